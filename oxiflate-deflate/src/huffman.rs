//! Huffman tree construction for DEFLATE compression.
//!
//! Every emitted block carries its own canonical Huffman codes, built here
//! from the block's symbol frequencies:
//!
//! 1. A min-heap repeatedly merges the two lightest nodes. Ties go to the
//!    shallower subtree so the result is deterministic and flat.
//! 2. Lengths above the alphabet's limit are folded back while keeping the
//!    Kraft sum at one.
//! 3. Canonical codes are assigned by ascending length, then symbol, and
//!    stored bit-reversed for LSB-first emission.
//!
//! The literal/length and distance code lengths are themselves sent with a
//! third, bit-length code that run-length encodes them (see
//! [`scan_lengths`] and [`send_lengths`]).
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29
//! - **Bit Length**: 0-18

use crate::tables::{
    BL_CODES, BL_EXTRA_BITS, D_CODES, DISTANCE_EXTRA_BITS, L_CODES, LENGTH_EXTRA_BITS, LITERALS,
    MAX_BITS, MAX_BL_BITS, REP_3_6, REPZ_3_10, REPZ_11_138, fixed_distance_lengths,
    fixed_litlen_lengths,
};
use oxiflate_core::bitstream::PendingBuf;
use std::sync::OnceLock;

/// Heap capacity: every leaf plus every internal node of the largest tree.
const HEAP_SIZE: usize = 2 * L_CODES + 1;

/// A canonical code ready for emission (bit-reversed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    /// Code bits, LSB-first.
    pub bits: u16,
    /// Code length in bits; zero for unused symbols.
    pub len: u8,
}

/// The three alphabets a block uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// Literals, end-of-block and match lengths.
    LitLen,
    /// Match distances.
    Distance,
    /// Code lengths of the other two trees.
    BitLength,
}

impl Alphabet {
    /// Number of symbols the encoder may use.
    pub fn size(self) -> usize {
        match self {
            Self::LitLen => L_CODES,
            Self::Distance => D_CODES,
            Self::BitLength => BL_CODES,
        }
    }

    /// Longest permitted code.
    pub fn max_length(self) -> u8 {
        match self {
            Self::BitLength => MAX_BL_BITS,
            _ => MAX_BITS,
        }
    }

    /// Extra bits sent after `symbol`.
    #[inline]
    pub fn extra_bits(self, symbol: usize) -> u8 {
        match self {
            Self::LitLen if symbol > LITERALS => LENGTH_EXTRA_BITS[symbol - LITERALS - 1],
            Self::LitLen => 0,
            Self::Distance => DISTANCE_EXTRA_BITS[symbol],
            Self::BitLength => BL_EXTRA_BITS[symbol],
        }
    }

    /// Fixed code for this alphabet, if RFC 1951 defines one.
    pub fn static_codes(self) -> Option<&'static [Code]> {
        match self {
            Self::LitLen => Some(static_litlen_codes()),
            Self::Distance => Some(static_distance_codes()),
            Self::BitLength => None,
        }
    }
}

/// Fixed literal/length codes (288 entries).
pub fn static_litlen_codes() -> &'static [Code] {
    static CODES: OnceLock<Vec<Code>> = OnceLock::new();
    CODES.get_or_init(|| canonical_codes(&fixed_litlen_lengths()))
}

/// Fixed distance codes (30 entries).
pub fn static_distance_codes() -> &'static [Code] {
    static CODES: OnceLock<Vec<Code>> = OnceLock::new();
    CODES.get_or_init(|| canonical_codes(&fixed_distance_lengths()[..D_CODES]))
}

/// Reverse the low `length` bits of `code`.
#[inline]
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - length as u32)
}

/// Assign canonical codes to a set of code lengths.
///
/// Codes are returned bit-reversed, ready for LSB-first output.
pub fn canonical_codes(lengths: &[u8]) -> Vec<Code> {
    let mut bl_count = [0u16; MAX_BITS as usize + 1];
    for &len in lengths {
        bl_count[len as usize] += 1;
    }
    bl_count[0] = 0;

    let mut next_code = [0u16; MAX_BITS as usize + 1];
    let mut code = 0u16;
    for bits in 1..=MAX_BITS as usize {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return Code::default();
            }
            let bits = reverse_bits(next_code[len as usize], len);
            next_code[len as usize] += 1;
            Code { bits, len }
        })
        .collect()
}

/// Encoded size of a block body under one tree, in bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCost {
    /// Bits using the tree just built.
    pub dynamic: i64,
    /// Bits using the fixed code (zero for the bit-length alphabet).
    pub fixed: i64,
}

/// One block's Huffman tree for one alphabet.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    alphabet: Alphabet,
    /// Symbol frequencies for the current block.
    freq: Vec<u32>,
    /// Codes built by [`TreeBuilder::build`].
    codes: Vec<Code>,
    /// Largest symbol with a non-zero code.
    max_code: usize,
}

impl HuffmanTree {
    /// Create an empty tree for an alphabet.
    pub fn new(alphabet: Alphabet) -> Self {
        let size = alphabet.size();
        Self {
            alphabet,
            freq: vec![0; size],
            codes: vec![Code::default(); size],
            max_code: 0,
        }
    }

    /// Which alphabet this tree codes.
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Zero all frequencies.
    pub fn reset(&mut self) {
        self.freq.fill(0);
    }

    /// Count one occurrence of `symbol`.
    #[inline(always)]
    pub fn count(&mut self, symbol: usize) {
        self.freq[symbol] += 1;
    }

    /// Count `n` occurrences of `symbol`.
    #[inline]
    pub fn count_n(&mut self, symbol: usize, n: u32) {
        self.freq[symbol] += n;
    }

    /// Frequency of `symbol` in the current block.
    #[inline]
    pub fn freq(&self, symbol: usize) -> u32 {
        self.freq[symbol]
    }

    /// Code for `symbol` from the last build.
    #[inline(always)]
    pub fn code(&self, symbol: usize) -> Code {
        self.codes[symbol]
    }

    /// All codes from the last build.
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Code length of `symbol` from the last build.
    #[inline]
    pub fn length(&self, symbol: usize) -> u8 {
        self.codes[symbol].len
    }

    /// Largest symbol with a non-zero code length.
    pub fn max_code(&self) -> usize {
        self.max_code
    }
}

/// Scratch space for building trees, reused across blocks.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    /// 1-based binary heap of node indices; the tail collects removed nodes.
    heap: Vec<usize>,
    heap_len: usize,
    heap_max: usize,
    /// Per-node frequency, depth, parent and length (leaves first).
    freq: Vec<u32>,
    depth: Vec<u8>,
    parent: Vec<usize>,
    len: Vec<u8>,
    bl_count: [u16; MAX_BITS as usize + 1],
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Allocate scratch space for the largest alphabet.
    pub fn new() -> Self {
        Self {
            heap: vec![0; HEAP_SIZE],
            heap_len: 0,
            heap_max: HEAP_SIZE,
            freq: vec![0; HEAP_SIZE],
            depth: vec![0; HEAP_SIZE],
            parent: vec![0; HEAP_SIZE],
            len: vec![0; HEAP_SIZE],
            bl_count: [0; MAX_BITS as usize + 1],
        }
    }

    /// Build length-limited canonical codes for `tree` from its frequencies.
    ///
    /// At least two codes are always produced, so the decoder never sees a
    /// degenerate one-code tree. Returns the block body size under the new
    /// codes and under the fixed codes.
    pub fn build(&mut self, tree: &mut HuffmanTree) -> TreeCost {
        let elems = tree.alphabet.size();
        let static_codes = tree.alphabet.static_codes();
        let mut cost = TreeCost::default();

        self.heap_len = 0;
        self.heap_max = HEAP_SIZE;
        let mut max_code: isize = -1;

        for n in 0..elems {
            self.freq[n] = tree.freq[n];
            self.depth[n] = 0;
            self.len[n] = 0;
            if tree.freq[n] != 0 {
                self.heap_len += 1;
                self.heap[self.heap_len] = n;
                max_code = n as isize;
            }
        }

        // Force at least two codes of non-zero frequency. The forced symbol
        // is either just above the largest used one or symbol 0, and is
        // never already in the heap.
        while self.heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            self.push_forced(node, static_codes, &mut cost);
        }
        let max_code = max_code as usize;
        tree.max_code = max_code;

        for n in (1..=self.heap_len / 2).rev() {
            self.sift_down(n);
        }

        // Combine the two lightest nodes until one root is left.
        let mut node = elems;
        loop {
            let n = self.pop();
            let m = self.heap[1];

            self.heap_max -= 1;
            self.heap[self.heap_max] = n;
            self.heap_max -= 1;
            self.heap[self.heap_max] = m;

            self.freq[node] = self.freq[n] + self.freq[m];
            self.depth[node] = self.depth[n].max(self.depth[m]) + 1;
            self.parent[n] = node;
            self.parent[m] = node;

            self.heap[1] = node;
            node += 1;
            self.sift_down(1);

            if self.heap_len < 2 {
                break;
            }
        }
        self.heap_max -= 1;
        self.heap[self.heap_max] = self.heap[1];

        self.gen_lengths(tree.alphabet, max_code, static_codes, &mut cost);

        tree.codes = canonical_codes(&self.len[..elems]);
        cost
    }

    fn push_forced(&mut self, node: usize, static_codes: Option<&[Code]>, cost: &mut TreeCost) {
        self.heap_len += 1;
        self.heap[self.heap_len] = node;
        self.freq[node] = 1;
        self.depth[node] = 0;
        // The forced symbol is never sent; undo the cost gen_lengths adds.
        cost.dynamic -= 1;
        if let Some(codes) = static_codes {
            cost.fixed -= codes[node].len as i64;
        }
    }

    /// Whether node `n` sorts before node `m`.
    #[inline]
    fn smaller(&self, n: usize, m: usize) -> bool {
        self.freq[n] < self.freq[m] || (self.freq[n] == self.freq[m] && self.depth[n] <= self.depth[m])
    }

    fn sift_down(&mut self, mut k: usize) {
        let v = self.heap[k];
        let mut j = k << 1;
        while j <= self.heap_len {
            if j < self.heap_len && self.smaller(self.heap[j + 1], self.heap[j]) {
                j += 1;
            }
            if self.smaller(v, self.heap[j]) {
                break;
            }
            self.heap[k] = self.heap[j];
            k = j;
            j <<= 1;
        }
        self.heap[k] = v;
    }

    fn pop(&mut self) -> usize {
        let top = self.heap[1];
        self.heap[1] = self.heap[self.heap_len];
        self.heap_len -= 1;
        self.sift_down(1);
        top
    }

    /// Compute code lengths from the merged tree, folding overlong codes.
    fn gen_lengths(
        &mut self,
        alphabet: Alphabet,
        max_code: usize,
        static_codes: Option<&[Code]>,
        cost: &mut TreeCost,
    ) {
        let max_length = alphabet.max_length();
        self.bl_count = [0; MAX_BITS as usize + 1];

        let root = self.heap[self.heap_max];
        self.len[root] = 0;
        let mut overflow = 0i32;

        for h in self.heap_max + 1..HEAP_SIZE {
            let n = self.heap[h];
            let mut bits = self.len[self.parent[n]] + 1;
            if bits > max_length {
                bits = max_length;
                overflow += 1;
            }
            self.len[n] = bits;
            if n > max_code {
                continue;
            }

            self.bl_count[bits as usize] += 1;
            let extra = alphabet.extra_bits(n) as i64;
            let f = self.freq[n] as i64;
            cost.dynamic += f * (bits as i64 + extra);
            if let Some(codes) = static_codes {
                cost.fixed += f * (codes[n].len as i64 + extra);
            }
        }
        if overflow == 0 {
            return;
        }

        // Move overflowing leaves up one level by splitting a shorter leaf.
        while overflow > 0 {
            let mut bits = max_length as usize - 1;
            while self.bl_count[bits] == 0 {
                bits -= 1;
            }
            self.bl_count[bits] -= 1;
            self.bl_count[bits + 1] += 2;
            self.bl_count[max_length as usize] -= 1;
            overflow -= 2;
        }

        // Reassign lengths to leaves in frequency order.
        let mut h = HEAP_SIZE;
        for bits in (1..=max_length).rev() {
            let mut n = self.bl_count[bits as usize];
            while n != 0 {
                h -= 1;
                let m = self.heap[h];
                if m > max_code {
                    continue;
                }
                if self.len[m] != bits {
                    cost.dynamic += (bits as i64 - self.len[m] as i64) * self.freq[m] as i64;
                    self.len[m] = bits;
                }
                n -= 1;
            }
        }
    }
}

/// A run of equal code lengths as the bit-length code expresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthRun {
    /// Send `len` literally `count` times.
    Plain { len: u8, count: usize },
    /// Send `len` once if it differs from the previous length, then
    /// repeat it with code 16 for the rest of `count`.
    Repeat { len: u8, count: usize, send_first: bool },
    /// 3-10 zeros (code 17).
    ShortZeros(usize),
    /// 11-138 zeros (code 18).
    LongZeros(usize),
}

/// Split `lengths[..=max_code]` into runs.
fn for_each_run(lengths: &[u8], max_code: usize, mut f: impl FnMut(LengthRun)) {
    let mut prev_len: Option<u8> = None;
    let mut next_len = lengths[0];
    let mut count = 0usize;
    let (mut max_count, mut min_count) = if next_len == 0 { (138, 3) } else { (7, 4) };

    for n in 0..=max_code {
        let cur_len = next_len;
        // Past the last code, compare against a length no tree can have.
        next_len = if n < max_code { lengths[n + 1] } else { u8::MAX };
        count += 1;
        if count < max_count && cur_len == next_len {
            continue;
        }

        let run = if count < min_count {
            LengthRun::Plain {
                len: cur_len,
                count,
            }
        } else if cur_len != 0 {
            LengthRun::Repeat {
                len: cur_len,
                count,
                send_first: prev_len != Some(cur_len),
            }
        } else if count <= 10 {
            LengthRun::ShortZeros(count)
        } else {
            LengthRun::LongZeros(count)
        };
        f(run);

        count = 0;
        prev_len = Some(cur_len);
        (max_count, min_count) = if next_len == 0 {
            (138, 3)
        } else if cur_len == next_len {
            (6, 3)
        } else {
            (7, 4)
        };
    }
}

/// Count the bit-length symbols needed to send `tree`'s code lengths.
pub fn scan_lengths(tree: &HuffmanTree, bl_tree: &mut HuffmanTree) {
    let lengths: Vec<u8> = tree.codes.iter().map(|c| c.len).collect();
    for_each_run(&lengths, tree.max_code, |run| match run {
        LengthRun::Plain { len, count } => bl_tree.count_n(len as usize, count as u32),
        LengthRun::Repeat {
            len, send_first, ..
        } => {
            if send_first {
                bl_tree.count(len as usize);
            }
            bl_tree.count(REP_3_6);
        }
        LengthRun::ShortZeros(_) => bl_tree.count(REPZ_3_10),
        LengthRun::LongZeros(_) => bl_tree.count(REPZ_11_138),
    });
}

/// Emit `tree`'s code lengths using the bit-length code.
pub fn send_lengths(tree: &HuffmanTree, bl_tree: &HuffmanTree, out: &mut PendingBuf) {
    let lengths: Vec<u8> = tree.codes.iter().map(|c| c.len).collect();
    for_each_run(&lengths, tree.max_code, |run| match run {
        LengthRun::Plain { len, count } => {
            for _ in 0..count {
                send_symbol(out, bl_tree, len as usize);
            }
        }
        LengthRun::Repeat {
            len,
            mut count,
            send_first,
        } => {
            if send_first {
                send_symbol(out, bl_tree, len as usize);
                count -= 1;
            }
            debug_assert!((3..=6).contains(&count));
            send_symbol(out, bl_tree, REP_3_6);
            out.send_bits((count - 3) as u32, 2);
        }
        LengthRun::ShortZeros(count) => {
            send_symbol(out, bl_tree, REPZ_3_10);
            out.send_bits((count - 3) as u32, 3);
        }
        LengthRun::LongZeros(count) => {
            send_symbol(out, bl_tree, REPZ_11_138);
            out.send_bits((count - 11) as u32, 7);
        }
    });
}

#[inline]
fn send_symbol(out: &mut PendingBuf, bl_tree: &HuffmanTree, symbol: usize) {
    let code = bl_tree.code(symbol);
    out.send_bits(code.bits as u32, code.len as u32);
}

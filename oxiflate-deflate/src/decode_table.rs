//! Table-driven Huffman decoding.
//!
//! A [`DecodeTable`] is indexed by the next `root_bits` input bits. Each
//! entry either finishes a symbol (literal, length or distance base, end of
//! block, or an invalid code) or links to a second-level table for codes
//! longer than the root width.
//!
//! Tables are built from code lengths exactly as they are sent in a dynamic
//! block header, so an over-subscribed or incomplete set is rejected here.

use crate::tables::{
    DISTANCE_BASE, DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS, MAX_BITS,
    fixed_distance_lengths, fixed_litlen_lengths,
};
use oxiflate_core::bitstream::BitAccumulator;
use std::sync::OnceLock;

/// Root width for literal/length tables.
pub const LITLEN_ROOT_BITS: u8 = 9;
/// Root width for distance tables.
pub const DISTANCE_ROOT_BITS: u8 = 6;
/// Root width for the code-length table (codes never exceed 7 bits).
pub const CODE_LENGTH_ROOT_BITS: u8 = 7;

/// Most entries a literal/length table can need with a 9-bit root.
const ENOUGH_LITLEN: usize = 852;
/// Most entries a distance table can need with a 6-bit root.
const ENOUGH_DISTANCE: usize = 592;
/// Code-length codes fit in one 7-bit table.
const ENOUGH_CODE_LENGTH: usize = 1 << CODE_LENGTH_ROOT_BITS;

/// What an entry decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `val` is a literal byte, or a code-length symbol (0-18).
    Literal,
    /// `val` is a length or distance base; `extra` bits follow.
    Base {
        /// Extra bits to add to the base.
        extra: u8,
    },
    /// End of the block.
    EndOfBlock,
    /// `val` is the offset of a sub-table indexed by `index_bits` more bits.
    Link {
        /// Width of the sub-table index.
        index_bits: u8,
    },
    /// The bits do not form a valid code.
    Invalid,
}

/// One decode-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// What the code means.
    pub op: Op,
    /// Bits consumed by this entry.
    pub bits: u8,
    /// Symbol value, base, or sub-table offset.
    pub val: u16,
}

impl Entry {
    const INVALID: Self = Self {
        op: Op::Invalid,
        bits: 1,
        val: 0,
    };
}

/// Which alphabet a table decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The 19 code-length symbols of a dynamic header.
    CodeLengths,
    /// Literals, end-of-block and lengths.
    LitLen,
    /// Distances.
    Distance,
}

impl TableKind {
    fn enough(self) -> usize {
        match self {
            Self::CodeLengths => ENOUGH_CODE_LENGTH,
            Self::LitLen => ENOUGH_LITLEN,
            Self::Distance => ENOUGH_DISTANCE,
        }
    }

    /// Message reported for a malformed set of code lengths.
    pub fn error_message(self) -> &'static str {
        match self {
            Self::CodeLengths => "invalid code lengths set",
            Self::LitLen => "invalid literal/lengths set",
            Self::Distance => "invalid distances set",
        }
    }

    fn entry(self, symbol: usize, bits: u8) -> Entry {
        let (op, val) = match self {
            Self::CodeLengths => (Op::Literal, symbol as u16),
            Self::LitLen => match symbol {
                0..=255 => (Op::Literal, symbol as u16),
                256 => (Op::EndOfBlock, 0),
                257..=285 => (
                    Op::Base {
                        extra: LENGTH_EXTRA_BITS[symbol - 257],
                    },
                    LENGTH_BASE[symbol - 257],
                ),
                _ => (Op::Invalid, 0),
            },
            Self::Distance => match symbol {
                0..=29 => (
                    Op::Base {
                        extra: DISTANCE_EXTRA_BITS[symbol],
                    },
                    DISTANCE_BASE[symbol],
                ),
                _ => (Op::Invalid, 0),
            },
        };
        Entry { op, bits, val }
    }
}

/// A two-level Huffman decode table.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    entries: Vec<Entry>,
    root_bits: u8,
}

impl DecodeTable {
    /// Create an empty table; every lookup is invalid until built.
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::INVALID; 2],
            root_bits: 1,
        }
    }

    /// Width of the root table in bits.
    pub fn root_bits(&self) -> u8 {
        self.root_bits
    }

    /// Number of entries in use.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the table from per-symbol code lengths.
    ///
    /// An empty set (all lengths zero) is accepted and decodes every input
    /// as invalid. An incomplete set is accepted only when it is a single
    /// one-bit code outside the code-length alphabet.
    pub fn build(
        &mut self,
        kind: TableKind,
        lengths: &[u8],
        root_bits: u8,
    ) -> Result<(), &'static str> {
        const MAX: usize = MAX_BITS as usize;
        let mut count = [0u16; MAX + 1];
        for &len in lengths {
            count[len as usize] += 1;
        }

        let mut max = MAX;
        while max >= 1 && count[max] == 0 {
            max -= 1;
        }
        self.entries.clear();
        if max == 0 {
            self.entries.extend([Entry::INVALID; 2]);
            self.root_bits = 1;
            return Ok(());
        }
        let mut min = 1;
        while count[min] == 0 {
            min += 1;
        }
        let root = (root_bits as usize).clamp(min, max);

        let mut left: i32 = 1;
        for &n in &count[1..] {
            left <<= 1;
            left -= n as i32;
            if left < 0 {
                return Err(kind.error_message());
            }
        }
        if left > 0 && (kind == TableKind::CodeLengths || max != 1) {
            return Err(kind.error_message());
        }

        // Symbols sorted by code length, then by value.
        let mut offsets = [0u16; MAX + 1];
        for len in 1..MAX {
            offsets[len + 1] = offsets[len] + count[len];
        }
        let mut work = [0u16; 320];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len != 0 {
                work[offsets[len as usize] as usize] = symbol as u16;
                offsets[len as usize] += 1;
            }
        }

        let enough = kind.enough();
        self.entries.resize(enough, Entry::INVALID);

        let mut huff = 0usize; // current code, bit-reversed
        let mut sym = 0;
        let mut len = min;
        let mut next = 0; // start of the table being filled
        let mut curr = root; // its index width
        let mut drop = 0; // bits resolved by the root table
        let mut low = usize::MAX; // root index of the current sub-table
        let mut used = 1usize << root;
        let mask = used - 1;

        loop {
            let here = kind.entry(work[sym] as usize, (len - drop) as u8);

            // Replicate the entry wherever the unused high bits vary.
            let incr = 1usize << (len - drop);
            let size = 1usize << curr;
            let mut fill = size;
            loop {
                fill -= incr;
                self.entries[next + (huff >> drop) + fill] = here;
                if fill == 0 {
                    break;
                }
            }

            // Increment the reversed code.
            let mut incr = 1usize << (len - 1);
            while huff & incr != 0 {
                incr >>= 1;
            }
            if incr != 0 {
                huff &= incr - 1;
                huff += incr;
            } else {
                huff = 0;
            }

            sym += 1;
            count[len] -= 1;
            if count[len] == 0 {
                if len == max {
                    break;
                }
                len = lengths[work[sym] as usize] as usize;
            }

            if len > root && (huff & mask) != low {
                if drop == 0 {
                    drop = root;
                }
                next += size;

                // Size the sub-table for the codes that share this prefix.
                curr = len - drop;
                let mut left = 1i32 << curr;
                while curr + drop < max {
                    left -= count[curr + drop] as i32;
                    if left <= 0 {
                        break;
                    }
                    curr += 1;
                    left <<= 1;
                }

                used += 1 << curr;
                if used > enough {
                    return Err(kind.error_message());
                }

                low = huff & mask;
                self.entries[low] = Entry {
                    op: Op::Link {
                        index_bits: curr as u8,
                    },
                    bits: root as u8,
                    val: next as u16,
                };
            }
        }

        // An incomplete code leaves exactly one slot unfilled.
        if huff != 0 {
            self.entries[next + (huff >> drop)] = Entry {
                op: Op::Invalid,
                bits: (len - drop) as u8,
                val: 0,
            };
        }

        self.entries.truncate(used);
        self.root_bits = root as u8;
        Ok(())
    }

    /// Decode one entry, pulling input bytes one at a time as needed.
    ///
    /// Returns `None` when the input runs out first; the bits pulled so far
    /// stay in `acc` and nothing is consumed.
    #[inline]
    pub fn decode(
        &self,
        acc: &mut BitAccumulator,
        input: &[u8],
        pos: &mut usize,
    ) -> Option<Entry> {
        let root = self.root_bits as u32;
        let mut here;
        loop {
            here = self.entries[acc.peek(root) as usize];
            if here.bits as u32 <= acc.bits() {
                break;
            }
            if !acc.pull_byte(input, pos) {
                return None;
            }
        }

        if let Op::Link { index_bits } = here.op {
            let base = here.val as usize;
            loop {
                let sub = self.entries[base + (acc.peek(root + index_bits as u32) >> root) as usize];
                if root + sub.bits as u32 <= acc.bits() {
                    here = sub;
                    break;
                }
                if !acc.pull_byte(input, pos) {
                    return None;
                }
            }
            acc.consume(root);
        }

        acc.consume(here.bits as u32);
        Some(here)
    }

    /// Decode one entry when at least 15 bits are known to be buffered.
    #[inline(always)]
    pub fn resolve(&self, acc: &mut BitAccumulator) -> Entry {
        let mut here = self.entries[acc.peek(self.root_bits as u32) as usize];
        if let Op::Link { index_bits } = here.op {
            acc.consume(here.bits as u32);
            here = self.entries[here.val as usize + acc.peek(index_bits as u32) as usize];
        }
        acc.consume(here.bits as u32);
        here
    }
}

impl Default for DecodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode tables for fixed-Huffman blocks, built on first use.
pub fn fixed_tables() -> &'static (DecodeTable, DecodeTable) {
    static FIXED: OnceLock<(DecodeTable, DecodeTable)> = OnceLock::new();
    FIXED.get_or_init(|| {
        let mut litlen = DecodeTable::new();
        let built = litlen.build(TableKind::LitLen, &fixed_litlen_lengths(), LITLEN_ROOT_BITS);
        debug_assert!(built.is_ok());

        let mut distance = DecodeTable::new();
        let built = distance.build(TableKind::Distance, &fixed_distance_lengths(), 5);
        debug_assert!(built.is_ok());

        (litlen, distance)
    })
}

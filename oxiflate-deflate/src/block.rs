//! Block emission for DEFLATE compression.
//!
//! The match finder tallies tokens here; when a block closes, the writer
//! builds Huffman trees for it, compares the encoded size under dynamic
//! codes, fixed codes and stored form, and writes the cheapest encoding to
//! the pending output.

use crate::huffman::{
    Alphabet, Code, HuffmanTree, TreeBuilder, scan_lengths, send_lengths, static_distance_codes,
    static_litlen_codes,
};
use crate::lz77::Lz77Token;
use crate::tables::{
    BL_ORDER, D_CODES, DISTANCE_BASE, DISTANCE_EXTRA_BITS, DYN_TREES, END_BLOCK, LENGTH_BASE,
    LENGTH_EXTRA_BITS, LITERALS, STATIC_TREES, STORED_BLOCK, distance_code, length_code,
};
use oxiflate_core::bitstream::PendingBuf;
use oxiflate_core::config::Strategy;

/// Accumulates one block's tokens and writes finished blocks.
#[derive(Debug, Clone)]
pub struct BlockWriter {
    /// Finished output waiting for caller buffer space.
    pub pending: PendingBuf,
    lit_tree: HuffmanTree,
    dist_tree: HuffmanTree,
    bl_tree: HuffmanTree,
    builder: TreeBuilder,
    /// Tokens of the block being built.
    tokens: Vec<Lz77Token>,
    /// Token capacity; the block closes one token before it.
    lit_bufsize: usize,
    /// Number of match tokens in the block.
    matches: usize,
    /// Length of the last end-of-block code sent, for the partial flush.
    last_eob_len: u8,
    /// Every token tallied since creation.
    #[cfg(test)]
    pub(crate) trace: Vec<Lz77Token>,
}

impl BlockWriter {
    /// Create a writer whose token buffer holds `1 << (mem_level + 6)`
    /// entries.
    pub fn new(mem_level: u8) -> Self {
        let lit_bufsize = 1usize << (mem_level + 6);
        let mut writer = Self {
            pending: PendingBuf::with_capacity(lit_bufsize * 4),
            lit_tree: HuffmanTree::new(Alphabet::LitLen),
            dist_tree: HuffmanTree::new(Alphabet::Distance),
            bl_tree: HuffmanTree::new(Alphabet::BitLength),
            builder: TreeBuilder::new(),
            tokens: Vec::with_capacity(lit_bufsize),
            lit_bufsize,
            matches: 0,
            last_eob_len: 8,
            #[cfg(test)]
            trace: Vec::new(),
        };
        writer.init_block();
        writer
    }

    /// Size of the pending buffer this writer was sized for; bounds stored
    /// block length.
    pub fn pending_buf_size(&self) -> usize {
        self.lit_bufsize * 4
    }

    /// Return to the freshly created state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.last_eob_len = 8;
        self.init_block();
    }

    /// Start a new block.
    fn init_block(&mut self) {
        self.lit_tree.reset();
        self.dist_tree.reset();
        self.bl_tree.reset();
        self.lit_tree.count(END_BLOCK);
        self.tokens.clear();
        self.matches = 0;
    }

    /// Number of tokens in the current block.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Record a literal. Returns `true` when the block should be closed.
    #[inline]
    pub fn tally_literal(&mut self, byte: u8) -> bool {
        self.push(Lz77Token::Literal(byte));
        self.lit_tree.count(byte as usize);
        self.tokens.len() == self.lit_bufsize - 1
    }

    /// Record a match.
    ///
    /// `input_span` is the number of input bytes the current block covers,
    /// used by the early-close estimate at levels above 2. Returns `true`
    /// when the block should be closed.
    #[inline]
    pub fn tally_match(
        &mut self,
        distance: usize,
        length: usize,
        level: u8,
        input_span: usize,
    ) -> bool {
        self.push(Lz77Token::Match {
            length: length as u16,
            distance: distance as u16,
        });
        self.matches += 1;
        self.lit_tree.count(length_code(length) + LITERALS + 1);
        self.dist_tree.count(distance_code(distance));

        let count = self.tokens.len();
        if count & 0x1fff == 0 && level > 2 && self.looks_compressed(count, input_span) {
            return true;
        }
        count == self.lit_bufsize - 1
    }

    /// Estimate whether closing now already beats 2:1 on a literal-heavy
    /// block.
    fn looks_compressed(&self, count: usize, input_span: usize) -> bool {
        let mut out_length = count * 8;
        for dcode in 0..D_CODES {
            out_length +=
                self.dist_tree.freq(dcode) as usize * (5 + DISTANCE_EXTRA_BITS[dcode] as usize);
        }
        out_length >>= 3;
        self.matches < count / 2 && out_length < input_span / 2
    }

    #[inline(always)]
    fn push(&mut self, token: Lz77Token) {
        self.tokens.push(token);
        #[cfg(test)]
        self.trace.push(token);
    }

    /// Close the current block.
    ///
    /// `stored` is the block's input when it is still in the window; a
    /// stored block is only possible then. `stored_len` is the number of
    /// input bytes the block covers.
    pub fn flush_block(
        &mut self,
        stored: Option<&[u8]>,
        stored_len: usize,
        last: bool,
        level: u8,
        strategy: Strategy,
    ) {
        let mut max_blindex = 0;
        let (opt_lenb, static_lenb) = if level > 0 {
            let lit_cost = self.builder.build(&mut self.lit_tree);
            let dist_cost = self.builder.build(&mut self.dist_tree);
            let (bl_index, bl_cost) = self.build_bl_tree();
            max_blindex = bl_index;

            let opt_len = lit_cost.dynamic + dist_cost.dynamic + bl_cost;
            let static_len = lit_cost.fixed + dist_cost.fixed;
            let opt_lenb = ((opt_len + 3 + 7) >> 3) as usize;
            let static_lenb = ((static_len + 3 + 7) >> 3) as usize;
            (opt_lenb.min(static_lenb), static_lenb)
        } else {
            (stored_len + 5, stored_len + 5)
        };

        match stored {
            Some(data) if stored_len + 4 <= opt_lenb => {
                self.stored_block(&data[..stored_len], last);
            }
            _ if strategy == Strategy::Fixed || static_lenb == opt_lenb => {
                self.pending.send_bits((STATIC_TREES << 1) + last as u32, 3);
                self.last_eob_len = compress_block(
                    &mut self.pending,
                    &self.tokens,
                    static_litlen_codes(),
                    static_distance_codes(),
                );
            }
            _ => {
                self.pending.send_bits((DYN_TREES << 1) + last as u32, 3);
                self.send_all_trees(max_blindex + 1);
                self.last_eob_len = compress_block(
                    &mut self.pending,
                    &self.tokens,
                    self.lit_tree.codes(),
                    self.dist_tree.codes(),
                );
            }
        }

        self.init_block();
        if last {
            self.pending.align_to_byte();
        }
    }

    /// Build the bit-length tree. Returns the index in [`BL_ORDER`] of the
    /// last length to send and the header cost in bits.
    fn build_bl_tree(&mut self) -> (usize, i64) {
        scan_lengths(&self.lit_tree, &mut self.bl_tree);
        scan_lengths(&self.dist_tree, &mut self.bl_tree);
        let cost = self.builder.build(&mut self.bl_tree);

        // At least four bit-length codes are always sent.
        let mut max_blindex = BL_ORDER.len() - 1;
        while max_blindex > 3 && self.bl_tree.length(BL_ORDER[max_blindex]) == 0 {
            max_blindex -= 1;
        }
        // HLIT, HDIST, HCLEN and 3 bits per transmitted bit-length code.
        let header = 3 * (max_blindex as i64 + 1) + 5 + 5 + 4;
        (max_blindex, cost.dynamic + header)
    }

    fn send_all_trees(&mut self, bl_codes: usize) {
        let lcodes = self.lit_tree.max_code() + 1;
        let dcodes = self.dist_tree.max_code() + 1;
        self.pending.send_bits((lcodes - 257) as u32, 5);
        self.pending.send_bits((dcodes - 1) as u32, 5);
        self.pending.send_bits((bl_codes - 4) as u32, 4);
        for &symbol in &BL_ORDER[..bl_codes] {
            self.pending
                .send_bits(self.bl_tree.length(symbol) as u32, 3);
        }
        send_lengths(&self.lit_tree, &self.bl_tree, &mut self.pending);
        send_lengths(&self.dist_tree, &self.bl_tree, &mut self.pending);
    }

    /// Write a stored block holding `data` (at most 65535 bytes).
    pub fn stored_block(&mut self, data: &[u8], last: bool) {
        debug_assert!(data.len() <= 0xffff);
        self.pending.send_bits((STORED_BLOCK << 1) + last as u32, 3);
        self.pending.align_to_byte();
        self.last_eob_len = 8;
        let len = data.len() as u16;
        self.pending.put_u16_le(len);
        self.pending.put_u16_le(!len);
        self.pending.put_bytes(data);
    }

    /// Emit an empty fixed-code block so the decoder can finish the
    /// previous one. Sends a second one when the decoder might otherwise
    /// lack lookahead bits to decode the first.
    pub fn align(&mut self) {
        let eob = static_litlen_codes()[END_BLOCK];
        self.pending.send_bits(STATIC_TREES << 1, 3);
        self.pending.send_bits(eob.bits as u32, eob.len as u32);
        self.pending.flush_bits();

        // The decoder needs 9 bits of lookahead past the last real code: the
        // previous EOB plus what has been sent of this empty block.
        if 1 + self.last_eob_len as u32 + 10 < 9 + self.pending.bit_count() {
            self.pending.send_bits(STATIC_TREES << 1, 3);
            self.pending.send_bits(eob.bits as u32, eob.len as u32);
            self.pending.flush_bits();
        }
        self.last_eob_len = 7;
    }
}

/// Huffman-code a block's tokens followed by end-of-block. Returns the
/// length of the end-of-block code.
fn compress_block(
    out: &mut PendingBuf,
    tokens: &[Lz77Token],
    lit_codes: &[Code],
    dist_codes: &[Code],
) -> u8 {
    for &token in tokens {
        match token {
            Lz77Token::Literal(byte) => send(out, lit_codes[byte as usize]),
            Lz77Token::Match { length, distance } => {
                let length = length as usize;
                let distance = distance as usize;

                let code = length_code(length);
                send(out, lit_codes[code + LITERALS + 1]);
                let extra = LENGTH_EXTRA_BITS[code];
                if extra != 0 {
                    out.send_bits((length - LENGTH_BASE[code] as usize) as u32, extra as u32);
                }

                let code = distance_code(distance);
                send(out, dist_codes[code]);
                let extra = DISTANCE_EXTRA_BITS[code];
                if extra != 0 {
                    out.send_bits(
                        (distance - DISTANCE_BASE[code] as usize) as u32,
                        extra as u32,
                    );
                }
            }
        }
    }

    send(out, lit_codes[END_BLOCK]);
    lit_codes[END_BLOCK].len
}

#[inline(always)]
fn send(out: &mut PendingBuf, code: Code) {
    out.send_bits(code.bits as u32, code.len as u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::Inflater;
    use oxiflate_core::Decompressor;

    fn drain(writer: &mut BlockWriter) -> Vec<u8> {
        let mut out = vec![0u8; writer.pending.pending()];
        let n = writer.pending.drain_into(&mut out);
        out.truncate(n);
        out
    }

    fn decode(raw: &[u8]) -> Vec<u8> {
        Inflater::raw(15).decompress_all(raw).unwrap()
    }

    #[test]
    fn test_stored_block_layout() {
        let mut writer = BlockWriter::new(8);
        writer.stored_block(b"abc", true);
        let out = drain(&mut writer);
        assert_eq!(out, [0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c']);
    }

    #[test]
    fn test_empty_sync_marker() {
        let mut writer = BlockWriter::new(8);
        writer.stored_block(&[], false);
        assert_eq!(drain(&mut writer), [0x00, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_fixed_block_roundtrip() {
        let mut writer = BlockWriter::new(8);
        for &b in b"hello" {
            writer.tally_literal(b);
        }
        writer.tally_match(5, 5, 6, 10);
        writer.flush_block(None, 10, true, 6, Strategy::Fixed);
        assert_eq!(decode(&drain(&mut writer)), b"hellohello");
    }

    #[test]
    fn test_dynamic_block_roundtrip() {
        let text = b"it was the best of times, it was the worst of times";
        let mut writer = BlockWriter::new(8);
        for _ in 0..20 {
            for &b in text.iter() {
                writer.tally_literal(b);
            }
        }
        writer.flush_block(None, 20 * text.len(), true, 6, Strategy::Default);
        let out = drain(&mut writer);
        // A skewed literal distribution picks dynamic codes.
        assert_eq!(out[0] & 0b111, (DYN_TREES << 1 | 1) as u8);
        assert_eq!(decode(&out), text.repeat(20));
    }

    #[test]
    fn test_fresh_writer_counts_end_of_block() {
        let writer = BlockWriter::new(8);
        assert_eq!(writer.lit_tree.freq(END_BLOCK), 1);
        assert_eq!(writer.token_count(), 0);
    }

    #[test]
    fn test_first_block_literals_below_256() {
        // Only literals in the first block: the end-of-block symbol must
        // still be the highest coded literal/length symbol.
        let mut writer = BlockWriter::new(8);
        let data = vec![0u8; 300];
        for &b in &data {
            writer.tally_literal(b);
        }
        writer.flush_block(None, data.len(), true, 6, Strategy::Default);
        let out = drain(&mut writer);
        assert_eq!(out[0] & 0b111, (DYN_TREES << 1 | 1) as u8);
        assert_eq!(decode(&out), data);
    }

    #[test]
    fn test_level_zero_forces_stored() {
        let data = b"xyz";
        let mut writer = BlockWriter::new(8);
        for &b in data {
            writer.tally_literal(b);
        }
        writer.flush_block(Some(data), 3, true, 0, Strategy::Default);
        assert_eq!(drain(&mut writer).len(), 3 + 5);
    }

    #[test]
    fn test_token_buffer_limit() {
        let mut writer = BlockWriter::new(1);
        let limit = (1 << 7) - 1;
        for i in 0..limit - 1 {
            assert!(!writer.tally_literal(i as u8));
        }
        assert!(writer.tally_literal(0));
        assert_eq!(writer.token_count(), limit);
    }

    #[test]
    fn test_align_emits_decodable_blocks() {
        let mut writer = BlockWriter::new(8);
        writer.tally_literal(b'a');
        writer.flush_block(None, 1, false, 6, Strategy::Fixed);
        writer.align();
        writer.tally_literal(b'b');
        writer.flush_block(None, 1, true, 6, Strategy::Fixed);
        assert_eq!(decode(&drain(&mut writer)), b"ab");
    }
}

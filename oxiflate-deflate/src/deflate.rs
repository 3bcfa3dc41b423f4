//! DEFLATE compression.
//!
//! This module implements the streaming compressor as specified in RFC 1951.
//! It supports:
//! - Stored, fixed-Huffman and dynamic-Huffman blocks, chosen per block
//! - Greedy (levels 1-3) and lazy (levels 4-9) match search
//! - Huffman-only and run-length strategies
//! - Partial, sync, full and finish flushes
//! - Optional zlib framing (RFC 1950) with preset dictionaries
//!
//! The compressor never blocks: every call consumes what it can, writes what
//! fits and keeps the rest of its state for the next call. Feeding the same
//! input in one call or one byte at a time produces identical output.

use crate::block::BlockWriter;
use crate::lz77::{MatchFinder, Source};
use crate::tables::{
    Flavor, LevelConfig, MAX_MATCH, MIN_LOOKAHEAD, MIN_MATCH, TOO_FAR, level_config,
};
use oxiflate_core::adler::Adler32;
use oxiflate_core::bitstream::PendingBuf;
use oxiflate_core::config::{DEFAULT_MEM_LEVEL, FlateConfig, Framing, MAX_WINDOW_BITS, Strategy};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{CompressStatus, Compressor, FlushMode};

/// FLG bit announcing a preset dictionary.
const PRESET_DICT: u16 = 0x20;

/// Block-processing routine in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engine {
    Stored,
    Fast,
    Slow,
    HuffmanOnly,
    Rle,
}

impl Engine {
    fn select(level: u8, strategy: Strategy) -> Self {
        if level == 0 {
            return Self::Stored;
        }
        match strategy {
            Strategy::HuffmanOnly => Self::HuffmanOnly,
            Strategy::Rle => Self::Rle,
            _ => match level_config(level).flavor {
                Flavor::Store => Self::Stored,
                Flavor::Fast => Self::Fast,
                Flavor::Slow => Self::Slow,
            },
        }
    }
}

/// Where a block routine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// Out of input or output space.
    NeedMore,
    /// A block was closed for a flush.
    BlockDone,
    /// The final block was started but not fully written out.
    FinishStarted,
    /// The final block was written.
    FinishDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Nothing written yet.
    Init,
    Busy,
    /// The final block is closed; the trailer may still be pending.
    Finishing,
    Done,
}

/// Caller output buffer, or an unbounded sink that keeps everything pending.
struct Sink<'a> {
    out: &'a mut [u8],
    pos: usize,
    unbounded: bool,
}

impl<'a> Sink<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self {
            out,
            pos: 0,
            unbounded: false,
        }
    }

    fn unbounded() -> Self {
        Self {
            out: &mut [],
            pos: 0,
            unbounded: true,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        !self.unbounded && self.pos == self.out.len()
    }

    fn drain(&mut self, pending: &mut PendingBuf) {
        if !self.unbounded {
            self.pos += pending.drain_into(&mut self.out[self.pos..]);
        }
    }
}

/// Streaming DEFLATE compressor.
#[derive(Debug, Clone)]
pub struct Deflater {
    finder: MatchFinder,
    blocks: BlockWriter,
    level: u8,
    strategy: Strategy,
    config: &'static LevelConfig,
    window_bits: u8,
    /// Emit the zlib header and Adler-32 trailer.
    zlib: bool,
    status: Status,
    /// Flush mode of the previous call; `None` after a call that ran out of
    /// output, so the next call always makes progress.
    last_flush: Option<FlushMode>,
    adler: Adler32,
    /// Adler-32 of the loaded preset dictionary.
    dictionary_adler: Option<u32>,
    trailer_written: bool,
    total_in: u64,
    total_out: u64,
}

impl Deflater {
    /// Create a raw DEFLATE compressor at `level` (0-9).
    pub fn new(level: u8) -> Self {
        Self::build(
            level.min(9),
            Strategy::Default,
            MAX_WINDOW_BITS,
            DEFAULT_MEM_LEVEL,
            false,
        )
    }

    /// Create a compressor that wraps its output in zlib framing.
    pub fn zlib(level: u8) -> Self {
        Self::build(
            level.min(9),
            Strategy::Default,
            MAX_WINDOW_BITS,
            DEFAULT_MEM_LEVEL,
            true,
        )
    }

    /// Create a compressor from a configuration.
    ///
    /// `Framing::Zlib` adds the zlib header and trailer here. Gzip framing is
    /// applied by the stream layer, so both `Gzip` and `Raw` produce bare
    /// DEFLATE blocks.
    pub fn with_config(config: &FlateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(
            config.level.level(),
            config.strategy,
            config.window_bits,
            config.mem_level,
            config.framing == Framing::Zlib,
        ))
    }

    fn build(level: u8, strategy: Strategy, window_bits: u8, mem_level: u8, zlib: bool) -> Self {
        Self {
            finder: MatchFinder::new(window_bits, mem_level),
            blocks: BlockWriter::new(mem_level),
            level,
            strategy,
            config: level_config(level),
            window_bits,
            zlib,
            status: Status::Init,
            last_flush: Some(FlushMode::None),
            adler: Adler32::new(),
            dictionary_adler: None,
            trailer_written: false,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Reset the compressor, keeping its parameters.
    pub fn reset(&mut self) {
        self.finder.reset();
        self.blocks.reset();
        self.status = Status::Init;
        self.last_flush = Some(FlushMode::None);
        self.adler = Adler32::new();
        self.dictionary_adler = None;
        self.trailer_written = false;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Current compression level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Current strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Adler-32 of the input consumed so far (zlib framing only).
    pub fn adler(&self) -> u32 {
        self.adler.value()
    }

    fn engine(&self) -> Engine {
        Engine::select(self.level, self.strategy)
    }

    /// Load a preset dictionary. Must be called before the first
    /// compression call.
    ///
    /// Returns the Adler-32 of the whole dictionary. Dictionaries shorter
    /// than three bytes are accepted but have no effect.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.status != Status::Init {
            return Err(FlateError::invalid_state(
                "dictionary must be set before compression starts",
            ));
        }
        let adler = Adler32::compute(dictionary);
        self.finder.reset();
        self.dictionary_adler = (self.finder.load_dictionary(dictionary) > 0).then_some(adler);
        Ok(adler)
    }

    /// Change the level and strategy mid-stream.
    ///
    /// When the block routine changes after input has been consumed, the
    /// current block is closed with a partial flush first; its output stays
    /// pending for the next compression call.
    pub fn set_params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        if matches!(self.status, Status::Finishing | Status::Done) {
            return Err(FlateError::invalid_state(
                "cannot change parameters after finish",
            ));
        }
        let level = level.min(9);
        let next = Engine::select(level, strategy);
        if next != self.engine() {
            if self.total_in != 0 {
                self.run(&mut Source::new(&[]), &mut Sink::unbounded(), FlushMode::Partial)?;
            }
            self.finder.match_length = MIN_MATCH - 1;
            self.finder.prev_length = MIN_MATCH - 1;
        }
        self.level = level;
        self.strategy = strategy;
        self.config = level_config(level);
        Ok(())
    }

    /// Compress data and return the bytes written to a Vec.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.compress_all(data)
    }

    fn write_zlib_header(&mut self) {
        let mut header = (8 + ((self.window_bits as u16 - 8) << 4)) << 8;
        let level_flags: u16 = match (self.strategy, self.level) {
            (Strategy::HuffmanOnly | Strategy::Rle, _) | (_, 0..=1) => 0,
            (_, 2..=5) => 1,
            (_, 6) => 2,
            _ => 3,
        };
        header |= level_flags << 6;
        if self.dictionary_adler.is_some() {
            header |= PRESET_DICT;
        }
        header += 31 - header % 31;

        self.blocks.pending.put_u16_be(header);
        if let Some(adler) = self.dictionary_adler {
            self.blocks.pending.put_u32_be(adler);
        }
        self.adler = Adler32::new();
    }

    /// One compression step.
    fn run(&mut self, src: &mut Source<'_>, sink: &mut Sink<'_>, flush: FlushMode) -> Result<()> {
        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        if self.status == Status::Init {
            if self.zlib {
                self.write_zlib_header();
            }
            self.status = Status::Busy;
        }

        if !self.blocks.pending.is_empty() {
            sink.drain(&mut self.blocks.pending);
            if sink.is_full() {
                self.last_flush = None;
                return Ok(());
            }
        } else if src.is_empty()
            && flush != FlushMode::Finish
            && old_flush.is_some_and(|old| flush <= old)
        {
            return Ok(());
        }

        if !src.is_empty()
            || self.finder.lookahead != 0
            || (flush != FlushMode::None && self.status != Status::Finishing)
        {
            let start = src.consumed();
            let state = match self.engine() {
                Engine::Stored => self.deflate_stored(src, sink, flush),
                Engine::Fast => self.deflate_fast(src, sink, flush),
                Engine::Slow => self.deflate_slow(src, sink, flush),
                Engine::HuffmanOnly => self.deflate_huff(src, sink, flush),
                Engine::Rle => self.deflate_rle(src, sink, flush),
            };
            if self.zlib {
                self.adler.update(src.consumed_since(start));
            }

            if matches!(state, BlockState::FinishStarted | BlockState::FinishDone) {
                self.status = Status::Finishing;
            }
            match state {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if sink.is_full() {
                        self.last_flush = None;
                    }
                    return Ok(());
                }
                BlockState::BlockDone => {
                    match flush {
                        FlushMode::Partial => self.blocks.align(),
                        FlushMode::Sync | FlushMode::Full => {
                            self.blocks.stored_block(&[], false);
                            if flush == FlushMode::Full {
                                self.finder.clear_hash();
                                self.finder.match_floor = self.finder.strstart;
                            }
                        }
                        _ => {}
                    }
                    sink.drain(&mut self.blocks.pending);
                    if sink.is_full() {
                        self.last_flush = None;
                        return Ok(());
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        if flush != FlushMode::Finish {
            return Ok(());
        }

        if self.zlib && !self.trailer_written {
            self.blocks.pending.put_u32_be(self.adler.value());
            self.trailer_written = true;
            sink.drain(&mut self.blocks.pending);
        }
        if self.blocks.pending.is_empty() {
            self.status = Status::Done;
        }
        Ok(())
    }

    /// Close the current block and push what fits to the caller.
    fn flush_block_only(&mut self, last: bool, sink: &mut Sink<'_>) {
        let stored_len = self.finder.block_len();
        self.blocks.flush_block(
            self.finder.block_data(),
            stored_len,
            last,
            self.level,
            self.strategy,
        );
        self.finder.block_start = self.finder.strstart as isize;
        sink.drain(&mut self.blocks.pending);
    }

    /// Close the block at the end of a block routine.
    fn finish_block(&mut self, flush: FlushMode, sink: &mut Sink<'_>) -> BlockState {
        let last = flush == FlushMode::Finish;
        self.flush_block_only(last, sink);
        match (sink.is_full(), last) {
            (true, true) => BlockState::FinishStarted,
            (true, false) => BlockState::NeedMore,
            (false, true) => BlockState::FinishDone,
            (false, false) => BlockState::BlockDone,
        }
    }

    /// Level 0: copy input into stored blocks of a fixed size.
    ///
    /// Block boundaries depend only on the input offset, never on how the
    /// input was split across calls.
    fn deflate_stored(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        let max_block = 0xffff_usize
            .min(self.blocks.pending_buf_size() - 5)
            .min(self.finder.max_dist());

        loop {
            if self.finder.lookahead <= 1 {
                self.finder.fill_window(src);
                if self.finder.lookahead == 0 {
                    if flush == FlushMode::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            self.finder.strstart += self.finder.lookahead;
            self.finder.lookahead = 0;

            while self.finder.block_len() >= max_block {
                let end = self.finder.block_start as usize + max_block;
                self.finder.lookahead = self.finder.strstart - end;
                self.finder.strstart = end;
                self.flush_block_only(false, sink);
                if sink.is_full() {
                    return BlockState::NeedMore;
                }
            }
        }

        self.finish_block(flush, sink)
    }

    /// Levels 1-3: take the first acceptable match greedily.
    fn deflate_fast(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        let config = self.config;
        loop {
            if self.finder.lookahead < MIN_LOOKAHEAD {
                self.finder.fill_window(src);
                if self.finder.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.finder.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.finder.lookahead >= MIN_MATCH {
                hash_head = self.finder.insert_string(self.finder.strstart);
            }

            if hash_head != 0 && self.finder.strstart - hash_head <= self.finder.max_dist() {
                self.finder.match_length = self.finder.longest_match(hash_head, config);
            }

            let close = if self.finder.match_length >= MIN_MATCH {
                let finder = &mut self.finder;
                let close = self.blocks.tally_match(
                    finder.strstart - finder.match_start,
                    finder.match_length,
                    self.level,
                    finder.block_len(),
                );
                finder.lookahead -= finder.match_length;

                if finder.match_length <= config.max_lazy && finder.lookahead >= MIN_MATCH {
                    // Hash the rest of the match too.
                    finder.match_length -= 1;
                    while finder.match_length != 0 {
                        finder.strstart += 1;
                        finder.insert_string(finder.strstart);
                        finder.match_length -= 1;
                    }
                    finder.strstart += 1;
                } else {
                    finder.strstart += finder.match_length;
                    finder.match_length = 0;
                    finder.reseed_hash();
                }
                close
            } else {
                let close = self
                    .blocks
                    .tally_literal(self.finder.window[self.finder.strstart]);
                self.finder.lookahead -= 1;
                self.finder.strstart += 1;
                close
            };

            if close {
                self.flush_block_only(false, sink);
                if sink.is_full() {
                    return BlockState::NeedMore;
                }
            }
        }

        self.finish_block(flush, sink)
    }

    /// Levels 4-9: hold each match back one position and keep it only if
    /// the next position does not match longer.
    fn deflate_slow(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        let config = self.config;
        loop {
            if self.finder.lookahead < MIN_LOOKAHEAD {
                self.finder.fill_window(src);
                if self.finder.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.finder.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.finder.lookahead >= MIN_MATCH {
                hash_head = self.finder.insert_string(self.finder.strstart);
            }

            let finder = &mut self.finder;
            finder.prev_length = finder.match_length;
            finder.prev_match = finder.match_start;
            finder.match_length = MIN_MATCH - 1;

            if hash_head != 0
                && finder.prev_length < config.max_lazy
                && finder.strstart - hash_head <= finder.max_dist()
            {
                finder.match_length = finder.longest_match(hash_head, config);

                if finder.match_length <= 5
                    && (self.strategy == Strategy::Filtered
                        || (finder.match_length == MIN_MATCH
                            && finder.strstart - finder.match_start > TOO_FAR))
                {
                    finder.match_length = MIN_MATCH - 1;
                }
            }

            if finder.prev_length >= MIN_MATCH && finder.match_length <= finder.prev_length {
                // The held match wins.
                let max_insert = finder.strstart + finder.lookahead - MIN_MATCH;
                let close = self.blocks.tally_match(
                    finder.strstart - 1 - finder.prev_match,
                    finder.prev_length,
                    self.level,
                    finder.block_len(),
                );

                finder.lookahead -= finder.prev_length - 1;
                finder.prev_length -= 2;
                while finder.prev_length != 0 {
                    finder.strstart += 1;
                    if finder.strstart <= max_insert {
                        finder.insert_string(finder.strstart);
                    }
                    finder.prev_length -= 1;
                }
                finder.match_available = false;
                finder.match_length = MIN_MATCH - 1;
                finder.strstart += 1;

                if close {
                    self.flush_block_only(false, sink);
                    if sink.is_full() {
                        return BlockState::NeedMore;
                    }
                }
            } else if finder.match_available {
                // The new match is longer: the held position becomes a literal.
                let byte = finder.window[finder.strstart - 1];
                if self.blocks.tally_literal(byte) {
                    self.flush_block_only(false, sink);
                }
                self.finder.strstart += 1;
                self.finder.lookahead -= 1;
                if sink.is_full() {
                    return BlockState::NeedMore;
                }
            } else {
                finder.match_available = true;
                finder.strstart += 1;
                finder.lookahead -= 1;
            }
        }

        if self.finder.match_available {
            let byte = self.finder.window[self.finder.strstart - 1];
            self.blocks.tally_literal(byte);
            self.finder.match_available = false;
        }

        self.finish_block(flush, sink)
    }

    /// Huffman-only strategy: every byte is a literal.
    fn deflate_huff(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        loop {
            if self.finder.lookahead == 0 {
                self.finder.fill_window(src);
                if self.finder.lookahead == 0 {
                    if flush == FlushMode::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            self.finder.match_length = 0;
            let close = self
                .blocks
                .tally_literal(self.finder.window[self.finder.strstart]);
            self.finder.lookahead -= 1;
            self.finder.strstart += 1;

            if close {
                self.flush_block_only(false, sink);
                if sink.is_full() {
                    return BlockState::NeedMore;
                }
            }
        }

        self.finish_block(flush, sink)
    }

    /// Run-length strategy: only distance-1 matches.
    fn deflate_rle(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        loop {
            if self.finder.lookahead < MAX_MATCH {
                self.finder.fill_window(src);
                if self.finder.lookahead < MAX_MATCH && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.finder.lookahead == 0 {
                    break;
                }
            }

            let run = self.finder.run_length();
            let close = if run >= MIN_MATCH {
                let close =
                    self.blocks
                        .tally_match(1, run, self.level, self.finder.block_len());
                self.finder.lookahead -= run;
                self.finder.strstart += run;
                close
            } else {
                let close = self
                    .blocks
                    .tally_literal(self.finder.window[self.finder.strstart]);
                self.finder.lookahead -= 1;
                self.finder.strstart += 1;
                close
            };

            if close {
                self.flush_block_only(false, sink);
                if sink.is_full() {
                    return BlockState::NeedMore;
                }
            }
        }

        self.finish_block(flush, sink)
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if output.is_empty() {
            return Err(FlateError::invalid_state("no output space supplied"));
        }
        match self.status {
            Status::Done => {
                return Err(FlateError::invalid_state("compression already finished"));
            }
            Status::Finishing if flush != FlushMode::Finish || !input.is_empty() => {
                return Err(FlateError::invalid_state(
                    "stream is finishing; only an empty finish may follow",
                ));
            }
            _ => {}
        }

        let mut src = Source::new(input);
        let mut sink = Sink::new(output);
        self.run(&mut src, &mut sink, flush)?;

        let consumed = src.consumed();
        let produced = sink.pos;
        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        let status = if self.status == Status::Done {
            CompressStatus::Done
        } else if sink.is_full() {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        };
        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.status == Status::Done
    }
}

/// Compress data using raw DEFLATE.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    deflater.compress_to_vec(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::{Inflater, inflate};
    use crate::lz77::Lz77Token;
    use oxiflate_core::Decompressor;
    use oxiflate_core::error::ErrorKind;

    fn sample(size: usize) -> Vec<u8> {
        let words: [&[u8]; 6] = [b"alpha ", b"beta ", b"gamma ", b"delta\n", b"42 ", b"epsilon "];
        let mut seed: u32 = 0x2545F491;
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            data.extend_from_slice(words[(seed % 6) as usize]);
        }
        data.truncate(size);
        data
    }

    fn random(size: usize) -> Vec<u8> {
        let mut seed: u64 = 0x9E3779B97F4A7C15;
        (0..size)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                (seed >> 33) as u8
            })
            .collect()
    }

    /// Compress one byte per call, then finish.
    fn compress_bytewise(deflater: &mut Deflater, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; 1 << 16];
        for byte in data.chunks(1) {
            let (consumed, produced, _) = deflater.compress(byte, &mut buf, FlushMode::None).unwrap();
            assert_eq!(consumed, 1);
            out.extend_from_slice(&buf[..produced]);
        }
        loop {
            let (_, produced, status) = deflater.compress(&[], &mut buf, FlushMode::Finish).unwrap();
            out.extend_from_slice(&buf[..produced]);
            if status == CompressStatus::Done {
                return out;
            }
        }
    }

    #[test]
    fn test_deflate_stored() {
        let input = b"Hello, World!";
        let compressed = deflate(input, 0).unwrap();
        assert_eq!(compressed.len(), input.len() + 5);
        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_deflate_empty() {
        for level in [0, 1, 6, 9] {
            let compressed = deflate(b"", level).unwrap();
            assert!(inflate(&compressed).unwrap().is_empty());
        }
        // A single empty stored block.
        assert_eq!(deflate(b"", 0).unwrap(), [0x01, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_deflate_roundtrip() {
        let inputs = [
            b"Hello".to_vec(),
            b"The quick brown fox jumps over the lazy dog".to_vec(),
            vec![0u8; 1000],
            (0..=255).collect::<Vec<u8>>(),
            sample(50_000),
            random(20_000),
        ];

        for input in &inputs {
            for level in 0..=9 {
                let compressed = deflate(input, level).unwrap();
                let decompressed = inflate(&compressed).unwrap();
                assert_eq!(
                    &decompressed,
                    input,
                    "Roundtrip failed for level {} with {} bytes",
                    level,
                    input.len()
                );
            }
        }
    }

    #[test]
    fn test_strategies_roundtrip() {
        let data = sample(40_000);
        for strategy in [
            Strategy::Default,
            Strategy::Filtered,
            Strategy::HuffmanOnly,
            Strategy::Rle,
            Strategy::Fixed,
        ] {
            for level in [1, 6, 9] {
                let config = FlateConfig::RAW.with_level(level).with_strategy(strategy);
                let mut deflater = Deflater::with_config(&config).unwrap();
                let compressed = deflater.compress_to_vec(&data).unwrap();
                assert_eq!(
                    inflate(&compressed).unwrap(),
                    data,
                    "{strategy:?} at level {level}"
                );
            }
        }
    }

    #[test]
    fn test_stored_size_is_exact() {
        let data = random(100_000);
        let compressed = deflate(&data, 0).unwrap();
        let max_block = 32768 - MIN_LOOKAHEAD;
        let blocks = data.len().div_ceil(max_block);
        assert_eq!(compressed.len(), data.len() + 5 * blocks);
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn test_zeros_compress_well() {
        let data = vec![0u8; 100_000];
        let compressed = deflate(&data, 6).unwrap();
        assert!(compressed.len() < data.len() / 100, "got {}", compressed.len());
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn test_zlib_header_level_hint() {
        let cases = [(0, [0x78, 0x01]), (1, [0x78, 0x01]), (5, [0x78, 0x5E]), (6, [0x78, 0x9C]), (9, [0x78, 0xDA])];
        for (level, header) in cases {
            let out = Deflater::zlib(level).compress_to_vec(b"x").unwrap();
            assert_eq!(out[..2], header, "level {level}");
            let check = u16::from_be_bytes([out[0], out[1]]);
            assert_eq!(check % 31, 0);
        }

        let config = FlateConfig::ZLIB.with_level(9).with_strategy(Strategy::HuffmanOnly);
        let out = Deflater::with_config(&config).unwrap().compress_to_vec(b"x").unwrap();
        assert_eq!(out[..2], [0x78, 0x01]);

        let config = FlateConfig::ZLIB.with_window_bits(9);
        let out = Deflater::with_config(&config).unwrap().compress_to_vec(b"x").unwrap();
        assert_eq!(out[0], 0x18);
    }

    #[test]
    fn test_zlib_trailer_is_adler() {
        let data = b"abababababababab";
        let out = Deflater::zlib(9).compress_to_vec(data).unwrap();
        let trailer = u32::from_be_bytes(out[out.len() - 4..].try_into().unwrap());
        assert_eq!(trailer, Adler32::compute(data));
    }

    #[test]
    fn test_chunking_equivalence() {
        let data = sample(20_000);
        for level in 0..=9 {
            let whole = Deflater::zlib(level).compress_to_vec(&data).unwrap();
            let bytewise = compress_bytewise(&mut Deflater::zlib(level), &data);
            assert_eq!(whole, bytewise, "level {level}");
        }
    }

    #[test]
    fn test_chunking_equivalence_across_window_slides() {
        let mut data = sample(90_000);
        data.extend(random(30_000));
        for level in [0, 1, 6] {
            let whole = Deflater::new(level).compress_to_vec(&data).unwrap();
            let bytewise = compress_bytewise(&mut Deflater::new(level), &data);
            assert_eq!(whole, bytewise, "level {level}");
        }
    }

    #[test]
    fn test_small_output_buffer() {
        let data = sample(30_000);
        let expected = deflate(&data, 6).unwrap();

        let mut deflater = Deflater::new(6);
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        let mut pos = 0;
        loop {
            let (consumed, produced, status) = deflater
                .compress(&data[pos..], &mut buf, FlushMode::Finish)
                .unwrap();
            pos += consumed;
            out.extend_from_slice(&buf[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        assert_eq!(out, expected);
        assert_eq!(deflater.total_in(), data.len() as u64);
        assert_eq!(deflater.total_out(), out.len() as u64);
    }

    #[test]
    fn test_match_bounds() {
        let mut data = sample(70_000);
        data.extend(vec![b'z'; 5000]);
        for level in 1..=9 {
            let mut deflater = Deflater::new(level);
            deflater.compress_to_vec(&data).unwrap();
            let max_dist = 32768 - MIN_LOOKAHEAD;
            let mut matches = 0;
            for token in &deflater.blocks.trace {
                if let Lz77Token::Match { length, distance } = *token {
                    matches += 1;
                    assert!((3..=258).contains(&(length as usize)));
                    assert!(distance >= 1 && distance as usize <= max_dist);
                }
            }
            assert!(matches > 0, "level {level} found no matches");
        }
    }

    #[test]
    fn test_tiny_inputs_have_no_matches() {
        for input in [&b""[..], b"a", b"aa"] {
            for level in 1..=9 {
                let mut deflater = Deflater::new(level);
                let compressed = deflater.compress_to_vec(input).unwrap();
                assert!(
                    deflater
                        .blocks
                        .trace
                        .iter()
                        .all(|t| matches!(t, Lz77Token::Literal(_)))
                );
                assert_eq!(inflate(&compressed).unwrap(), input);
            }
        }
    }

    #[test]
    fn test_sync_flush_marker_and_noop() {
        let mut deflater = Deflater::new(6);
        let mut buf = vec![0u8; 1024];
        let (_, produced, status) = deflater
            .compress(b"hello hello hello", &mut buf, FlushMode::Sync)
            .unwrap();
        assert_eq!(status, CompressStatus::NeedsInput);
        assert!(produced > 4);
        assert_eq!(buf[produced - 4..produced], [0x00, 0x00, 0xFF, 0xFF]);

        // Everything so far decodes without the final block.
        let mut inflater = Inflater::raw(15);
        let mut plain = vec![0u8; 64];
        let (_, n, _) = inflater.decompress(&buf[..produced], &mut plain).unwrap();
        assert_eq!(&plain[..n], b"hello hello hello");

        let (_, again, _) = deflater.compress(&[], &mut buf, FlushMode::Sync).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn test_partial_and_full_flush_roundtrip() {
        let data = sample(10_000);
        for flush in [FlushMode::Partial, FlushMode::Sync, FlushMode::Full] {
            let mut deflater = Deflater::zlib(6);
            let mut out = Vec::new();
            let mut buf = vec![0u8; 1 << 16];
            for chunk in data.chunks(777) {
                let (_, produced, _) = deflater.compress(chunk, &mut buf, flush).unwrap();
                out.extend_from_slice(&buf[..produced]);
            }
            let (_, produced, status) = deflater.compress(&[], &mut buf, FlushMode::Finish).unwrap();
            assert_eq!(status, CompressStatus::Done);
            out.extend_from_slice(&buf[..produced]);
            assert_eq!(Inflater::zlib().decompress_all(&out).unwrap(), data, "{flush:?}");
        }
    }

    #[test]
    fn test_dictionary() {
        let dict = b"the quick brown fox jumps over the lazy dog";
        let data = b"the lazy dog jumps over the quick brown fox";

        let mut deflater = Deflater::zlib(9);
        let adler = deflater.set_dictionary(dict).unwrap();
        assert_eq!(adler, Adler32::compute(dict));
        let with_dict = deflater.compress_to_vec(data).unwrap();
        let without = Deflater::zlib(9).compress_to_vec(data).unwrap();

        assert_eq!(with_dict[1] & PRESET_DICT as u8, PRESET_DICT as u8);
        assert_eq!(with_dict[2..6], adler.to_be_bytes());
        assert!(with_dict.len() < without.len());

        let mut inflater = Inflater::zlib();
        inflater.set_dictionary(dict).unwrap();
        assert_eq!(inflater.decompress_all(&with_dict).unwrap(), data);
    }

    #[test]
    fn test_dictionary_after_start_is_state_error() {
        let mut deflater = Deflater::zlib(6);
        let mut buf = [0u8; 64];
        deflater.compress(b"abc", &mut buf, FlushMode::None).unwrap();
        let err = deflater.set_dictionary(b"dictionary").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_misuse_is_state_error() {
        let mut deflater = Deflater::new(6);
        let err = deflater.compress(b"abc", &mut [], FlushMode::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        deflater.compress_to_vec(b"abc").unwrap();
        assert!(deflater.is_finished());
        let mut buf = [0u8; 16];
        let err = deflater.compress(b"more", &mut buf, FlushMode::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        let err = deflater.set_params(1, Strategy::Default).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let err = deflater.compress(&[], &mut buf, FlushMode::Finish).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        deflater.reset();
        assert!(!deflater.is_finished());
        assert_eq!(inflate(&deflater.compress_to_vec(b"again").unwrap()).unwrap(), b"again");
    }

    #[test]
    fn test_set_params_mid_stream() {
        let data = sample(30_000);
        let mut deflater = Deflater::zlib(1);
        let mut out = Vec::new();
        let mut buf = vec![0u8; 1 << 16];

        let (_, produced, _) = deflater.compress(&data[..10_000], &mut buf, FlushMode::None).unwrap();
        out.extend_from_slice(&buf[..produced]);
        deflater.set_params(9, Strategy::Default).unwrap();
        assert_eq!(deflater.level(), 9);

        let (_, produced, _) = deflater.compress(&data[10_000..20_000], &mut buf, FlushMode::None).unwrap();
        out.extend_from_slice(&buf[..produced]);
        deflater.set_params(0, Strategy::Default).unwrap();
        deflater.set_params(3, Strategy::Rle).unwrap();

        let (_, produced, status) = deflater.compress(&data[20_000..], &mut buf, FlushMode::Finish).unwrap();
        assert_eq!(status, CompressStatus::Done);
        out.extend_from_slice(&buf[..produced]);

        assert_eq!(Inflater::zlib().decompress_all(&out).unwrap(), data);
    }
}

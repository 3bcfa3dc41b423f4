//! Block-level decoding state machine.
//!
//! [`BlockDecoder`] walks a raw DEFLATE stream block by block. Every state
//! consumes input incrementally from a persisted [`BitAccumulator`] and
//! writes into a [`Window`], so a call can stop whenever the input runs out
//! or the caller's output is full and pick up exactly where it left off.
//!
//! ```text
//! Type ─┬─ 00 ─> Lens ─> Stored ──────────────────┐
//!       ├─ 01 ─────────────────────────> Codes ───┤
//!       ├─ 10 ─> Table ─> Btree ─> Dtree ─> Codes ┤
//!       └─ 11 ─> error                            │
//!                                                 v
//!                 Type <── (not last) ── end of block ── (last) ──> Dry ─> Done
//! ```
//!
//! Errors are returned as static messages; the caller owns the failed
//! state and the byte offset.

use crate::codes::{CodeState, CodesOutcome, decode_codes};
use crate::decode_table::{
    CODE_LENGTH_ROOT_BITS, DISTANCE_ROOT_BITS, DecodeTable, LITLEN_ROOT_BITS, TableKind,
    fixed_tables,
};
use crate::tables::{BL_CODES, BL_ORDER, D_CODES, DYN_TREES, L_CODES, STATIC_TREES, STORED_BLOCK};
use oxiflate_core::bitstream::BitAccumulator;
use oxiflate_core::ringbuffer::Window;
use oxiflate_core::traits::DecompressStatus;

/// Where block decoding resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Waiting for a block header.
    Type,
    /// Stored block: waiting for LEN and NLEN.
    Lens,
    /// Stored block: copying the remaining bytes.
    Stored(usize),
    /// Dynamic block: waiting for HLIT, HDIST and HCLEN.
    Table,
    /// Dynamic block: reading code-length code lengths.
    Btree,
    /// Dynamic block: reading literal/length and distance code lengths.
    Dtree,
    /// Decoding Huffman-coded symbols.
    Codes,
    /// Last block finished; draining the window.
    Dry,
    /// Stream complete.
    Done,
}

/// Why [`BlockDecoder::step`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stall {
    Input,
    Output,
    End,
}

/// Resumable decoder for a raw DEFLATE block stream.
#[derive(Debug, Clone)]
pub struct BlockDecoder {
    pub(crate) acc: BitAccumulator,
    pub(crate) window: Window,
    mode: BlockMode,
    /// Current block carries the final flag.
    last: bool,
    /// Current block uses the fixed tables.
    fixed: bool,
    nlen: usize,
    ndist: usize,
    ncode: usize,
    /// Code lengths read so far in `Btree` / `Dtree`.
    have: usize,
    lens: [u8; L_CODES + 2 + D_CODES + 2],
    /// Repeat symbol (16-18) waiting for its extra bits.
    repeat: Option<u8>,
    code_lengths: DecodeTable,
    litlen: DecodeTable,
    distance: DecodeTable,
    codes: CodeState,
}

impl BlockDecoder {
    /// Create a decoder with a `1 << window_bits` byte window.
    pub fn new(window_bits: u8) -> Self {
        Self {
            acc: BitAccumulator::new(),
            window: Window::new(window_bits),
            mode: BlockMode::Type,
            last: false,
            fixed: false,
            nlen: 0,
            ndist: 0,
            ncode: 0,
            have: 0,
            lens: [0; L_CODES + 2 + D_CODES + 2],
            repeat: None,
            code_lengths: DecodeTable::new(),
            litlen: DecodeTable::new(),
            distance: DecodeTable::new(),
            codes: CodeState::default(),
        }
    }

    /// Return to the start of a block stream, forgetting all history.
    pub fn reset(&mut self) {
        self.acc.reset();
        self.window.reset();
        self.mode = BlockMode::Type;
        self.last = false;
        self.fixed = false;
        self.have = 0;
        self.repeat = None;
        self.codes = CodeState::default();
    }

    /// Current state.
    pub fn mode(&self) -> BlockMode {
        self.mode
    }

    /// Whether the last block has been decoded and flushed.
    pub fn is_done(&self) -> bool {
        self.mode == BlockMode::Done
    }

    /// Whether decoding sits right after a stored block header, on a byte
    /// boundary, waiting for its length field.
    pub fn is_sync_point(&self) -> bool {
        self.mode == BlockMode::Lens && self.acc.bits() == 0
    }

    /// Decode from `input[*pos..]` into `output[*written..]`.
    ///
    /// Advances `pos` and `written` by what was consumed and produced.
    pub fn decode(
        &mut self,
        input: &[u8],
        pos: &mut usize,
        output: &mut [u8],
        written: &mut usize,
    ) -> Result<DecompressStatus, &'static str> {
        loop {
            *written += self.window.flush_into(&mut output[*written..]);
            match self.step(input, pos)? {
                Stall::Input => {
                    *written += self.window.flush_into(&mut output[*written..]);
                    return Ok(if self.window.pending() > 0 {
                        DecompressStatus::NeedsOutput
                    } else {
                        DecompressStatus::NeedsInput
                    });
                }
                Stall::Output => {
                    if *written == output.len() {
                        return Ok(DecompressStatus::NeedsOutput);
                    }
                }
                Stall::End => return Ok(DecompressStatus::Done),
            }
        }
    }

    fn after_block(&self) -> BlockMode {
        if self.last {
            BlockMode::Dry
        } else {
            BlockMode::Type
        }
    }

    /// Run the state machine until it stalls or fails.
    fn step(&mut self, input: &[u8], pos: &mut usize) -> Result<Stall, &'static str> {
        loop {
            match self.mode {
                BlockMode::Type => {
                    if !self.acc.need(input, pos, 3) {
                        return Ok(Stall::Input);
                    }
                    self.last = self.acc.take(1) == 1;
                    match self.acc.take(2) {
                        STORED_BLOCK => {
                            self.acc.align_to_byte();
                            self.mode = BlockMode::Lens;
                        }
                        STATIC_TREES => {
                            self.fixed = true;
                            self.codes = CodeState::default();
                            self.mode = BlockMode::Codes;
                        }
                        DYN_TREES => self.mode = BlockMode::Table,
                        _ => return Err("invalid block type"),
                    }
                }
                BlockMode::Lens => {
                    if !self.acc.need(input, pos, 32) {
                        return Ok(Stall::Input);
                    }
                    let len = self.acc.take(16);
                    let nlen = self.acc.take(16);
                    if len != !nlen & 0xffff {
                        return Err("invalid stored block lengths");
                    }
                    self.mode = BlockMode::Stored(len as usize);
                }
                BlockMode::Stored(left) => {
                    if left == 0 {
                        self.mode = self.after_block();
                        continue;
                    }
                    if *pos == input.len() {
                        return Ok(Stall::Input);
                    }
                    let n = left.min(input.len() - *pos).min(self.window.space());
                    if n == 0 {
                        return Ok(Stall::Output);
                    }
                    self.window.push_slice(&input[*pos..*pos + n]);
                    *pos += n;
                    self.mode = BlockMode::Stored(left - n);
                }
                BlockMode::Table => {
                    if !self.acc.need(input, pos, 14) {
                        return Ok(Stall::Input);
                    }
                    self.nlen = self.acc.take(5) as usize + 257;
                    self.ndist = self.acc.take(5) as usize + 1;
                    self.ncode = self.acc.take(4) as usize + 4;
                    if self.nlen > L_CODES || self.ndist > D_CODES {
                        return Err("too many length or distance symbols");
                    }
                    self.have = 0;
                    self.mode = BlockMode::Btree;
                }
                BlockMode::Btree => {
                    while self.have < self.ncode {
                        if !self.acc.need(input, pos, 3) {
                            return Ok(Stall::Input);
                        }
                        self.lens[BL_ORDER[self.have]] = self.acc.take(3) as u8;
                        self.have += 1;
                    }
                    for &symbol in &BL_ORDER[self.ncode..] {
                        self.lens[symbol] = 0;
                    }
                    self.code_lengths.build(
                        TableKind::CodeLengths,
                        &self.lens[..BL_CODES],
                        CODE_LENGTH_ROOT_BITS,
                    )?;
                    self.have = 0;
                    self.repeat = None;
                    self.mode = BlockMode::Dtree;
                }
                BlockMode::Dtree => {
                    if !self.read_code_lengths(input, pos)? {
                        return Ok(Stall::Input);
                    }
                    if self.lens[256] == 0 {
                        return Err("invalid code -- missing end-of-block");
                    }
                    let total = self.nlen + self.ndist;
                    self.litlen
                        .build(TableKind::LitLen, &self.lens[..self.nlen], LITLEN_ROOT_BITS)?;
                    self.distance.build(
                        TableKind::Distance,
                        &self.lens[self.nlen..total],
                        DISTANCE_ROOT_BITS,
                    )?;
                    self.fixed = false;
                    self.codes = CodeState::default();
                    self.mode = BlockMode::Codes;
                }
                BlockMode::Codes => {
                    let (litlen, distance) = if self.fixed {
                        let (litlen, distance) = fixed_tables();
                        (litlen, distance)
                    } else {
                        (&self.litlen, &self.distance)
                    };
                    let outcome = decode_codes(
                        &mut self.codes,
                        litlen,
                        distance,
                        &mut self.acc,
                        &mut self.window,
                        input,
                        pos,
                    )?;
                    match outcome {
                        CodesOutcome::EndOfBlock => self.mode = self.after_block(),
                        CodesOutcome::NeedInput => return Ok(Stall::Input),
                        CodesOutcome::NeedSpace => return Ok(Stall::Output),
                    }
                }
                BlockMode::Dry => {
                    if self.window.pending() > 0 {
                        return Ok(Stall::Output);
                    }
                    self.mode = BlockMode::Done;
                }
                BlockMode::Done => return Ok(Stall::End),
            }
        }
    }

    /// Read the run-length coded literal/length and distance code lengths.
    ///
    /// Returns `false` when the input ran out first.
    fn read_code_lengths(&mut self, input: &[u8], pos: &mut usize) -> Result<bool, &'static str> {
        let total = self.nlen + self.ndist;
        while self.have < total {
            let symbol = match self.repeat {
                Some(symbol) => symbol,
                None => {
                    let Some(here) = self.code_lengths.decode(&mut self.acc, input, pos) else {
                        return Ok(false);
                    };
                    let symbol = here.val as u8;
                    if symbol < 16 {
                        self.lens[self.have] = symbol;
                        self.have += 1;
                        continue;
                    }
                    symbol
                }
            };

            self.repeat = Some(symbol);
            let (extra, base) = match symbol {
                16 => (2, 3),
                17 => (3, 3),
                _ => (7, 11),
            };
            if !self.acc.need(input, pos, extra) {
                return Ok(false);
            }
            let value = if symbol == 16 {
                if self.have == 0 {
                    return Err("invalid bit length repeat");
                }
                self.lens[self.have - 1]
            } else {
                0
            };
            let count = base + self.acc.take(extra) as usize;
            if self.have + count > total {
                return Err("invalid bit length repeat");
            }
            self.lens[self.have..self.have + count].fill(value);
            self.have += count;
            self.repeat = None;
        }
        Ok(true)
    }
}

//! Decoding the body of a Huffman-coded block.
//!
//! [`decode_codes`] is the resumable path: it keeps the symbol it is working
//! on in a [`CodeState`] so a call may stop between any two steps. When the
//! input and the window both have plenty of room it hands over to
//! [`decode_fast`], which decodes whole symbols without checking for
//! suspension and returns before either margin runs out.

use crate::decode_table::{DecodeTable, Op};
use crate::tables::MAX_MATCH;
use oxiflate_core::bitstream::BitAccumulator;
use oxiflate_core::ringbuffer::Window;

/// Input bytes the fast path needs on hand: one longest symbol sequence
/// (length code, extra, distance code, extra) is 48 bits.
pub const FAST_MIN_INPUT: usize = 10;
/// Window space the fast path needs: one longest match.
pub const FAST_MIN_SPACE: usize = MAX_MATCH;

/// Where a suspended symbol decode resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeMode {
    /// Decode a literal/length symbol.
    #[default]
    Len,
    /// A literal waits for window space.
    Lit(u8),
    /// Read the length's extra bits.
    LenExt(u8),
    /// Decode a distance symbol.
    Dist,
    /// Read the distance's extra bits.
    DistExt(u8),
    /// Copy the rest of a match.
    Match,
}

/// Progress through one block body.
#[derive(Debug, Clone, Default)]
pub struct CodeState {
    /// Resume point.
    pub mode: CodeMode,
    /// Length of the match being decoded or copied.
    pub length: usize,
    /// Distance of the match being decoded or copied.
    pub distance: usize,
}

/// Why [`decode_codes`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodesOutcome {
    /// The block's end-of-block code was decoded.
    EndOfBlock,
    /// The input ran out.
    NeedInput,
    /// The window is full of unflushed output.
    NeedSpace,
}

/// Decode block symbols into `window` until the block ends or a buffer
/// runs out.
pub fn decode_codes(
    state: &mut CodeState,
    litlen: &DecodeTable,
    distance: &DecodeTable,
    acc: &mut BitAccumulator,
    window: &mut Window,
    input: &[u8],
    pos: &mut usize,
) -> Result<CodesOutcome, &'static str> {
    loop {
        match state.mode {
            CodeMode::Len => {
                if input.len() - *pos >= FAST_MIN_INPUT && window.space() >= FAST_MIN_SPACE {
                    if decode_fast(litlen, distance, acc, window, input, pos)? {
                        return Ok(CodesOutcome::EndOfBlock);
                    }
                    continue;
                }

                let Some(here) = litlen.decode(acc, input, pos) else {
                    return Ok(CodesOutcome::NeedInput);
                };
                match here.op {
                    Op::Literal => state.mode = CodeMode::Lit(here.val as u8),
                    Op::Base { extra } => {
                        state.length = here.val as usize;
                        state.mode = CodeMode::LenExt(extra);
                    }
                    Op::EndOfBlock => return Ok(CodesOutcome::EndOfBlock),
                    Op::Link { .. } | Op::Invalid => return Err("invalid literal/length code"),
                }
            }
            CodeMode::Lit(byte) => {
                if window.space() == 0 {
                    return Ok(CodesOutcome::NeedSpace);
                }
                window.push(byte);
                state.mode = CodeMode::Len;
            }
            CodeMode::LenExt(extra) => {
                if !acc.need(input, pos, extra as u32) {
                    return Ok(CodesOutcome::NeedInput);
                }
                state.length += acc.take(extra as u32) as usize;
                state.mode = CodeMode::Dist;
            }
            CodeMode::Dist => {
                let Some(here) = distance.decode(acc, input, pos) else {
                    return Ok(CodesOutcome::NeedInput);
                };
                match here.op {
                    Op::Base { extra } => {
                        state.distance = here.val as usize;
                        state.mode = CodeMode::DistExt(extra);
                    }
                    _ => return Err("invalid distance code"),
                }
            }
            CodeMode::DistExt(extra) => {
                if !acc.need(input, pos, extra as u32) {
                    return Ok(CodesOutcome::NeedInput);
                }
                state.distance += acc.take(extra as u32) as usize;
                if state.distance > window.history() {
                    return Err("invalid distance too far back");
                }
                state.mode = CodeMode::Match;
            }
            CodeMode::Match => {
                let space = window.space();
                if space == 0 {
                    return Ok(CodesOutcome::NeedSpace);
                }
                let n = state.length.min(space);
                window.copy_match(state.distance, n);
                state.length -= n;
                if state.length == 0 {
                    state.mode = CodeMode::Len;
                }
            }
        }
    }
}

/// Decode whole symbols while at least [`FAST_MIN_INPUT`] input bytes and
/// [`FAST_MIN_SPACE`] bytes of window space remain.
///
/// Returns `true` at end of block. Whole bytes pulled ahead into `acc` are
/// handed back to the input before returning, so the caller resumes exactly
/// where decoding stopped.
pub fn decode_fast(
    litlen: &DecodeTable,
    distance: &DecodeTable,
    acc: &mut BitAccumulator,
    window: &mut Window,
    input: &[u8],
    pos: &mut usize,
) -> Result<bool, &'static str> {
    let result = fast_loop(litlen, distance, acc, window, input, pos);
    acc.give_back(pos);
    result
}

#[inline(always)]
fn fast_loop(
    litlen: &DecodeTable,
    distance: &DecodeTable,
    acc: &mut BitAccumulator,
    window: &mut Window,
    input: &[u8],
    pos: &mut usize,
) -> Result<bool, &'static str> {
    while input.len() - *pos >= FAST_MIN_INPUT && window.space() >= FAST_MIN_SPACE {
        acc.refill(input, pos);

        let here = litlen.resolve(acc);
        let length = match here.op {
            Op::Literal => {
                window.push(here.val as u8);
                continue;
            }
            Op::Base { extra } => here.val as usize + acc.take(extra as u32) as usize,
            Op::EndOfBlock => return Ok(true),
            Op::Link { .. } | Op::Invalid => return Err("invalid literal/length code"),
        };

        let here = distance.resolve(acc);
        let dist = match here.op {
            Op::Base { extra } => here.val as usize + acc.take(extra as u32) as usize,
            _ => return Err("invalid distance code"),
        };
        if dist > window.history() {
            return Err("invalid distance too far back");
        }
        window.copy_match(dist, length);
    }
    Ok(false)
}

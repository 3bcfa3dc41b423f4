//! Core traits for streaming compression.
//!
//! Both directions are call-driven: each call consumes what it can from the
//! input slice, writes what fits into the output slice, and reports why it
//! stopped. Running out of input or output space is a normal status, never
//! an error.

use crate::error::{FlateError, Result};

/// Scratch size used by the `*_all` helpers.
const CHUNK: usize = 32 * 1024;

/// Why a [`Decompressor::decompress`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// Every input byte was taken; the stream continues.
    NeedsInput,
    /// The output slice is full and decoded bytes are still waiting.
    NeedsOutput,
    /// The final block and any trailer have been read.
    Done,
}

/// Why a [`Compressor::compress`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// Input is used up and the requested flush is complete.
    NeedsInput,
    /// The output slice is full; call again with more room.
    NeedsOutput,
    /// The final block and trailer are written.
    Done,
}

/// How much a compression call must push out, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FlushMode {
    /// Let the compressor decide when blocks end.
    #[default]
    None,
    /// Close the current block and emit an empty static block, unaligned.
    Partial,
    /// Close the current block and byte-align with an empty stored block.
    Sync,
    /// As [`Sync`](Self::Sync), and forget all history.
    Full,
    /// Write the final block and the trailer.
    Finish,
}

/// A resumable decoder.
///
/// Implementations keep all progress in `self`, so a call may stop at any
/// input or output byte and the next call carries on from there.
pub trait Decompressor {
    /// Decode from `input` into `output`.
    ///
    /// Returns `(consumed, produced, status)`.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Return to the state of a freshly created decoder.
    fn reset(&mut self);

    /// Whether the end of the stream has been reached.
    fn is_finished(&self) -> bool;

    /// Decode a stream held entirely in memory.
    ///
    /// A stream that is still open when `input` runs out is a data error.
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut plain = Vec::new();
        let mut chunk = vec![0u8; CHUNK];
        let mut pos = 0;
        loop {
            let (used, n, status) = self.decompress(&input[pos..], &mut chunk)?;
            pos += used;
            plain.extend_from_slice(&chunk[..n]);
            match status {
                DecompressStatus::Done => return Ok(plain),
                DecompressStatus::NeedsInput if pos == input.len() => {
                    return Err(FlateError::corrupted(
                        pos as u64,
                        "unexpected end of compressed stream",
                    ));
                }
                _ => {}
            }
        }
    }
}

/// A resumable encoder.
///
/// The flush mode of each call says how much of the input seen so far must
/// be decodable from the output produced so far.
pub trait Compressor {
    /// Encode from `input` into `output`.
    ///
    /// Returns `(consumed, produced, status)`.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Return to the state of a freshly created encoder, keeping its
    /// parameters.
    fn reset(&mut self);

    /// Whether the trailer has been fully written.
    fn is_finished(&self) -> bool;

    /// Encode `input` as one complete stream.
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut packed = Vec::new();
        let mut chunk = vec![0u8; CHUNK];
        let mut pos = 0;
        loop {
            let (used, n, status) = self.compress(&input[pos..], &mut chunk, FlushMode::Finish)?;
            pos += used;
            packed.extend_from_slice(&chunk[..n]);
            if status == CompressStatus::Done {
                return Ok(packed);
            }
        }
    }
}

/// DEFLATE effort, 0 (store) to 9 (slowest search).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// Stored blocks only.
    pub const NONE: Self = Self(0);
    /// Greedy matching with short chains.
    pub const FAST: Self = Self(1);
    /// Lazy matching, the usual trade-off.
    pub const DEFAULT: Self = Self(6);
    /// Longest chains and lazy matching.
    pub const BEST: Self = Self(9);

    /// Level `level`, saturating at 9.
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Numeric level.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_saturate() {
        let levels: Vec<u8> = [
            CompressionLevel::NONE,
            CompressionLevel::FAST,
            CompressionLevel::DEFAULT,
            CompressionLevel::BEST,
        ]
        .iter()
        .map(CompressionLevel::level)
        .collect();
        assert_eq!(levels, [0, 1, 6, 9]);
        assert_eq!(CompressionLevel::from(42), CompressionLevel::BEST);
        assert_eq!(CompressionLevel::default(), CompressionLevel::DEFAULT);
    }

    #[test]
    fn test_flush_mode_order() {
        assert_eq!(FlushMode::default(), FlushMode::None);
        assert!(FlushMode::None < FlushMode::Partial);
        assert!(FlushMode::Partial < FlushMode::Sync);
        assert!(FlushMode::Sync < FlushMode::Full);
        assert!(FlushMode::Full < FlushMode::Finish);
    }

    struct Echo {
        done: bool,
    }

    impl Decompressor for Echo {
        fn decompress(
            &mut self,
            input: &[u8],
            output: &mut [u8],
        ) -> Result<(usize, usize, DecompressStatus)> {
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            if input.ends_with(b"!") && n == input.len() {
                self.done = true;
                return Ok((n, n, DecompressStatus::Done));
            }
            Ok((n, n, DecompressStatus::NeedsInput))
        }

        fn reset(&mut self) {
            self.done = false;
        }

        fn is_finished(&self) -> bool {
            self.done
        }
    }

    #[test]
    fn test_decompress_all_requires_end() {
        let mut echo = Echo { done: false };
        assert_eq!(echo.decompress_all(b"hi!").unwrap(), b"hi!");
        assert!(echo.is_finished());

        echo.reset();
        let err = echo.decompress_all(b"hi").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
    }
}

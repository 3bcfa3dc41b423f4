//! One-shot helpers over whole buffers.

use crate::framer::{FrameDecoder, FrameEncoder};
use oxiflate_core::config::{FlateConfig, Framing};
use oxiflate_core::error::Result;
use oxiflate_core::traits::{Compressor, Decompressor};

/// Compress `data` with the framing, level and tuning in `config`.
pub fn compress_buffer(data: &[u8], config: &FlateConfig) -> Result<Vec<u8>> {
    FrameEncoder::new(config)?.compress_all(data)
}

/// Decompress a complete stream in the given framing.
pub fn uncompress_buffer(data: &[u8], framing: Framing) -> Result<Vec<u8>> {
    FrameDecoder::new(framing).decompress_all(data)
}

/// Compress `data` into a single gzip member.
///
/// # Example
///
/// ```
/// use oxiflate_stream::{gzip_compress, gzip_decompress};
///
/// let gz = gzip_compress(b"Hello, gzip!", 6).unwrap();
/// assert_eq!(&gz[..2], &[0x1F, 0x8B]);
/// assert_eq!(gzip_decompress(&gz).unwrap(), b"Hello, gzip!");
/// ```
pub fn gzip_compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    compress_buffer(data, &FlateConfig::GZIP.with_level(level))
}

/// Decompress the first gzip member in `data`.
pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>> {
    uncompress_buffer(data, Framing::Gzip)
}

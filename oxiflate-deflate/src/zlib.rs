//! Zlib format wrapper for DEFLATE compression.
//!
//! The zlib format (RFC 1950) wraps raw DEFLATE data with a header and
//! an Adler-32 checksum. It is widely used in PNG, HTTP compression, and
//! many other applications.
//!
//! # Format
//!
//! ```text
//! +---+---+=============+============+---+---+---+---+
//! |CMF|FLG|[DICTID (4)] | compressed |    ADLER32    |
//! +---+---+=============+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary id follows
//!   - Bits 6-7: FLEVEL - compression level hint (0-3)
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)
//!
//! Framing itself lives in [`Deflater::zlib`] and [`Inflater::zlib`]; this
//! module adds one-shot helpers and header inspection.

use crate::deflate::Deflater;
use crate::inflate::Inflater;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::Decompressor;

/// Compression level hint carried in FLG bits 6-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZlibLevel {
    /// Levels 0-1, or the Huffman-only and RLE strategies.
    Fastest = 0,
    /// Levels 2-5.
    Fast = 1,
    /// Level 6.
    Default = 2,
    /// Levels 7-9.
    Best = 3,
}

impl ZlibLevel {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Best,
        }
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Fast => "fast",
            Self::Default => "default",
            Self::Best => "best",
        }
    }
}

/// A parsed zlib header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Window size the compressor used, in bits.
    pub window_bits: u8,
    /// Level hint.
    pub level: ZlibLevel,
    /// Adler-32 of the preset dictionary, when one is required.
    pub dictionary_id: Option<u32>,
}

impl ZlibHeader {
    /// Parse the header at the start of `input`.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let [cmf, flg, ..] = *input else {
            return Err(FlateError::invalid_header("zlib data too short"));
        };
        if ((u16::from(cmf) << 8) | u16::from(flg)) % 31 != 0 {
            return Err(FlateError::invalid_header("incorrect header check"));
        }
        if cmf & 0x0f != 8 {
            return Err(FlateError::invalid_header("unknown compression method"));
        }
        let window_bits = (cmf >> 4) + 8;
        if window_bits > 15 {
            return Err(FlateError::invalid_header("invalid window size"));
        }
        let dictionary_id = if flg & 0x20 != 0 {
            match input.get(2..6) {
                Some(id) => Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]])),
                None => return Err(FlateError::invalid_header("zlib data too short")),
            }
        } else {
            None
        };
        Ok(Self {
            window_bits,
            level: ZlibLevel::from_bits(flg >> 6),
            dictionary_id,
        })
    }

    /// Header size in bytes, including the dictionary id.
    pub fn len(&self) -> usize {
        if self.dictionary_id.is_some() { 6 } else { 2 }
    }

    /// Never true: a header is at least two bytes.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Compress data using zlib format.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// let decompressed = zlib_decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    Deflater::zlib(level).compress_to_vec(input)
}

/// Compress data using zlib format with a preset dictionary.
///
/// The dictionary's Adler-32 is stored in the header (FDICT=1) so the
/// decompressor can tell which dictionary to supply.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress_with_dict, zlib_decompress_with_dict};
///
/// let dict = b"common patterns and shared content";
/// let data = b"This text has common patterns that match the dictionary";
/// let compressed = zlib_compress_with_dict(data, 6, dict).unwrap();
/// let decompressed = zlib_decompress_with_dict(&compressed, dict).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut deflater = Deflater::zlib(level);
    deflater.set_dictionary(dictionary)?;
    deflater.compress_to_vec(input)
}

/// Decompress zlib format data.
///
/// Fails with a header error if the stream needs a preset dictionary.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    Inflater::zlib().decompress_all(input)
}

/// Decompress zlib format data compressed with a preset dictionary.
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::zlib();
    inflater.set_dictionary(dictionary)?;
    inflater.decompress_all(input)
}

/// Check if zlib data requires a preset dictionary.
///
/// Returns the Adler-32 of the expected dictionary, or `None` when no
/// dictionary is needed or the header is unreadable.
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress_with_dict, zlib_requires_dictionary};
///
/// let dict = b"test dictionary";
/// let compressed = zlib_compress_with_dict(b"test data", 6, dict).unwrap();
/// assert!(zlib_requires_dictionary(&compressed).is_some());
/// ```
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    ZlibHeader::parse(input).ok()?.dictionary_id
}

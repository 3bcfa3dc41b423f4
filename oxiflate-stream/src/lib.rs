//! # OxiFlate Stream
//!
//! Container framing and `std::io` adapters for the OxiFlate codec.
//!
//! - [`gzip`]: RFC 1952 header model, incremental header parser, trailer
//! - [`framer`]: push-based [`FrameEncoder`] / [`FrameDecoder`] for zlib,
//!   gzip and raw framing
//! - [`stream`]: [`FlateStream`], a `Read`/`Write` adapter that compresses or
//!   decompresses in either direction
//! - [`detect`]: framing detection from magic bytes and file extensions
//! - one-shot buffer helpers
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::config::{FlateConfig, Framing};
//! use oxiflate_stream::{compress_buffer, uncompress_buffer};
//!
//! let data = b"one shot, any framing";
//! let packed = compress_buffer(data, &FlateConfig::GZIP.with_level(9)).unwrap();
//! assert_eq!(uncompress_buffer(&packed, Framing::Gzip).unwrap(), data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod buffer;
pub mod detect;
pub mod framer;
pub mod gzip;
pub mod stream;

// Re-exports
pub use buffer::{compress_buffer, gzip_compress, gzip_decompress, uncompress_buffer};
pub use framer::{FrameDecoder, FrameEncoder};
pub use gzip::{GzipHeader, GzipTrailer, HeaderParser};
pub use oxiflate_deflate::{
    deflate, inflate, zlib_compress, zlib_compress_with_dict, zlib_decompress,
    zlib_decompress_with_dict,
};
pub use stream::{Direction, FlateStream};

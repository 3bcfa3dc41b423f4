//! # OxiFlate Core
//!
//! Core components for the OxiFlate DEFLATE codec.
//!
//! This crate provides the building blocks shared by both codec directions:
//!
//! - [`bitstream`]: Resumable input bit accumulator and pending output buffer
//! - [`ringbuffer`]: Sliding window for resumable decompression
//! - [`crc`]: CRC-32 checksum (gzip trailer)
//! - [`adler`]: Adler-32 checksum (zlib trailer)
//! - [`traits`]: Streaming compressor/decompressor traits
//! - [`config`]: Level, window, memory, strategy and framing settings
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Stream                                              │
//! │     gzip header, framer, Read/Write adapter, CLI        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflater (LZ77 + Huffman), Inflater, zlib wrapper   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Core (this crate)                                   │
//! │     BitAccumulator/PendingBuf, Window, CRC-32, Adler-32 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::adler::Adler32;
//! use oxiflate_core::crc::Crc32;
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! assert_eq!(Adler32::compute(b"Wikipedia"), 0x11E60398);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler;
pub mod bitstream;
pub mod config;
pub mod crc;
pub mod error;
pub mod ringbuffer;
pub mod traits;

// Re-exports for convenience
pub use adler::Adler32;
pub use bitstream::{BitAccumulator, PendingBuf};
pub use config::{FlateConfig, Framing, Strategy};
pub use crc::Crc32;
pub use error::{ErrorKind, FlateError, Result};
pub use ringbuffer::Window;
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler::Adler32;
    pub use crate::config::{FlateConfig, Framing, Strategy};
    pub use crate::crc::Crc32;
    pub use crate::error::{ErrorKind, FlateError, Result};
    pub use crate::traits::{
        CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    };
}

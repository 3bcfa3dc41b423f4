//! # OxiFlate Deflate
//!
//! Streaming DEFLATE (RFC 1951) compression and decompression, with zlib
//! (RFC 1950) framing built in.
//!
//! ## Components
//!
//! - [`Deflater`]: hash-chain LZ77 match finder feeding a canonical Huffman
//!   block writer; levels 0-9, five strategies, flush modes and preset
//!   dictionaries
//! - [`Inflater`]: resumable block decoder that can stop and continue at any
//!   byte boundary of input or output, with a bulk fast path
//! - [`zlib`]: one-shot zlib helpers and header inspection
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_deflate::{deflate, inflate};
//!
//! // Compress data
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//!
//! // Decompress data
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: Stored blocks only
//! - Level 1-3: Greedy matching
//! - Level 4-9: Lazy matching (default is 6)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod blocks;
pub mod codes;
pub mod decode_table;
pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod zlib;

// Re-exports
pub use deflate::{Deflater, deflate};
pub use inflate::{Inflater, inflate};
pub use lz77::Lz77Token;
pub use zlib::{
    ZlibHeader, zlib_compress, zlib_compress_with_dict, zlib_decompress,
    zlib_decompress_with_dict,
};

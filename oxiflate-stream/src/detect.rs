//! Framing detection from magic bytes and file names.
//!
//! Raw DEFLATE has no signature, so it is never detected from content; it
//! can only be chosen by extension or explicitly.

use crate::gzip::GZIP_MAGIC;
use oxiflate_core::config::Framing;
use oxiflate_core::error::Result;
use oxiflate_deflate::ZlibHeader;
use std::io::Read;
use std::path::Path;

/// Detect the framing from the first bytes of a stream.
pub fn framing_from_magic(magic: &[u8]) -> Option<Framing> {
    if magic.starts_with(&GZIP_MAGIC) {
        return Some(Framing::Gzip);
    }
    // A two-byte header passing the mod-31 check with method 8.
    if magic.len() >= 2 && ZlibHeader::parse(&magic[..2]).is_ok() {
        return Some(Framing::Zlib);
    }
    None
}

/// Framing implied by a file extension.
pub fn framing_from_extension(path: &Path) -> Option<Framing> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "gz" | "gzip" | "tgz" => Some(Framing::Gzip),
        "zz" | "zlib" => Some(Framing::Zlib),
        "deflate" => Some(Framing::Raw),
        _ => None,
    }
}

/// Typical file extension for a framing.
pub fn extension(framing: Framing) -> &'static str {
    match framing {
        Framing::Gzip => "gz",
        Framing::Zlib => "zz",
        Framing::Raw => "deflate",
    }
}

/// MIME type for a framing.
pub fn mime_type(framing: Framing) -> &'static str {
    match framing {
        Framing::Gzip => "application/gzip",
        Framing::Zlib => "application/zlib",
        Framing::Raw => "application/octet-stream",
    }
}

/// Read the first bytes of `reader` and detect its framing.
///
/// The bytes read are returned so the caller can replay them.
pub fn detect<R: Read>(reader: &mut R) -> Result<(Option<Framing>, Vec<u8>)> {
    let mut magic = vec![0u8; 16];
    let bytes_read = reader.read(&mut magic)?;
    magic.truncate(bytes_read);
    Ok((framing_from_magic(&magic), magic))
}

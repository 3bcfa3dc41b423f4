//! GZIP header and trailer (RFC 1952).
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+
//! |ID1|ID2|CM |FLG|     MTIME     |XFL|OS |
//! +---+---+---+---+---+---+---+---+---+---+
//! [XLEN + extra] [name\0] [comment\0] [CRC16]
//! ... deflate blocks ...
//! +---+---+---+---+---+---+---+---+
//! |     CRC32     |     ISIZE     |
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! [`HeaderParser`] accepts the header in pieces of any size, so a decoder
//! never needs the whole header in one buffer.

use oxiflate_core::Crc32;
use oxiflate_core::error::{FlateError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Operating system code for "unknown".
pub const OS_UNKNOWN: u8 = 255;

/// Size of the fixed part of the header.
pub const HEADER_SIZE: usize = 10;

/// Size of the trailer.
pub const TRAILER_SIZE: usize = 8;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
    /// Bits that must be zero.
    pub const RESERVED: u8 = 0xE0;
}

/// Extra-flags value written for the given compression level.
pub fn extra_flags_for_level(level: u8) -> u8 {
    match level {
        9 => 2,
        0..=1 => 4,
        _ => 0,
    }
}

/// GZIP member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// The data is probably text.
    pub text: bool,
    /// Modification time (Unix timestamp, 0 = unknown).
    pub mtime: u32,
    /// Extra flags (2 = best compression, 4 = fastest).
    pub extra_flags: u8,
    /// Operating system.
    pub os: u8,
    /// Extra field payload.
    pub extra: Option<Vec<u8>>,
    /// Original filename.
    pub filename: Option<String>,
    /// Comment.
    pub comment: Option<String>,
    /// Header CRC16. On write, `Some` requests one (the value is computed).
    pub header_crc: Option<u16>,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
            extra: None,
            filename: None,
            comment: None,
            header_crc: None,
        }
    }
}

impl GzipHeader {
    /// Create a new GZIP header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the original filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the extra field (at most 65535 bytes are written).
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the modification time to now.
    pub fn with_mtime_now(mut self) -> Self {
        self.mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        self
    }

    /// Mark the content as text.
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Request a header CRC16.
    pub fn with_header_crc(mut self) -> Self {
        self.header_crc = Some(0);
        self
    }

    /// Flag byte implied by the optional fields.
    pub fn flags(&self) -> u8 {
        let mut flg = 0;
        if self.text {
            flg |= flags::FTEXT;
        }
        if self.header_crc.is_some() {
            flg |= flags::FHCRC;
        }
        if self.extra.is_some() {
            flg |= flags::FEXTRA;
        }
        if self.filename.is_some() {
            flg |= flags::FNAME;
        }
        if self.comment.is_some() {
            flg |= flags::FCOMMENT;
        }
        flg
    }

    /// Serialize the header for a stream compressed at `level`.
    ///
    /// The extra-flags byte is derived from `level`; names and comments are
    /// written as Latin-1.
    pub fn encode(&self, level: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + 32);
        out.extend_from_slice(&GZIP_MAGIC);
        out.push(CM_DEFLATE);
        out.push(self.flags());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(extra_flags_for_level(level));
        out.push(self.os);

        if let Some(extra) = &self.extra {
            let extra = &extra[..extra.len().min(u16::MAX as usize)];
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(extra);
        }
        if let Some(filename) = &self.filename {
            out.extend(encode_latin1(filename));
            out.push(0);
        }
        if let Some(comment) = &self.comment {
            out.extend(encode_latin1(comment));
            out.push(0);
        }
        if self.header_crc.is_some() {
            let crc = Crc32::compute(&out) as u16;
            out.extend_from_slice(&crc.to_le_bytes());
        }
        out
    }

    /// Parse a complete header from the start of `data`.
    ///
    /// Returns the header and its size in bytes.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let mut parser = HeaderParser::new();
        match parser.feed(data)? {
            (used, Some(header)) => Ok((header, used)),
            (_, None) => Err(FlateError::invalid_header("truncated gzip header")),
        }
    }
}

fn encode_latin1(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .map(|b| if b == 0 { b'?' } else { b })
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Fixed,
    ExtraLen,
    Extra(usize),
    Name,
    Comment,
    HeaderCrc,
    Done,
}

/// Incremental GZIP header parser.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    state: ParseState,
    /// Bytes of the current fixed-size or NUL-terminated field.
    scratch: Vec<u8>,
    flags: u8,
    header: GzipHeader,
    consumed: usize,
}

impl HeaderParser {
    /// Create a parser waiting for the first header byte.
    pub fn new() -> Self {
        Self {
            state: ParseState::Fixed,
            scratch: Vec::with_capacity(HEADER_SIZE),
            flags: 0,
            header: GzipHeader::default(),
            consumed: 0,
        }
    }

    /// Header bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Whether the whole header has been parsed.
    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Consume header bytes from `input`.
    ///
    /// Returns the bytes used and, once the header is complete, the header.
    /// Bytes after the header are left untouched.
    pub fn feed(&mut self, input: &[u8]) -> Result<(usize, Option<GzipHeader>)> {
        let mut pos = 0;
        loop {
            match self.state {
                ParseState::Fixed => {
                    pos += self.fill(&input[pos..], HEADER_SIZE);
                    self.check_fixed_prefix()?;
                    if self.scratch.len() < HEADER_SIZE {
                        break;
                    }
                    let b = &self.scratch;
                    self.flags = b[3];
                    self.header.text = self.flags & flags::FTEXT != 0;
                    self.header.mtime = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
                    self.header.extra_flags = b[8];
                    self.header.os = b[9];
                    self.scratch.clear();
                    self.state = if self.flags & flags::FEXTRA != 0 {
                        ParseState::ExtraLen
                    } else {
                        self.after_extra()
                    };
                }
                ParseState::ExtraLen => {
                    pos += self.fill(&input[pos..], 2);
                    if self.scratch.len() < 2 {
                        break;
                    }
                    let len = u16::from_le_bytes([self.scratch[0], self.scratch[1]]) as usize;
                    self.scratch.clear();
                    self.header.extra = Some(Vec::with_capacity(len));
                    self.state = ParseState::Extra(len);
                }
                ParseState::Extra(left) => {
                    if left == 0 {
                        self.state = self.after_extra();
                        continue;
                    }
                    let n = left.min(input.len() - pos);
                    if n == 0 {
                        break;
                    }
                    if let Some(extra) = self.header.extra.as_mut() {
                        extra.extend_from_slice(&input[pos..pos + n]);
                    }
                    pos += n;
                    self.state = ParseState::Extra(left - n);
                }
                ParseState::Name | ParseState::Comment => {
                    let rest = &input[pos..];
                    let Some(nul) = rest.iter().position(|&b| b == 0) else {
                        self.scratch.extend_from_slice(rest);
                        pos = input.len();
                        break;
                    };
                    self.scratch.extend_from_slice(&rest[..nul]);
                    pos += nul + 1;
                    let text = decode_latin1(&self.scratch);
                    self.scratch.clear();
                    if self.state == ParseState::Name {
                        self.header.filename = Some(text);
                        self.state = self.after_name();
                    } else {
                        self.header.comment = Some(text);
                        self.state = self.after_comment();
                    }
                }
                ParseState::HeaderCrc => {
                    pos += self.fill(&input[pos..], 2);
                    if self.scratch.len() < 2 {
                        break;
                    }
                    self.header.header_crc =
                        Some(u16::from_le_bytes([self.scratch[0], self.scratch[1]]));
                    self.scratch.clear();
                    self.state = ParseState::Done;
                }
                ParseState::Done => {
                    self.consumed += pos;
                    return Ok((pos, Some(self.header.clone())));
                }
            }
        }
        self.consumed += pos;
        Ok((pos, None))
    }

    /// Top up `scratch` to `want` bytes; returns the bytes taken.
    fn fill(&mut self, input: &[u8], want: usize) -> usize {
        let n = want.saturating_sub(self.scratch.len()).min(input.len());
        self.scratch.extend_from_slice(&input[..n]);
        n
    }

    /// Reject a bad magic, method or flag byte as soon as it arrives.
    fn check_fixed_prefix(&self) -> Result<()> {
        let b = &self.scratch;
        if b.len() > 1 && b[..2] != GZIP_MAGIC || b.len() == 1 && b[0] != GZIP_MAGIC[0] {
            return Err(FlateError::invalid_header("incorrect gzip magic"));
        }
        if b.len() > 2 && b[2] != CM_DEFLATE {
            return Err(FlateError::invalid_header("unknown compression method"));
        }
        if b.len() > 3 && b[3] & flags::RESERVED != 0 {
            return Err(FlateError::invalid_header("unknown header flags set"));
        }
        Ok(())
    }

    fn after_extra(&self) -> ParseState {
        if self.flags & flags::FNAME != 0 {
            ParseState::Name
        } else {
            self.after_name()
        }
    }

    fn after_name(&self) -> ParseState {
        if self.flags & flags::FCOMMENT != 0 {
            ParseState::Comment
        } else {
            self.after_comment()
        }
    }

    fn after_comment(&self) -> ParseState {
        if self.flags & flags::FHCRC != 0 {
            ParseState::HeaderCrc
        } else {
            ParseState::Done
        }
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

/// GZIP member trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data.
    pub crc: u32,
    /// Uncompressed size modulo 2^32.
    pub size: u32,
}

impl GzipTrailer {
    /// Serialize as 8 little-endian bytes.
    pub fn encode(&self) -> [u8; TRAILER_SIZE] {
        let mut out = [0u8; TRAILER_SIZE];
        out[..4].copy_from_slice(&self.crc.to_le_bytes());
        out[4..].copy_from_slice(&self.size.to_le_bytes());
        out
    }

    /// Parse 8 trailer bytes.
    pub fn decode(bytes: &[u8; TRAILER_SIZE]) -> Self {
        Self {
            crc: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Compare against the computed values.
    pub fn verify(&self, crc: u32, size: u32) -> Result<()> {
        if self.crc != crc {
            return Err(FlateError::checksum_mismatch("CRC-32", self.crc, crc));
        }
        if self.size != size {
            return Err(FlateError::checksum_mismatch("size", self.size, size));
        }
        Ok(())
    }
}

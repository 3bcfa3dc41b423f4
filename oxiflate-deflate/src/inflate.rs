//! DEFLATE decompression (inflate).
//!
//! [`Inflater`] decodes a raw RFC 1951 stream, or a zlib (RFC 1950) stream
//! when created with [`Inflater::zlib`]. Input and output can be supplied in
//! pieces of any size; a call returns as soon as it runs out of either and
//! the next call resumes mid-symbol.
//!
//! # Example
//!
//! ```rust
//! use oxiflate_core::traits::Decompressor;
//! use oxiflate_deflate::Inflater;
//!
//! // "Hello" as one fixed-Huffman block.
//! let stream = [0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x07, 0x00];
//! let mut inflater = Inflater::new();
//! assert_eq!(inflater.decompress_all(&stream).unwrap(), b"Hello");
//! ```

use crate::blocks::{BlockDecoder, BlockMode};
use oxiflate_core::adler::Adler32;
use oxiflate_core::bitstream::BitAccumulator;
use oxiflate_core::config::{FlateConfig, Framing};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor};

/// Largest usable preset dictionary (one full window).
pub const MAX_DICTIONARY_SIZE: usize = 32768;

/// zlib compression method: deflate.
const Z_DEFLATED: u32 = 8;
/// zlib FLG bit: a dictionary id follows the header.
const PRESET_DICT: u32 = 0x20;

/// How a stream failed. The decoder stays failed and reports the same
/// error on every later call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Header(&'static str),
    Data { offset: u64, message: &'static str },
    Checksum { expected: u32, computed: u32 },
}

impl Failure {
    fn to_error(self) -> FlateError {
        match self {
            Self::Header(message) => FlateError::invalid_header(message),
            Self::Data { offset, message } => FlateError::corrupted(offset, message),
            Self::Checksum { expected, computed } => {
                FlateError::checksum_mismatch("Adler-32", expected, computed)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Waiting for the 2-byte zlib header.
    Header,
    /// Waiting for the 4-byte dictionary id.
    Dictionary,
    /// Decoding DEFLATE blocks.
    Blocks,
    /// Waiting for the Adler-32 trailer.
    Check,
    Done,
    Bad(Failure),
}

/// Streaming DEFLATE decompressor with optional zlib framing.
#[derive(Debug, Clone)]
pub struct Inflater {
    blocks: BlockDecoder,
    mode: Mode,
    /// Whether a zlib header and trailer surround the blocks.
    zlib: bool,
    window_bits: u8,
    /// Running Adler-32 of the output.
    check: Adler32,
    /// Verify the trailer; cleared by [`sync`](Self::sync).
    verify: bool,
    dictionary_adler: Option<u32>,
    /// Marker bytes matched so far while a sync is in progress.
    sync_got: Option<u8>,
    total_in: u64,
    total_out: u64,
}

impl Inflater {
    /// Create a raw DEFLATE decompressor with a 32 KiB window.
    pub fn new() -> Self {
        Self::raw(15)
    }

    /// Create a raw DEFLATE decompressor with a `1 << window_bits` window.
    ///
    /// `window_bits` is clamped to 9..=15.
    pub fn raw(window_bits: u8) -> Self {
        let window_bits = window_bits.clamp(9, 15);
        Self {
            blocks: BlockDecoder::new(window_bits),
            mode: Mode::Blocks,
            zlib: false,
            window_bits,
            check: Adler32::new(),
            verify: true,
            dictionary_adler: None,
            sync_got: None,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Create a zlib decompressor accepting any window size.
    pub fn zlib() -> Self {
        Self::zlib_with_window(15)
    }

    fn zlib_with_window(window_bits: u8) -> Self {
        Self {
            mode: Mode::Header,
            zlib: true,
            ..Self::raw(window_bits)
        }
    }

    /// Create a decompressor from a configuration.
    ///
    /// Gzip framing yields a raw decompressor; the gzip header and trailer
    /// are handled by the stream layer.
    pub fn with_config(config: &FlateConfig) -> Result<Self> {
        config.validate()?;
        Ok(match config.framing {
            Framing::Zlib => Self::zlib_with_window(config.window_bits),
            Framing::Gzip | Framing::Raw => Self::raw(config.window_bits),
        })
    }

    /// Create a raw decompressor with a preset dictionary.
    ///
    /// If the dictionary is larger than the window only its tail is used.
    pub fn with_dictionary(dictionary: &[u8]) -> Self {
        let mut inflater = Self::new();
        inflater.load_dictionary(dictionary);
        inflater
    }

    /// Supply the preset dictionary the compressor used.
    ///
    /// Must be called before any input is decoded. For zlib streams the
    /// header's dictionary id is checked against the returned Adler-32.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        let fresh = self.total_in == 0
            && self.sync_got.is_none()
            && matches!(self.mode, Mode::Header | Mode::Blocks)
            && self.blocks.mode() == BlockMode::Type;
        if !fresh {
            return Err(FlateError::invalid_state(
                "dictionary must be set before decompression starts",
            ));
        }
        Ok(self.load_dictionary(dictionary))
    }

    fn load_dictionary(&mut self, dictionary: &[u8]) -> u32 {
        self.blocks.window.preload(dictionary);
        let adler = Adler32::compute(dictionary);
        self.dictionary_adler = Some(adler);
        adler
    }

    /// Whether a preset dictionary was supplied.
    pub fn has_dictionary(&self) -> bool {
        self.dictionary_adler.is_some()
    }

    /// Configured window size in bits.
    pub fn window_bits(&self) -> u8 {
        self.window_bits
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Adler-32 of the output produced so far.
    pub fn adler(&self) -> u32 {
        self.check.value()
    }

    /// Whether the decoder sits at the start of a stored block's length
    /// field, on a byte boundary.
    ///
    /// A Sync or Full flush leaves the compressed stream at such a point.
    pub fn is_sync_point(&self) -> bool {
        self.mode == Mode::Blocks && self.blocks.is_sync_point()
    }

    /// Skip forward to the next `00 00 FF FF` flush marker.
    ///
    /// Returns the number of input bytes consumed and whether the marker was
    /// found. The search resumes across calls until it succeeds; meanwhile
    /// [`decompress`](Decompressor::decompress) is a state error. Once found,
    /// decoding restarts at the next block header with an empty window and
    /// the trailer checksum is no longer verified.
    pub fn sync(&mut self, input: &[u8]) -> (usize, bool) {
        let mut got = match self.sync_got {
            Some(got) => got,
            None => {
                // Whole bytes already pulled into the accumulator come first.
                let acc = &mut self.blocks.acc;
                acc.align_to_byte();
                let mut buffered = [0u8; 8];
                let mut len = 0;
                while acc.bits() >= 8 {
                    buffered[len] = acc.take(8) as u8;
                    len += 1;
                }
                let mut got = 0;
                search_marker(&mut got, &buffered[..len]);
                got
            }
        };

        let consumed = search_marker(&mut got, input);
        self.total_in += consumed as u64;
        if got < 4 {
            self.sync_got = Some(got);
            return (consumed, false);
        }

        self.sync_got = None;
        self.blocks.reset();
        self.mode = Mode::Blocks;
        self.verify = false;
        (consumed, true)
    }

    fn run(
        &mut self,
        input: &[u8],
        pos: &mut usize,
        output: &mut [u8],
        written: &mut usize,
    ) -> std::result::Result<DecompressStatus, Failure> {
        loop {
            match self.mode {
                Mode::Header => {
                    let acc = &mut self.blocks.acc;
                    if !acc.need(input, pos, 16) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let cmf = acc.take(8);
                    let flg = acc.take(8);
                    if ((cmf << 8) | flg) % 31 != 0 {
                        return Err(Failure::Header("incorrect header check"));
                    }
                    if cmf & 0x0f != Z_DEFLATED {
                        return Err(Failure::Header("unknown compression method"));
                    }
                    if (cmf >> 4) + 8 > self.window_bits as u32 {
                        return Err(Failure::Header("invalid window size"));
                    }
                    self.mode = if flg & PRESET_DICT != 0 {
                        Mode::Dictionary
                    } else {
                        Mode::Blocks
                    };
                }
                Mode::Dictionary => {
                    if !self.blocks.acc.need(input, pos, 32) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let id = take_u32_be(&mut self.blocks.acc);
                    match self.dictionary_adler {
                        None => return Err(Failure::Header("need dictionary")),
                        Some(adler) if adler != id => {
                            return Err(Failure::Header("incorrect dictionary"));
                        }
                        Some(_) => self.mode = Mode::Blocks,
                    }
                }
                Mode::Blocks => {
                    let start = *written;
                    let decoded = self.blocks.decode(input, pos, output, written);
                    self.check.update(&output[start..*written]);
                    match decoded {
                        Ok(DecompressStatus::Done) => {
                            self.mode = if self.zlib { Mode::Check } else { Mode::Done };
                        }
                        Ok(status) => return Ok(status),
                        Err(message) => {
                            return Err(Failure::Data {
                                offset: self.total_in + *pos as u64,
                                message,
                            });
                        }
                    }
                }
                Mode::Check => {
                    let acc = &mut self.blocks.acc;
                    acc.align_to_byte();
                    if !acc.need(input, pos, 32) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let expected = take_u32_be(acc);
                    let computed = self.check.value();
                    if self.verify && expected != computed {
                        return Err(Failure::Checksum { expected, computed });
                    }
                    self.mode = Mode::Done;
                }
                Mode::Done => return Ok(DecompressStatus::Done),
                Mode::Bad(failure) => return Err(failure),
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        if output.is_empty() {
            return Err(FlateError::invalid_state("no output space supplied"));
        }
        if self.sync_got.is_some() {
            return Err(FlateError::invalid_state(
                "cannot decompress while a sync is in progress",
            ));
        }

        let mut pos = 0;
        let mut written = 0;
        let result = self.run(input, &mut pos, output, &mut written);
        self.total_in += pos as u64;
        self.total_out += written as u64;

        match result {
            Ok(status) => Ok((pos, written, status)),
            Err(failure) => {
                self.mode = Mode::Bad(failure);
                Err(failure.to_error())
            }
        }
    }

    fn reset(&mut self) {
        self.blocks.reset();
        self.mode = if self.zlib { Mode::Header } else { Mode::Blocks };
        self.check.reset();
        self.verify = true;
        self.dictionary_adler = None;
        self.sync_got = None;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn is_finished(&self) -> bool {
        self.mode == Mode::Done
    }
}

/// Read four buffered bytes as a big-endian value.
fn take_u32_be(acc: &mut BitAccumulator) -> u32 {
    (0..4).fold(0, |value, _| (value << 8) | acc.take(8))
}

/// Advance the `00 00 FF FF` search over `bytes`.
///
/// `got` counts marker bytes matched so far; a zero byte after partial
/// progress keeps the longest suffix that can still start a marker.
/// Returns the bytes examined.
fn search_marker(got: &mut u8, bytes: &[u8]) -> usize {
    let mut next = 0;
    while next < bytes.len() && *got < 4 {
        let want = if *got < 2 { 0x00 } else { 0xff };
        if bytes[next] == want {
            *got += 1;
        } else if bytes[next] != 0 {
            *got = 0;
        } else {
            *got = 4 - *got;
        }
        next += 1;
    }
    next
}

/// Decompress a complete raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_all(data)
}

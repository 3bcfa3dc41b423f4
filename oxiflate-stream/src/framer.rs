//! Push-based container framing.
//!
//! [`FrameEncoder`] and [`FrameDecoder`] wrap the raw codec with the
//! framing chosen in [`FlateConfig`]. Zlib framing is carried by the codec
//! itself; gzip adds the RFC 1952 header, a CRC-32 over the plaintext and
//! the size trailer. Both types implement the same call-driven traits as
//! the codec, so they can be driven with any buffer sizes.

use crate::gzip::{GzipHeader, GzipTrailer, HeaderParser, TRAILER_SIZE};
use oxiflate_core::config::{FlateConfig, Framing, Strategy};
use oxiflate_core::crc::Crc32;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
};
use oxiflate_deflate::{Deflater, Inflater};

/// Framing bytes waiting for output space.
#[derive(Debug, Clone, Default)]
struct Pending {
    bytes: Vec<u8>,
    pos: usize,
}

impl Pending {
    fn set(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
        self.pos = 0;
    }

    fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let n = (self.bytes.len() - self.pos).min(output.len());
        output[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

/// Streaming compressor producing zlib, gzip or raw output.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    deflater: Deflater,
    framing: Framing,
    level: u8,
    /// Gzip header not yet queued.
    header: Option<GzipHeader>,
    pending: Pending,
    crc: Crc32,
    size: u32,
    finished: bool,
    /// `Done` has been returned to the caller.
    reported_done: bool,
    total_in: u64,
    total_out: u64,
}

impl FrameEncoder {
    /// Create an encoder for `config`.
    pub fn new(config: &FlateConfig) -> Result<Self> {
        let deflater = Deflater::with_config(config)?;
        Ok(Self {
            deflater,
            framing: config.framing,
            level: config.level.level(),
            header: (config.framing == Framing::Gzip).then(GzipHeader::new),
            pending: Pending::default(),
            crc: Crc32::new(),
            size: 0,
            finished: false,
            reported_done: false,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Use `header` for the gzip member. Ignored for other framings.
    ///
    /// Takes effect only before the first output is produced.
    pub fn with_gzip_header(mut self, header: GzipHeader) -> Self {
        if self.header.is_some() {
            self.header = Some(header);
        }
        self
    }

    /// Framing in use.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Load a preset dictionary before the first call.
    ///
    /// Gzip has no field to name a dictionary, so it is rejected there.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.framing == Framing::Gzip {
            return Err(FlateError::invalid_parameter(
                "dictionary",
                "gzip framing cannot carry a preset dictionary",
            ));
        }
        self.deflater.set_dictionary(dictionary)
    }

    /// Change level and strategy mid-stream.
    pub fn set_params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        self.deflater.set_params(level, strategy)?;
        self.level = self.deflater.level();
        Ok(())
    }

    /// Plaintext bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Framed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    fn queue_trailer(&mut self) {
        let trailer = GzipTrailer {
            crc: self.crc.value(),
            size: self.size,
        };
        self.pending.set(trailer.encode().to_vec());
    }
}

impl Compressor for FrameEncoder {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if output.is_empty() {
            return Err(FlateError::invalid_state("no output space supplied"));
        }
        if self.reported_done {
            return Err(FlateError::invalid_state("compression already finished"));
        }
        if let Some(header) = self.header.take() {
            self.pending.set(header.encode(self.level));
        }

        let mut written = self.pending.drain_into(output);
        let mut consumed = 0;
        let status = if !self.pending.is_empty() || written == output.len() && !self.finished {
            CompressStatus::NeedsOutput
        } else if self.finished {
            if !input.is_empty() || flush != FlushMode::Finish {
                return Err(FlateError::invalid_state("compression already finished"));
            }
            CompressStatus::Done
        } else {
            let (used, produced, status) =
                self.deflater
                    .compress(input, &mut output[written..], flush)?;
            self.crc.update(&input[..used]);
            self.size = self.size.wrapping_add(used as u32);
            consumed = used;
            written += produced;

            if status == CompressStatus::Done {
                self.finished = true;
                if self.framing == Framing::Gzip {
                    self.queue_trailer();
                    written += self.pending.drain_into(&mut output[written..]);
                }
                if self.pending.is_empty() {
                    CompressStatus::Done
                } else {
                    CompressStatus::NeedsOutput
                }
            } else {
                status
            }
        };

        self.reported_done = status == CompressStatus::Done;
        self.total_in += consumed as u64;
        self.total_out += written as u64;
        Ok((consumed, written, status))
    }

    fn reset(&mut self) {
        self.deflater.reset();
        if self.framing == Framing::Gzip {
            self.header = Some(GzipHeader::new());
        }
        self.pending = Pending::default();
        self.crc.reset();
        self.size = 0;
        self.finished = false;
        self.reported_done = false;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Stage {
    Header(HeaderParser),
    Body,
    Trailer {
        bytes: [u8; TRAILER_SIZE],
        have: usize,
    },
    Done,
    Failed,
}

/// Streaming decompressor accepting zlib, gzip or raw input.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    inflater: Inflater,
    framing: Framing,
    stage: Stage,
    header: Option<GzipHeader>,
    crc: Crc32,
    size: u32,
    total_in: u64,
    total_out: u64,
}

impl FrameDecoder {
    /// Create a decoder for `framing` with a full-size window.
    pub fn new(framing: Framing) -> Self {
        let inflater = match framing {
            Framing::Zlib => Inflater::zlib(),
            Framing::Gzip | Framing::Raw => Inflater::new(),
        };
        Self::build(inflater, framing)
    }

    /// Create a decoder from a configuration (framing and window size).
    pub fn with_config(config: &FlateConfig) -> Result<Self> {
        Ok(Self::build(Inflater::with_config(config)?, config.framing))
    }

    fn build(inflater: Inflater, framing: Framing) -> Self {
        Self {
            inflater,
            framing,
            stage: Self::first_stage(framing),
            header: None,
            crc: Crc32::new(),
            size: 0,
            total_in: 0,
            total_out: 0,
        }
    }

    fn first_stage(framing: Framing) -> Stage {
        match framing {
            Framing::Gzip => Stage::Header(HeaderParser::new()),
            Framing::Zlib | Framing::Raw => Stage::Body,
        }
    }

    /// Framing in use.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// The gzip header, once it has been parsed.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.header.as_ref()
    }

    /// Supply the preset dictionary the compressor used.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        self.inflater.set_dictionary(dictionary)
    }

    /// Compressed bytes consumed, framing included.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Plaintext bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Report whether the input may legitimately end here.
    ///
    /// A gzip source that ends before its first byte is an empty stream;
    /// any other unfinished stream is truncated.
    pub fn end_of_input(&self) -> Result<()> {
        match &self.stage {
            Stage::Done => Ok(()),
            Stage::Header(parser) if parser.consumed() == 0 => Ok(()),
            Stage::Trailer { .. } => Err(FlateError::corrupted(
                self.total_in,
                "missing or incomplete gzip trailer",
            )),
            Stage::Header(_) | Stage::Body => Err(FlateError::corrupted(
                self.total_in,
                "unexpected end of compressed stream",
            )),
            Stage::Failed => Err(Self::failed()),
        }
    }

    fn failed() -> FlateError {
        FlateError::invalid_state("decoder failed earlier; reset it before reuse")
    }

    fn step(
        &mut self,
        input: &[u8],
        pos: &mut usize,
        output: &mut [u8],
        written: &mut usize,
    ) -> Result<DecompressStatus> {
        loop {
            match &mut self.stage {
                Stage::Header(parser) => {
                    let (used, header) = parser.feed(&input[*pos..])?;
                    *pos += used;
                    match header {
                        Some(header) => {
                            self.header = Some(header);
                            self.stage = Stage::Body;
                        }
                        None => return Ok(DecompressStatus::NeedsInput),
                    }
                }
                Stage::Body => {
                    if *written == output.len() {
                        return Ok(DecompressStatus::NeedsOutput);
                    }
                    let (used, produced, status) = self
                        .inflater
                        .decompress(&input[*pos..], &mut output[*written..])?;
                    *pos += used;
                    if self.framing == Framing::Gzip {
                        self.crc.update(&output[*written..*written + produced]);
                        self.size = self.size.wrapping_add(produced as u32);
                    }
                    *written += produced;
                    match status {
                        DecompressStatus::Done if self.framing == Framing::Gzip => {
                            self.stage = Stage::Trailer {
                                bytes: [0; TRAILER_SIZE],
                                have: 0,
                            };
                        }
                        DecompressStatus::Done => self.stage = Stage::Done,
                        other => return Ok(other),
                    }
                }
                Stage::Trailer { bytes, have } => {
                    let n = (TRAILER_SIZE - *have).min(input.len() - *pos);
                    bytes[*have..*have + n].copy_from_slice(&input[*pos..*pos + n]);
                    *have += n;
                    *pos += n;
                    if *have < TRAILER_SIZE {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    GzipTrailer::decode(bytes).verify(self.crc.value(), self.size)?;
                    self.stage = Stage::Done;
                }
                Stage::Done => return Ok(DecompressStatus::Done),
                Stage::Failed => return Err(Self::failed()),
            }
        }
    }
}

impl Decompressor for FrameDecoder {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        if output.is_empty() {
            return Err(FlateError::invalid_state("no output space supplied"));
        }
        let mut pos = 0;
        let mut written = 0;
        let result = self.step(input, &mut pos, output, &mut written);
        self.total_in += pos as u64;
        self.total_out += written as u64;
        match result {
            Ok(status) => Ok((pos, written, status)),
            Err(err) => {
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.inflater.reset();
        self.stage = Self::first_stage(self.framing);
        self.header = None;
        self.crc.reset();
        self.size = 0;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Done)
    }

    /// Decode a complete in-memory stream; an empty gzip input decodes to
    /// nothing.
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut pos = 0;
        let mut buffer = vec![0u8; 32768];
        loop {
            let (used, produced, status) = self.decompress(&input[pos..], &mut buffer)?;
            pos += used;
            output.extend_from_slice(&buffer[..produced]);
            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if pos >= input.len() => {
                    self.end_of_input()?;
                    break;
                }
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::error::ErrorKind;

    fn encode(data: &[u8], config: &FlateConfig) -> Vec<u8> {
        FrameEncoder::new(config).unwrap().compress_all(data).unwrap()
    }

    #[test]
    fn test_gzip_layout() {
        let data = b"Hello, World!";
        let out = encode(data, &FlateConfig::GZIP);
        assert_eq!(&out[..4], &[0x1F, 0x8B, 8, 0]);
        assert_eq!(out[9], 255);
        let tail = &out[out.len() - 8..];
        assert_eq!(&tail[..4], &Crc32::compute(data).to_le_bytes());
        assert_eq!(&tail[4..], &13u32.to_le_bytes());
    }

    #[test]
    fn test_roundtrip_each_framing() {
        let data = b"framing framing framing framing, and then some".repeat(40);
        for framing in [Framing::Zlib, Framing::Gzip, Framing::Raw] {
            let config = FlateConfig::new(framing);
            let out = encode(&data, &config);
            let back = FrameDecoder::new(framing).decompress_all(&out).unwrap();
            assert_eq!(back, data, "{}", framing.name());
        }
    }

    #[test]
    fn test_tiny_output_buffers() {
        let data = b"tiny buffers tiny buffers tiny buffers".repeat(20);
        let header = GzipHeader::new().with_filename("tiny.txt");
        let mut encoder = FrameEncoder::new(&FlateConfig::GZIP)
            .unwrap()
            .with_gzip_header(header);

        let mut framed = Vec::new();
        let mut pos = 0;
        let mut byte = [0u8; 1];
        loop {
            let (used, produced, status) = encoder
                .compress(&data[pos..], &mut byte, FlushMode::Finish)
                .unwrap();
            pos += used;
            framed.extend_from_slice(&byte[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        assert!(encoder.is_finished());
        assert_eq!(encoder.total_out(), framed.len() as u64);

        let mut decoder = FrameDecoder::new(Framing::Gzip);
        let mut plain = Vec::new();
        let mut pos = 0;
        loop {
            let end = (pos + 1).min(framed.len());
            let (used, produced, status) =
                decoder.decompress(&framed[pos..end], &mut byte).unwrap();
            pos += used;
            plain.extend_from_slice(&byte[..produced]);
            if status == DecompressStatus::Done {
                break;
            }
        }
        assert_eq!(plain, data);
        assert_eq!(decoder.header().unwrap().filename.as_deref(), Some("tiny.txt"));
        assert_eq!(pos, framed.len());
    }

    #[test]
    fn test_finished_encoder() {
        let mut encoder = FrameEncoder::new(&FlateConfig::GZIP).unwrap();
        encoder.compress_all(b"x").unwrap();
        let mut out = [0u8; 16];
        let err = encoder.compress(&[], &mut out, FlushMode::Finish).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        let err = encoder.compress(b"more", &mut out, FlushMode::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        encoder.reset();
        assert!(!encoder.compress_all(b"y").unwrap().is_empty());
    }

    #[test]
    fn test_gzip_trailer_mismatches() {
        let data = b"checksummed payload";
        let good = encode(data, &FlateConfig::GZIP);

        let mut bad_crc = good.clone();
        let n = bad_crc.len();
        bad_crc[n - 8] ^= 1;
        let err = FrameDecoder::new(Framing::Gzip).decompress_all(&bad_crc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Checksum);

        let mut bad_size = good.clone();
        bad_size[n - 1] ^= 1;
        let err = FrameDecoder::new(Framing::Gzip).decompress_all(&bad_size).unwrap_err();
        assert!(err.to_string().contains("size"));

        let err = FrameDecoder::new(Framing::Gzip)
            .decompress_all(&good[..n - 3])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("gzip trailer"));
    }

    #[test]
    fn test_empty_gzip_source() {
        let out = FrameDecoder::new(Framing::Gzip).decompress_all(&[]).unwrap();
        assert!(out.is_empty());

        let err = FrameDecoder::new(Framing::Zlib).decompress_all(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let err = FrameDecoder::new(Framing::Gzip)
            .decompress_all(&[0x1F, 0x8B, 8])
            .unwrap_err();
        assert!(err.to_string().contains("unexpected end"));
    }

    #[test]
    fn test_header_error_before_payload() {
        let mut decoder = FrameDecoder::new(Framing::Gzip);
        let mut out = [0u8; 64];
        let err = decoder.decompress(b"PK\x03\x04", &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Header);
        let err = decoder.decompress(&[], &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        decoder.reset();
        let good = encode(b"after reset", &FlateConfig::GZIP);
        assert_eq!(decoder.decompress_all(&good).unwrap(), b"after reset");
    }

    #[test]
    fn test_empty_output_rejected() {
        let framed = encode(b"no room", &FlateConfig::GZIP);
        let mut decoder = FrameDecoder::new(Framing::Gzip);
        let err = decoder.decompress(&framed, &mut []).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(decoder.total_in(), 0);
        assert!(decoder.header().is_none());
        assert_eq!(decoder.decompress_all(&framed).unwrap(), b"no room");
    }

    #[test]
    fn test_trailing_bytes_untouched() {
        let mut framed = encode(b"member", &FlateConfig::GZIP);
        let len = framed.len();
        framed.extend_from_slice(b"garbage");

        let mut decoder = FrameDecoder::new(Framing::Gzip);
        let mut out = [0u8; 64];
        let (used, produced, status) = decoder.decompress(&framed, &mut out).unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(used, len);
        assert_eq!(&out[..produced], b"member");
        assert_eq!(decoder.total_in(), len as u64);
    }

    #[test]
    fn test_zlib_dictionary_through_framer() {
        let dict = b"shared vocabulary shared vocabulary";
        let mut encoder = FrameEncoder::new(&FlateConfig::ZLIB).unwrap();
        encoder.set_dictionary(dict).unwrap();
        let framed = encoder.compress_all(b"shared vocabulary again").unwrap();

        let mut decoder = FrameDecoder::new(Framing::Zlib);
        decoder.set_dictionary(dict).unwrap();
        assert_eq!(decoder.decompress_all(&framed).unwrap(), b"shared vocabulary again");

        let mut gzip = FrameEncoder::new(&FlateConfig::GZIP).unwrap();
        let err = gzip.set_dictionary(dict).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_extra_flags_follow_level() {
        let best = encode(b"x", &FlateConfig::GZIP.with_level(9));
        let fast = encode(b"x", &FlateConfig::GZIP.with_level(1));
        assert_eq!(best[8], 2);
        assert_eq!(fast[8], 4);
    }

    #[test]
    fn test_sync_flush_is_decodable() {
        let mut encoder = FrameEncoder::new(&FlateConfig::GZIP).unwrap();
        let mut out = vec![0u8; 1024];
        let (_, produced, status) = encoder
            .compress(b"partial message", &mut out, FlushMode::Sync)
            .unwrap();
        assert_eq!(status, CompressStatus::NeedsInput);
        assert_eq!(&out[produced - 4..produced], &[0, 0, 0xFF, 0xFF]);

        let mut decoder = FrameDecoder::new(Framing::Gzip);
        let mut plain = [0u8; 64];
        let (_, n, status) = decoder.decompress(&out[..produced], &mut plain).unwrap();
        assert_eq!(status, DecompressStatus::NeedsInput);
        assert_eq!(&plain[..n], b"partial message");
    }
}

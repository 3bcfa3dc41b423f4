//! `std::io` adapter over the framers.
//!
//! A [`FlateStream`] wraps a reader or writer and either compresses or
//! decompresses whatever passes through it. Which of `Read` and `Write` is
//! used is fixed by the first call.

use crate::framer::{FrameDecoder, FrameEncoder};
use crate::gzip::GzipHeader;
use oxiflate_core::config::{FlateConfig, Framing};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
};
use std::io::{self, Read, Write};

/// Default working-buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Smallest accepted working-buffer size.
pub const MIN_BUFFER_SIZE: usize = 1024;

/// What a [`FlateStream`] does to the bytes passing through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext in, compressed out.
    Compress,
    /// Compressed in, plaintext out.
    Decompress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Unset,
    Read,
    Write,
}

#[derive(Debug)]
enum Engine {
    Encoder(FrameEncoder),
    Decoder(FrameDecoder),
}

/// Compressing or decompressing wrapper around a reader or writer.
///
/// Writers must call [`finish`](FlateStream::finish) to complete the
/// stream; dropping the adapter does not write the trailer. Readers see
/// the end of the stream as a zero-length read, which happens only after
/// the trailer has been verified.
///
/// # Example
///
/// ```
/// use oxiflate_core::config::{FlateConfig, Framing};
/// use oxiflate_stream::FlateStream;
/// use std::io::{Read, Write};
///
/// let mut writer = FlateStream::compressor(Vec::new(), &FlateConfig::GZIP).unwrap();
/// writer.write_all(b"streamed text").unwrap();
/// writer.finish().unwrap();
/// let gz = writer.into_inner();
///
/// let mut reader = FlateStream::decompressor(&gz[..], Framing::Gzip);
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "streamed text");
/// ```
#[derive(Debug)]
pub struct FlateStream<S> {
    inner: S,
    engine: Engine,
    access: Access,
    flush_mode: FlushMode,
    /// Reading: input staged from `inner`. Writing: engine output.
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    finished: bool,
}

impl<S> FlateStream<S> {
    /// Wrap `inner`, transforming data in `direction` according to `config`.
    pub fn new(inner: S, direction: Direction, config: &FlateConfig) -> Result<Self> {
        let engine = match direction {
            Direction::Compress => Engine::Encoder(FrameEncoder::new(config)?),
            Direction::Decompress => Engine::Decoder(FrameDecoder::with_config(config)?),
        };
        Ok(Self {
            inner,
            engine,
            access: Access::Unset,
            flush_mode: FlushMode::Sync,
            buf: vec![0; DEFAULT_BUFFER_SIZE],
            start: 0,
            end: 0,
            eof: false,
            finished: false,
        })
    }

    /// Compressing stream.
    pub fn compressor(inner: S, config: &FlateConfig) -> Result<Self> {
        Self::new(inner, Direction::Compress, config)
    }

    /// Decompressing stream with a full-size window.
    pub fn decompressor(inner: S, framing: Framing) -> Self {
        Self {
            inner,
            engine: Engine::Decoder(FrameDecoder::new(framing)),
            access: Access::Unset,
            flush_mode: FlushMode::Sync,
            buf: vec![0; DEFAULT_BUFFER_SIZE],
            start: 0,
            end: 0,
            eof: false,
            finished: false,
        }
    }

    /// Set the working-buffer size (at least [`MIN_BUFFER_SIZE`]).
    ///
    /// Only effective before the first read or write.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        if self.access == Access::Unset {
            self.buf = vec![0; size.max(MIN_BUFFER_SIZE)];
        }
        self
    }

    /// Flush mode performed by [`Write::flush`] on a compressing writer.
    ///
    /// `Finish` is not a flush; it is treated as `Full`.
    pub fn with_flush_mode(mut self, mode: FlushMode) -> Self {
        self.flush_mode = mode.min(FlushMode::Full);
        self
    }

    /// Gzip header for a compressing stream.
    pub fn with_gzip_header(mut self, header: GzipHeader) -> Self {
        self.engine = match self.engine {
            Engine::Encoder(encoder) => Engine::Encoder(encoder.with_gzip_header(header)),
            decoder => decoder,
        };
        self
    }

    /// Load a preset dictionary before any data flows.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        match &mut self.engine {
            Engine::Encoder(encoder) => encoder.set_dictionary(dictionary),
            Engine::Decoder(decoder) => decoder.set_dictionary(dictionary),
        }
    }

    /// Direction of the stream.
    pub fn direction(&self) -> Direction {
        match self.engine {
            Engine::Encoder(_) => Direction::Compress,
            Engine::Decoder(_) => Direction::Decompress,
        }
    }

    /// Working-buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Gzip header read by a decompressing stream.
    pub fn header(&self) -> Option<&GzipHeader> {
        match &self.engine {
            Engine::Decoder(decoder) => decoder.header(),
            Engine::Encoder(_) => None,
        }
    }

    /// Bytes taken into the codec.
    pub fn total_in(&self) -> u64 {
        match &self.engine {
            Engine::Encoder(encoder) => encoder.total_in(),
            Engine::Decoder(decoder) => decoder.total_in(),
        }
    }

    /// Bytes produced by the codec.
    pub fn total_out(&self) -> u64 {
        match &self.engine {
            Engine::Encoder(encoder) => encoder.total_out(),
            Engine::Decoder(decoder) => decoder.total_out(),
        }
    }

    /// Whether the stream has been completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutable reference to the wrapped stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap the stream.
    ///
    /// A reader may have buffered bytes past the end of the compressed
    /// stream; they are dropped with the adapter.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn begin(&mut self, access: Access) -> Result<()> {
        match (self.access, access) {
            (Access::Unset, _) => {
                self.access = access;
                Ok(())
            }
            (current, wanted) if current == wanted => Ok(()),
            (Access::Write, _) => Err(FlateError::invalid_state("cannot read after writing")),
            _ => Err(FlateError::invalid_state("cannot write after reading")),
        }
    }
}

impl<S: Write> FlateStream<S> {
    /// Complete the stream.
    ///
    /// A compressing writer emits its final block and trailer; a
    /// decompressing writer checks that the stream and trailer were
    /// complete. Calling it twice is an error.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(FlateError::invalid_state("stream already finished"));
        }
        self.begin(Access::Write)?;
        match &mut self.engine {
            Engine::Encoder(encoder) => loop {
                let (_, produced, status) =
                    encoder.compress(&[], &mut self.buf, FlushMode::Finish)?;
                self.inner.write_all(&self.buf[..produced])?;
                if status == CompressStatus::Done {
                    break;
                }
            },
            Engine::Decoder(decoder) => decoder.end_of_input()?,
        }
        self.inner.flush()?;
        self.finished = true;
        Ok(())
    }

    fn encode_into_inner(&mut self, data: &[u8], flush: FlushMode) -> Result<usize> {
        let Engine::Encoder(encoder) = &mut self.engine else {
            return Ok(0);
        };
        let mut pos = 0;
        loop {
            let (used, produced, status) = encoder.compress(&data[pos..], &mut self.buf, flush)?;
            self.inner.write_all(&self.buf[..produced])?;
            pos += used;
            if status != CompressStatus::NeedsOutput {
                return Ok(pos);
            }
        }
    }

    fn decode_into_inner(&mut self, data: &[u8]) -> Result<usize> {
        let Engine::Decoder(decoder) = &mut self.engine else {
            return Ok(0);
        };
        let mut pos = 0;
        loop {
            let (used, produced, status) = decoder.decompress(&data[pos..], &mut self.buf)?;
            self.inner.write_all(&self.buf[..produced])?;
            pos += used;
            if status != DecompressStatus::NeedsOutput {
                return Ok(pos);
            }
        }
    }
}

impl<S: Write> Write for FlateStream<S> {
    /// Feed bytes through the codec.
    ///
    /// A decompressing writer stops accepting bytes once the compressed
    /// stream has ended, so `write_all` of trailing garbage fails with
    /// `WriteZero`.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.begin(Access::Write)?;
        if self.finished {
            return Err(FlateError::invalid_state("stream already finished").into());
        }
        let written = match self.direction() {
            Direction::Compress => self.encode_into_inner(data, FlushMode::None)?,
            Direction::Decompress => self.decode_into_inner(data)?,
        };
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.access == Access::Read {
            return Ok(());
        }
        if !self.finished
            && self.direction() == Direction::Compress
            && self.flush_mode != FlushMode::None
        {
            self.begin(Access::Write)?;
            self.encode_into_inner(&[], self.flush_mode)?;
        }
        self.inner.flush()
    }
}

impl<S: Read> Read for FlateStream<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.begin(Access::Read)?;
        if out.is_empty() || self.finished {
            return Ok(0);
        }
        loop {
            if self.start == self.end && !self.eof {
                let n = self.inner.read(&mut self.buf)?;
                self.start = 0;
                self.end = n;
                self.eof = n == 0;
            }
            let input = &self.buf[self.start..self.end];

            match &mut self.engine {
                Engine::Decoder(decoder) => {
                    let (used, produced, status) = decoder.decompress(input, out)?;
                    self.start += used;
                    if status == DecompressStatus::Done {
                        self.finished = true;
                        return Ok(produced);
                    }
                    if produced > 0 {
                        return Ok(produced);
                    }
                    if self.eof && self.start == self.end {
                        decoder.end_of_input()?;
                        self.finished = true;
                        return Ok(0);
                    }
                }
                Engine::Encoder(encoder) => {
                    let flush = if self.eof {
                        FlushMode::Finish
                    } else {
                        FlushMode::None
                    };
                    let (used, produced, status) = encoder.compress(input, out, flush)?;
                    self.start += used;
                    if status == CompressStatus::Done {
                        self.finished = true;
                        return Ok(produced);
                    }
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
            }
        }
    }
}

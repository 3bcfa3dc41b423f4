//! Bit-level plumbing for resumable DEFLATE coding.
//!
//! DEFLATE packs codes LSB-first within bytes. Neither side of the codec may
//! block on I/O, so both halves keep their bit state across calls:
//!
//! - [`BitAccumulator`] pulls input bytes from caller-supplied slices on
//!   demand and keeps any unconsumed bits between calls.
//! - [`PendingBuf`] collects emitted codes and hands out finished bytes as
//!   the caller provides output space.
//!
//! # Example
//!
//! ```
//! use oxiflate_core::bitstream::{BitAccumulator, PendingBuf};
//!
//! let mut pending = PendingBuf::new();
//! pending.send_bits(0b101, 3);
//! pending.send_bits(0b1100, 4);
//! pending.align_to_byte();
//!
//! let mut bytes = [0u8; 4];
//! let n = pending.drain_into(&mut bytes);
//! assert_eq!(n, 1);
//!
//! let mut acc = BitAccumulator::new();
//! let mut pos = 0;
//! assert!(acc.need(&bytes[..n], &mut pos, 7));
//! assert_eq!(acc.take(3), 0b101);
//! assert_eq!(acc.take(4), 0b1100);
//! ```

/// Input-side bit buffer that survives across decode calls.
///
/// Bytes are only pulled when a caller asks for more bits than are held, so
/// between complete operations fewer than eight bits stay buffered. The
/// bulk decode path refills greedily and hands whole bytes back with
/// [`give_back`](Self::give_back) when it exits.
#[derive(Debug, Clone, Default)]
pub struct BitAccumulator {
    /// Bit buffer (LSB-first).
    hold: u64,
    /// Number of valid bits in `hold`.
    bits: u32,
}

impl BitAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all buffered bits.
    pub fn reset(&mut self) {
        self.hold = 0;
        self.bits = 0;
    }

    /// Number of buffered bits.
    #[inline(always)]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Pull a single byte from `input[*pos..]`.
    ///
    /// Returns `false` when the input is exhausted.
    #[inline]
    pub fn pull_byte(&mut self, input: &[u8], pos: &mut usize) -> bool {
        match input.get(*pos) {
            Some(&byte) => {
                self.hold |= (byte as u64) << self.bits;
                self.bits += 8;
                *pos += 1;
                true
            }
            None => false,
        }
    }

    /// Ensure at least `count` bits are buffered, pulling bytes as needed.
    ///
    /// Returns `false` when the input ran out first; bits pulled so far stay
    /// buffered for the next call.
    #[inline]
    pub fn need(&mut self, input: &[u8], pos: &mut usize, count: u32) -> bool {
        while self.bits < count {
            if !self.pull_byte(input, pos) {
                return false;
            }
        }
        true
    }

    /// Greedily fill the buffer to at least 56 bits when input allows.
    #[inline]
    pub fn refill(&mut self, input: &[u8], pos: &mut usize) {
        while self.bits <= 56 {
            if !self.pull_byte(input, pos) {
                break;
            }
        }
    }

    /// Look at the low `count` bits without consuming them (`count <= 32`).
    ///
    /// Bits beyond those buffered read as zero.
    #[inline(always)]
    pub fn peek(&self, count: u32) -> u32 {
        (self.hold & ((1u64 << count) - 1)) as u32
    }

    /// Drop `count` buffered bits.
    #[inline(always)]
    pub fn consume(&mut self, count: u32) {
        debug_assert!(count <= self.bits);
        self.hold >>= count;
        self.bits -= count;
    }

    /// Read and consume `count` buffered bits.
    #[inline(always)]
    pub fn take(&mut self, count: u32) -> u32 {
        let value = self.peek(count);
        self.consume(count);
        value
    }

    /// Drop bits up to the next byte boundary.
    #[inline]
    pub fn align_to_byte(&mut self) {
        let partial = self.bits & 7;
        self.consume(partial);
    }

    /// Return whole buffered bytes to the input by rewinding `pos`.
    ///
    /// Only bytes pulled from the current input slice can be returned; the
    /// caller guarantees that is the case for everything above the low
    /// partial byte.
    #[inline]
    pub fn give_back(&mut self, pos: &mut usize) {
        let bytes = ((self.bits >> 3) as usize).min(*pos);
        *pos -= bytes;
        self.bits -= (bytes as u32) << 3;
        self.hold &= (1u64 << self.bits) - 1;
    }
}

/// Output-side bit sink with a queue of finished bytes.
///
/// Codes are packed into a 64-bit accumulator and spilled to the byte queue
/// 32 bits at a time. Whole bytes become visible to
/// [`drain_into`](Self::drain_into) after [`flush_bits`](Self::flush_bits)
/// or [`align_to_byte`](Self::align_to_byte).
#[derive(Debug, Clone, Default)]
pub struct PendingBuf {
    /// Finished bytes; `buf[out..]` has not been handed out yet.
    buf: Vec<u8>,
    /// Number of bytes of `buf` already drained.
    out: usize,
    /// Bit accumulator (LSB-first).
    bit_buf: u64,
    /// Number of valid bits in `bit_buf`.
    bit_count: u32,
}

impl PendingBuf {
    /// Create an empty pending buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pending buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Drop all queued bytes and bits.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.out = 0;
        self.bit_buf = 0;
        self.bit_count = 0;
    }

    /// Append the low `count` bits of `value` (`count <= 32`).
    #[inline]
    pub fn send_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        let masked = (value as u64) & ((1u64 << count) - 1);
        self.bit_buf |= masked << self.bit_count;
        self.bit_count += count;
        if self.bit_count >= 32 {
            self.buf
                .extend_from_slice(&(self.bit_buf as u32).to_le_bytes());
            self.bit_buf >>= 32;
            self.bit_count -= 32;
        }
    }

    /// Move whole bytes from the accumulator into the queue, leaving fewer
    /// than eight bits behind.
    #[inline]
    pub fn flush_bits(&mut self) {
        while self.bit_count >= 8 {
            self.buf.push(self.bit_buf as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Flush every bit, padding the last partial byte with zeros.
    pub fn align_to_byte(&mut self) {
        self.flush_bits();
        if self.bit_count > 0 {
            self.buf.push(self.bit_buf as u8);
        }
        self.bit_buf = 0;
        self.bit_count = 0;
    }

    /// Bits held in the accumulator and not yet queued.
    #[inline(always)]
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    /// Queue a byte. The accumulator must be byte aligned.
    #[inline]
    pub fn put_byte(&mut self, byte: u8) {
        debug_assert_eq!(self.bit_count, 0);
        self.buf.push(byte);
    }

    /// Queue a 16-bit value, least significant byte first.
    #[inline]
    pub fn put_u16_le(&mut self, value: u16) {
        debug_assert_eq!(self.bit_count, 0);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Queue a 16-bit value, most significant byte first.
    #[inline]
    pub fn put_u16_be(&mut self, value: u16) {
        debug_assert_eq!(self.bit_count, 0);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Queue a 32-bit value, most significant byte first.
    #[inline]
    pub fn put_u32_be(&mut self, value: u32) {
        debug_assert_eq!(self.bit_count, 0);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Queue raw bytes. The accumulator must be byte aligned.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bit_count, 0);
        self.buf.extend_from_slice(bytes);
    }

    /// Number of finished bytes waiting to be drained.
    #[inline]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.out
    }

    /// Whether no finished bytes are waiting.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Copy as many finished bytes as fit into `output`.
    ///
    /// Returns the number of bytes copied.
    pub fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let n = self.pending().min(output.len());
        output[..n].copy_from_slice(&self.buf[self.out..self.out + n]);
        self.out += n;
        if self.out == self.buf.len() {
            self.buf.clear();
            self.out = 0;
        }
        n
    }
}

//! Sliding window for resumable DEFLATE decompression.
//!
//! Every decoded byte is written into the window first. The window doubles
//! as the back-reference history and as a staging area for output that the
//! caller has not yet provided room for: bytes stay *pending* until they are
//! flushed into a caller buffer, and a match can only be expanded while the
//! window has space for it.
//!
//! # Sizes
//!
//! The window holds `1 << window_bits` bytes, from 512 bytes (9 bits) up to
//! 32 KiB (15 bits).

/// Window size for the default 15 window bits.
pub const DEFAULT_WINDOW_SIZE: usize = 32768;

/// Circular history buffer with an unflushed-output cursor.
#[derive(Debug, Clone)]
pub struct Window {
    /// The underlying buffer.
    buffer: Vec<u8>,
    /// Capacity minus one (capacity is a power of two).
    mask: usize,
    /// Next write position.
    position: usize,
    /// Bytes written but not yet flushed to the caller.
    pending: usize,
    /// Bytes of valid history, saturating at capacity.
    history: usize,
}

impl Window {
    /// Create a window of `1 << window_bits` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `window_bits` is outside `8..=15`.
    pub fn new(window_bits: u8) -> Self {
        assert!(
            (8..=15).contains(&window_bits),
            "window bits must be in 8..=15, got {window_bits}"
        );
        let capacity = 1usize << window_bits;
        Self {
            buffer: vec![0; capacity],
            mask: capacity - 1,
            position: 0,
            pending: 0,
            history: 0,
        }
    }

    /// Forget all history and pending output.
    pub fn reset(&mut self) {
        self.position = 0;
        self.pending = 0;
        self.history = 0;
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes that can be written before pending output must be flushed.
    #[inline(always)]
    pub fn space(&self) -> usize {
        self.buffer.len() - self.pending
    }

    /// Bytes waiting to be flushed.
    #[inline(always)]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Longest distance a back-reference may currently use.
    #[inline(always)]
    pub fn history(&self) -> usize {
        self.history
    }

    /// Append a byte. The caller ensures `space() > 0`.
    #[inline(always)]
    pub fn push(&mut self, byte: u8) {
        debug_assert!(self.pending < self.buffer.len());
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        self.pending += 1;
        if self.history < self.buffer.len() {
            self.history += 1;
        }
    }

    /// Append a run of bytes. The caller ensures they fit in `space()`.
    pub fn push_slice(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.space());
        let capacity = self.buffer.len();
        let mut rest = bytes;
        while !rest.is_empty() {
            let run = rest.len().min(capacity - self.position);
            self.buffer[self.position..self.position + run].copy_from_slice(&rest[..run]);
            self.position = (self.position + run) & self.mask;
            rest = &rest[run..];
        }
        self.pending += bytes.len();
        self.history = (self.history + bytes.len()).min(capacity);
    }

    /// Expand a back-reference of `length` bytes at `distance`.
    ///
    /// The caller ensures `1 <= distance <= history()` and
    /// `length <= space()`. Overlapping copies (`length > distance`) repeat
    /// the referenced bytes.
    #[inline]
    pub fn copy_match(&mut self, distance: usize, length: usize) {
        debug_assert!(distance >= 1 && distance <= self.history);
        debug_assert!(length <= self.space());
        let mut src = self.position.wrapping_sub(distance) & self.mask;
        for _ in 0..length {
            self.buffer[self.position] = self.buffer[src];
            self.position = (self.position + 1) & self.mask;
            src = (src + 1) & self.mask;
        }
        self.pending += length;
        self.history = (self.history + length).min(self.buffer.len());
    }

    /// Move pending bytes into `output`, oldest first.
    ///
    /// Returns the number of bytes copied.
    pub fn flush_into(&mut self, output: &mut [u8]) -> usize {
        let n = self.pending.min(output.len());
        let capacity = self.buffer.len();
        let mut start = self.position.wrapping_sub(self.pending) & self.mask;
        let mut copied = 0;
        while copied < n {
            let run = (n - copied).min(capacity - start);
            output[copied..copied + run].copy_from_slice(&self.buffer[start..start + run]);
            copied += run;
            start = (start + run) & self.mask;
        }
        self.pending -= n;
        n
    }

    /// Seed the history with a preset dictionary.
    ///
    /// Only the last `capacity()` bytes are kept. Dictionary bytes are
    /// history only and are never flushed as output.
    pub fn preload(&mut self, dictionary: &[u8]) {
        let capacity = self.buffer.len();
        let tail = &dictionary[dictionary.len().saturating_sub(capacity)..];
        self.buffer[..tail.len()].copy_from_slice(tail);
        self.position = tail.len() & self.mask;
        self.pending = 0;
        self.history = tail.len();
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flush_all(window: &mut Window) -> Vec<u8> {
        let mut out = vec![0u8; window.pending()];
        let n = window.flush_into(&mut out);
        out.truncate(n);
        out
    }

    #[test]
    fn test_window_basic() {
        let mut window = Window::new(9);
        assert_eq!(window.capacity(), 512);
        assert_eq!(window.space(), 512);

        window.push(b'a');
        window.push(b'b');
        assert_eq!(window.pending(), 2);
        assert_eq!(window.history(), 2);
        assert_eq!(flush_all(&mut window), b"ab");
        assert_eq!(window.pending(), 0);
        assert_eq!(window.history(), 2);
    }

    #[test]
    fn test_copy_match_overlapping() {
        let mut window = Window::new(9);
        window.push_slice(b"ab");
        window.copy_match(2, 6);
        assert_eq!(flush_all(&mut window), b"abababab");

        window.push(b'x');
        window.copy_match(1, 4);
        assert_eq!(flush_all(&mut window), b"xxxxx");
    }

    #[test]
    fn test_flush_partial_and_wrap() {
        let mut window = Window::new(9);
        let data: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
        window.push_slice(&data);
        assert_eq!(flush_all(&mut window), data);

        // Write across the physical end of the buffer.
        let more: Vec<u8> = (0..100u8).collect();
        window.push_slice(&more);
        let mut out = [0u8; 30];
        assert_eq!(window.flush_into(&mut out), 30);
        assert_eq!(&out[..], &more[..30]);
        assert_eq!(flush_all(&mut window), &more[30..]);
        assert_eq!(window.history(), 512);
    }

    #[test]
    fn test_space_limits_pending() {
        let mut window = Window::new(9);
        window.push_slice(&[7u8; 512]);
        assert_eq!(window.space(), 0);

        let mut out = [0u8; 12];
        window.flush_into(&mut out);
        assert_eq!(window.space(), 12);
    }

    #[test]
    fn test_preload_dictionary() {
        let mut window = Window::new(9);
        window.preload(b"hello ");
        assert_eq!(window.pending(), 0);
        assert_eq!(window.history(), 6);

        window.copy_match(6, 5);
        assert_eq!(flush_all(&mut window), b"hello");
    }

    #[test]
    fn test_preload_keeps_tail() {
        let mut window = Window::new(9);
        let dict: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        window.preload(&dict);
        assert_eq!(window.history(), 512);

        window.copy_match(1, 1);
        assert_eq!(flush_all(&mut window), vec![dict[999]]);
    }

    #[test]
    fn test_reset() {
        let mut window = Window::default();
        window.push_slice(b"data");
        window.reset();
        assert_eq!(window.pending(), 0);
        assert_eq!(window.history(), 0);
        assert_eq!(window.capacity(), DEFAULT_WINDOW_SIZE);
    }
}

//! Adler-32 rolling checksum (RFC 1950), as used by the zlib trailer and
//! the preset-dictionary identifier.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(ADLER_MOD-1) fits in 32 bits.
const NMAX: usize = 5552;

/// Running Adler-32 accumulator.
///
/// # Example
///
/// ```
/// use oxiflate_core::adler::Adler32;
///
/// assert_eq!(Adler32::compute(b"Wikipedia"), 0x11E60398);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new accumulator (value 1).
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Resume from a previously reported checksum value.
    pub fn from_value(value: u32) -> Self {
        Self {
            a: value & 0xFFFF,
            b: value >> 16,
        }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Current checksum value.
    pub fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute Adler-32 of a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adler32_empty() {
        assert_eq!(Adler32::compute(b""), 1);
    }

    #[test]
    fn test_adler32_known_values() {
        assert_eq!(Adler32::compute(b"Hello"), 0x058C01F5);
        assert_eq!(Adler32::compute(b"Wikipedia"), 0x11E60398);
    }

    #[test]
    fn test_adler32_incremental() {
        let data = vec![0xFFu8; 20_000];
        let mut adler = Adler32::new();
        for chunk in data.chunks(777) {
            adler.update(chunk);
        }
        assert_eq!(adler.value(), Adler32::compute(&data));
    }

    #[test]
    fn test_adler32_resume() {
        let first = Adler32::compute(b"abab");
        let mut adler = Adler32::from_value(first);
        adler.update(b"abab");
        assert_eq!(adler.value(), Adler32::compute(b"abababab"));
    }
}

//! CRC-32 (ISO 3309) as used by the gzip trailer.
//!
//! Inputs of 16 bytes or more go through a slicing-by-8 loop that folds
//! eight bytes per step; shorter inputs use the byte-at-a-time table.

/// Reflected generator polynomial 0x04C11DB7.
const POLY: u32 = 0xEDB8_8320;

/// Register value before any data, and the final XOR mask.
const INIT: u32 = !0;

/// CRC of a single byte value `n` with an empty register.
const fn byte_crc(n: u32) -> u32 {
    let mut reg = n;
    let mut bit = 0;
    while bit < 8 {
        reg = if reg & 1 == 1 { (reg >> 1) ^ POLY } else { reg >> 1 };
        bit += 1;
    }
    reg
}

/// `TABLES[k][n]` advances the CRC of byte `n` over `k` further zero bytes.
static TABLES: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];
    let mut n = 0;
    while n < 256 {
        tables[0][n] = byte_crc(n as u32);
        n += 1;
    }
    let mut k = 1;
    while k < 8 {
        let mut n = 0;
        while n < 256 {
            let reg = tables[k - 1][n];
            tables[k][n] = (reg >> 8) ^ tables[0][(reg & 0xFF) as usize];
            n += 1;
        }
        k += 1;
    }
    tables
};

/// Running CRC-32 over a byte stream.
///
/// # Example
///
/// ```
/// use oxiflate_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    reg: u32,
}

impl Crc32 {
    /// Empty checksum.
    pub fn new() -> Self {
        Self { reg: INIT }
    }

    /// Forget everything fed so far.
    pub fn reset(&mut self) {
        self.reg = INIT;
    }

    /// Fold `data` into the checksum.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.reg = if data.len() < 16 {
            bytewise(self.reg, data)
        } else {
            slice8(self.reg, data)
        };
    }

    /// Checksum of the bytes seen so far.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.reg
    }

    /// One-shot CRC-32 of `data`.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn bytewise(reg: u32, data: &[u8]) -> u32 {
    data.iter().fold(reg, |reg, &byte| {
        (reg >> 8) ^ TABLES[0][((reg ^ u32::from(byte)) & 0xFF) as usize]
    })
}

#[inline]
fn slice8(mut reg: u32, data: &[u8]) -> u32 {
    let mut words = data.chunks_exact(8);
    for w in &mut words {
        let lo = reg ^ u32::from_le_bytes([w[0], w[1], w[2], w[3]]);
        reg = TABLES[7][(lo & 0xFF) as usize]
            ^ TABLES[6][((lo >> 8) & 0xFF) as usize]
            ^ TABLES[5][((lo >> 16) & 0xFF) as usize]
            ^ TABLES[4][(lo >> 24) as usize]
            ^ TABLES[3][w[4] as usize]
            ^ TABLES[2][w[5] as usize]
            ^ TABLES[1][w[6] as usize]
            ^ TABLES[0][w[7] as usize];
    }
    bytewise(reg, words.remainder())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(Crc32::compute(b""), 0);
        assert_eq!(Crc32::compute(b"a"), 0xE8B7BE43);
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
        assert_eq!(
            Crc32::compute(b"The quick brown fox jumps over the lazy dog"),
            0x414FA339
        );
    }

    #[test]
    fn test_split_updates_agree() {
        let data = b"gzip trailers carry the CRC of the whole member";
        for split in [0, 1, 15, 16, 17, data.len()] {
            let mut crc = Crc32::new();
            crc.update(&data[..split]);
            crc.update(&data[split..]);
            assert_eq!(crc.value(), Crc32::compute(data), "split at {split}");
        }
    }

    #[test]
    fn test_slice8_matches_bytewise() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 31 + 7) as u8).collect();
        for len in [16, 17, 23, 24, 64, 999, 1000] {
            assert_eq!(
                slice8(INIT, &data[..len]),
                bytewise(INIT, &data[..len]),
                "len {len}"
            );
        }
    }

    #[test]
    fn test_reset() {
        let mut crc = Crc32::new();
        crc.update(b"garbage");
        crc.reset();
        crc.update(b"123456789");
        assert_eq!(crc.value(), 0xCBF43926);
    }
}

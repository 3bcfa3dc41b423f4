//! Constant tables for DEFLATE (RFC 1951).
//!
//! Holds the per-level tuning table, the length/distance code tables shared
//! by both codec directions, and the fixed Huffman code lengths from
//! RFC 1951 Section 3.2.6. Everything here is immutable and shared by all
//! codec instances.

/// Shortest match the encoder emits.
pub const MIN_MATCH: usize = 3;
/// Longest match DEFLATE can express.
pub const MAX_MATCH: usize = 258;
/// Lookahead the match finder keeps so a full match plus the next hash key
/// are always in the window.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;
/// Length-3 matches further back than this are not worth their cost.
pub const TOO_FAR: usize = 4096;

/// Number of literal byte values.
pub const LITERALS: usize = 256;
/// End-of-block symbol.
pub const END_BLOCK: usize = 256;
/// Number of length codes (257-285).
pub const LENGTH_CODES: usize = 29;
/// Size of the literal/length alphabet the encoder uses.
pub const L_CODES: usize = LITERALS + 1 + LENGTH_CODES;
/// Size of the distance alphabet.
pub const D_CODES: usize = 30;
/// Size of the bit-length alphabet.
pub const BL_CODES: usize = 19;
/// Longest literal/length or distance code.
pub const MAX_BITS: u8 = 15;
/// Longest bit-length code.
pub const MAX_BL_BITS: u8 = 7;

/// Bit-length code: repeat the previous length 3-6 times (2 extra bits).
pub const REP_3_6: usize = 16;
/// Bit-length code: repeat a zero length 3-10 times (3 extra bits).
pub const REPZ_3_10: usize = 17;
/// Bit-length code: repeat a zero length 11-138 times (7 extra bits).
pub const REPZ_11_138: usize = 18;

/// Block type: stored.
pub const STORED_BLOCK: u32 = 0;
/// Block type: fixed Huffman codes.
pub const STATIC_TREES: u32 = 1;
/// Block type: dynamic Huffman codes.
pub const DYN_TREES: u32 = 2;

/// Match-search strategy selected by the compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Copy input through in stored blocks.
    Store,
    /// Greedy matching.
    Fast,
    /// Lazy matching with one position of lookahead.
    Slow,
}

/// Tuning constants for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Reduce the chain search once the previous match is at least this long.
    pub good_length: usize,
    /// Do not look for lazy matches beyond this length. The fast flavor uses
    /// it as the longest match whose strings still get hashed.
    pub max_lazy: usize,
    /// Stop searching once a match this long is found.
    pub nice_length: usize,
    /// Longest hash chain to walk.
    pub max_chain: usize,
    /// Match-search strategy.
    pub flavor: Flavor,
}

impl LevelConfig {
    const fn new(
        good_length: usize,
        max_lazy: usize,
        nice_length: usize,
        max_chain: usize,
        flavor: Flavor,
    ) -> Self {
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            flavor,
        }
    }
}

/// Tuning table indexed by compression level.
pub const LEVEL_TABLE: [LevelConfig; 10] = [
    LevelConfig::new(0, 0, 0, 0, Flavor::Store),
    LevelConfig::new(4, 4, 8, 4, Flavor::Fast),
    LevelConfig::new(4, 5, 16, 8, Flavor::Fast),
    LevelConfig::new(4, 6, 32, 32, Flavor::Fast),
    LevelConfig::new(4, 4, 16, 16, Flavor::Slow),
    LevelConfig::new(8, 16, 32, 32, Flavor::Slow),
    LevelConfig::new(8, 16, 128, 128, Flavor::Slow),
    LevelConfig::new(8, 32, 128, 256, Flavor::Slow),
    LevelConfig::new(32, 128, 258, 1024, Flavor::Slow),
    LevelConfig::new(32, 258, 258, 4096, Flavor::Slow),
];

/// Look up the tuning constants for a level (clamped to 9).
pub fn level_config(level: u8) -> &'static LevelConfig {
    &LEVEL_TABLE[(level as usize).min(9)]
}

/// Length code base values (RFC 1951 Section 3.2.5), for codes 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values (RFC 1951 Section 3.2.5), for codes 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Number of extra bits for each bit-length code.
pub const BL_EXTRA_BITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// Order in which bit-length code lengths are transmitted
/// (RFC 1951 Section 3.2.7).
pub const BL_ORDER: [usize; BL_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length code index (0-28) for each match length minus [`MIN_MATCH`].
static LENGTH_CODE: [u8; 256] = build_length_code();

/// Distance code for `distance - 1`: direct for values below 256, then by
/// `256 + ((distance - 1) >> 7)`.
static DIST_CODE: [u8; 512] = build_dist_code();

const fn build_length_code() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        let base = LENGTH_BASE[code] as usize - MIN_MATCH;
        let count = 1usize << LENGTH_EXTRA_BITS[code];
        let mut i = 0;
        while i < count {
            table[base + i] = code as u8;
            i += 1;
        }
        code += 1;
    }
    // Length 258 has its own code even though 227 + 31 would also reach it.
    table[255] = (LENGTH_CODES - 1) as u8;
    table
}

const fn build_dist_code() -> [u8; 512] {
    let mut table = [0u8; 512];
    let mut code = 0;
    while code < 16 {
        let base = DISTANCE_BASE[code] as usize - 1;
        let count = 1usize << DISTANCE_EXTRA_BITS[code];
        let mut i = 0;
        while i < count {
            table[base + i] = code as u8;
            i += 1;
        }
        code += 1;
    }
    while code < D_CODES {
        let base = (DISTANCE_BASE[code] as usize - 1) >> 7;
        let count = 1usize << (DISTANCE_EXTRA_BITS[code] - 7);
        let mut i = 0;
        while i < count {
            table[256 + base + i] = code as u8;
            i += 1;
        }
        code += 1;
    }
    table
}

/// Length code index (0-28) for a match length in 3..=258.
#[inline(always)]
pub fn length_code(length: usize) -> usize {
    debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
    LENGTH_CODE[length - MIN_MATCH] as usize
}

/// Distance code (0-29) for a distance in 1..=32768.
#[inline(always)]
pub fn distance_code(distance: usize) -> usize {
    debug_assert!((1..=32768).contains(&distance));
    let d = distance - 1;
    if d < 256 {
        DIST_CODE[d] as usize
    } else {
        DIST_CODE[256 + (d >> 7)] as usize
    }
}

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths: all 30 codes (plus the two unused ones)
/// use 5 bits.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_table() {
        assert_eq!(level_config(0).flavor, Flavor::Store);
        assert_eq!(level_config(3).flavor, Flavor::Fast);
        assert_eq!(level_config(4).flavor, Flavor::Slow);
        assert_eq!(level_config(6).max_chain, 128);
        assert_eq!(level_config(9).nice_length, MAX_MATCH);
        assert_eq!(level_config(42), level_config(9));
    }

    #[test]
    fn test_min_lookahead() {
        assert_eq!(MIN_LOOKAHEAD, 262);
        assert_eq!(L_CODES, 286);
    }

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = fixed_litlen_lengths();
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7);
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_length_code_covers_range() {
        for length in MIN_MATCH..=MAX_MATCH {
            let code = length_code(length);
            let base = LENGTH_BASE[code] as usize;
            let extra = LENGTH_EXTRA_BITS[code];
            assert!(length >= base, "length {length} below base of code {code}");
            assert!(length - base < (1 << extra) || (length == 258 && code == 28));
        }
        assert_eq!(length_code(3), 0);
        assert_eq!(length_code(10), 7);
        assert_eq!(length_code(11), 8);
        assert_eq!(length_code(257), 27);
        assert_eq!(length_code(258), 28);
    }

    #[test]
    fn test_distance_code_covers_range() {
        for distance in 1..=32768usize {
            let code = distance_code(distance);
            let base = DISTANCE_BASE[code] as usize;
            let extra = DISTANCE_EXTRA_BITS[code];
            assert!(distance >= base);
            assert!(distance - base < (1 << extra), "distance {distance} code {code}");
        }
        assert_eq!(distance_code(1), 0);
        assert_eq!(distance_code(5), 4);
        assert_eq!(distance_code(256), 15);
        assert_eq!(distance_code(257), 16);
        assert_eq!(distance_code(32768), 29);
    }
}

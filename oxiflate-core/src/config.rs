//! Codec configuration.
//!
//! [`FlateConfig`] bundles every knob a compressor accepts. Decompressors
//! only look at `window_bits` and `framing`.

use crate::error::{FlateError, Result};
use crate::traits::CompressionLevel;

/// Smallest accepted window size, in bits.
pub const MIN_WINDOW_BITS: u8 = 9;
/// Largest accepted window size, in bits.
pub const MAX_WINDOW_BITS: u8 = 15;
/// Smallest accepted memory level.
pub const MIN_MEM_LEVEL: u8 = 1;
/// Largest accepted memory level.
pub const MAX_MEM_LEVEL: u8 = 9;
/// Default memory level.
pub const DEFAULT_MEM_LEVEL: u8 = 8;

/// Match-acceptance strategy.
///
/// Strategies change how matches are chosen, never whether the output
/// decodes correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Normal matching for the configured level.
    #[default]
    Default,
    /// Prefer literals over short matches (data with small random variation).
    Filtered,
    /// Literals only, no string matching.
    HuffmanOnly,
    /// Only distance-1 matches (run-length encoding).
    Rle,
    /// Never emit dynamic Huffman blocks.
    Fixed,
}

/// Container framing around the raw DEFLATE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Framing {
    /// RFC 1950: 2-byte header, Adler-32 trailer.
    #[default]
    Zlib,
    /// RFC 1952: 10-byte header plus optional fields, CRC-32 and size trailer.
    Gzip,
    /// Bare RFC 1951 blocks.
    Raw,
}

impl Framing {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
            Self::Raw => "raw",
        }
    }
}

/// Compression and decompression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlateConfig {
    /// Compression level (0 = store, 9 = best).
    pub level: CompressionLevel,
    /// Base-two logarithm of the window size (9..=15).
    pub window_bits: u8,
    /// Memory level (1..=9); sizes the hash table and token buffer.
    pub mem_level: u8,
    /// Match-acceptance strategy.
    pub strategy: Strategy,
    /// Container framing.
    pub framing: Framing,
}

impl FlateConfig {
    /// Default settings with zlib framing.
    pub const ZLIB: Self = Self {
        level: CompressionLevel::DEFAULT,
        window_bits: MAX_WINDOW_BITS,
        mem_level: DEFAULT_MEM_LEVEL,
        strategy: Strategy::Default,
        framing: Framing::Zlib,
    };

    /// Default settings with gzip framing.
    pub const GZIP: Self = Self {
        framing: Framing::Gzip,
        ..Self::ZLIB
    };

    /// Default settings without framing.
    pub const RAW: Self = Self {
        framing: Framing::Raw,
        ..Self::ZLIB
    };

    /// Default settings for the given framing.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            ..Self::ZLIB
        }
    }

    /// Set the compression level.
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the window size in bits.
    pub fn with_window_bits(mut self, bits: u8) -> Self {
        self.window_bits = bits;
        self
    }

    /// Set the memory level.
    pub fn with_mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the framing.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            return Err(FlateError::invalid_parameter(
                "window_bits",
                format!(
                    "{} is outside {MIN_WINDOW_BITS}..={MAX_WINDOW_BITS}",
                    self.window_bits
                ),
            ));
        }
        if !(MIN_MEM_LEVEL..=MAX_MEM_LEVEL).contains(&self.mem_level) {
            return Err(FlateError::invalid_parameter(
                "mem_level",
                format!(
                    "{} is outside {MIN_MEM_LEVEL}..={MAX_MEM_LEVEL}",
                    self.mem_level
                ),
            ));
        }
        Ok(())
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.window_bits
    }
}

impl Default for FlateConfig {
    fn default() -> Self {
        Self::ZLIB
    }
}

/// Parse a level given as text, rejecting anything outside 0-9.
pub fn parse_level(text: &str) -> Result<CompressionLevel> {
    match text.trim().parse::<u8>() {
        Ok(level) if level <= 9 => Ok(CompressionLevel::new(level)),
        _ => Err(FlateError::invalid_parameter(
            "level",
            format!("'{text}' is not a level in 0..=9"),
        )),
    }
}

//! Error types for OxiFlate operations.
//!
//! Every failure a codec can report falls into one of a handful of kinds:
//! a malformed container header, corrupt compressed data, a trailer checksum
//! that does not match, or misuse of the API. Running out of input or output
//! space is *not* an error; it is reported through
//! [`CompressStatus`](crate::traits::CompressStatus) and
//! [`DecompressStatus`](crate::traits::DecompressStatus).

use std::io;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum FlateError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid container header (bad magic, method, window size or check bits).
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Corrupt compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset in the compressed input where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Trailer checksum or size mismatch.
    #[error("{what} mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Which trailer field failed ("Adler-32", "CRC-32", "size").
        what: &'static str,
        /// Value stored in the stream.
        expected: u32,
        /// Value computed from the data.
        computed: u32,
    },

    /// API misuse, such as writing after finish.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },

    /// A configuration value outside its legal range.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// Description of the accepted range.
        message: String,
    },
}

/// Coarse classification of a [`FlateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Underlying I/O failure.
    Io,
    /// Container header rejected.
    Header,
    /// Compressed data is corrupt.
    Data,
    /// Trailer checksum or size mismatch.
    Checksum,
    /// API misuse.
    State,
    /// Bad configuration value.
    Parameter,
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, FlateError>;

impl FlateError {
    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(what: &'static str, expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            what,
            expected,
            computed,
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidHeader { .. } => ErrorKind::Header,
            Self::CorruptedData { .. } => ErrorKind::Data,
            Self::ChecksumMismatch { .. } => ErrorKind::Checksum,
            Self::InvalidState { .. } => ErrorKind::State,
            Self::InvalidParameter { .. } => ErrorKind::Parameter,
        }
    }

    /// Recover a `FlateError` carried inside an [`io::Error`].
    ///
    /// The stream adapters surface codec failures through `std::io`; this
    /// gives callers the original error back.
    pub fn from_io_ref(err: &io::Error) -> Option<&FlateError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<FlateError>())
    }
}

impl From<FlateError> for io::Error {
    fn from(err: FlateError) -> Self {
        match err {
            FlateError::Io(inner) => inner,
            other => {
                let kind = match other.kind() {
                    ErrorKind::State | ErrorKind::Parameter => io::ErrorKind::InvalidInput,
                    _ => io::ErrorKind::InvalidData,
                };
                io::Error::new(kind, other)
            }
        }
    }
}

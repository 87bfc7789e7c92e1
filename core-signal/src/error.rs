//! # Signal Error Types
//!
//! Error types for descriptor, manager and adapter operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening, seeking or reading a signal.
#[derive(Error, Debug)]
pub enum SignalError {
    // ========================================================================
    // Open Errors
    // ========================================================================
    /// The underlying file could not be opened (missing, unreadable).
    ///
    /// Raised on the first `acquire` and again on every re-acquire after a
    /// close if the file has been deleted or moved in between.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container was opened but its format could not be understood,
    /// or it does not declare the metadata the adapter needs (frame count,
    /// channel count, sample rate).
    #[error("unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// The container was recognized but no decodable audio track was found.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    // ========================================================================
    // Read Errors
    // ========================================================================
    /// Error while reading or decoding packets. Never retried.
    #[error("decoding error: {0}")]
    Decode(String),

    /// The source does not support random access.
    #[error("seeking not supported by this source")]
    SeekNotSupported,

    /// Seek target lies past the end of the stream.
    #[error("seek target {frame} out of bounds for {frames} frames")]
    SeekOutOfBounds { frame: u64, frames: u64 },

    /// The descriptor position moved underneath a locked read.
    ///
    /// This indicates a violated lock discipline (an integration bug), not a
    /// recoverable condition; the read that observed it is aborted.
    #[error("descriptor position drifted: expected frame {expected}, found {actual}")]
    PositionDrift { expected: u64, actual: u64 },

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// An index request outside the supported basic-indexing forms.
    #[error("unsupported index: {0}")]
    UnsupportedIndex(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SignalError {
    /// Returns `true` if this error was raised while opening the source.
    pub fn is_open_error(&self) -> bool {
        matches!(self, SignalError::Open { .. })
    }

    /// Returns `true` if this error is related to the audio format/codec.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            SignalError::InvalidFormat(_) | SignalError::UnsupportedCodec(_)
        )
    }

    /// Returns `true` if this error signals a caller mistake rather than a
    /// failing source.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SignalError::UnsupportedIndex(_) | SignalError::SeekOutOfBounds { .. }
        )
    }
}

/// Result type for signal operations.
pub type Result<T> = std::result::Result<T, SignalError>;

//! # Dataset Error Types

use core_signal::SignalError;
use thiserror::Error;

/// Errors that can occur during store or dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Failure from the signal core (open, decode, seek, indexing),
    /// propagated unchanged.
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// Files could not be concatenated along the filename dimension.
    #[error("cannot merge files: {0}")]
    MergeMismatch(String),

    /// `open_files` was called with an empty path list.
    #[error("no files given")]
    NoFiles,

    /// A filename index past the end of the dataset.
    #[error("file index {index} out of bounds for {files} files")]
    FileIndexOutOfBounds { index: usize, files: usize },

    /// A chunk specification names a dimension the dataset does not have.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    /// A chunk specification with a zero block size.
    #[error("invalid chunk specification: {0}")]
    InvalidChunk(String),
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

//! # Open Configuration
//!
//! Options controlling how files are opened and materialized.

use crate::error::{DatasetError, Result};
use crate::store::{DIM_CHANNEL, DIM_FILENAME, DIM_TIME};
use core_signal::{OpenMode, SampleDtype, SignalLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Block sizes for chunk-wise materialization.
///
/// When a chunk spec is present, [`Dataset::compute`](crate::Dataset::compute)
/// loads the data block by block instead of in one read per file; each block
/// is one locked adapter read. Absent chunks mean one whole-file read per
/// file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkSpec {
    /// One block size applied to the `time` and `channel` dimensions alike.
    Uniform(usize),
    /// Block size per dimension name; omitted dimensions stay whole.
    PerDim(HashMap<String, usize>),
}

impl ChunkSpec {
    /// Per-axis blocks for `(time, channel)`.
    pub fn per_axis(time: usize, channel: usize) -> Self {
        let mut sizes = HashMap::new();
        sizes.insert(DIM_TIME.to_string(), time);
        sizes.insert(DIM_CHANNEL.to_string(), channel);
        ChunkSpec::PerDim(sizes)
    }

    /// Resolve into concrete `(time, channel)` block sizes for one file.
    ///
    /// The `filename` dimension may appear in a per-dimension spec but is
    /// ignored: every file is inherently its own block.
    pub(crate) fn resolve(&self, shape: (usize, usize)) -> Result<(usize, usize)> {
        let (frames, channels) = shape;
        let (time, channel) = match self {
            ChunkSpec::Uniform(size) => (*size, *size),
            ChunkSpec::PerDim(sizes) => {
                for dim in sizes.keys() {
                    if dim != DIM_TIME && dim != DIM_CHANNEL && dim != DIM_FILENAME {
                        return Err(DatasetError::UnknownDimension(dim.clone()));
                    }
                }
                (
                    sizes.get(DIM_TIME).copied().unwrap_or(frames),
                    sizes.get(DIM_CHANNEL).copied().unwrap_or(channels),
                )
            }
        };
        if time == 0 || channel == 0 {
            return Err(DatasetError::InvalidChunk(
                "block sizes must be positive".to_string(),
            ));
        }
        Ok((time.min(frames).max(1), channel.min(channels).max(1)))
    }
}

/// Options for [`open`](crate::open) and [`open_files`](crate::open_files).
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Chunk sizes for block-wise materialization. `None` loads each file
    /// in a single read.
    pub chunks: Option<ChunkSpec>,

    /// Declared element type of decoded samples.
    pub dtype: SampleDtype,

    /// Override for the shared read lock. By default a fresh lock is
    /// created per open call and shared by every store it produces.
    pub lock: Option<SignalLock>,

    /// How the underlying files are opened.
    pub mode: OpenMode,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(mut self, chunks: ChunkSpec) -> Self {
        self.chunks = Some(chunks);
        self
    }

    pub fn with_dtype(mut self, dtype: SampleDtype) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_lock(mut self, lock: SignalLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }
}

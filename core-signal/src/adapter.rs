//! # Lazy Array Adapter
//!
//! Maps array-style range/index requests onto descriptor seek/read calls.
//!
//! ## Overview
//!
//! [`SignalArrayAdapter`] exposes an audio file as a `(time, channel)`
//! array without materializing it. Construction performs exactly one
//! acquire to cache the shape; nothing else is read until a block is
//! requested. Arbitrary basic indexing (integers, ranges, ellipsis) is
//! normalized by [`normalize_index`] into the `(samples, channels)`
//! selector pair the core read routine implements.
//!
//! ## Read algorithm
//!
//! Executed under the shared read lock to serialize access to the
//! descriptor's seek position:
//!
//! 1. Normalize the sample range (start → 0, stop → frame count, step → 1).
//! 2. Seekable source and step 1: seek to `start`, verify the landed
//!    position, read exactly `stop - start` frames, select the requested
//!    channel columns.
//! 3. Otherwise: rewind, read the entire stream, apply the stepped range
//!    and channel selection in memory. O(stream size) by design — the best
//!    achievable against non-seekable sources.
//!
//! The adapter performs no caching; callers wanting to avoid repeated
//! decodes wrap results themselves.

use crate::descriptor::AudioDescriptor;
use crate::error::{Result, SignalError};
use crate::manager::{FileManager, SignalLock};
use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Declared element type of decoded samples.
///
/// Decoding always produces `f64` data; `F32` declares that values pass
/// through `f32` precision on the way out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleDtype {
    /// 32-bit float samples.
    F32,
    /// 64-bit float samples (the default).
    #[default]
    F64,
}

/// A contiguous (optionally stepped) range over the time dimension.
///
/// Missing bounds default at read time: start to `0`, stop to the frame
/// count, step to `1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleRange {
    pub start: Option<u64>,
    pub stop: Option<u64>,
    pub step: Option<u64>,
}

impl SampleRange {
    /// The full range.
    pub fn all() -> Self {
        Self::default()
    }

    /// `start..stop` with step 1.
    pub fn new(start: u64, stop: u64) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// Set the step.
    pub fn with_step(mut self, step: u64) -> Self {
        self.step = Some(step);
        self
    }

    /// Resolve against a frame count into `(start, stop, step)`.
    pub fn normalize(&self, frames: u64) -> Result<(u64, u64, u64)> {
        let start = self.start.unwrap_or(0);
        let stop = self.stop.unwrap_or(frames);
        let step = self.step.unwrap_or(1);

        if step == 0 {
            return Err(SignalError::UnsupportedIndex(
                "range step must be non-zero".to_string(),
            ));
        }
        if start > stop {
            return Err(SignalError::UnsupportedIndex(format!(
                "range start {start} is past stop {stop}"
            )));
        }
        if stop > frames {
            return Err(SignalError::UnsupportedIndex(format!(
                "range stop {stop} exceeds {frames} frames"
            )));
        }
        Ok((start, stop, step))
    }
}

/// Selection over the channel dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelect {
    /// Every channel, in order.
    All,
    /// A contiguous channel range `start..stop`.
    Range { start: usize, stop: usize },
    /// Explicit channel indices, in the requested order.
    List(Vec<usize>),
}

impl ChannelSelect {
    /// Resolve into concrete column indices against a channel count.
    pub fn resolve(&self, channels: usize) -> Result<Vec<usize>> {
        match self {
            ChannelSelect::All => Ok((0..channels).collect()),
            ChannelSelect::Range { start, stop } => {
                if start > stop || *stop > channels {
                    return Err(SignalError::UnsupportedIndex(format!(
                        "channel range {start}..{stop} invalid for {channels} channels"
                    )));
                }
                Ok((*start..*stop).collect())
            }
            ChannelSelect::List(indices) => {
                for &index in indices {
                    if index >= channels {
                        return Err(SignalError::UnsupportedIndex(format!(
                            "channel index {index} out of bounds for {channels} channels"
                        )));
                    }
                }
                Ok(indices.clone())
            }
        }
    }
}

/// One element of a basic-indexing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKey {
    /// A single position (selects a length-1 range; never squeezed).
    Index(u64),
    /// A range with optional bounds and step.
    Range(SampleRange),
    /// Fill in full ranges for the remaining dimensions.
    Ellipsis,
}

/// Normalize a basic-indexing request against a `(frames, channels)` shape
/// into the `(samples, channels)` selector pair.
///
/// Supported forms: up to two of integer/range, with at most one ellipsis;
/// omitted trailing dimensions default to the full range. Anything else is
/// a [`SignalError::UnsupportedIndex`] usage error, never silently coerced.
pub fn normalize_index(
    key: &[IndexKey],
    shape: (usize, usize),
) -> Result<(SampleRange, ChannelSelect)> {
    let ellipses = key
        .iter()
        .filter(|k| matches!(k, IndexKey::Ellipsis))
        .count();
    if ellipses > 1 {
        return Err(SignalError::UnsupportedIndex(
            "at most one ellipsis is allowed".to_string(),
        ));
    }
    let explicit = key.len() - ellipses;
    if explicit > 2 {
        return Err(SignalError::UnsupportedIndex(format!(
            "too many indices ({explicit}) for a (time, channel) array"
        )));
    }

    let mut expanded: Vec<IndexKey> = Vec::with_capacity(2);
    for k in key {
        match k {
            IndexKey::Ellipsis => {
                for _ in 0..(2 - explicit) {
                    expanded.push(IndexKey::Range(SampleRange::all()));
                }
            }
            other => expanded.push(other.clone()),
        }
    }
    while expanded.len() < 2 {
        expanded.push(IndexKey::Range(SampleRange::all()));
    }

    let samples = match &expanded[0] {
        IndexKey::Index(i) => {
            if *i >= shape.0 as u64 {
                return Err(SignalError::UnsupportedIndex(format!(
                    "time index {i} out of bounds for {} frames",
                    shape.0
                )));
            }
            SampleRange::new(*i, *i + 1)
        }
        IndexKey::Range(range) => range.clone(),
        IndexKey::Ellipsis => unreachable!("ellipsis expanded above"),
    };

    let channels = match &expanded[1] {
        IndexKey::Index(i) => {
            if *i >= shape.1 as u64 {
                return Err(SignalError::UnsupportedIndex(format!(
                    "channel index {i} out of bounds for {} channels",
                    shape.1
                )));
            }
            ChannelSelect::List(vec![*i as usize])
        }
        IndexKey::Range(range) => {
            let (start, stop, step) = range.normalize(shape.1 as u64)?;
            if step == 1 {
                ChannelSelect::Range {
                    start: start as usize,
                    stop: stop as usize,
                }
            } else {
                ChannelSelect::List(
                    (start..stop)
                        .step_by(step as usize)
                        .map(|c| c as usize)
                        .collect(),
                )
            }
        }
        IndexKey::Ellipsis => unreachable!("ellipsis expanded above"),
    };

    Ok((samples, channels))
}

/// The indexable-array capability.
///
/// The seam between the core read machinery and whatever dataset model or
/// deferred-computation engine consumes it: consumers depend on this trait,
/// not on the concrete adapter.
pub trait BackendArray: Send + Sync {
    /// `(frame_count, channel_count)`, fixed at construction.
    fn shape(&self) -> (usize, usize);

    /// Declared element type.
    fn dtype(&self) -> SampleDtype;

    /// Read one block: the core two-selector routine.
    ///
    /// The result is always shaped `(frames_selected, channels_selected)`.
    fn read_block(&self, samples: &SampleRange, channels: &ChannelSelect) -> Result<Array2<f64>>;

    /// Normalize an arbitrary basic-indexing request and read it.
    fn index(&self, key: &[IndexKey]) -> Result<Array2<f64>> {
        let (samples, channels) = normalize_index(key, self.shape())?;
        self.read_block(&samples, &channels)
    }
}

/// Lazy `(time, channel)` array over a managed audio file.
pub struct SignalArrayAdapter {
    manager: FileManager,
    lock: SignalLock,
    dtype: SampleDtype,
    shape: (usize, usize),
    sample_rate: u32,
}

impl SignalArrayAdapter {
    /// Build an adapter over a manager and shared read lock.
    ///
    /// Opens the file once (through the manager) solely to read the frame
    /// and channel counts; the shape is cached for the adapter's lifetime
    /// and never re-queried. Files are assumed not to change size while
    /// open for this session.
    pub fn new(manager: FileManager, lock: SignalLock, dtype: SampleDtype) -> Result<Self> {
        let spec = manager.with_descriptor(true, |descriptor| Ok(descriptor.spec().clone()))?;

        debug!(
            path = %manager.path().display(),
            frames = spec.frames,
            channels = spec.channels,
            "adapter constructed"
        );

        Ok(Self {
            manager,
            lock,
            dtype,
            shape: (spec.frames as usize, spec.channels),
            sample_rate: spec.sample_rate,
        })
    }

    /// Sample rate of the underlying file, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The manager this adapter reads through.
    pub fn manager(&self) -> &FileManager {
        &self.manager
    }

    /// The shared read lock.
    pub fn lock(&self) -> &SignalLock {
        &self.lock
    }
}

impl BackendArray for SignalArrayAdapter {
    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn dtype(&self) -> SampleDtype {
        self.dtype
    }

    fn read_block(&self, samples: &SampleRange, channels: &ChannelSelect) -> Result<Array2<f64>> {
        let (frames, file_channels) = self.shape;
        let (start, stop, step) = samples.normalize(frames as u64)?;
        let columns = channels.resolve(file_channels)?;

        if start == stop {
            return Ok(Array2::zeros((0, columns.len())));
        }

        let _read = self.lock.lock();
        let mut descriptor = self.manager.acquire(false)?;

        let data = if descriptor.seekable() && step == 1 {
            let landed = descriptor.seek(start)?;
            let actual = descriptor.position();
            if landed != start || actual != start {
                // Someone moved the position despite the lock.
                return Err(SignalError::PositionDrift {
                    expected: start,
                    actual,
                });
            }

            let want = (stop - start) as usize;
            let buffer = read_exact(&mut *descriptor, want, file_channels)?;
            into_array(buffer, want, file_channels)?
        } else {
            // Whole-stream fallback. A non-seekable stream can only be
            // rewound by closing and transparently reopening it.
            if descriptor.seekable() {
                descriptor.seek(0)?;
            } else if descriptor.position() != 0 {
                drop(descriptor);
                self.manager.close();
                descriptor = self.manager.acquire(false)?;
            }

            let buffer = read_exact(&mut *descriptor, frames, file_channels)?;
            let full = into_array(buffer, frames, file_channels)?;
            full.slice(s![start as isize..stop as isize;step as isize, ..])
                .to_owned()
        };

        let mut data = if is_identity(&columns, file_channels) {
            data
        } else {
            data.select(Axis(1), &columns)
        };

        if self.dtype == SampleDtype::F32 {
            data.mapv_inplace(|v| v as f32 as f64);
        }
        Ok(data)
    }
}

/// Read exactly `want` frames, failing if the stream ends short.
fn read_exact(
    descriptor: &mut dyn AudioDescriptor,
    want: usize,
    channels: usize,
) -> Result<Vec<f64>> {
    let mut buffer = Vec::with_capacity(want * channels);
    let mut remaining = want;
    while remaining > 0 {
        let got = descriptor.read(remaining, &mut buffer)?;
        if got == 0 {
            return Err(SignalError::Decode(format!(
                "stream ended {remaining} frames short of the requested range"
            )));
        }
        remaining -= got;
    }
    Ok(buffer)
}

fn into_array(buffer: Vec<f64>, frames: usize, channels: usize) -> Result<Array2<f64>> {
    Array2::from_shape_vec((frames, channels), buffer)
        .map_err(|e| SignalError::Internal(e.to_string()))
}

fn is_identity(columns: &[usize], channels: usize) -> bool {
    columns.len() == channels && columns.iter().enumerate().all(|(i, &c)| i == c)
}

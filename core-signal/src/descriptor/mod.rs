//! # Audio Descriptor Module
//!
//! The seek/read surface over a decoded audio stream.
//!
//! ## Overview
//!
//! An [`AudioDescriptor`] exposes an audio file as a flat sequence of
//! interleaved sample frames with an explicit position, a `seek`, and a
//! `read` — the minimal surface the lazy array adapter maps range requests
//! onto. [`SymphoniaDescriptor`] is the production implementation backed by
//! the Symphonia demuxer/decoder stack.
//!
//! ## Architecture
//!
//! ```text
//! OpenParams → MediaSourceStream → FormatReader → Decoder → interleaved f64
//! ```
//!
//! Decoding itself stays inside Symphonia; this module only adapts packet
//! decoding to exact-frame positioning. The frame count, channel count and
//! sample rate are probed once at open time and never re-queried.

mod convert;
mod symphonia;

pub use self::symphonia::SymphoniaDescriptor;

use crate::error::Result;
use crate::manager::OpenParams;

/// Stream metadata fixed at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSpec {
    /// Total number of sample frames in the stream.
    pub frames: u64,
    /// Number of audio channels (1 = mono, 2 = stereo, ...).
    pub channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// A live, open handle on an audio stream.
///
/// Positions and counts are in frames (one frame = one sample per channel).
/// `read` hands out interleaved `f64` samples and advances the position;
/// `seek` repositions exactly on the requested frame or fails.
///
/// Implementations are `Send` so descriptors can live inside a shared cell
/// accessed from multiple worker threads; serialization of access is the
/// caller's job (see the manager and the shared read lock).
pub trait AudioDescriptor: Send {
    /// Metadata probed at open time.
    fn spec(&self) -> &DescriptorSpec;

    /// Whether the underlying source supports random access.
    fn seekable(&self) -> bool;

    /// The frame index the next `read` will return samples from.
    fn position(&self) -> u64;

    /// Position the stream exactly on `frame`. Returns the landed position,
    /// which equals `frame` on success.
    ///
    /// # Errors
    ///
    /// [`SignalError::SeekNotSupported`](crate::SignalError::SeekNotSupported)
    /// for non-seekable sources,
    /// [`SignalError::SeekOutOfBounds`](crate::SignalError::SeekOutOfBounds)
    /// past the end of the stream, or a decode error if refinement fails.
    fn seek(&mut self, frame: u64) -> Result<u64>;

    /// Decode up to `max_frames` frames from the current position, appending
    /// interleaved samples to `out`. Returns the number of frames appended;
    /// `0` means end of stream.
    fn read(&mut self, max_frames: usize, out: &mut Vec<f64>) -> Result<usize>;
}

/// Open a descriptor for the given parameters.
pub(crate) fn open(params: &OpenParams) -> Result<Box<dyn AudioDescriptor>> {
    Ok(Box::new(SymphoniaDescriptor::open(params)?))
}

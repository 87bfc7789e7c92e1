//! # Core Signal
//!
//! Lazily-indexed array access over audio files.
//!
//! ## Overview
//!
//! This crate is the engineering core of the sound-file-as-array bridge:
//!
//! - [`FileManager`]: owns and lazily (re)opens an audio descriptor,
//!   shareable across concurrent readers and serializable across process
//!   boundaries by storing open parameters rather than the live handle.
//! - [`SignalArrayAdapter`]: the indexable-array capability over a
//!   not-yet-materialized file, translating range requests into seek/read
//!   calls under a shared lock.
//! - [`AudioDescriptor`]: the frame-addressed seek/read seam over the Symphonia
//!   decoder stack.
//!
//! Dataset assembly (labeled dimensions, coordinates, multi-file
//! concatenation) lives in `core-dataset`; this crate knows nothing about
//! it and is reusable by any consumer of the [`BackendArray`] trait.
//!
//! ## Concurrency
//!
//! Everything is synchronous and blocking. Reads against one descriptor
//! are serialized by the [`SignalLock`] shared by all adapters over the
//! same manager; reads against different files proceed independently.

pub mod adapter;
pub mod descriptor;
pub mod error;
pub mod manager;

pub use adapter::{
    normalize_index, BackendArray, ChannelSelect, IndexKey, SampleDtype, SampleRange,
    SignalArrayAdapter,
};
pub use descriptor::{AudioDescriptor, DescriptorSpec, SymphoniaDescriptor};
pub use error::{Result, SignalError};
pub use manager::{default_lock, DescriptorGuard, FileManager, OpenMode, OpenParams, SignalLock};

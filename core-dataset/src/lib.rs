//! # Core Dataset
//!
//! Labeled datasets over lazily-read audio files.
//!
//! ## Overview
//!
//! This crate is the thin glue over `core-signal`: it assembles managers,
//! locks and adapters into stores with named dimensions, coordinates and
//! attributes, and concatenates multiple files along a synthetic
//! `filename` dimension.
//!
//! - Dimensions are `("time", "channel")`, plus a leading `"filename"`
//!   for multi-file opens.
//! - The single data variable is `"signal"`; the `fs` attribute records
//!   the sample rate.
//! - Nothing is decoded until a block is materialized; the optional chunk
//!   spec controls block-wise loading.
//!
//! ## Example
//!
//! ```rust,no_run
//! use core_dataset::{open_files, ChunkSpec, OpenOptions};
//!
//! let options = OpenOptions::new().with_chunks(ChunkSpec::per_axis(10_000, 2));
//! let dataset = open_files(["a.wav", "b.wav"], &options)?;
//!
//! assert_eq!(dataset.dims(), vec!["filename", "time", "channel"]);
//! let samples = dataset.compute()?;
//! println!("loaded {:?} at {} Hz", samples.shape(), dataset.sample_rate());
//! # Ok::<(), core_dataset::DatasetError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod store;

pub use config::{ChunkSpec, OpenOptions};
pub use core_signal::{BackendArray, OpenMode, SampleDtype, SignalLock};
pub use dataset::{open, open_files, Dataset};
pub use error::{DatasetError, Result};
pub use store::{
    DataStore, SignalStore, Variable, ATTR_SAMPLE_RATE, DIM_CHANNEL, DIM_FILENAME, DIM_TIME,
    VAR_SIGNAL,
};

//! # Signal Store
//!
//! Assembles a manager, a shared lock and an adapter into the variable,
//! attribute and coordinate structure a labeled dataset expects.

use crate::config::OpenOptions;
use crate::error::Result;
use core_signal::{
    default_lock, BackendArray, FileManager, OpenParams, SignalArrayAdapter, SignalLock,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Frame-index dimension.
pub const DIM_TIME: &str = "time";
/// Channel-index dimension.
pub const DIM_CHANNEL: &str = "channel";
/// Synthetic per-file dimension added by multi-file opens.
pub const DIM_FILENAME: &str = "filename";

/// The sole data variable.
pub const VAR_SIGNAL: &str = "signal";
/// Sample-rate attribute key.
pub const ATTR_SAMPLE_RATE: &str = "fs";

/// A named, dimensioned, lazily-readable array.
#[derive(Clone)]
pub struct Variable {
    /// Dimension names, in axis order.
    pub dims: &'static [&'static str],
    /// The backing array; nothing is read until it is sliced.
    pub array: Arc<dyn BackendArray>,
}

/// The abstract-datastore capability: what a labeled dataset model needs
/// from a backend, independent of this crate's [`Dataset`](crate::Dataset).
pub trait DataStore {
    /// Dimension names of the data variables.
    fn dims(&self) -> &'static [&'static str];

    /// All data variables, by name.
    fn variables(&self) -> Vec<(&'static str, Variable)>;

    /// Numeric attributes, by name.
    fn attrs(&self) -> HashMap<&'static str, f64>;

    /// Index coordinates, by dimension name.
    fn coords(&self) -> HashMap<&'static str, Vec<usize>>;
}

/// Datastore over one audio file: dimensions `("time", "channel")`, one
/// `"signal"` variable, and the sample rate as the `fs` attribute.
///
/// Assembly reads nothing; the variable wraps the adapter behind its lazy
/// capability and the first decode happens on the first slice. Failures
/// from the manager or adapter propagate unchanged.
pub struct SignalStore {
    manager: FileManager,
    lock: SignalLock,
    adapter: Arc<SignalArrayAdapter>,
}

impl SignalStore {
    /// Open a store with its own fresh lock (unless one is supplied).
    pub fn open(path: impl Into<PathBuf>, options: &OpenOptions) -> Result<Self> {
        let lock = options.lock.clone().unwrap_or_else(default_lock);
        Self::open_shared(path.into(), lock, options)
    }

    /// Open a store sharing an existing read lock — used by multi-file
    /// assembly so that every store of one dataset follows one lock
    /// discipline.
    pub(crate) fn open_shared(
        path: PathBuf,
        lock: SignalLock,
        options: &OpenOptions,
    ) -> Result<Self> {
        debug!(path = %path.display(), mode = ?options.mode, "opening store");
        let manager = FileManager::with_params(OpenParams {
            path,
            mode: options.mode,
        });
        let adapter = Arc::new(SignalArrayAdapter::new(
            manager.clone(),
            lock.clone(),
            options.dtype,
        )?);
        Ok(Self {
            manager,
            lock,
            adapter,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.manager.path()
    }

    /// The lazy signal adapter.
    pub fn adapter(&self) -> &Arc<SignalArrayAdapter> {
        &self.adapter
    }

    /// `(frame_count, channel_count)`.
    pub fn shape(&self) -> (usize, usize) {
        self.adapter.shape()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.adapter.sample_rate()
    }

    /// The shared read lock.
    pub fn lock(&self) -> &SignalLock {
        &self.lock
    }

    /// Close the underlying descriptor; later reads reopen transparently.
    pub fn close(&self) {
        self.manager.close();
    }
}

impl DataStore for SignalStore {
    fn dims(&self) -> &'static [&'static str] {
        &[DIM_TIME, DIM_CHANNEL]
    }

    fn variables(&self) -> Vec<(&'static str, Variable)> {
        vec![(
            VAR_SIGNAL,
            Variable {
                dims: &[DIM_TIME, DIM_CHANNEL],
                array: self.adapter.clone() as Arc<dyn BackendArray>,
            },
        )]
    }

    fn attrs(&self) -> HashMap<&'static str, f64> {
        let mut attrs = HashMap::new();
        attrs.insert(ATTR_SAMPLE_RATE, f64::from(self.sample_rate()));
        attrs
    }

    fn coords(&self) -> HashMap<&'static str, Vec<usize>> {
        let mut coords = HashMap::new();
        coords.insert(DIM_CHANNEL, (0..self.shape().1).collect());
        coords
    }
}

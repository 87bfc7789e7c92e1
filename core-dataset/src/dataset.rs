//! # Dataset Assembly
//!
//! Opens one or many files and stitches per-file identity into a combined
//! dataset along a synthetic `filename` dimension.

use crate::config::OpenOptions;
use crate::error::{DatasetError, Result};
use crate::store::{SignalStore, DIM_CHANNEL, DIM_FILENAME, DIM_TIME};
use core_signal::{default_lock, BackendArray, ChannelSelect, SampleRange};
use ndarray::{s, Array2, ArrayD, Axis};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// One or more audio files exposed as a labeled, lazily-read dataset.
///
/// Single-file datasets have dimensions `(time, channel)`; multi-file
/// datasets gain a leading `filename` dimension whose coordinate records
/// each source path. No data is read until [`compute`](Self::compute) or
/// [`isel_filename`](Self::isel_filename) materializes a block.
pub struct Dataset {
    stores: Vec<SignalStore>,
    filenames: Option<Vec<PathBuf>>,
    options: OpenOptions,
}

/// Open a single audio file as a `(time, channel)` dataset.
pub fn open(path: impl Into<PathBuf>, options: &OpenOptions) -> Result<Dataset> {
    let path = path.into();
    info!(path = %path.display(), "opening dataset");

    let lock = options.lock.clone().unwrap_or_else(default_lock);
    let store = SignalStore::open_shared(path, lock, options)?;
    Ok(Dataset {
        stores: vec![store],
        filenames: None,
        options: options.clone(),
    })
}

/// Open several audio files and concatenate them along a new `filename`
/// dimension.
///
/// All stores of the resulting dataset share one read lock. No cross-file
/// validation happens while the stores are assembled; incompatible files
/// surface from the concatenation step as
/// [`DatasetError::MergeMismatch`].
pub fn open_files<I, P>(paths: I, options: &OpenOptions) -> Result<Dataset>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
    if paths.is_empty() {
        return Err(DatasetError::NoFiles);
    }
    info!(files = paths.len(), "opening multi-file dataset");

    let lock = options.lock.clone().unwrap_or_else(default_lock);
    let stores = paths
        .iter()
        .map(|path| SignalStore::open_shared(path.clone(), lock.clone(), options))
        .collect::<Result<Vec<_>>>()?;

    // Concatenation along `filename` requires congruent per-file slices.
    let first = &stores[0];
    for store in &stores[1..] {
        if store.shape() != first.shape() || store.sample_rate() != first.sample_rate() {
            return Err(DatasetError::MergeMismatch(format!(
                "{} has shape {:?} at {} Hz, but {} has shape {:?} at {} Hz",
                store.path().display(),
                store.shape(),
                store.sample_rate(),
                first.path().display(),
                first.shape(),
                first.sample_rate(),
            )));
        }
    }

    Ok(Dataset {
        stores,
        filenames: Some(paths),
        options: options.clone(),
    })
}

impl Dataset {
    /// Dimension names, in axis order.
    pub fn dims(&self) -> Vec<&'static str> {
        if self.filenames.is_some() {
            vec![DIM_FILENAME, DIM_TIME, DIM_CHANNEL]
        } else {
            vec![DIM_TIME, DIM_CHANNEL]
        }
    }

    /// Shape along [`dims`](Self::dims).
    pub fn shape(&self) -> Vec<usize> {
        let (frames, channels) = self.stores[0].shape();
        match &self.filenames {
            Some(paths) => vec![paths.len(), frames, channels],
            None => vec![frames, channels],
        }
    }

    /// Number of files in the dataset.
    pub fn n_files(&self) -> usize {
        self.stores.len()
    }

    /// The per-file stores, in filename order.
    pub fn stores(&self) -> &[SignalStore] {
        &self.stores
    }

    /// The lazy `signal` arrays, one per file in filename order. Nothing
    /// is read until a block is requested through them.
    pub fn signal(&self) -> Vec<Arc<dyn BackendArray>> {
        self.stores
            .iter()
            .map(|store| store.adapter().clone() as Arc<dyn BackendArray>)
            .collect()
    }

    /// The `filename` coordinate, present for multi-file datasets.
    pub fn filename_coord(&self) -> Option<&[PathBuf]> {
        self.filenames.as_deref()
    }

    /// The `channel` index coordinate.
    pub fn channel_coord(&self) -> Vec<usize> {
        (0..self.stores[0].shape().1).collect()
    }

    /// Numeric attributes; `fs` records the sample rate.
    pub fn attrs(&self) -> HashMap<&'static str, f64> {
        let mut attrs = HashMap::new();
        attrs.insert(
            crate::store::ATTR_SAMPLE_RATE,
            f64::from(self.stores[0].sample_rate()),
        );
        attrs
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.stores[0].sample_rate()
    }

    /// Materialize the whole dataset.
    ///
    /// Returns a `(time, channel)` array for single-file datasets and a
    /// `(filename, time, channel)` array for multi-file ones. With a chunk
    /// spec, each file is read block by block; every block is one locked
    /// adapter read.
    pub fn compute(&self) -> Result<ArrayD<f64>> {
        if self.filenames.is_none() {
            return Ok(self.materialize(&self.stores[0])?.into_dyn());
        }

        let slices = self
            .stores
            .iter()
            .map(|store| self.materialize(store))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = slices.iter().map(Array2::view).collect();
        let stacked = ndarray::stack(Axis(0), &views)
            .map_err(|e| DatasetError::MergeMismatch(e.to_string()))?;
        Ok(stacked.into_dyn())
    }

    /// Materialize a single file of the dataset.
    pub fn isel_filename(&self, index: usize) -> Result<Array2<f64>> {
        let store = self
            .stores
            .get(index)
            .ok_or(DatasetError::FileIndexOutOfBounds {
                index,
                files: self.stores.len(),
            })?;
        self.materialize(store)
    }

    /// Close every underlying descriptor. Idempotent; later reads reopen.
    pub fn close(&self) {
        for store in &self.stores {
            store.close();
        }
    }

    fn materialize(&self, store: &SignalStore) -> Result<Array2<f64>> {
        let adapter = store.adapter();
        let Some(chunks) = &self.options.chunks else {
            return Ok(adapter.read_block(&SampleRange::all(), &ChannelSelect::All)?);
        };

        let (frames, channels) = store.shape();
        let (time_block, channel_block) = chunks.resolve((frames, channels))?;
        debug!(
            path = %store.path().display(),
            time_block,
            channel_block,
            "materializing in blocks"
        );

        let mut out = Array2::zeros((frames, channels));
        let mut time = 0;
        while time < frames {
            let time_stop = (time + time_block).min(frames);
            let mut channel = 0;
            while channel < channels {
                let channel_stop = (channel + channel_block).min(channels);
                let block = adapter.read_block(
                    &SampleRange::new(time as u64, time_stop as u64),
                    &ChannelSelect::Range {
                        start: channel,
                        stop: channel_stop,
                    },
                )?;
                out.slice_mut(s![
                    time as isize..time_stop as isize,
                    channel as isize..channel_stop as isize
                ])
                .assign(&block);
                channel = channel_stop;
            }
            time = time_stop;
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("dims", &self.dims())
            .field("shape", &self.shape())
            .field(
                "files",
                &self
                    .stores
                    .iter()
                    .map(SignalStore::path)
                    .map(Path::display)
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

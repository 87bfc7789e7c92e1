//! # File Handle Manager
//!
//! Lifecycle management for audio descriptors.
//!
//! ## Overview
//!
//! A [`FileManager`] is identified by its [`OpenParams`] and owns at most
//! one live descriptor at a time. The descriptor is opened lazily on the
//! first [`acquire`](FileManager::acquire), closed explicitly with
//! [`close`](FileManager::close), and reopened transparently on the next
//! acquire. Managers serialize as their open parameters only — never the
//! live handle — so a manager reconstructed in another worker process opens
//! its own descriptor independently.
//!
//! ## Descriptor sharing
//!
//! Managers constructed with equal parameters coalesce onto one shared,
//! reference-counted descriptor cell through a process-wide registry. This
//! is an optimization, not a correctness requirement: every manager works
//! standalone, and the shared cell is itself a mutex, so coalescing adds no
//! unsynchronized sharing.
//!
//! ## The shared read lock
//!
//! The descriptor's seek position is global mutable state. All adapters
//! reading through one manager serialize their seek+read sequences behind a
//! [`SignalLock`], created once at dataset-open time (see
//! [`default_lock`]) and threaded through explicitly rather than imported
//! as ambient global state.

use crate::descriptor::{self, AudioDescriptor};
use crate::error::Result;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Shared mutual-exclusion object guarding sequential-read state.
///
/// One lock per store; all adapters reading the same manager must share it.
pub type SignalLock = Arc<Mutex<()>>;

/// Create a fresh read lock. The documented default for dataset assembly.
pub fn default_lock() -> SignalLock {
    Arc::new(Mutex::new(()))
}

/// How the underlying file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Random-access read; the fast seek path is available.
    #[default]
    Read,
    /// Sequential read without random access. Every windowed read falls
    /// back to reading the whole stream.
    Stream,
}

/// Open parameters — the identity of a manager.
///
/// Two managers with equal parameters may share one cached descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenParams {
    /// Path to the audio file.
    pub path: PathBuf,
    /// Open mode.
    #[serde(default)]
    pub mode: OpenMode,
}

/// Cell state: the descriptor, if one is currently open.
struct CellState {
    descriptor: Option<Box<dyn AudioDescriptor>>,
}

pub(crate) type DescriptorCell = Mutex<CellState>;

/// Process-wide registry coalescing equal-parameter managers onto one cell.
/// Weak entries; cells die with their last manager.
static REGISTRY: Lazy<Mutex<HashMap<OpenParams, Weak<DescriptorCell>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Lazily (re)opening, shareable, serializable owner of an audio descriptor.
///
/// # Example
///
/// ```rust,no_run
/// use core_signal::FileManager;
///
/// let manager = FileManager::new("recording.wav");
/// let frames = manager.with_descriptor(true, |d| Ok(d.spec().frames))?;
/// manager.close();
/// # Ok::<(), core_signal::SignalError>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct FileManager {
    params: OpenParams,

    /// The shared descriptor cell. Never serialized: a deserialized manager
    /// re-resolves its cell and reopens on first acquire.
    #[serde(skip)]
    cell: OnceCell<Arc<DescriptorCell>>,
}

impl FileManager {
    /// Create a manager for `path` in [`OpenMode::Read`]. No I/O happens
    /// until the first acquire.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_params(OpenParams {
            path: path.into(),
            mode: OpenMode::Read,
        })
    }

    /// Create a manager from explicit open parameters.
    pub fn with_params(params: OpenParams) -> Self {
        Self {
            params,
            cell: OnceCell::new(),
        }
    }

    /// The manager's open parameters.
    pub fn params(&self) -> &OpenParams {
        &self.params
    }

    /// Path of the managed file.
    pub fn path(&self) -> &Path {
        &self.params.path
    }

    /// Resolve the shared descriptor cell, consulting the registry so that
    /// equal-parameter managers share one live descriptor.
    fn cell(&self) -> &Arc<DescriptorCell> {
        self.cell.get_or_init(|| {
            let mut registry = REGISTRY.lock();
            if let Some(cell) = registry.get(&self.params).and_then(Weak::upgrade) {
                return cell;
            }
            registry.retain(|_, weak| weak.strong_count() > 0);
            let cell = Arc::new(Mutex::new(CellState { descriptor: None }));
            registry.insert(self.params.clone(), Arc::downgrade(&cell));
            cell
        })
    }

    /// Return a live, open descriptor, opening one if necessary.
    ///
    /// The returned guard keeps the cell locked for its lifetime, so the
    /// open/reopen critical section can never race. `needs_lock = false`
    /// documents that the caller already holds the shared read lock; cell
    /// access is serialized either way.
    ///
    /// # Errors
    ///
    /// Propagates open failures — in particular a file deleted or moved
    /// since the last open surfaces here as
    /// [`SignalError::Open`](crate::SignalError::Open).
    pub fn acquire(&self, needs_lock: bool) -> Result<DescriptorGuard<'_>> {
        let mut state = self.cell().lock();
        if state.descriptor.is_none() {
            debug!(
                path = %self.params.path.display(),
                needs_lock,
                "opening descriptor"
            );
            state.descriptor = Some(descriptor::open(&self.params)?);
        }
        Ok(DescriptorGuard(MutexGuard::map(state, |state| {
            state
                .descriptor
                .as_mut()
                .expect("descriptor opened while holding the cell lock")
        })))
    }

    /// Scoped form of [`acquire`](Self::acquire): run `f` with the
    /// descriptor, releasing the cell when `f` returns. The underlying
    /// resource stays alive across scopes and is reused by the next call.
    pub fn with_descriptor<R>(
        &self,
        needs_lock: bool,
        f: impl FnOnce(&mut dyn AudioDescriptor) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.acquire(needs_lock)?;
        f(&mut *guard)
    }

    /// Close the underlying descriptor if open. Idempotent; the next
    /// acquire reopens it.
    pub fn close(&self) {
        if let Some(cell) = self.cell.get() {
            let mut state = cell.lock();
            if state.descriptor.take().is_some() {
                debug!(path = %self.params.path.display(), "descriptor closed");
            }
        }
    }
}

/// Equality and hashing follow the open parameters, so managers can key
/// caches and coalesce onto shared descriptors.
impl PartialEq for FileManager {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl Eq for FileManager {}

impl std::hash::Hash for FileManager {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.params.hash(state);
    }
}

impl fmt::Debug for FileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileManager")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// RAII guard over an acquired descriptor.
///
/// Holds the descriptor cell locked; drop it before calling back into the
/// owning manager (e.g. [`FileManager::close`]).
pub struct DescriptorGuard<'a>(MappedMutexGuard<'a, Box<dyn AudioDescriptor>>);

impl Deref for DescriptorGuard<'_> {
    type Target = dyn AudioDescriptor;

    fn deref(&self) -> &Self::Target {
        &**self.0
    }
}

impl DerefMut for DescriptorGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut **self.0
    }
}

//! Manager lifecycle, sharing and serialization tests.

use core_signal::{
    default_lock, BackendArray, ChannelSelect, FileManager, SampleDtype, SampleRange,
    SignalArrayAdapter,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write_ramp_wav(path: &Path, frames: usize, channels: u16) {
    let spec = WavSpec {
        channels,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for frame in 0..frames {
        for channel in 0..channels as usize {
            let value = (((frame * channels as usize + channel) % 20000) as i64 - 10000) as i16;
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn fixture(dir: &TempDir, name: &str, frames: usize, channels: u16) -> PathBuf {
    let path = dir.path().join(name);
    write_ramp_wav(&path, frames, channels);
    path
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn acquire_is_lazy_and_probes_metadata() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "a.wav", 640, 2);

    let manager = FileManager::new(&path);
    let spec = manager
        .with_descriptor(true, |d| Ok(d.spec().clone()))
        .unwrap();
    assert_eq!(spec.frames, 640);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 8000);
}

#[test]
fn close_and_reacquire_is_transparent() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "b.wav", 400, 2);

    let manager = FileManager::new(&path);
    let adapter =
        SignalArrayAdapter::new(manager.clone(), default_lock(), SampleDtype::F64).unwrap();

    let range = SampleRange::new(50, 150);
    let before = adapter.read_block(&range, &ChannelSelect::All).unwrap();

    manager.close();
    manager.close(); // idempotent

    let after = adapter.read_block(&range, &ChannelSelect::All).unwrap();
    assert_eq!(before, after);
}

#[test]
fn reacquire_after_file_deletion_fails_on_open() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "doomed.wav", 100, 1);

    let manager = FileManager::new(&path);
    manager.with_descriptor(true, |_| Ok(())).unwrap();
    manager.close();

    std::fs::remove_file(&path).unwrap();

    let err = manager.acquire(true).map(|_| ()).unwrap_err();
    assert!(err.is_open_error());
}

// ============================================================================
// Descriptor coalescing
// ============================================================================

#[test]
fn equal_params_share_one_descriptor() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "shared.wav", 300, 2);

    let first = FileManager::new(&path);
    let second = FileManager::new(&path);
    assert_eq!(first, second);

    let mut scratch = Vec::new();
    first
        .with_descriptor(true, |d| d.read(10, &mut scratch).map(|_| ()))
        .unwrap();

    // The second manager sees the position advanced through the first:
    // both resolve to the same cached descriptor.
    let position = second.with_descriptor(true, |d| Ok(d.position())).unwrap();
    assert_eq!(position, 10);
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn manager_round_trips_through_serialization() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "pickled.wav", 500, 2);

    let manager = FileManager::new(&path);
    let adapter =
        SignalArrayAdapter::new(manager.clone(), default_lock(), SampleDtype::F64).unwrap();
    let range = SampleRange::new(0, 500);
    let original = adapter.read_block(&range, &ChannelSelect::All).unwrap();

    let json = serde_json::to_string(&manager).unwrap();
    let restored: FileManager = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, manager);

    let restored_adapter =
        SignalArrayAdapter::new(restored, default_lock(), SampleDtype::F64).unwrap();
    let reread = restored_adapter
        .read_block(&range, &ChannelSelect::All)
        .unwrap();
    assert_eq!(original, reread);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Concurrent non-overlapping window reads must each return exactly their
/// own window — a hybrid of two ranges would mean the seek/read pair was
/// not atomic under the shared lock.
#[test]
fn concurrent_window_reads_never_interleave() {
    let dir = TempDir::new().unwrap();
    let frames = 4096;
    let path = fixture(&dir, "stress.wav", frames, 2);

    let manager = FileManager::new(&path);
    let adapter = Arc::new(
        SignalArrayAdapter::new(manager, default_lock(), SampleDtype::F64).unwrap(),
    );

    let reference = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::All)
        .unwrap();

    let workers = 8;
    let window = frames / workers;

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let adapter = Arc::clone(&adapter);
            let reference = &reference;
            scope.spawn(move || {
                let start = (worker * window) as u64;
                let stop = start + window as u64;
                for _ in 0..16 {
                    let block = adapter
                        .read_block(&SampleRange::new(start, stop), &ChannelSelect::All)
                        .unwrap();
                    let expected = reference
                        .slice(ndarray::s![start as isize..stop as isize, ..])
                        .to_owned();
                    assert_eq!(block, expected, "worker {worker} window corrupted");
                }
            });
        }
    });
}

//! Adapter read-path tests over real WAV fixtures.
//!
//! Verifies the two read algorithms against each other: the seekable
//! step-1 fast path and the whole-stream fallback (forced either by a
//! stepped range or by a non-seekable stream-mode open).

use core_signal::{
    default_lock, BackendArray, ChannelSelect, FileManager, IndexKey, OpenMode, OpenParams,
    SampleDtype, SampleRange, SignalArrayAdapter,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::s;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Write a 16-bit WAV whose sample values form a deterministic ramp, so
/// every (frame, channel) position is distinguishable.
fn write_ramp_wav(path: &Path, frames: usize, channels: u16, sample_rate: u32) {
    let spec = WavSpec {
        channels,
        sample_rate,
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

fn ramp_fixture(dir: &TempDir, frames: usize, channels: u16) -> PathBuf {
    let path = dir.path().join("ramp.wav");
    write_ramp_wav(&path, frames, channels, 8000);
    path
}

fn adapter_for(path: &Path, mode: OpenMode, dtype: SampleDtype) -> SignalArrayAdapter {
    let manager = FileManager::with_params(OpenParams {
        path: path.to_path_buf(),
        mode,
    });
    SignalArrayAdapter::new(manager, default_lock(), dtype).unwrap()
}

// ============================================================================
// Shape and metadata
// ============================================================================

#[test]
fn reported_shape_matches_the_file() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 1234, 3);

    for dtype in [SampleDtype::F64, SampleDtype::F32] {
        let adapter = adapter_for(&path, OpenMode::Read, dtype);
        assert_eq!(adapter.shape(), (1234, 3));
        assert_eq!(adapter.dtype(), dtype);
        assert_eq!(adapter.sample_rate(), 8000);
    }
}

#[test]
fn stream_mode_reports_the_same_shape() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 500, 2);

    let adapter = adapter_for(&path, OpenMode::Stream, SampleDtype::F64);
    assert_eq!(adapter.shape(), (500, 2));
}

// ============================================================================
// Fast path vs fallback equivalence
// ============================================================================

#[test]
fn window_reads_match_the_full_read() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 2000, 2);
    let adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F64);

    let full = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::All)
        .unwrap();
    assert_eq!(full.dim(), (2000, 2));

    for (start, stop) in [(0, 100), (137, 1024), (1999, 2000), (500, 500)] {
        let window = adapter
            .read_block(&SampleRange::new(start, stop), &ChannelSelect::All)
            .unwrap();
        assert_eq!(
            window,
            full.slice(s![start as isize..stop as isize, ..]).to_owned(),
            "window {start}..{stop}"
        );
    }
}

#[test]
fn stream_fallback_matches_the_seekable_fast_path() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 1500, 2);

    let seekable = adapter_for(&path, OpenMode::Read, SampleDtype::F64);
    let stream = adapter_for(&path, OpenMode::Stream, SampleDtype::F64);

    for (start, stop) in [(0, 1500), (10, 20), (700, 1500)] {
        let range = SampleRange::new(start, stop);
        let fast = seekable.read_block(&range, &ChannelSelect::All).unwrap();
        let fallback = stream.read_block(&range, &ChannelSelect::All).unwrap();
        assert_eq!(fast, fallback, "window {start}..{stop}");
    }
}

#[test]
fn stepped_ranges_match_sliced_full_reads() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 999, 2);
    let adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F64);

    let full = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::All)
        .unwrap();

    for step in [2u64, 3, 7] {
        let stepped = adapter
            .read_block(
                &SampleRange::new(5, 900).with_step(step),
                &ChannelSelect::All,
            )
            .unwrap();
        assert_eq!(
            stepped,
            full.slice(s![5..900;step as isize, ..]).to_owned(),
            "step {step}"
        );
    }
}

#[test]
fn repeated_stream_reads_rewind_through_reopen() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 800, 2);
    let adapter = adapter_for(&path, OpenMode::Stream, SampleDtype::F64);

    let range = SampleRange::new(100, 200);
    let first = adapter.read_block(&range, &ChannelSelect::All).unwrap();
    // The stream is past frame 200 now; a second windowed read must still
    // return the same data.
    let second = adapter.read_block(&range, &ChannelSelect::All).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Channel selection
// ============================================================================

#[test]
fn channel_subsets_select_columns() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 300, 4);
    let adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F64);

    let full = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::All)
        .unwrap();

    let single = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::List(vec![2]))
        .unwrap();
    assert_eq!(single.dim(), (300, 1));
    assert_eq!(single.column(0), full.column(2));

    let reversed = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::List(vec![3, 0]))
        .unwrap();
    assert_eq!(reversed.column(0), full.column(3));
    assert_eq!(reversed.column(1), full.column(0));

    let range = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::Range { start: 1, stop: 3 })
        .unwrap();
    assert_eq!(range.dim(), (300, 2));
    assert_eq!(range.column(0), full.column(1));
}

// ============================================================================
// Indexing layer
// ============================================================================

#[test]
fn basic_indexing_normalizes_to_block_reads() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 400, 2);
    let adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F64);

    let full = adapter.index(&[IndexKey::Ellipsis]).unwrap();
    assert_eq!(full.dim(), (400, 2));

    let row = adapter
        .index(&[IndexKey::Index(42), IndexKey::Ellipsis])
        .unwrap();
    assert_eq!(row.dim(), (1, 2));
    assert_eq!(row.row(0), full.row(42));

    let err = adapter
        .index(&[IndexKey::Index(0), IndexKey::Index(0), IndexKey::Index(0)])
        .unwrap_err();
    assert!(err.is_usage_error());
}

#[test]
fn out_of_bounds_ranges_are_usage_errors() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 100, 2);
    let adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F64);

    let err = adapter
        .read_block(&SampleRange::new(0, 101), &ChannelSelect::All)
        .unwrap_err();
    assert!(err.is_usage_error());

    let err = adapter
        .read_block(&SampleRange::all(), &ChannelSelect::List(vec![2]))
        .unwrap_err();
    assert!(err.is_usage_error());
}

// ============================================================================
// Dtype
// ============================================================================

#[test]
fn declared_dtype_only_narrows_precision() {
    let dir = TempDir::new().unwrap();
    let path = ramp_fixture(&dir, 256, 2);

    let f64_adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F64);
    let f32_adapter = adapter_for(&path, OpenMode::Read, SampleDtype::F32);

    let wide = f64_adapter
        .read_block(&SampleRange::all(), &ChannelSelect::All)
        .unwrap();
    let narrow = f32_adapter
        .read_block(&SampleRange::all(), &ChannelSelect::All)
        .unwrap();

    assert_eq!(wide.dim(), narrow.dim());
    for (a, b) in wide.iter().zip(narrow.iter()) {
        assert!((a - b).abs() < 1e-6, "{a} vs {b}");
    }
}

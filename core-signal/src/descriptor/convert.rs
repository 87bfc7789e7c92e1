//! Sample format conversion to interleaved f64.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Convert a decoded Symphonia buffer to interleaved `f64` samples.
///
/// Symphonia outputs audio in various sample formats (i16, i24, i32, f32,
/// f64, ...) and a planar layout. Everything is normalized here to
/// interleaved `f64` in the range `[-1.0, 1.0]` (LRLRLR... for stereo).
pub(crate) fn to_interleaved_f64(buffer: &AudioBufferRef<'_>) -> Vec<f64> {
    match buffer {
        AudioBufferRef::F64(buf) => interleave(buf, |s: f64| s),
        AudioBufferRef::F32(buf) => interleave(buf, |s: f32| s.into_sample()),
        AudioBufferRef::S32(buf) => interleave(buf, |s: i32| s.into_sample()),
        AudioBufferRef::S24(buf) => interleave(buf, |s| IntoSample::into_sample(s)),
        AudioBufferRef::S16(buf) => interleave(buf, |s: i16| s.into_sample()),
        AudioBufferRef::S8(buf) => interleave(buf, |s: i8| s.into_sample()),
        AudioBufferRef::U32(buf) => interleave(buf, |s: u32| s.into_sample()),
        AudioBufferRef::U24(buf) => interleave(buf, |s| IntoSample::into_sample(s)),
        AudioBufferRef::U16(buf) => interleave(buf, |s: u16| s.into_sample()),
        AudioBufferRef::U8(buf) => interleave(buf, |s: u8| s.into_sample()),
    }
}

/// Convert and interleave the planes of a planar buffer.
fn interleave<T>(buf: &AudioBuffer<T>, convert: fn(T) -> f64) -> Vec<f64>
where
    T: Sample + Copy,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    let mut interleaved = Vec::with_capacity(num_frames * num_channels);

    for frame_idx in 0..num_frames {
        for chan_idx in 0..num_channels {
            interleaved.push(convert(buf.chan(chan_idx)[frame_idx]));
        }
    }

    interleaved
}

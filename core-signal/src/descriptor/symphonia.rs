//! # Symphonia Descriptor Implementation
//!
//! Frame-addressable descriptor backed by the Symphonia library.

use crate::descriptor::{convert, AudioDescriptor, DescriptorSpec};
use crate::error::{Result, SignalError};
use crate::manager::{OpenMode, OpenParams};
use std::path::Path;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

/// Frame-addressable audio descriptor over a Symphonia format reader.
///
/// The decode pipeline is the usual Symphonia three-layer stack:
/// media source, format reader (demuxer), codec decoder. On top of it this
/// type maintains an exact frame position: container seeks land on packet
/// boundaries, so `seek` refines the coarse landing point by decoding and
/// discarding frames until the requested one.
///
/// Packets rarely align with requested ranges; samples decoded past the
/// caller's request are kept in a carry buffer and handed out first on the
/// next `read`.
pub struct SymphoniaDescriptor {
    /// Format reader (demuxer) - owns the media source stream.
    reader: Box<dyn FormatReader>,

    /// Codec decoder.
    decoder: Box<dyn Decoder>,

    /// Selected track ID.
    track_id: u32,

    /// Metadata probed at open time.
    spec: DescriptorSpec,

    /// Whether the media source supports random access.
    seekable: bool,

    /// Frame index of the next sample `read` will return.
    position: u64,

    /// Decoded samples not yet handed out (interleaved).
    carry: Vec<f64>,

    /// Read offset into `carry`, in samples.
    carry_offset: usize,

    /// End-of-stream flag.
    eof: bool,
}

impl SymphoniaDescriptor {
    /// Open a descriptor for the given parameters.
    ///
    /// Probes the container once to fix frame count, channel count and
    /// sample rate for the descriptor's lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, the format is not
    /// recognized, no decodable audio track exists, or the container does
    /// not declare the stream length.
    #[instrument(skip(params), fields(path = %params.path.display(), mode = ?params.mode))]
    pub fn open(params: &OpenParams) -> Result<Self> {
        let file = std::fs::File::open(&params.path).map_err(|e| SignalError::Open {
            path: params.path.clone(),
            source: e,
        })?;

        let (source, seekable): (Box<dyn MediaSource>, bool) = match params.mode {
            OpenMode::Read => (Box::new(file), true),
            // ReadOnlySource hides the file's Seek impl, forcing the
            // sequential code paths end to end.
            OpenMode::Stream => (Box::new(ReadOnlySource::new(file)), false),
        };

        let stream = MediaSourceStream::new(source, Default::default());
        let hint = hint_from_path(&params.path);

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| SignalError::InvalidFormat(format!("failed to probe format: {e}")))?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                SignalError::UnsupportedCodec("no decodable audio tracks".to_string())
            })?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| SignalError::InvalidFormat("missing sample rate".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .map(|ch| ch.count())
            .ok_or_else(|| SignalError::InvalidFormat("missing channel layout".to_string()))?;

        // The adapter's shape is fixed at construction, so a stream of
        // undeclared length cannot be exposed as an array.
        let frames = track.codec_params.n_frames.ok_or_else(|| {
            SignalError::InvalidFormat("container does not declare a frame count".to_string())
        })?;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                SignalError::UnsupportedCodec(format!("failed to create codec decoder: {e}"))
            })?;

        debug!(frames, channels, sample_rate, "descriptor opened");

        Ok(Self {
            reader,
            decoder,
            track_id,
            spec: DescriptorSpec {
                frames,
                channels,
                sample_rate,
            },
            seekable,
            position: 0,
            carry: Vec::new(),
            carry_offset: 0,
            eof: false,
        })
    }

    /// Read and decode the next packet of the selected track.
    ///
    /// Returns `Ok(None)` at end of stream. Decode failures are surfaced
    /// immediately; corrupted packets are never skipped or retried.
    fn next_decoded(&mut self) -> Result<Option<Vec<f64>>> {
        if self.eof {
            return Ok(None);
        }

        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!(position = self.position, "end of stream");
                    self.eof = true;
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("track list changed mid-stream");
                    return Err(SignalError::Decode(
                        "track list changed, reset required".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(SignalError::Decode(format!("failed to read packet: {e}")));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = self
                .decoder
                .decode(&packet)
                .map_err(|e| SignalError::Decode(format!("failed to decode packet: {e}")))?;

            if decoded.frames() == 0 {
                continue;
            }

            // AudioBufferRef is only valid until the next decode call, so
            // convert to owned samples immediately.
            return Ok(Some(convert::to_interleaved_f64(&decoded)));
        }
    }
}

impl AudioDescriptor for SymphoniaDescriptor {
    fn spec(&self) -> &DescriptorSpec {
        &self.spec
    }

    fn seekable(&self) -> bool {
        self.seekable
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, frame: u64) -> Result<u64> {
        if !self.seekable {
            return Err(SignalError::SeekNotSupported);
        }
        if frame >= self.spec.frames {
            return Err(SignalError::SeekOutOfBounds {
                frame,
                frames: self.spec.frames,
            });
        }

        let seeked = self
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: frame,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| SignalError::Decode(format!("seek to frame {frame} failed: {e}")))?;

        self.decoder.reset();
        self.carry.clear();
        self.carry_offset = 0;
        self.eof = false;
        self.position = seeked.actual_ts;

        if self.position > frame {
            return Err(SignalError::Decode(format!(
                "container seek overshot frame {frame}, landed on {}",
                self.position
            )));
        }

        // The container lands on a packet boundary at or before the target;
        // decode and discard up to the exact frame.
        let mut scratch = Vec::new();
        while self.position < frame {
            scratch.clear();
            let skip = (frame - self.position) as usize;
            if self.read(skip, &mut scratch)? == 0 {
                return Err(SignalError::Decode(format!(
                    "stream ended while refining seek to frame {frame}"
                )));
            }
        }

        debug!(frame, "seek completed");
        Ok(self.position)
    }

    fn read(&mut self, max_frames: usize, out: &mut Vec<f64>) -> Result<usize> {
        let channels = self.spec.channels;
        let mut taken = 0usize;

        while taken < max_frames {
            if self.carry_offset >= self.carry.len() {
                match self.next_decoded()? {
                    Some(samples) => {
                        self.carry = samples;
                        self.carry_offset = 0;
                    }
                    None => break,
                }
            }

            let avail = (self.carry.len() - self.carry_offset) / channels;
            let take = avail.min(max_frames - taken);
            let end = self.carry_offset + take * channels;
            out.extend_from_slice(&self.carry[self.carry_offset..end]);
            self.carry_offset = end;
            taken += take;
        }

        self.position += taken as u64;
        Ok(taken)
    }
}

/// Build a probe hint from the file extension.
fn hint_from_path(path: &Path) -> Hint {
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }
    hint
}

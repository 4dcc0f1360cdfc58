//! Format Converter
//!
//! Pulls PCM from a [`DecoderSource`] in whatever format it produces and
//! hands back frames in a fixed destination format: sample rate, sample
//! representation, byte order, interleaving and channel layout can all differ.
//!
//! ## Pipeline
//!
//! ```text
//! decoder bytes ──decode──▶ planar f32 ──channel map──▶ resample ──▶ pending ──encode──▶ caller buffer
//! ```
//!
//! When source and destination are identical the bytes are copied through
//! untouched.
//!
//! ## Exact length
//!
//! The resampler's filter delay is discarded at the start of a stream and its
//! history is flushed at the end, so a source of `n` frames always converts to
//! exactly `ceil(n × dst_rate / src_rate)` frames.
//!
//! ## Example
//!
//! ```rust
//! use soul_core::{AudioBufferList, StreamFormat};
//! use soul_render::converter::Converter;
//! use soul_render::sources::MemorySource;
//!
//! // One second of 44.1kHz stereo 16-bit silence
//! let source = MemorySource::silence(StreamFormat::pcm_i16(44_100.0, 2), 44_100);
//!
//! let destination = StreamFormat::float32(48_000.0, 2);
//! let mut converter = Converter::new(Box::new(source), destination, None);
//! converter.open().unwrap();
//!
//! let mut buffer = AudioBufferList::new(destination, 512);
//! let mut total = 0;
//! loop {
//!     let frames = converter.convert_audio(&mut buffer, 512);
//!     if frames == 0 {
//!         break;
//!     }
//!     total += frames;
//! }
//! assert_eq!(total, 48_000);
//! assert!(converter.last_error().is_none());
//! ```

mod channel_map;
pub mod sample;

pub use channel_map::ChannelMap;

use crate::resampling::{Resampler, SrcComplexity};
use soul_core::{AudioBufferList, ChannelLayout, DecoderSource, Result, SoulError, StreamFormat};
use tracing::{debug, warn};

/// Frames pulled from the decoder per read when no resampler sets the chunk size
const DIRECT_CHUNK_FRAMES: usize = 1024;

/// Output frames a source of `frames_in` frames converts to
fn expected_output_frames(frames_in: u64, ratio: f64) -> u64 {
    ((frames_in as f64) * ratio - 1e-9).ceil().max(0.0) as u64
}

/// Planar frames waiting to be encoded into the caller's buffer
struct Pending {
    data: Vec<Vec<f32>>,
    start: usize,
    end: usize,
}

impl Pending {
    fn new(channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![vec![0.0; capacity]; channels],
            start: 0,
            end: 0,
        }
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }
}

/// Transient state between Open and Close
struct ConversionSession {
    source: StreamFormat,
    passthrough: bool,
    map: ChannelMap,
    resampler: Option<Resampler>,
    chunk: usize,
    /// Raw decoder output, in the source format
    read: AudioBufferList,
    /// Decoded source channels
    decoded: Vec<Vec<f32>>,
    /// Mapped frames waiting for a full resampler chunk
    staged: Vec<Vec<f32>>,
    staged_frames: usize,
    pending: Pending,
    delay_remaining: usize,
    frames_in: u64,
    frames_generated: u64,
    frames_out: u64,
    source_done: bool,
    finished: bool,
    /// Set on the first source or resampler failure; cleared by reset
    failed: bool,
    error: Option<SoulError>,
}

impl ConversionSession {
    fn new(
        source: StreamFormat,
        source_layout: Option<&ChannelLayout>,
        dest: StreamFormat,
        dest_layout: Option<&ChannelLayout>,
        complexity: SrcComplexity,
    ) -> Result<Self> {
        source
            .validate()
            .map_err(|e| SoulError::incompatible(source, dest, e.to_string()))?;

        let src_channels = usize::from(source.channels);
        let dst_channels = usize::from(dest.channels);
        let map = ChannelMap::new(src_channels, source_layout, dst_channels, dest_layout);

        let resampler = if source.sample_rate == dest.sample_rate {
            None
        } else {
            Some(
                Resampler::new(source.sample_rate, dest.sample_rate, dst_channels, complexity)
                    .map_err(|e| SoulError::incompatible(source, dest, e.to_string()))?,
            )
        };

        let passthrough = resampler.is_none() && source == dest && map.is_identity();
        let chunk = resampler
            .as_ref()
            .map_or(DIRECT_CHUNK_FRAMES, Resampler::chunk_size);
        let pending_capacity = resampler
            .as_ref()
            .map_or(chunk, |r| r.output_frames_max().max(chunk));
        let delay_remaining = resampler.as_ref().map_or(0, Resampler::output_delay);

        // Passthrough copies bytes straight from `read`, so the f32 stages stay empty
        let (decoded, staged, pending) = if passthrough {
            (Vec::new(), Vec::new(), Pending::new(0, 0))
        } else {
            (
                vec![vec![0.0; chunk]; src_channels],
                if resampler.is_some() {
                    vec![vec![0.0; chunk]; dst_channels]
                } else {
                    Vec::new()
                },
                Pending::new(dst_channels, pending_capacity),
            )
        };

        Ok(Self {
            source,
            passthrough,
            map,
            resampler,
            chunk,
            read: AudioBufferList::new(source, chunk),
            decoded,
            staged,
            staged_frames: 0,
            pending,
            delay_remaining,
            frames_in: 0,
            frames_generated: 0,
            frames_out: 0,
            source_done: false,
            finished: false,
            failed: false,
            error: None,
        })
    }

    fn reset(&mut self) {
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
            self.delay_remaining = resampler.output_delay();
        }
        self.staged_frames = 0;
        self.pending.clear();
        self.frames_in = 0;
        self.frames_generated = 0;
        self.frames_out = 0;
        self.source_done = false;
        self.finished = false;
        self.failed = false;
        self.error = None;
    }

    fn fail(&mut self, error: SoulError) {
        self.failed = true;
        self.error = Some(error);
    }

    /// Produce up to `frames` frames into `out`, returning the count produced
    fn fill(&mut self, decoder: &mut dyn DecoderSource, out: &mut AudioBufferList, frames: usize) -> usize {
        let mut produced = 0;

        while produced < frames {
            if self.pending.len() > 0 {
                let n = self.pending.len().min(frames - produced);
                sample::encode_planar(&self.pending.data, self.pending.start, n, out, produced);
                self.pending.start += n;
                produced += n;
                self.frames_out += n as u64;
                continue;
            }

            if self.passthrough {
                if !self.read_direct(decoder, out, &mut produced, frames) {
                    break;
                }
                continue;
            }

            if !self.refill(decoder) {
                break;
            }
        }

        produced
    }

    /// Bit-exact path: decoder bytes go straight to the caller's buffer
    fn read_direct(
        &mut self,
        decoder: &mut dyn DecoderSource,
        out: &mut AudioBufferList,
        produced: &mut usize,
        frames: usize,
    ) -> bool {
        if self.finished || self.failed {
            return false;
        }

        let want = (frames - *produced).min(self.chunk);
        match decoder.read_frames(&mut self.read, want) {
            Ok(0) => {
                self.source_done = true;
                self.finished = true;
                false
            }
            Ok(n) => {
                let n = out.copy_frames_from(&self.read, 0, *produced, n.min(want));
                *produced += n;
                self.frames_in += n as u64;
                self.frames_generated += n as u64;
                self.frames_out += n as u64;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Move the pipeline forward by one decoder read or one resampler call
    ///
    /// Returns false once no further output will ever be produced.
    fn refill(&mut self, decoder: &mut dyn DecoderSource) -> bool {
        if self.finished || self.failed {
            return false;
        }
        self.pending.clear();

        if !self.source_done {
            let want = self.chunk - self.staged_frames;
            match decoder.read_frames(&mut self.read, want) {
                Ok(0) => self.source_done = true,
                Ok(n) => {
                    let n = n.min(want);
                    sample::decode_planar(&self.read, 0, n, &mut self.decoded, 0);
                    let target = if self.resampler.is_some() {
                        &mut self.staged
                    } else {
                        &mut self.pending.data
                    };
                    self.map.apply(&self.decoded, 0, target, self.staged_frames, n);
                    self.staged_frames += n;
                    self.frames_in += n as u64;
                }
                Err(e) => {
                    self.fail(e);
                    return false;
                }
            }
        }

        let Some(resampler) = self.resampler.as_mut() else {
            if self.staged_frames > 0 {
                self.pending.end = self.staged_frames;
                self.frames_generated += self.staged_frames as u64;
                self.staged_frames = 0;
                return true;
            }
            self.finished = self.source_done;
            return !self.finished;
        };

        if self.staged_frames < self.chunk && !self.source_done {
            return true;
        }

        let result = if self.staged_frames > 0 {
            // Last partial chunk is padded with silence and trimmed below
            for channel in &mut self.staged {
                channel[self.staged_frames..].fill(0.0);
            }
            resampler.process_into(&self.staged, &mut self.pending.data)
        } else {
            resampler.flush_into(&mut self.pending.data)
        };
        self.staged_frames = 0;

        let produced = match result {
            Ok(n) => n,
            Err(e) => {
                self.failed = true;
                self.error = Some(e.into());
                return false;
            }
        };

        let skip = self.delay_remaining.min(produced);
        self.delay_remaining -= skip;
        let mut end = produced;

        if self.source_done {
            let target = expected_output_frames(self.frames_in, resampler.ratio());
            let allowed = target.saturating_sub(self.frames_generated) as usize;
            end = end.min(skip + allowed);
            if self.frames_generated + (end - skip) as u64 >= target || produced == 0 {
                self.finished = true;
            }
        }

        self.pending.start = skip;
        self.pending.end = end;
        self.frames_generated += (end - skip) as u64;
        true
    }
}

/// Converts a decoder's PCM into a fixed destination format
///
/// The converter owns its decoder for its whole life; dropping the converter
/// drops the decoder.
///
/// Exactly one thread may drive a converter at a time. `convert_audio` does
/// not allocate once the converter is open, so it may be called from a
/// real-time context.
pub struct Converter {
    decoder: Box<dyn DecoderSource>,
    format: StreamFormat,
    layout: Option<ChannelLayout>,
    complexity: SrcComplexity,
    session: Option<ConversionSession>,
    last_error: Option<SoulError>,
}

impl Converter {
    /// Create a closed converter that takes ownership of `decoder`
    pub fn new(
        decoder: Box<dyn DecoderSource>,
        format: StreamFormat,
        layout: Option<ChannelLayout>,
    ) -> Self {
        Self {
            decoder,
            format,
            layout,
            complexity: SrcComplexity::default(),
            session: None,
            last_error: None,
        }
    }

    /// Builder-style complexity override, applied at the next open
    #[must_use]
    pub fn with_complexity(mut self, complexity: SrcComplexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Validate formats, open the decoder, and allocate conversion state
    ///
    /// # Errors
    /// - State error if the converter is already open
    /// - Configuration error if the formats cannot be bridged
    /// - Whatever the decoder returns from its own `open`
    pub fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(SoulError::invalid_state("open converter", "open"));
        }

        self.validate_destination(&self.format, self.layout.as_ref())?;

        let opened_here = !self.decoder.is_open();
        if opened_here {
            self.decoder.open()?;
        }

        match self.build_session(self.format, self.layout.clone()) {
            Ok(session) => {
                debug!(
                    source = %session.source,
                    destination = %self.format,
                    resampling = session.resampler.is_some(),
                    passthrough = session.passthrough,
                    "Converter opened"
                );
                self.session = Some(session);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                if opened_here {
                    if let Err(close_err) = self.decoder.close() {
                        warn!("Failed to close decoder after open error: {}", close_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// Release conversion state and close the decoder
    ///
    /// Closing a closed converter succeeds and does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.session = None;
        if self.decoder.is_open() {
            self.decoder.close()?;
        }
        Ok(())
    }

    /// Check if the converter is open
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Convert up to `frame_count` frames into `buffer`
    ///
    /// `buffer` must be in [`Converter::format`]; requests larger than its
    /// capacity are clamped. Sets `buffer.frames()` to the count written and
    /// returns it. Bytes past that count are left untouched.
    ///
    /// `0` means end of stream or failure: check [`Converter::last_error`].
    pub fn convert_audio(&mut self, buffer: &mut AudioBufferList, frame_count: usize) -> usize {
        let Some(session) = self.session.as_mut() else {
            if self.last_error.is_none() {
                self.last_error = Some(SoulError::invalid_state("convert audio", "closed"));
            }
            return 0;
        };

        if *buffer.format() != self.format {
            if self.last_error.is_none() {
                self.last_error = Some(SoulError::incompatible(
                    buffer.format(),
                    self.format,
                    "buffer is not in the converter's destination format",
                ));
            }
            buffer.set_frames(0);
            return 0;
        }

        let frames = frame_count.min(buffer.capacity());
        let produced = session.fill(self.decoder.as_mut(), buffer, frames);
        if let Some(err) = session.error.take() {
            self.last_error = Some(err);
        }

        buffer.set_frames(produced);
        produced
    }

    /// Flush all conversion state so the next pull starts a fresh stream
    ///
    /// Does not reposition the decoder; reposition it first through
    /// [`Converter::decoder_mut`] if needed.
    ///
    /// # Errors
    /// State error if the converter is closed
    pub fn reset(&mut self) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SoulError::invalid_state("reset converter", "closed"))?;
        session.reset();
        self.last_error = None;
        Ok(())
    }

    /// Switch to a new destination format without closing the decoder
    ///
    /// Buffered output is discarded. On a closed converter the new format is
    /// simply stored for the next open.
    pub fn reconfigure(&mut self, format: StreamFormat, layout: Option<ChannelLayout>) -> Result<()> {
        self.validate_destination(&format, layout.as_ref())?;

        if self.session.is_some() {
            let session = self.build_session(format, layout.clone())?;
            self.session = Some(session);
        }

        self.format = format;
        self.layout = layout;
        self.last_error = None;
        Ok(())
    }

    /// Set the sample rate converter complexity, applied at the next open or reconfigure
    pub fn set_src_complexity(&mut self, complexity: SrcComplexity) {
        self.complexity = complexity;
    }

    /// Sample rate converter complexity
    pub fn src_complexity(&self) -> SrcComplexity {
        self.complexity
    }

    /// Destination format
    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    /// Destination channel layout
    pub fn channel_layout(&self) -> Option<&ChannelLayout> {
        self.layout.as_ref()
    }

    /// Source format (from the open session, or the decoder if closed)
    pub fn source_format(&self) -> StreamFormat {
        self.session
            .as_ref()
            .map_or_else(|| self.decoder.format(), |s| s.source)
    }

    /// Human-readable description of the conversion
    pub fn description(&self) -> String {
        format!("{} -> {}", self.source_format(), self.format)
    }

    /// Decoder owned by this converter
    pub fn decoder(&self) -> &dyn DecoderSource {
        self.decoder.as_ref()
    }

    /// Mutable access to the decoder, e.g. to seek before [`Converter::reset`]
    pub fn decoder_mut(&mut self) -> &mut dyn DecoderSource {
        self.decoder.as_mut()
    }

    /// Consume the converter and hand back its decoder, still open if it was
    pub fn into_decoder(self) -> Box<dyn DecoderSource> {
        self.decoder
    }

    /// Error recorded by the last failing call, if any
    pub fn last_error(&self) -> Option<&SoulError> {
        self.last_error.as_ref()
    }

    /// Take the recorded error, clearing it
    pub fn take_last_error(&mut self) -> Option<SoulError> {
        self.last_error.take()
    }

    /// Whether the source has been fully converted and delivered
    pub fn is_exhausted(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.finished && s.pending.len() == 0)
    }

    /// Whether the open session changes sample rate
    pub fn is_resampling(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.resampler.is_some())
    }

    /// Whether the open session copies bytes through untouched
    pub fn is_passthrough(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.passthrough)
    }

    /// Resampler filter delay in destination frames (compensated internally)
    pub fn resampler_delay_frames(&self) -> usize {
        self.session
            .as_ref()
            .and_then(|s| s.resampler.as_ref())
            .map_or(0, Resampler::output_delay)
    }

    /// Source frames consumed since open or reset
    pub fn frames_in(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.frames_in)
    }

    /// Frames delivered since open or reset
    pub fn frames_out(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.frames_out)
    }

    fn validate_destination(&self, format: &StreamFormat, layout: Option<&ChannelLayout>) -> Result<()> {
        format.validate()?;
        if let Some(layout) = layout {
            if layout.channel_count() != usize::from(format.channels) {
                return Err(SoulError::invalid_layout(format!(
                    "layout {} has {} channels, format has {}",
                    layout,
                    layout.channel_count(),
                    format.channels
                )));
            }
        }
        Ok(())
    }

    fn build_session(&self, format: StreamFormat, layout: Option<ChannelLayout>) -> Result<ConversionSession> {
        let source = self.decoder.format();
        // An unlabelled source takes the conventional layout for its channel
        // count when the destination is labelled
        let source_layout = self
            .decoder
            .channel_layout()
            .filter(|l| l.channel_count() == usize::from(source.channels))
            .or_else(|| {
                layout
                    .as_ref()
                    .and_then(|_| ChannelLayout::default_for_channels(source.channels))
            });
        ConversionSession::new(
            source,
            source_layout.as_ref(),
            format,
            layout.as_ref(),
            self.complexity,
        )
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("format", &self.format)
            .field("layout", &self.layout)
            .field("complexity", &self.complexity)
            .field("open", &self.is_open())
            .field("last_error", &self.last_error)
            .finish()
    }
}

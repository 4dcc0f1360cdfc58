//! In-memory decoder sources
//!
//! [`MemorySource`] plays a prepared buffer in any supported format and
//! [`ToneSource`] synthesises a sine. Both are used for offline rendering,
//! the CLI's test tone and the test suite.

use crate::converter::sample::encode_planar;
use soul_core::{
    AudioBufferList, ChannelLayout, DecoderSource, Result, SoulError, StreamFormat, MAX_CHANNELS,
};
use std::f64::consts::TAU;

/// Decoder source backed by a buffer
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: AudioBufferList,
    layout: Option<ChannelLayout>,
    position: usize,
    open: bool,
    max_read: usize,
    fail_at: Option<usize>,
}

impl MemorySource {
    /// Play every valid frame of `data`
    pub fn new(data: AudioBufferList) -> Self {
        Self {
            data,
            layout: None,
            position: 0,
            open: false,
            max_read: usize::MAX,
            fail_at: None,
        }
    }

    /// Encode interleaved `f32` samples into `format`
    pub fn from_f32(format: StreamFormat, samples: &[f32]) -> Self {
        let channels = usize::from(format.channels.max(1));
        let frames = samples.len() / channels;

        let mut planar = vec![vec![0.0f32; frames]; channels];
        for (i, frame) in samples.chunks_exact(channels).enumerate() {
            for (ch, &sample) in frame.iter().enumerate() {
                planar[ch][i] = sample;
            }
        }

        let mut data = AudioBufferList::new(format, frames);
        encode_planar(&planar, 0, frames, &mut data, 0);
        data.set_frames(frames);
        Self::new(data)
    }

    /// `frames` frames of digital silence
    pub fn silence(format: StreamFormat, frames: usize) -> Self {
        let samples = vec![0.0f32; frames * usize::from(format.channels.max(1))];
        Self::from_f32(format, &samples)
    }

    /// Report a channel layout
    #[must_use]
    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Return at most `frames` frames per read
    #[must_use]
    pub fn with_max_read(mut self, frames: usize) -> Self {
        self.max_read = frames.max(1);
        self
    }

    /// Fail every read once `frame` frames have been delivered
    #[must_use]
    pub fn failing_after(mut self, frame: usize) -> Self {
        self.fail_at = Some(frame);
        self
    }
}

impl DecoderSource for MemorySource {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn format(&self) -> StreamFormat {
        *self.data.format()
    }

    fn channel_layout(&self) -> Option<ChannelLayout> {
        self.layout.clone()
    }

    fn read_frames(&mut self, buffer: &mut AudioBufferList, frame_count: usize) -> Result<usize> {
        if !self.open {
            return Err(SoulError::invalid_state("read frames", "source is closed"));
        }

        let mut limit = self.data.frames() - self.position;
        if let Some(fail_at) = self.fail_at {
            if self.position >= fail_at {
                return Err(SoulError::decoder(format!(
                    "read failed at frame {}",
                    self.position
                )));
            }
            limit = limit.min(fail_at - self.position);
        }

        let count = frame_count
            .min(self.max_read)
            .min(buffer.capacity())
            .min(limit);
        let copied = buffer.copy_frames_from(&self.data, self.position, 0, count);
        buffer.set_frames(copied);
        self.position += copied;
        Ok(copied)
    }

    fn reset(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.data.frames() as u64)
    }

    fn current_frame(&self) -> u64 {
        self.position as u64
    }

    fn supports_seeking(&self) -> bool {
        true
    }

    fn seek_to_frame(&mut self, frame: u64) -> Result<u64> {
        let total = self.data.frames() as u64;
        if frame > total {
            return Err(SoulError::unsupported(format!(
                "seek to frame {} past end ({} frames)",
                frame, total
            )));
        }
        self.position = frame as usize;
        Ok(frame)
    }
}

/// Sine generator in interleaved `f32`
#[derive(Debug, Clone)]
pub struct ToneSource {
    format: StreamFormat,
    frequency: f64,
    amplitude: f32,
    total_frames: u64,
    position: u64,
    open: bool,
}

impl ToneSource {
    /// `seconds` of a sine at `frequency` Hz, identical on every channel
    pub fn new(sample_rate: f64, channels: u16, frequency: f64, seconds: f64) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            format: StreamFormat::float32(sample_rate, channels),
            frequency,
            amplitude: 0.5,
            total_frames: (seconds.max(0.0) * sample_rate).round() as u64,
            position: 0,
            open: false,
        }
    }

    /// Peak amplitude; clamped to [0, 1]
    #[must_use]
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = crate::device::clamp_level(amplitude);
        self
    }

    fn sample_at(&self, frame: u64) -> f32 {
        let phase = TAU * self.frequency * frame as f64 / self.format.sample_rate;
        self.amplitude * phase.sin() as f32
    }
}

impl DecoderSource for ToneSource {
    fn open(&mut self) -> Result<()> {
        self.format.validate()?;
        self.open = true;
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn format(&self) -> StreamFormat {
        self.format
    }

    fn read_frames(&mut self, buffer: &mut AudioBufferList, frame_count: usize) -> Result<usize> {
        if !self.open {
            return Err(SoulError::invalid_state("read frames", "source is closed"));
        }
        if *buffer.format() != self.format {
            return Err(SoulError::incompatible(
                buffer.format(),
                self.format,
                "read buffer must match the source format",
            ));
        }

        let remaining = self.total_frames.saturating_sub(self.position);
        let count = (frame_count.min(buffer.capacity()) as u64).min(remaining) as usize;
        let channels = usize::from(self.format.channels);
        let mut frame = [0.0f32; MAX_CHANNELS as usize];

        for i in 0..count {
            let value = self.sample_at(self.position + i as u64);
            frame[..channels].fill(value);
            buffer.write_f32_interleaved(i * channels, &frame[..channels]);
        }

        buffer.set_frames(count);
        self.position += count as u64;
        Ok(count)
    }

    fn reset(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total_frames)
    }

    fn current_frame(&self) -> u64 {
        self.position
    }

    fn supports_seeking(&self) -> bool {
        true
    }

    fn seek_to_frame(&mut self, frame: u64) -> Result<u64> {
        self.position = frame.min(self.total_frames);
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reads_until_exhausted() {
        let mut source = MemorySource::silence(StreamFormat::pcm_i16(44_100.0, 2), 100)
            .with_max_read(30);
        source.open().unwrap();

        let mut buffer = AudioBufferList::new(source.format(), 64);
        let mut reads = Vec::new();
        loop {
            let n = source.read_frames(&mut buffer, 64).unwrap();
            if n == 0 {
                break;
            }
            reads.push(n);
        }
        assert_eq!(reads, vec![30, 30, 30, 10]);
        assert_eq!(source.current_frame(), 100);
    }

    #[test]
    fn memory_source_requires_open() {
        let mut source = MemorySource::silence(StreamFormat::pcm_i16(44_100.0, 2), 10);
        let mut buffer = AudioBufferList::new(source.format(), 10);
        let err = source.read_frames(&mut buffer, 10).unwrap_err();
        assert!(err.is_state());
    }

    #[test]
    fn memory_source_fails_at_configured_frame() {
        let mut source =
            MemorySource::silence(StreamFormat::pcm_u8(8_000.0, 1), 100).failing_after(25);
        source.open().unwrap();
        let mut buffer = AudioBufferList::new(source.format(), 64);
        assert_eq!(source.read_frames(&mut buffer, 64).unwrap(), 25);
        assert!(source.read_frames(&mut buffer, 64).is_err());
        assert!(source.read_frames(&mut buffer, 64).is_err());
    }

    #[test]
    fn memory_source_round_trips_f32() {
        let samples = [0.25f32, -0.5, 0.75, -1.0];
        let mut source = MemorySource::from_f32(StreamFormat::float32(48_000.0, 2), &samples);
        source.open().unwrap();
        let mut buffer = AudioBufferList::new(source.format(), 4);
        assert_eq!(source.read_frames(&mut buffer, 4).unwrap(), 2);
        assert_eq!(buffer.to_f32_vec(), samples.to_vec());
    }

    #[test]
    fn memory_source_seek() {
        let mut source = MemorySource::silence(StreamFormat::pcm_i16(44_100.0, 1), 50);
        source.open().unwrap();
        assert_eq!(source.seek_to_frame(40).unwrap(), 40);
        let mut buffer = AudioBufferList::new(source.format(), 64);
        assert_eq!(source.read_frames(&mut buffer, 64).unwrap(), 10);
        assert!(source.seek_to_frame(51).is_err());
    }

    #[test]
    fn tone_has_requested_length_and_peak() {
        let mut tone = ToneSource::new(48_000.0, 2, 1_000.0, 0.01).with_amplitude(0.8);
        tone.open().unwrap();
        let mut buffer = AudioBufferList::new(tone.format(), 1024);
        assert_eq!(tone.read_frames(&mut buffer, 1024).unwrap(), 480);

        let samples = buffer.to_f32_vec();
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.79 && peak <= 0.8 + 1e-6);
        assert!(samples.chunks_exact(2).all(|f| f[0] == f[1]));
        assert_eq!(tone.read_frames(&mut buffer, 1024).unwrap(), 0);
    }
}

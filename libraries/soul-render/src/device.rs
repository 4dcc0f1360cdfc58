//! Output device properties
//!
//! [`OutputDevice`] is the property interface the render graph negotiates
//! against: sample rate, channel count, preferred stereo pair, buffer size,
//! latency, volume and exclusive ("hog") mode. Methods take `&self`; devices
//! use interior mutability so one device can be shared between the graph and
//! the driver glue.

use soul_core::{Result, SoulError, MAX_CHANNELS, MAX_SAMPLE_RATE};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracing::debug;

/// Clamp a linear level to [0, 1]; NaN becomes 0
#[inline]
pub fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Properties of an audio output device
///
/// Unsupported properties return [`SoulError::PropertyUnsupported`].
pub trait OutputDevice: Send + Sync {
    /// Persistent unique identifier
    fn uid(&self) -> &str;

    /// Session-local numeric identifier
    fn id(&self) -> u32;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Nominal sample rate in Hz
    fn sample_rate(&self) -> f64;

    /// Change the nominal sample rate
    fn set_sample_rate(&self, rate: f64) -> Result<()>;

    /// Sample rates the device accepts
    fn supported_sample_rates(&self) -> Vec<f64> {
        vec![self.sample_rate()]
    }

    /// Output channel count
    fn channel_count(&self) -> u16;

    /// Zero-based (left, right) channels for stereo content
    fn preferred_stereo_pair(&self) -> (u16, u16) {
        (0, 1)
    }

    /// Buffer size the device asks for, in frames
    fn preferred_buffer_frames(&self) -> Option<usize> {
        None
    }

    /// Output latency in frames at the nominal rate
    fn latency_frames(&self) -> u32 {
        0
    }

    /// Hardware master volume (0.0 to 1.0)
    fn master_volume(&self) -> Result<f32> {
        Err(SoulError::property_unsupported("master volume", self.name()))
    }

    /// Set the hardware master volume; clamped to [0, 1]
    fn set_master_volume(&self, volume: f32) -> Result<()> {
        let _ = volume;
        Err(SoulError::property_unsupported("master volume", self.name()))
    }

    /// Hardware volume of one channel (0.0 to 1.0)
    fn volume_for_channel(&self, channel: u16) -> Result<f32> {
        let _ = channel;
        Err(SoulError::property_unsupported("channel volume", self.name()))
    }

    /// Set the hardware volume of one channel; clamped to [0, 1]
    fn set_volume_for_channel(&self, channel: u16, volume: f32) -> Result<()> {
        let _ = (channel, volume);
        Err(SoulError::property_unsupported("channel volume", self.name()))
    }

    /// Check if this process holds the device exclusively
    fn is_hogged(&self) -> bool {
        false
    }

    /// Take exclusive access
    fn start_hogging(&self) -> Result<()> {
        Err(SoulError::property_unsupported("hog mode", self.name()))
    }

    /// Release exclusive access
    fn stop_hogging(&self) -> Result<()> {
        Err(SoulError::property_unsupported("hog mode", self.name()))
    }
}

static NEXT_DEVICE_ID: AtomicU32 = AtomicU32::new(1);

/// In-memory device with every property implemented
///
/// Used for offline rendering and tests: nothing pulls from it, the caller
/// drives `RenderHandle::render` directly.
#[derive(Debug)]
pub struct VirtualDevice {
    uid: String,
    id: u32,
    name: String,
    sample_rate: AtomicU64,
    supported_rates: Vec<f64>,
    channels: u16,
    stereo_pair: (u16, u16),
    buffer_frames: Option<usize>,
    latency_frames: u32,
    master_volume: AtomicU32,
    channel_volumes: Vec<AtomicU32>,
    hogged: AtomicBool,
}

impl VirtualDevice {
    /// Create a device; `channels` is clamped to 1..=32
    pub fn new(name: impl Into<String>, sample_rate: f64, channels: u16) -> Self {
        let name = name.into();
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            uid: format!("virtual:{}", name),
            id: NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed),
            name,
            sample_rate: AtomicU64::new(sample_rate.to_bits()),
            supported_rates: Vec::new(),
            channels,
            stereo_pair: (0, 1.min(channels - 1)),
            buffer_frames: None,
            latency_frames: 0,
            master_volume: AtomicU32::new(1.0f32.to_bits()),
            channel_volumes: (0..channels).map(|_| AtomicU32::new(1.0f32.to_bits())).collect(),
            hogged: AtomicBool::new(false),
        }
    }

    /// Restrict `set_sample_rate` to these rates
    #[must_use]
    pub fn with_supported_rates(mut self, rates: Vec<f64>) -> Self {
        self.supported_rates = rates;
        self
    }

    /// Set the preferred stereo pair (zero-based, clamped to the channel count)
    #[must_use]
    pub fn with_stereo_pair(mut self, left: u16, right: u16) -> Self {
        let last = self.channels - 1;
        self.stereo_pair = (left.min(last), right.min(last));
        self
    }

    /// Set the preferred buffer size
    #[must_use]
    pub fn with_buffer_frames(mut self, frames: usize) -> Self {
        self.buffer_frames = Some(frames);
        self
    }

    /// Set the reported output latency
    #[must_use]
    pub fn with_latency_frames(mut self, frames: u32) -> Self {
        self.latency_frames = frames;
        self
    }

    fn channel_volume(&self, channel: u16) -> Result<&AtomicU32> {
        self.channel_volumes.get(usize::from(channel)).ok_or_else(|| {
            SoulError::device(format!(
                "{} has no channel {} ({} channels)",
                self.name, channel, self.channels
            ))
        })
    }
}

impl OutputDevice for VirtualDevice {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> f64 {
        f64::from_bits(self.sample_rate.load(Ordering::Acquire))
    }

    fn set_sample_rate(&self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_SAMPLE_RATE {
            return Err(SoulError::InvalidSampleRate(rate));
        }
        if !self.supported_rates.is_empty() && !self.supported_rates.contains(&rate) {
            return Err(SoulError::device(format!(
                "{} does not support {} Hz",
                self.name, rate
            )));
        }
        self.sample_rate.store(rate.to_bits(), Ordering::Release);
        debug!(device = %self.name, rate, "Virtual device sample rate changed");
        Ok(())
    }

    fn supported_sample_rates(&self) -> Vec<f64> {
        if self.supported_rates.is_empty() {
            vec![self.sample_rate()]
        } else {
            self.supported_rates.clone()
        }
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn preferred_stereo_pair(&self) -> (u16, u16) {
        self.stereo_pair
    }

    fn preferred_buffer_frames(&self) -> Option<usize> {
        self.buffer_frames
    }

    fn latency_frames(&self) -> u32 {
        self.latency_frames
    }

    fn master_volume(&self) -> Result<f32> {
        Ok(f32::from_bits(self.master_volume.load(Ordering::Relaxed)))
    }

    fn set_master_volume(&self, volume: f32) -> Result<()> {
        self.master_volume
            .store(clamp_level(volume).to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn volume_for_channel(&self, channel: u16) -> Result<f32> {
        Ok(f32::from_bits(self.channel_volume(channel)?.load(Ordering::Relaxed)))
    }

    fn set_volume_for_channel(&self, channel: u16, volume: f32) -> Result<()> {
        self.channel_volume(channel)?
            .store(clamp_level(volume).to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn is_hogged(&self) -> bool {
        self.hogged.load(Ordering::Acquire)
    }

    fn start_hogging(&self) -> Result<()> {
        if self.hogged.swap(true, Ordering::AcqRel) {
            return Err(SoulError::device(format!("{} is already hogged", self.name)));
        }
        Ok(())
    }

    fn stop_hogging(&self) -> Result<()> {
        self.hogged.store(false, Ordering::Release);
        Ok(())
    }
}

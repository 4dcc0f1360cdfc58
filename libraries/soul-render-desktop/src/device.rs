// soul-render-desktop/src/device.rs
//
// Output device enumeration and the cpal-backed device properties

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};
use soul_core::{Result as SoulResult, SoulError, MAX_SAMPLE_RATE};
use soul_render::device::OutputDevice;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{AudioError, Result};

/// Rates offered when a device reports a continuous range
const STANDARD_RATES: [u32; 8] = [
    22_050, 32_000, 44_100, 48_000, 88_200, 96_000, 176_400, 192_000,
];

/// Buffer size requested when the device accepts a range
const DEFAULT_BUFFER_FRAMES: u32 = 512;

static NEXT_DEVICE_ID: AtomicU32 = AtomicU32::new(1);

/// Information about an audio output device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    /// Device name (human-readable, also the UID)
    pub name: String,

    /// Is this the system default device?
    pub is_default: bool,

    /// Native sample rate (Hz)
    pub sample_rate: u32,

    /// Number of output channels
    pub channels: u16,

    /// Supported sample rates (min, max)
    pub sample_rate_range: Option<(u32, u32)>,
}

/// Enumerate output devices on the default host, default device first
pub fn list_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut device_list = Vec::new();
    for device in host.output_devices()? {
        let Ok(name) = device.name() else {
            continue;
        };
        let Ok(config) = device.default_output_config() else {
            continue;
        };

        device_list.push(AudioDeviceInfo {
            is_default: Some(&name) == default_name.as_ref(),
            name,
            sample_rate: config.sample_rate(),
            channels: config.channels(),
            sample_rate_range: rate_range(&device),
        });
    }

    // Sort: default first, then alphabetically
    device_list.sort_by(|a, b| match (a.is_default, b.is_default) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });

    Ok(device_list)
}

/// The default output device of the default host
pub fn default_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("default output".to_string()))
}

/// Find an output device by name
pub fn find_device(device_name: &str) -> Result<cpal::Device> {
    let host = cpal::default_host();
    for device in host.output_devices()? {
        if device.name().is_ok_and(|name| name == device_name) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(device_name.to_string()))
}

fn rate_range(device: &cpal::Device) -> Option<(u32, u32)> {
    device.supported_output_configs().ok().and_then(|configs| {
        configs
            .map(|c| (c.min_sample_rate(), c.max_sample_rate()))
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
    })
}

/// Output device properties backed by cpal
///
/// cpal exposes no hardware volume, so volume and channel volume report
/// `PropertyUnsupported`. Hog mode is bookkeeping only: the flag is exclusive
/// within this process. Latency is measured by the output stream from the
/// callback and playback timestamps.
#[derive(Debug)]
pub struct CpalDevice {
    name: String,
    id: u32,
    sample_rate: AtomicU64,
    supported_rates: Vec<f64>,
    channels: u16,
    buffer_frames: Option<usize>,
    latency_frames: AtomicU32,
    hogged: AtomicBool,
}

impl CpalDevice {
    /// Read properties from a cpal device
    pub fn from_cpal(device: &cpal::Device) -> Result<Self> {
        let name = device.name()?;
        let config = device.default_output_config()?;
        let default_rate = config.sample_rate();

        let mut rates: Vec<u32> = match device.supported_output_configs() {
            Ok(configs) => configs
                .flat_map(|c| {
                    let (min, max) = (c.min_sample_rate(), c.max_sample_rate());
                    STANDARD_RATES
                        .into_iter()
                        .filter(move |r| (min..=max).contains(r))
                        .chain([min, max])
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        rates.push(default_rate);
        rates.sort_unstable();
        rates.dedup();

        let buffer_frames = match config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                Some(DEFAULT_BUFFER_FRAMES.clamp(*min, (*max).max(*min)) as usize)
            }
            cpal::SupportedBufferSize::Unknown => None,
        };

        debug!(
            device = %name,
            rate = default_rate,
            channels = config.channels(),
            "Read cpal device properties"
        );

        Ok(Self::from_parts(
            name,
            f64::from(default_rate),
            config.channels(),
            rates.into_iter().map(f64::from).collect(),
            buffer_frames,
        ))
    }

    fn from_parts(
        name: String,
        sample_rate: f64,
        channels: u16,
        supported_rates: Vec<f64>,
        buffer_frames: Option<usize>,
    ) -> Self {
        Self {
            name,
            id: NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed),
            sample_rate: AtomicU64::new(sample_rate.to_bits()),
            supported_rates,
            channels,
            buffer_frames,
            latency_frames: AtomicU32::new(0),
            hogged: AtomicBool::new(false),
        }
    }

    /// Store the latency observed by the output stream
    ///
    /// Called from the stream callback; only touches an atomic.
    pub(crate) fn record_latency(&self, latency: Duration) {
        let frames = (latency.as_secs_f64() * self.sample_rate()).round() as u32;
        self.latency_frames.store(frames, Ordering::Relaxed);
    }

    /// Stream configuration matching the current properties
    ///
    /// The host picks the callback size; the graph slices whatever it gets.
    pub(crate) fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.sample_rate().round() as u32,
            buffer_size: cpal::BufferSize::Default,
        }
    }
}

impl OutputDevice for CpalDevice {
    fn uid(&self) -> &str {
        &self.name
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

    fn set_sample_rate(&self, rate: f64) -> SoulResult<()> {
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_SAMPLE_RATE {
            return Err(SoulError::InvalidSampleRate(rate));
        }
        if !self.supported_rates.contains(&rate) {
            return Err(SoulError::device(format!(
                "{} does not support {} Hz",
                self.name, rate
            )));
        }
        self.sample_rate.store(rate.to_bits(), Ordering::Release);
        Ok(())
    }

    fn supported_sample_rates(&self) -> Vec<f64> {
        self.supported_rates.clone()
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn preferred_stereo_pair(&self) -> (u16, u16) {
        (0, 1.min(self.channels.saturating_sub(1)))
    }

    fn preferred_buffer_frames(&self) -> Option<usize> {
        self.buffer_frames
    }

    fn latency_frames(&self) -> u32 {
        self.latency_frames.load(Ordering::Relaxed)
    }

    fn is_hogged(&self) -> bool {
        self.hogged.load(Ordering::Acquire)
    }

    fn start_hogging(&self) -> SoulResult<()> {
        if self.hogged.swap(true, Ordering::AcqRel) {
            return Err(SoulError::device(format!("{} is already hogged", self.name)));
        }
        Ok(())
    }

    fn stop_hogging(&self) -> SoulResult<()> {
        self.hogged.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> CpalDevice {
        CpalDevice::from_parts(
            "Test DAC".to_string(),
            48_000.0,
            2,
            vec![44_100.0, 48_000.0, 96_000.0],
            Some(512),
        )
    }

    #[test]
    fn test_uid_is_name() {
        let device = device();
        assert_eq!(device.uid(), "Test DAC");
        assert_eq!(device.name(), device.uid());
    }

    #[test]
    fn test_sample_rate_must_be_supported() {
        let device = device();
        device.set_sample_rate(96_000.0).unwrap();
        assert_eq!(device.sample_rate(), 96_000.0);
        assert!(device.set_sample_rate(22_050.0).is_err());
        assert!(device.set_sample_rate(f64::NAN).is_err());
        assert_eq!(device.stream_config().sample_rate, 96_000);
    }

    #[test]
    fn test_hardware_volume_is_unsupported() {
        let device = device();
        let err = device.master_volume().unwrap_err();
        assert!(matches!(err, SoulError::PropertyUnsupported { .. }));
        assert!(device.set_volume_for_channel(0, 0.5).is_err());
    }

    #[test]
    fn test_hog_flag_is_exclusive() {
        let device = device();
        device.start_hogging().unwrap();
        assert!(device.start_hogging().is_err());
        device.stop_hogging().unwrap();
        assert!(!device.is_hogged());
    }

    #[test]
    fn test_latency_recorded_in_frames() {
        let device = device();
        device.record_latency(Duration::from_millis(10));
        assert_eq!(device.latency_frames(), 480);
    }

    #[test]
    fn test_device_info_serializes() {
        let info = AudioDeviceInfo {
            name: "Speakers".to_string(),
            is_default: true,
            sample_rate: 48_000,
            channels: 2,
            sample_rate_range: Some((44_100, 192_000)),
        };
        let json = serde_json::to_string(&info).unwrap();
        let back: AudioDeviceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_find_nonexistent_device() {
        let result = find_device("Nonexistent Device 12345");
        assert!(result.is_err(), "Should fail to find nonexistent device");
    }
}

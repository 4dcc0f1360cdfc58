//! Output node
//!
//! The last node of every graph: master and per-channel volume, the mixer's
//! pre-gain, and the map from graph channels to device channels. Levels live
//! in atomics the render thread reads once per cycle.

use super::RenderGraph;
use crate::device::clamp_level;
use crate::resampling::SrcComplexity;
use soul_core::{Result, SoulError, MAX_CHANNELS};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// `f32` levels stored as bits
#[derive(Debug)]
pub(crate) struct OutputLevels {
    volume: AtomicU32,
    pre_gain: AtomicU32,
    channels: [AtomicU32; MAX_CHANNELS as usize],
}

impl OutputLevels {
    pub(crate) fn new(volume: f32, pre_gain: f32) -> Self {
        Self {
            volume: AtomicU32::new(clamp_level(volume).to_bits()),
            pre_gain: AtomicU32::new(clamp_level(pre_gain).to_bits()),
            channels: std::array::from_fn(|_| AtomicU32::new(1.0f32.to_bits())),
        }
    }

    pub(crate) fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub(crate) fn set_volume(&self, volume: f32) {
        self.volume.store(clamp_level(volume).to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn pre_gain(&self) -> f32 {
        f32::from_bits(self.pre_gain.load(Ordering::Relaxed))
    }

    pub(crate) fn set_pre_gain(&self, gain: f32) {
        self.pre_gain.store(clamp_level(gain).to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn channel_volume(&self, channel: usize) -> Option<f32> {
        self.channels
            .get(channel)
            .map(|v| f32::from_bits(v.load(Ordering::Relaxed)))
    }

    pub(crate) fn set_channel_volume(&self, channel: usize, volume: f32) -> bool {
        match self.channels.get(channel) {
            Some(slot) => {
                slot.store(clamp_level(volume).to_bits(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub(crate) fn load_channel_volumes(&self, out: &mut [f32; MAX_CHANNELS as usize]) {
        for (dst, src) in out.iter_mut().zip(&self.channels) {
            *dst = f32::from_bits(src.load(Ordering::Relaxed));
        }
    }
}

/// Graph-to-device routing used when none is set explicitly
///
/// Mono content goes to both channels of the preferred stereo pair, stereo
/// content to the pair itself, anything else by position.
pub(crate) fn default_channel_map(
    graph_channels: usize,
    device_channels: usize,
    stereo_pair: (u16, u16),
) -> Vec<Option<usize>> {
    let mut map = vec![None; device_channels];
    let (left, right) = (usize::from(stereo_pair.0), usize::from(stereo_pair.1));
    let pair_fits = left < device_channels && right < device_channels;

    match graph_channels {
        1 if pair_fits => {
            map[left] = Some(0);
            map[right] = Some(0);
        }
        2 if pair_fits && left != right => {
            map[left] = Some(0);
            map[right] = Some(1);
        }
        _ => {
            for (d, slot) in map.iter_mut().enumerate() {
                if d < graph_channels {
                    *slot = Some(d);
                }
            }
        }
    }
    map
}

impl RenderGraph {
    /// Set the master volume; clamped to [0, 1]
    pub fn set_volume(&self, volume: f32) {
        self.shared.levels.set_volume(volume);
    }

    /// Master volume
    pub fn volume(&self) -> f32 {
        self.shared.levels.volume()
    }

    /// Set the volume of one device channel; clamped to [0, 1]
    ///
    /// # Errors
    /// Configuration error if `channel` is not a device channel
    pub fn set_channel_volume(&self, channel: usize, volume: f32) -> Result<()> {
        self.check_device_channel(channel)?;
        self.shared.levels.set_channel_volume(channel, volume);
        Ok(())
    }

    /// Volume of one device channel
    pub fn channel_volume(&self, channel: usize) -> Result<f32> {
        self.check_device_channel(channel)?;
        self.shared
            .levels
            .channel_volume(channel)
            .ok_or_else(|| SoulError::invalid_layout(format!("no device channel {}", channel)))
    }

    /// Set the mixer input gain; clamped to [0, 1]
    pub fn set_pre_gain(&self, gain: f32) {
        self.shared.levels.set_pre_gain(gain);
    }

    /// Mixer input gain
    pub fn pre_gain(&self) -> f32 {
        self.shared.levels.pre_gain()
    }

    /// Route device channels to graph channels
    ///
    /// `map[d]` names the graph channel feeding device channel `d`, or `None`
    /// for silence. Applies from the next cycle.
    pub fn set_output_channel_map(&mut self, map: Vec<Option<usize>>) -> Result<()> {
        let current = self.shared.snapshot.load_full();
        if map.len() != current.device_channels {
            return Err(SoulError::invalid_layout(format!(
                "channel map has {} entries, device has {} channels",
                map.len(),
                current.device_channels
            )));
        }
        let graph_channels = current.graph_channels();
        if let Some(bad) = map.iter().flatten().find(|&&c| c >= graph_channels) {
            return Err(SoulError::invalid_layout(format!(
                "graph channel {} does not exist ({} channels)",
                bad, graph_channels
            )));
        }

        debug!(?map, "Output channel map set");
        self.custom_channel_map = Some(map.clone());
        let mut next = (*current).clone();
        next.channel_map = map;
        self.publish(next);
        Ok(())
    }

    /// Current device-channel → graph-channel routing
    pub fn output_channel_map(&self) -> Vec<Option<usize>> {
        self.shared.snapshot.load().channel_map.clone()
    }

    /// Set the sample rate converter quality
    ///
    /// A resampling converter already installed is rebuilt at the next cycle
    /// boundary; buffered converter output is discarded.
    ///
    /// # Errors
    /// The converter could not be rebuilt; the previous quality stays in effect
    pub fn set_src_complexity(&mut self, complexity: SrcComplexity) -> Result<()> {
        let previous = self.config.src_complexity;
        if previous == complexity {
            return Ok(());
        }
        self.config.src_complexity = complexity;
        debug!(?complexity, "SRC complexity changed");
        self.rebuild_converter(previous)
    }

    /// Sample rate converter quality
    pub fn src_complexity(&self) -> SrcComplexity {
        self.config.src_complexity
    }

    /// Check if the source is being resampled to the device rate
    pub fn is_performing_sample_rate_conversion(&self) -> bool {
        self.shared
            .lock_slot()
            .converter
            .as_ref()
            .is_some_and(|c| c.is_resampling())
    }

    /// Total output latency in seconds: units, converter and device
    pub fn latency(&self) -> f64 {
        let snapshot = self.shared.snapshot.load();
        let rate = snapshot.format.sample_rate;
        let converter = self
            .shared
            .lock_slot()
            .converter
            .as_ref()
            .map_or(0, |c| c.resampler_delay_frames());
        let device = self
            .device
            .as_ref()
            .map_or(0, |d| d.latency_frames());

        snapshot.latency() + (converter as f64 + f64::from(device)) / rate
    }

    /// Sum of unit tail times in seconds
    pub fn tail_time(&self) -> f64 {
        self.shared.snapshot.load().tail_time()
    }

    fn check_device_channel(&self, channel: usize) -> Result<()> {
        let device_channels = self.shared.snapshot.load().device_channels;
        let limit = if device_channels == 0 {
            usize::from(MAX_CHANNELS)
        } else {
            device_channels.min(usize::from(MAX_CHANNELS))
        };
        if channel >= limit {
            return Err(SoulError::invalid_layout(format!(
                "channel {} out of range ({} channels)",
                channel, limit
            )));
        }
        Ok(())
    }
}

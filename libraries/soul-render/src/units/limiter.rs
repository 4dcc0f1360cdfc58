/// Brick-wall limiter for preventing clipping
///
/// A limiter is a compressor with an infinite ratio: the envelope follows
/// peaks instantly and releases exponentially, and the gain keeps the
/// envelope at or below the threshold. All channels share one envelope so
/// the stereo image does not shift.
use super::{db_to_linear, AudioUnit, ComponentDescriptor, UnitInfo};
use serde::{Deserialize, Serialize};
use soul_core::{Result, SoulError, StreamFormat};
use std::any::Any;

/// Limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Threshold in dB (typical: -0.1 to -3.0)
    pub threshold_db: f32,
    /// Release time in milliseconds
    pub release_ms: f32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            threshold_db: -0.3,
            release_ms: 50.0,
        }
    }
}

impl LimiterSettings {
    /// Aggressive brick-wall limiting
    pub fn brickwall() -> Self {
        Self {
            threshold_db: -0.1,
            release_ms: 100.0,
        }
    }

    /// Soft limiting (more transparent)
    pub fn soft() -> Self {
        Self {
            threshold_db: -1.0,
            release_ms: 200.0,
        }
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.threshold_db.is_nan() || self.threshold_db > 0.0 {
            return Err(SoulError::unsupported(
                "limiter threshold must be negative (in dB)",
            ));
        }
        if self.release_ms.is_nan() || self.release_ms <= 0.0 {
            return Err(SoulError::unsupported("limiter release time must be positive"));
        }
        Ok(())
    }
}

/// Number of samples over which to smooth threshold changes
/// At 44.1kHz, 64 samples = ~1.5ms, which is imperceptible but prevents clicks
const SMOOTH_SAMPLES: u32 = 64;

/// Brick-wall limiter unit (`aufx`/`lmtr`/`soul`)
///
/// # Parameter Smoothing
/// Threshold changes are smoothed over 64 frames (~1.5ms) to prevent
/// audible clicks when adjusting the threshold during playback.
#[derive(Debug, Clone)]
pub struct Limiter {
    settings: LimiterSettings,
    /// Target threshold (set by user, smoothed toward)
    target_threshold_linear: f32,
    /// Active threshold (used for processing, smoothed toward target)
    threshold_linear: f32,
    /// Frames remaining until threshold matches target
    smooth_samples_remaining: u32,
    sample_rate: f64,
    release_coeff: f32,
    envelope: f32,
    enabled: bool,
}

impl Limiter {
    /// Descriptor this unit registers under
    pub const DESCRIPTOR: ComponentDescriptor = ComponentDescriptor::builtin(*b"lmtr");

    /// Create a limiter with default settings
    pub fn new() -> Self {
        Self::build(LimiterSettings::default())
    }

    /// Create a limiter with specific settings
    ///
    /// # Errors
    /// Returns an error if the settings fail validation
    pub fn with_settings(settings: LimiterSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: LimiterSettings) -> Self {
        let threshold_linear = db_to_linear(settings.threshold_db);
        let sample_rate = 44_100.0;

        Self {
            settings,
            target_threshold_linear: threshold_linear,
            threshold_linear,
            smooth_samples_remaining: 0,
            sample_rate,
            release_coeff: Self::calculate_release_coeff(settings.release_ms, sample_rate),
            envelope: 0.0,
            enabled: true,
        }
    }

    /// Set threshold in dB
    ///
    /// The threshold is smoothed over 64 frames to prevent clicks.
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.settings.threshold_db = threshold_db.min(0.0);
        let new_target = db_to_linear(self.settings.threshold_db);

        if (new_target - self.target_threshold_linear).abs() > 1e-6 {
            self.target_threshold_linear = new_target;
            self.smooth_samples_remaining = SMOOTH_SAMPLES;
        }
    }

    /// Set release time in milliseconds
    pub fn set_release(&mut self, release_ms: f32) {
        self.settings.release_ms = release_ms.max(1.0);
        self.release_coeff = Self::calculate_release_coeff(self.settings.release_ms, self.sample_rate);
    }

    /// Get current settings
    pub fn settings(&self) -> LimiterSettings {
        self.settings
    }

    /// Smooth threshold toward target value
    #[inline]
    fn smooth_threshold(&mut self) {
        if self.smooth_samples_remaining == 0 {
            return;
        }

        let alpha = 1.0 / self.smooth_samples_remaining as f32;
        self.threshold_linear += alpha * (self.target_threshold_linear - self.threshold_linear);
        self.smooth_samples_remaining -= 1;

        if self.smooth_samples_remaining == 0 {
            self.threshold_linear = self.target_threshold_linear;
        }
    }

    /// Calculate release coefficient for given sample rate
    fn calculate_release_coeff(release_ms: f32, sample_rate: f64) -> f32 {
        let release_samples = (f64::from(release_ms) / 1000.0 * sample_rate) as f32;
        (-1.0 / release_samples.max(1.0)).exp()
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioUnit for Limiter {
    fn initialize(&mut self, format: &StreamFormat, _max_frames: usize) -> Result<()> {
        self.sample_rate = format.sample_rate;
        self.release_coeff = Self::calculate_release_coeff(self.settings.release_ms, self.sample_rate);
        Ok(())
    }

    fn process(&mut self, buffer: &mut [f32], channels: usize) {
        if !self.enabled || channels == 0 {
            return;
        }

        for frame in buffer.chunks_exact_mut(channels) {
            self.smooth_threshold();

            let peak = frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));

            if peak > self.envelope {
                // Instant attack
                self.envelope = peak;
            } else {
                self.envelope = peak + self.release_coeff * (self.envelope - peak);
            }

            let gain = if self.envelope > self.threshold_linear {
                self.threshold_linear / self.envelope
            } else {
                1.0
            };

            for sample in frame {
                *sample *= gain;
            }
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.threshold_linear = self.target_threshold_linear;
        self.smooth_samples_remaining = 0;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            descriptor: Self::DESCRIPTOR,
            display_name: "Limiter",
            description: "Brick-wall peak limiter",
            supports_in_place_update: true,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn update_parameters(&mut self, params: &dyn Any) -> bool {
        if let Some(settings) = params.downcast_ref::<LimiterSettings>() {
            if settings.validate().is_err() {
                return false;
            }
            self.set_threshold(settings.threshold_db);
            self.set_release(settings.release_ms);
            true
        } else {
            false
        }
    }
}

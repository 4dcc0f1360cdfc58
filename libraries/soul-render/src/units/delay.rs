/// Feedback delay (echo)
///
/// The delay line is allocated in `initialize`; `process` only reads and
/// writes it. The unit's tail time is how long the echoes take to decay
/// below -60 dB.
use super::{AudioUnit, ComponentDescriptor, UnitInfo};
use serde::{Deserialize, Serialize};
use soul_core::{Result, SoulError, StreamFormat};
use std::any::Any;

/// Longest supported delay
const MAX_DELAY_MS: f32 = 2000.0;
/// Highest feedback that still decays in reasonable time
const MAX_FEEDBACK: f32 = 0.95;
/// Echo level at which the tail is considered gone (-60 dB)
const TAIL_FLOOR: f64 = 1e-3;

/// Delay settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySettings {
    /// Delay time in milliseconds (1 to 2000)
    pub time_ms: f32,
    /// Portion of the delayed signal fed back (0.0 to 0.95)
    pub feedback: f32,
    /// Dry/wet mix (0.0 = dry, 1.0 = wet)
    pub mix: f32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            time_ms: 250.0,
            feedback: 0.35,
            mix: 0.3,
        }
    }
}

impl DelaySettings {
    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !(1.0..=MAX_DELAY_MS).contains(&self.time_ms) {
            return Err(SoulError::unsupported(format!(
                "delay time {} ms outside 1-{} ms",
                self.time_ms, MAX_DELAY_MS
            )));
        }
        if !(0.0..=MAX_FEEDBACK).contains(&self.feedback) {
            return Err(SoulError::unsupported(format!(
                "delay feedback {} outside 0-{}",
                self.feedback, MAX_FEEDBACK
            )));
        }
        if !(0.0..=1.0).contains(&self.mix) {
            return Err(SoulError::unsupported(format!(
                "delay mix {} outside 0-1",
                self.mix
            )));
        }
        Ok(())
    }
}

/// Feedback delay unit (`aufx`/`dely`/`soul`)
#[derive(Debug, Clone)]
pub struct Delay {
    settings: DelaySettings,
    /// Interleaved delay line, `delay_frames * channels` samples
    line: Vec<f32>,
    delay_frames: usize,
    channels: usize,
    sample_rate: f64,
    position: usize,
    enabled: bool,
}

impl Delay {
    /// Descriptor this unit registers under
    pub const DESCRIPTOR: ComponentDescriptor = ComponentDescriptor::builtin(*b"dely");

    /// Create a delay with default settings
    pub fn new() -> Self {
        Self::build(DelaySettings::default())
    }

    /// Create a delay with specific settings
    ///
    /// # Errors
    /// Returns an error if the settings fail validation
    pub fn with_settings(settings: DelaySettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: DelaySettings) -> Self {
        Self {
            settings,
            line: Vec::new(),
            delay_frames: 0,
            channels: 0,
            sample_rate: 0.0,
            position: 0,
            enabled: true,
        }
    }

    /// Get current settings
    pub fn settings(&self) -> DelaySettings {
        self.settings
    }

    /// Replace the settings
    ///
    /// Resizes the delay line when the unit is initialised, so call this from
    /// the control context only.
    ///
    /// # Errors
    /// Returns an error if the settings fail validation
    pub fn set_settings(&mut self, settings: DelaySettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        if self.channels > 0 {
            self.allocate();
        }
        Ok(())
    }

    /// Delay time in frames at the initialised rate
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    fn allocate(&mut self) {
        self.delay_frames =
            ((f64::from(self.settings.time_ms) / 1000.0 * self.sample_rate).round() as usize).max(1);
        self.line = vec![0.0; self.delay_frames * self.channels];
        self.position = 0;
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioUnit for Delay {
    fn initialize(&mut self, format: &StreamFormat, _max_frames: usize) -> Result<()> {
        self.sample_rate = format.sample_rate;
        self.channels = usize::from(format.channels);
        self.allocate();
        Ok(())
    }

    fn process(&mut self, buffer: &mut [f32], channels: usize) {
        if !self.enabled || channels == 0 || channels != self.channels || self.line.is_empty() {
            return;
        }

        let DelaySettings { feedback, mix, .. } = self.settings;
        for frame in buffer.chunks_exact_mut(channels) {
            let slot = &mut self.line[self.position * channels..(self.position + 1) * channels];
            for (sample, delayed) in frame.iter_mut().zip(slot.iter_mut()) {
                let echo = *delayed;
                *delayed = *sample + echo * feedback;
                *sample = *sample * (1.0 - mix) + echo * mix;
            }
            self.position = (self.position + 1) % self.delay_frames;
        }
    }

    fn reset(&mut self) {
        self.line.fill(0.0);
        self.position = 0;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn tail_time(&self) -> f64 {
        let delay = f64::from(self.settings.time_ms) / 1000.0;
        let feedback = f64::from(self.settings.feedback);
        let repeats = if feedback > 0.0 {
            (TAIL_FLOOR.ln() / feedback.ln()).ceil()
        } else {
            0.0
        };
        delay * (1.0 + repeats)
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            descriptor: Self::DESCRIPTOR,
            display_name: "Delay",
            description: "Feedback echo",
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
        if let Some(settings) = params.downcast_ref::<DelaySettings>() {
            self.set_settings(*settings).is_ok()
        } else {
            false
        }
    }
}

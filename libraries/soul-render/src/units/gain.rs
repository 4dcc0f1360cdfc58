/// Static gain stage
///
/// Gain changes are ramped over one slice so parameter updates never click.
use super::{db_to_linear, AudioUnit, ComponentDescriptor, UnitInfo};
use soul_core::{Result, StreamFormat};
use std::any::Any;

/// Allowed gain range in dB
const MIN_GAIN_DB: f32 = -96.0;
const MAX_GAIN_DB: f32 = 24.0;

/// Gain unit (`aufx`/`gain`/`soul`)
#[derive(Debug, Clone)]
pub struct Gain {
    gain_db: f32,
    target: f32,
    current: f32,
    enabled: bool,
}

impl Gain {
    /// Descriptor this unit registers under
    pub const DESCRIPTOR: ComponentDescriptor = ComponentDescriptor::builtin(*b"gain");

    /// Unity gain
    pub fn new() -> Self {
        Self::from_db(0.0)
    }

    /// Gain in dB, clamped to -96..=+24
    pub fn from_db(gain_db: f32) -> Self {
        let gain_db = Self::clamp_db(gain_db);
        let linear = db_to_linear(gain_db);
        Self {
            gain_db,
            target: linear,
            current: linear,
            enabled: true,
        }
    }

    /// Set gain in dB (clamped); ramps in over the next slice
    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = Self::clamp_db(gain_db);
        self.target = db_to_linear(self.gain_db);
    }

    /// Gain in dB
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    fn clamp_db(gain_db: f32) -> f32 {
        if gain_db.is_nan() {
            0.0
        } else {
            gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
        }
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioUnit for Gain {
    fn initialize(&mut self, _format: &StreamFormat, _max_frames: usize) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, buffer: &mut [f32], channels: usize) {
        if !self.enabled || channels == 0 {
            return;
        }

        let frames = buffer.len() / channels;
        if self.current == self.target || frames == 0 {
            if self.current != 1.0 {
                for sample in buffer.iter_mut() {
                    *sample *= self.current;
                }
            }
            return;
        }

        let step = (self.target - self.current) / frames as f32;
        for frame in buffer.chunks_exact_mut(channels) {
            self.current += step;
            for sample in frame {
                *sample *= self.current;
            }
        }
        self.current = self.target;
    }

    fn reset(&mut self) {
        self.current = self.target;
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
            display_name: "Gain",
            description: "Static gain in dB",
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
        if let Some(db) = params.downcast_ref::<f32>() {
            self.set_gain_db(*db);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_gain_is_transparent() {
        let mut gain = Gain::new();
        let mut buffer = [0.25, -0.5, 1.0, 0.0];
        gain.process(&mut buffer, 2);
        assert_eq!(buffer, [0.25, -0.5, 1.0, 0.0]);
    }

    #[test]
    fn gain_change_ramps_to_target() {
        let mut gain = Gain::new();
        gain.set_gain_db(-6.0);

        let mut buffer = vec![1.0; 8];
        gain.process(&mut buffer, 2);
        // Ramp ends exactly on the target
        assert!((buffer[7] - db_to_linear(-6.0)).abs() < 1e-6);
        assert!(buffer[0] > buffer[7]);

        let mut buffer = vec![1.0; 4];
        gain.process(&mut buffer, 2);
        assert!(buffer.iter().all(|s| (s - db_to_linear(-6.0)).abs() < 1e-6));
    }

    #[test]
    fn gain_is_clamped() {
        assert_eq!(Gain::from_db(100.0).gain_db(), MAX_GAIN_DB);
        assert_eq!(Gain::from_db(f32::NAN).gain_db(), 0.0);
    }

    #[test]
    fn disabled_gain_bypasses() {
        let mut gain = Gain::from_db(-20.0);
        gain.set_enabled(false);
        let mut buffer = [1.0, 1.0];
        gain.process(&mut buffer, 2);
        assert_eq!(buffer, [1.0, 1.0]);
    }
}

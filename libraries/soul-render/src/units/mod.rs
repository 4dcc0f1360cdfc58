//! Audio Units
//!
//! Processing nodes that sit between the mixer and the output node of a
//! render graph. Units are created from a [`ComponentDescriptor`] through the
//! [`UnitRegistry`] and processed in signal-flow order.

mod delay;
mod descriptor;
mod gain;
mod limiter;
mod registry;

pub use delay::{Delay, DelaySettings};
pub use descriptor::{ComponentDescriptor, FourCharCode};
pub use gain::Gain;
pub use limiter::{Limiter, LimiterSettings};
pub use registry::{CreateFn, UnitFactory, UnitRegistry};

use soul_core::{Result, StreamFormat};
use std::any::Any;

/// Information about a unit for introspection
#[derive(Debug, Clone, PartialEq)]
pub struct UnitInfo {
    /// Descriptor the unit answers to
    pub descriptor: ComponentDescriptor,
    /// Human-readable name
    pub display_name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Whether this unit supports in-place parameter updates
    pub supports_in_place_update: bool,
}

/// Base trait for all audio units
///
/// # Real-Time Constraints
/// `process()` runs on the device's render thread and must not allocate,
/// lock, or perform I/O. Everything it needs is sized in `initialize()`.
pub trait AudioUnit: Send {
    /// Prepare for processing at `format`, for slices of up to `max_frames` frames
    ///
    /// Called from the control context, before the first `process()` and again
    /// whenever the graph renegotiates. May allocate.
    fn initialize(&mut self, format: &StreamFormat, max_frames: usize) -> Result<()>;

    /// Process interleaved `f32` samples in-place
    ///
    /// # Arguments
    /// * `buffer` - Interleaved samples, `channels` per frame
    /// * `channels` - Channel count of the graph format
    fn process(&mut self, buffer: &mut [f32], channels: usize);

    /// Clear processing state (delay lines, envelopes)
    fn reset(&mut self);

    /// Enable/disable the unit
    fn set_enabled(&mut self, enabled: bool);

    /// Check if unit is enabled
    fn is_enabled(&self) -> bool;

    /// Processing latency in seconds
    fn latency(&self) -> f64 {
        0.0
    }

    /// Time the unit keeps producing output after its input goes silent, in seconds
    fn tail_time(&self) -> f64 {
        0.0
    }

    /// Slice size the unit needs, if larger than the graph default
    fn preferred_slice_frames(&self) -> Option<usize> {
        None
    }

    /// Get unit information
    fn info(&self) -> UnitInfo;

    /// Get a reference to self as Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Get a mutable reference to self as Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Update parameters in-place from a generic parameters object
    ///
    /// Returns true if the update was applied, false on a type mismatch.
    fn update_parameters(&mut self, _params: &dyn Any) -> bool {
        false
    }
}

/// Convert dB to linear gain
#[inline]
pub(crate) fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestUnit {
        enabled: bool,
        gain: f32,
    }

    impl AudioUnit for TestUnit {
        fn initialize(&mut self, _format: &StreamFormat, _max_frames: usize) -> Result<()> {
            Ok(())
        }

        fn process(&mut self, buffer: &mut [f32], _channels: usize) {
            if self.enabled {
                for sample in buffer.iter_mut() {
                    *sample *= self.gain;
                }
            }
        }

        fn reset(&mut self) {}

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn info(&self) -> UnitInfo {
            UnitInfo {
                descriptor: ComponentDescriptor::effect(FourCharCode::new(*b"test"), FourCharCode::new(*b"soul")),
                display_name: "Test Unit",
                description: "A test unit",
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
            if let Some(gain) = params.downcast_ref::<f32>() {
                self.gain = *gain;
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn test_default_timing_is_zero() {
        let unit = TestUnit {
            enabled: true,
            gain: 1.0,
        };
        assert_eq!(unit.latency(), 0.0);
        assert_eq!(unit.tail_time(), 0.0);
        assert!(unit.preferred_slice_frames().is_none());
    }

    #[test]
    fn test_in_place_update() {
        let mut unit = TestUnit {
            enabled: true,
            gain: 1.0,
        };

        assert!(unit.update_parameters(&0.5f32));
        assert!(!unit.update_parameters(&"wrong"));

        let mut buffer = [1.0, -1.0];
        unit.process(&mut buffer, 2);
        assert_eq!(buffer, [0.5, -0.5]);
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0) - 0.501_187).abs() < 1e-4);
    }
}

//! Render graph configuration

use crate::resampling::SrcComplexity;
use serde::{Deserialize, Serialize};
use soul_core::{Result, SoulError};
use std::time::Duration;

/// Largest slice the graph will negotiate
pub const MAX_FRAMES_PER_SLICE: usize = 16_384;

/// Render graph settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Minimum frames per slice; the device or a unit may raise it
    pub max_frames_per_slice: usize,

    /// Sample rate converter quality for the source
    pub src_complexity: SrcComplexity,

    /// Master volume (0.0 to 1.0)
    pub volume: f32,

    /// Mixer input gain (0.0 to 1.0)
    pub pre_gain: f32,

    /// Stop automatically once the source and every unit tail have finished
    pub stop_when_drained: bool,

    /// How long `stop()` waits for the in-flight render cycle
    pub stop_timeout_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_frames_per_slice: 512,
            src_complexity: SrcComplexity::Normal,
            volume: 1.0,
            pre_gain: 1.0,
            stop_when_drained: false,
            stop_timeout_ms: 500,
        }
    }
}

impl GraphConfig {
    /// Stop timeout as a [`Duration`]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.max_frames_per_slice == 0 || self.max_frames_per_slice > MAX_FRAMES_PER_SLICE {
            return Err(SoulError::unsupported(format!(
                "max frames per slice must be 1-{}, got {}",
                MAX_FRAMES_PER_SLICE, self.max_frames_per_slice
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.max_frames_per_slice, 512);
        assert_eq!(config.src_complexity, SrcComplexity::Normal);
        assert_eq!(config.stop_timeout(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{ "src_complexity": "mastering", "volume": 0.5 }"#).unwrap();
        assert_eq!(config.src_complexity, SrcComplexity::Mastering);
        assert_eq!(config.volume, 0.5);
        assert_eq!(config.max_frames_per_slice, 512);
    }

    #[test]
    fn zero_slice_is_rejected() {
        let config = GraphConfig {
            max_frames_per_slice: 0,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

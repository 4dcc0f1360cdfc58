/// Command-line configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use soul_render::graph::GraphConfig;
use soul_render::units::{ComponentDescriptor, Delay, DelaySettings, Gain, Limiter, LimiterSettings};
use std::any::Any;
use std::path::{Path, PathBuf};

/// Config file read when no path is given and it exists
pub const DEFAULT_CONFIG_FILE: &str = "soul-render.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Output device name; the system default when unset
    #[serde(default)]
    pub device: Option<String>,

    /// Device sample rate to request before starting
    #[serde(default)]
    pub device_sample_rate: Option<f64>,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub tone: ToneSettings,

    /// Effect chain, in processing order
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToneSettings {
    pub frequency: f64,
    pub seconds: f64,
    pub sample_rate: f64,
    pub channels: u16,
    pub amplitude: f32,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            seconds: 2.0,
            sample_rate: 44_100.0,
            channels: 2,
            amplitude: 0.5,
        }
    }
}

/// One effect in the chain
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EffectConfig {
    Gain { gain_db: f32 },
    Delay(DelaySettings),
    Limiter(LimiterSettings),
}

impl EffectConfig {
    /// Descriptor to instantiate
    pub fn descriptor(&self) -> ComponentDescriptor {
        match self {
            Self::Gain { .. } => Gain::DESCRIPTOR,
            Self::Delay(_) => Delay::DESCRIPTOR,
            Self::Limiter(_) => Limiter::DESCRIPTOR,
        }
    }

    /// Factory parameters for the registry
    pub fn params(&self) -> &dyn Any {
        match self {
            Self::Gain { gain_db } => gain_db,
            Self::Delay(settings) => settings,
            Self::Limiter(settings) => settings,
        }
    }

    /// Parse the `--effect` shorthand: `gain:-6`, `delay`, `limiter`
    pub fn parse(arg: &str) -> Result<Self> {
        let (name, value) = match arg.split_once(':') {
            Some((name, value)) => (name, Some(value)),
            None => (arg, None),
        };
        match (name.trim().to_ascii_lowercase().as_str(), value) {
            ("gain", Some(db)) => Ok(Self::Gain {
                gain_db: db
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid gain '{}'", db))?,
            }),
            ("gain", None) => Ok(Self::Gain { gain_db: 0.0 }),
            ("delay", Some(ms)) => Ok(Self::Delay(DelaySettings {
                time_ms: ms
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid delay time '{}'", ms))?,
                ..DelaySettings::default()
            })),
            ("delay", None) => Ok(Self::Delay(DelaySettings::default())),
            ("limiter", None) => Ok(Self::Limiter(LimiterSettings::default())),
            ("limiter", Some(db)) => Ok(Self::Limiter(LimiterSettings {
                threshold_db: db
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid limiter threshold '{}'", db))?,
                ..LimiterSettings::default()
            })),
            _ => bail!("unknown effect '{}' (expected gain, delay or limiter)", arg),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Gain { gain_db } if gain_db.is_nan() => bail!("gain must be a number"),
            Self::Gain { .. } => {}
            Self::Delay(settings) => settings.validate()?,
            Self::Limiter(settings) => settings.validate()?,
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; otherwise [`DEFAULT_CONFIG_FILE`] is read
    /// if present. Environment variables prefixed with `SOUL_` override the
    /// file, with `__` between nested keys (`SOUL_GRAPH__VOLUME=0.5`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = Self::file_source(path)?.add_source(
            config::Environment::with_prefix("SOUL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self::build(settings)
    }

    /// Load configuration from a file only
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::build(Self::file_source(Some(path))?)
    }

    fn file_source(
        path: Option<&Path>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let mut settings = config::Config::builder();
        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("config file {} does not exist", path.display());
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }
        Ok(settings)
    }

    fn build(settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Self = settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;

        let tone = &self.tone;
        if !(tone.sample_rate.is_finite() && tone.sample_rate > 0.0) {
            bail!("tone sample rate must be positive, got {}", tone.sample_rate);
        }
        if !(tone.frequency > 0.0 && tone.frequency < tone.sample_rate / 2.0) {
            bail!(
                "tone frequency {} Hz must be between 0 and {} Hz",
                tone.frequency,
                tone.sample_rate / 2.0
            );
        }
        if !(tone.seconds.is_finite() && tone.seconds > 0.0) {
            bail!("tone length must be positive, got {} s", tone.seconds);
        }
        if tone.channels == 0 || tone.channels > 2 {
            bail!("tone channels must be 1 or 2, got {}", tone.channels);
        }
        if !(0.0..=1.0).contains(&tone.amplitude) {
            bail!("tone amplitude must be 0-1, got {}", tone.amplitude);
        }

        for effect in &self.effects {
            effect.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.device.is_none());
        assert!(config.effects.is_empty());
    }

    #[test]
    fn test_parse_effect_shorthand() {
        assert_eq!(
            EffectConfig::parse("gain:-6").unwrap(),
            EffectConfig::Gain { gain_db: -6.0 }
        );
        match EffectConfig::parse("delay:120").unwrap() {
            EffectConfig::Delay(settings) => assert_eq!(settings.time_ms, 120.0),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            EffectConfig::parse("LIMITER").unwrap(),
            EffectConfig::Limiter(LimiterSettings::default())
        );
        assert!(EffectConfig::parse("reverb").is_err());
        assert!(EffectConfig::parse("gain:loud").is_err());
    }

    #[test]
    fn test_effect_params_match_factories() {
        let effect = EffectConfig::Gain { gain_db: -3.0 };
        assert_eq!(effect.descriptor(), Gain::DESCRIPTOR);
        assert_eq!(effect.params().downcast_ref::<f32>(), Some(&-3.0));

        let effect = EffectConfig::Limiter(LimiterSettings::soft());
        assert!(effect
            .params()
            .downcast_ref::<LimiterSettings>()
            .is_some());
    }

    #[test]
    fn test_tone_above_nyquist_is_rejected() {
        let mut config = AppConfig::default();
        config.tone.frequency = 30_000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_delay_is_rejected() {
        let mut config = AppConfig::default();
        config.effects.push(EffectConfig::Delay(DelaySettings {
            time_ms: 0.0,
            ..DelaySettings::default()
        }));
        assert!(config.validate().is_err());
    }
}

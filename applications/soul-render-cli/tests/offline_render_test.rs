//! Configuration loading and offline rendering through the CLI library

use soul_render::resampling::SrcComplexity;
use soul_render::units::DelaySettings;
use soul_render_cli::{render_offline, AppConfig, EffectConfig};
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("soul-render.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
device = "USB DAC"

[graph]
max_frames_per_slice = 1024
src_complexity = "mastering"
volume = 0.8

[tone]
frequency = 1000.0
seconds = 0.25

[[effects]]
type = "gain"
gain_db = -6.0

[[effects]]
type = "delay"
time_ms = 100.0
feedback = 0.2
mix = 0.5

[[effects]]
type = "limiter"
threshold_db = -1.0
release_ms = 80.0
"#,
    );

    let config = AppConfig::from_file(&path).unwrap();
    assert_eq!(config.device.as_deref(), Some("USB DAC"));
    assert_eq!(config.graph.max_frames_per_slice, 1024);
    assert_eq!(config.graph.src_complexity, SrcComplexity::Mastering);
    assert_eq!(config.graph.stop_timeout_ms, 500);
    assert_eq!(config.tone.frequency, 1000.0);
    assert_eq!(config.tone.channels, 2);
    assert_eq!(config.effects.len(), 3);
    assert_eq!(config.effects[0], EffectConfig::Gain { gain_db: -6.0 });
    assert_eq!(
        config.effects[1],
        EffectConfig::Delay(DelaySettings {
            time_ms: 100.0,
            feedback: 0.2,
            mix: 0.5,
        })
    );
}

#[test]
fn test_empty_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    let config = AppConfig::from_file(&path).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[graph]\nmax_frames_per_slice = 0\n");
    assert!(AppConfig::from_file(&path).is_err());

    let path = write_config(&dir, "[[effects]]\ntype = \"reverb\"\n");
    assert!(AppConfig::from_file(&path).is_err());
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(AppConfig::from_file(&dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_offline_render_drains_tone() {
    let mut config = AppConfig::default();
    config.tone.seconds = 0.1;

    let report = render_offline(&config, 48_000.0, 2, 512).unwrap();
    assert!(report.drained);
    assert_eq!(report.stats.source_frames, 4_800);
    assert_eq!(report.stats.frames_rendered % 512, 0);
    assert!(report.stats.frames_rendered >= 4_800);
    assert_eq!(report.stats.source_errors, 0);
}

#[test]
fn test_offline_render_with_delay_renders_tail() {
    let mut config = AppConfig::default();
    config.tone.seconds = 0.05;
    let dry = render_offline(&config, 48_000.0, 2, 256).unwrap();

    config.effects.push(EffectConfig::parse("delay:50").unwrap());
    let wet = render_offline(&config, 48_000.0, 2, 256).unwrap();

    assert!(wet.drained);
    assert_eq!(wet.stats.source_frames, dry.stats.source_frames);
    assert!(wet.stats.frames_rendered > dry.stats.frames_rendered);
}

//! Soul Render command-line front end
//!
//! Loads [`config::AppConfig`], builds a render graph with a generated tone
//! and the configured effect chain, and plays it on a cpal device or renders
//! it offline.

pub mod config;
pub mod session;

pub use config::{AppConfig, EffectConfig, ToneSettings};
pub use session::{configure_graph, play, render_offline, RunReport};

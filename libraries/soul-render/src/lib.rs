//! Soul Render
//!
//! Real-time audio output pipeline: format conversion, a linear render graph
//! of audio units, and the device property interface the graph renders for.
//!
//! This crate provides:
//! - **Format conversion** ([`converter`]): any supported PCM format, rate and
//!   channel layout to any other, with exact output length
//! - **Render graph** ([`graph`]): `[mixer, effects…, output]`, reconfigurable
//!   from a control thread while a real-time thread renders
//! - **Audio units** ([`units`]): gain, limiter and delay, instantiated by
//!   four-character-code descriptor
//! - **Devices** ([`device`]): the property interface plus an in-memory device
//!   for offline rendering
//!
//! Platform output (cpal) lives in `soul-render-desktop`.
//!
//! # Example: Offline Render
//!
//! ```rust
//! use std::sync::Arc;
//! use soul_render::device::VirtualDevice;
//! use soul_render::graph::{GraphConfig, RenderGraph};
//! use soul_render::sources::ToneSource;
//! use soul_render::units::Gain;
//!
//! let mut graph = RenderGraph::new(GraphConfig::default());
//! graph.open(Arc::new(VirtualDevice::new("offline", 48_000.0, 2))).unwrap();
//! graph.set_source(Box::new(ToneSource::new(44_100.0, 1, 440.0, 0.5))).unwrap();
//! let gain = graph.add_effect(&Gain::DESCRIPTOR).unwrap();
//! graph.update_effect(gain, &-6.0f32).unwrap();
//! graph.start().unwrap();
//!
//! let render = graph.render_handle();
//! let mut output = vec![0.0f32; 512 * 2];
//! while !graph.is_end_of_stream() {
//!     render.render(&mut output, 512);
//! }
//! assert!(graph.is_performing_sample_rate_conversion());
//! ```

#![forbid(unsafe_code)]

pub mod converter;
pub mod device;
pub mod graph;
pub mod resampling;
pub mod sources;
pub mod units;

pub use converter::Converter;
pub use device::{OutputDevice, VirtualDevice};
pub use graph::{GraphConfig, GraphState, NodeHandle, RenderGraph, RenderHandle, RenderStatus};
pub use resampling::SrcComplexity;
pub use units::{AudioUnit, ComponentDescriptor};

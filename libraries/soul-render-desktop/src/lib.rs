//! Desktop audio output for the render graph using CPAL
//!
//! [`CpalOutput`] binds a [`soul_render::RenderGraph`] to a CPAL output
//! device. The device callback pulls every buffer through the graph; control
//! operations stay on the calling thread.
//!
//! # Features
//!
//! - Cross-platform audio output using CPAL
//! - Device enumeration with the default device first
//! - Device sample rate changes with graph renegotiation
//! - Measured output latency
//!
//! # Example
//!
//! ```no_run
//! use soul_render::graph::GraphConfig;
//! use soul_render::sources::ToneSource;
//! use soul_render_desktop::CpalOutput;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut output = CpalOutput::new(GraphConfig::default())?;
//! output
//!     .graph_mut()
//!     .set_source(Box::new(ToneSource::new(44_100.0, 2, 440.0, 2.0)))?;
//! output.graph_mut().set_stop_when_drained(true);
//!
//! output.start()?;
//! std::thread::sleep(std::time::Duration::from_secs(2));
//! output.stop()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod device;
mod error;
mod output;

pub use device::{default_device, find_device, list_devices, AudioDeviceInfo, CpalDevice};
pub use error::{AudioError, Result};
pub use output::CpalOutput;

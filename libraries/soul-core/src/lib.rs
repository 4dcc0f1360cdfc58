//! Soul Render Core
//!
//! Platform-agnostic types, traits, and error handling shared by the Soul
//! Render pipeline crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Stream types**: `StreamFormat`, `ChannelLayout`, `AudioBufferList`
//! - **Core traits**: `DecoderSource`, the pull interface every PCM source implements
//! - **Error handling**: unified `SoulError` (with `ErrorDomain` and numeric codes) and `Result`
//!
//! # Example
//!
//! ```rust
//! use soul_core::types::{AudioBufferList, ChannelLayout, StreamFormat};
//!
//! // CD audio, described the way every pipeline stage sees it
//! let format = StreamFormat::pcm_i16(44_100.0, 2);
//! assert!(format.validate().is_ok());
//!
//! // A caller-owned buffer for 512 frames of it
//! let buffer = AudioBufferList::new(format, 512);
//! assert_eq!(buffer.plane(0).len(), 512 * 4);
//!
//! assert!(ChannelLayout::stereo().is_stereo());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorDomain, Result, SoulError};
pub use traits::DecoderSource;
pub use types::{
    AudioBufferList, ByteOrder, ChannelLabel, ChannelLayout, SampleKind, StreamFormat,
    MAX_CHANNELS, MAX_SAMPLE_RATE,
};

mod buffer;
mod format;
mod layout;

pub use buffer::AudioBufferList;
pub use format::{ByteOrder, SampleKind, StreamFormat, MAX_CHANNELS, MAX_SAMPLE_RATE};
pub use layout::{ChannelLabel, ChannelLayout};

/// Core traits for Soul Render
use crate::error::{Result, SoulError};
use crate::types::{AudioBufferList, ChannelLayout, StreamFormat};

/// Pull-based PCM source
///
/// Implementers produce a finite sequence of frames in their own
/// [`StreamFormat`]. A converter owns its source exclusively and is the only
/// caller of these methods, so implementations need no internal locking.
pub trait DecoderSource: Send {
    /// Prepare the source for reading
    ///
    /// # Errors
    /// Returns an error if the underlying stream cannot be opened
    fn open(&mut self) -> Result<()>;

    /// Release the underlying stream
    fn close(&mut self) -> Result<()>;

    /// Check if the source is open
    fn is_open(&self) -> bool;

    /// Format of the frames this source produces
    fn format(&self) -> StreamFormat;

    /// Channel roles, if the source knows them
    fn channel_layout(&self) -> Option<ChannelLayout> {
        None
    }

    /// Read up to `frame_count` frames into `buffer`, starting at frame 0
    ///
    /// `buffer` is in [`DecoderSource::format`]. Reads are bounded by the
    /// buffer's capacity. Short reads are allowed at any time; `Ok(0)` means
    /// end of stream.
    ///
    /// # Errors
    /// Returns an error if the source is not open or reading fails
    fn read_frames(&mut self, buffer: &mut AudioBufferList, frame_count: usize) -> Result<usize>;

    /// Reposition to the first frame
    fn reset(&mut self) -> Result<()>;

    /// Total length in frames, if known
    fn total_frames(&self) -> Option<u64> {
        None
    }

    /// Index of the next frame `read_frames` will return
    fn current_frame(&self) -> u64;

    /// Check if [`DecoderSource::seek_to_frame`] is supported
    fn supports_seeking(&self) -> bool {
        false
    }

    /// Reposition to `frame`, returning the frame actually reached
    ///
    /// # Errors
    /// Returns an error if seeking is unsupported or `frame` is out of range
    fn seek_to_frame(&mut self, frame: u64) -> Result<u64> {
        let _ = frame;
        Err(SoulError::unsupported("seeking"))
    }
}

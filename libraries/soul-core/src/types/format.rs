/// Stream format description for one side of a conversion
use crate::error::{Result, SoulError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest channel count any pipeline stage accepts
pub const MAX_CHANNELS: u16 = 32;

/// Highest sample rate any pipeline stage accepts (Hz)
pub const MAX_SAMPLE_RATE: f64 = 1_000_000.0;

/// How each sample is represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Two's complement signed integer
    SignedInt,
    /// Offset-binary unsigned integer (silence at the midpoint)
    UnsignedInt,
    /// IEEE 754 floating point, nominal range [-1.0, 1.0]
    Float,
}

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl ByteOrder {
    /// Byte order of the host CPU
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;

    /// Byte order of the host CPU
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;
}

/// PCM stream format
///
/// A format is a plain value: pipeline stages copy it when they open and never
/// observe later changes. Reopen the stage to change it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Frames per second
    pub sample_rate: f64,

    /// Sample representation
    pub sample_kind: SampleKind,

    /// Bits per sample (24-bit samples are packed in 3 bytes)
    pub bits_per_sample: u16,

    /// Number of channels (1 = mono, 2 = stereo, etc.)
    pub channels: u16,

    /// One plane with channels interleaved, or one plane per channel
    pub interleaved: bool,

    /// Byte order of each sample
    pub byte_order: ByteOrder,
}

impl StreamFormat {
    /// Create an interleaved, native-endian format
    pub fn new(sample_rate: f64, sample_kind: SampleKind, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            sample_kind,
            bits_per_sample,
            channels,
            interleaved: true,
            byte_order: ByteOrder::NATIVE,
        }
    }

    /// Unsigned 8-bit PCM
    pub fn pcm_u8(sample_rate: f64, channels: u16) -> Self {
        Self::new(sample_rate, SampleKind::UnsignedInt, 8, channels)
    }

    /// Signed 16-bit PCM, little-endian
    pub fn pcm_i16(sample_rate: f64, channels: u16) -> Self {
        Self::new(sample_rate, SampleKind::SignedInt, 16, channels).with_byte_order(ByteOrder::Little)
    }

    /// Signed packed 24-bit PCM, little-endian
    pub fn pcm_i24(sample_rate: f64, channels: u16) -> Self {
        Self::new(sample_rate, SampleKind::SignedInt, 24, channels).with_byte_order(ByteOrder::Little)
    }

    /// Signed 32-bit PCM, little-endian
    pub fn pcm_i32(sample_rate: f64, channels: u16) -> Self {
        Self::new(sample_rate, SampleKind::SignedInt, 32, channels).with_byte_order(ByteOrder::Little)
    }

    /// Native-endian interleaved 32-bit float, the format render graphs process in
    pub fn float32(sample_rate: f64, channels: u16) -> Self {
        Self::new(sample_rate, SampleKind::Float, 32, channels)
    }

    /// Native-endian planar 32-bit float
    pub fn float32_planar(sample_rate: f64, channels: u16) -> Self {
        Self::float32(sample_rate, channels).planar()
    }

    /// Native-endian interleaved 64-bit float
    pub fn float64(sample_rate: f64, channels: u16) -> Self {
        Self::new(sample_rate, SampleKind::Float, 64, channels)
    }

    /// Copy of this format at a different sample rate
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Copy of this format with a different channel count
    #[must_use]
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Copy of this format with a different byte order
    #[must_use]
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Planar copy of this format
    #[must_use]
    pub fn planar(mut self) -> Self {
        self.interleaved = false;
        self
    }

    /// Interleaved copy of this format
    #[must_use]
    pub fn interleaved(mut self) -> Self {
        self.interleaved = true;
        self
    }

    /// Bytes occupied by one sample
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample).div_ceil(8)
    }

    /// Bytes occupied by one frame within a single plane
    pub fn bytes_per_frame(&self) -> usize {
        if self.interleaved {
            self.bytes_per_sample() * usize::from(self.channels)
        } else {
            self.bytes_per_sample()
        }
    }

    /// Number of planes a buffer in this format has
    pub fn plane_count(&self) -> usize {
        if self.interleaved {
            1
        } else {
            usize::from(self.channels)
        }
    }

    /// Whether the sample representation is one the pipeline can read and write
    pub fn is_supported_representation(&self) -> bool {
        matches!(
            (self.sample_kind, self.bits_per_sample),
            (SampleKind::SignedInt, 8 | 16 | 24 | 32)
                | (SampleKind::UnsignedInt, 8)
                | (SampleKind::Float, 32 | 64)
        )
    }

    /// Whether this is interleaved native-endian `f32`
    pub fn is_canonical_f32(&self) -> bool {
        self.sample_kind == SampleKind::Float
            && self.bits_per_sample == 32
            && self.interleaved
            && self.byte_order == ByteOrder::NATIVE
    }

    /// Whether two formats differ only in sample rate
    pub fn same_layout_as(&self, other: &Self) -> bool {
        self.sample_kind == other.sample_kind
            && self.bits_per_sample == other.bits_per_sample
            && self.channels == other.channels
            && self.interleaved == other.interleaved
            && self.byte_order == other.byte_order
    }

    /// Check that the format describes a stream the pipeline can carry
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(SoulError::InvalidSampleRate(self.sample_rate));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SoulError::unsupported_format(format!(
                "{} channels (must be 1-{})",
                self.channels, MAX_CHANNELS
            )));
        }
        if !self.is_supported_representation() {
            return Err(SoulError::unsupported_format(format!(
                "{}-bit {}",
                self.bits_per_sample,
                kind_name(self.sample_kind)
            )));
        }
        Ok(())
    }
}

fn kind_name(kind: SampleKind) -> &'static str {
    match kind {
        SampleKind::SignedInt => "signed integer",
        SampleKind::UnsignedInt => "unsigned integer",
        SampleKind::Float => "float",
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ch, {} Hz, {}-bit {}, {}, {}",
            self.channels,
            self.sample_rate,
            self.bits_per_sample,
            kind_name(self.sample_kind),
            match self.byte_order {
                ByteOrder::Little => "little-endian",
                ByteOrder::Big => "big-endian",
            },
            if self.interleaved { "interleaved" } else { "planar" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_24_bit_uses_three_bytes() {
        let format = StreamFormat::pcm_i24(48_000.0, 2);
        assert_eq!(format.bytes_per_sample(), 3);
        assert_eq!(format.bytes_per_frame(), 6);
        assert_eq!(format.plane_count(), 1);
    }

    #[test]
    fn planar_frames_hold_one_sample_per_plane() {
        let format = StreamFormat::float32_planar(44_100.0, 6);
        assert_eq!(format.bytes_per_frame(), 4);
        assert_eq!(format.plane_count(), 6);
        assert!(!format.is_canonical_f32());
    }

    #[test]
    fn validate_rejects_bad_formats() {
        assert!(StreamFormat::pcm_i16(44_100.0, 0).validate().is_err());
        assert!(StreamFormat::pcm_i16(0.0, 2).validate().is_err());
        assert!(StreamFormat::pcm_i16(f64::NAN, 2).validate().is_err());
        assert!(StreamFormat::pcm_i16(44_100.0, 33).validate().is_err());

        let unsigned_16 = StreamFormat::new(44_100.0, SampleKind::UnsignedInt, 16, 2);
        let err = unsigned_16.validate().unwrap_err();
        assert!(err.is_configuration());

        let float_16 = StreamFormat::new(44_100.0, SampleKind::Float, 16, 2);
        assert!(float_16.validate().is_err());
    }

    #[test]
    fn validate_accepts_supported_formats() {
        for format in [
            StreamFormat::pcm_u8(8_000.0, 1),
            StreamFormat::pcm_i16(44_100.0, 2),
            StreamFormat::pcm_i24(96_000.0, 6),
            StreamFormat::pcm_i32(192_000.0, 8),
            StreamFormat::float32(48_000.0, 2),
            StreamFormat::float64(48_000.0, 2).planar(),
        ] {
            assert!(format.validate().is_ok(), "{format}");
        }
    }

    #[test]
    fn description_is_readable() {
        let format = StreamFormat::pcm_i16(44_100.0, 2);
        assert_eq!(
            format.to_string(),
            "2 ch, 44100 Hz, 16-bit signed integer, little-endian, interleaved"
        );
    }

    #[test]
    fn serde_round_trip_uses_snake_case() {
        let format = StreamFormat::pcm_i24(96_000.0, 2);
        let json = serde_json::to_string(&format).unwrap();
        assert!(json.contains("\"signed_int\""));
        let back: StreamFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
    }
}

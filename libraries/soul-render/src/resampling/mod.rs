//! Sample Rate Conversion
//!
//! Allocation-free wrapper around rubato used by the format converter.
//!
//! ## Features
//!
//! - **Arbitrary ratios**: 44.1kHz → 48kHz, 96kHz → 44.1kHz, 8kHz → 192kHz, ...
//! - **Complexity presets**: Linear, Normal, Mastering, Maximum
//! - **Fixed input chunks**: every call consumes exactly [`Resampler::chunk_size`]
//!   frames, so all buffers can be sized once up front
//! - **Exact flushing**: [`Resampler::flush_into`] drains the filter after end of stream
//!
//! ## Example
//!
//! ```rust
//! use soul_render::resampling::{Resampler, SrcComplexity};
//!
//! // 44.1kHz → 48kHz, stereo
//! let mut resampler = Resampler::new(44_100.0, 48_000.0, 2, SrcComplexity::Normal).unwrap();
//!
//! let input = vec![vec![0.0f32; resampler.chunk_size()]; 2];
//! let mut output = vec![vec![0.0f32; resampler.output_frames_max()]; 2];
//! let produced = resampler.process_into(&input, &mut output).unwrap();
//! assert!(produced <= resampler.output_frames_max());
//! ```

mod rubato_backend;

use serde::{Deserialize, Serialize};
use soul_core::{SoulError, MAX_CHANNELS, MAX_SAMPLE_RATE};
use thiserror::Error;

use rubato_backend::RubatoResampler;

/// Resampling errors
#[derive(Error, Debug)]
pub enum ResamplingError {
    #[error("Invalid sample rate: {0} Hz (must be > 0 and <= 1MHz)")]
    InvalidSampleRate(f64),

    #[error("Invalid channel count: {0} (must be 1-32)")]
    InvalidChannelCount(usize),

    #[error("Resampler initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

pub type Result<T> = std::result::Result<T, ResamplingError>;

impl From<ResamplingError> for SoulError {
    fn from(err: ResamplingError) -> Self {
        match err {
            ResamplingError::InvalidSampleRate(rate) => SoulError::InvalidSampleRate(rate),
            ResamplingError::InvalidChannelCount(_) | ResamplingError::InitializationFailed(_) => {
                SoulError::unsupported_format(err.to_string())
            }
            ResamplingError::ProcessingFailed(msg) => SoulError::render(msg),
        }
    }
}

/// Sample rate converter complexity
///
/// Higher settings use longer filters: better stopband rejection and a flatter
/// passband, at the cost of CPU time and latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrcComplexity {
    /// Linear interpolation, lowest CPU, audible aliasing
    Linear,

    /// Sinc interpolation, 128 taps
    /// - Passband: 95% of Nyquist
    #[default]
    Normal,

    /// Sinc interpolation, 256 taps
    /// - Passband: 99% of Nyquist
    Mastering,

    /// Sinc interpolation, 512 taps
    /// - Passband: 99.5% of Nyquist
    Maximum,
}

impl SrcComplexity {
    /// Input frames consumed per resampler call
    pub fn chunk_size(self) -> usize {
        match self {
            Self::Linear => 256,
            Self::Normal | Self::Mastering => 512,
            Self::Maximum => 1024,
        }
    }
}

/// Fixed-input rubato resampler over planar `f32`
pub struct Resampler {
    backend: RubatoResampler,
    input_rate: f64,
    output_rate: f64,
    channels: usize,
    complexity: SrcComplexity,
}

impl Resampler {
    /// Create a new resampler
    ///
    /// # Arguments
    /// - `input_rate`: Input sample rate (Hz)
    /// - `output_rate`: Output sample rate (Hz)
    /// - `channels`: Number of channels (1-32)
    /// - `complexity`: Filter preset
    pub fn new(
        input_rate: f64,
        output_rate: f64,
        channels: usize,
        complexity: SrcComplexity,
    ) -> Result<Self> {
        for rate in [input_rate, output_rate] {
            if !rate.is_finite() || rate <= 0.0 || rate > MAX_SAMPLE_RATE {
                return Err(ResamplingError::InvalidSampleRate(rate));
            }
        }
        if channels == 0 || channels > usize::from(MAX_CHANNELS) {
            return Err(ResamplingError::InvalidChannelCount(channels));
        }

        let backend = RubatoResampler::new(output_rate / input_rate, channels, complexity)?;

        Ok(Self {
            backend,
            input_rate,
            output_rate,
            channels,
            complexity,
        })
    }

    /// Resample exactly one chunk
    ///
    /// `input` holds one slice per channel with at least [`Self::chunk_size`]
    /// frames; `output` one slice per channel with at least
    /// [`Self::output_frames_max`] frames. Returns output frames produced.
    pub fn process_into(&mut self, input: &[Vec<f32>], output: &mut [Vec<f32>]) -> Result<usize> {
        self.backend.process_into(input, output)
    }

    /// Push one chunk of silence through the filter to drain buffered history
    ///
    /// Returns output frames produced.
    pub fn flush_into(&mut self, output: &mut [Vec<f32>]) -> Result<usize> {
        self.backend.flush_into(output)
    }

    /// Input frames consumed by every call
    pub fn chunk_size(&self) -> usize {
        self.backend.input_frames_next()
    }

    /// Upper bound on output frames from one call
    pub fn output_frames_max(&self) -> usize {
        self.backend.output_frames_max()
    }

    /// Filter delay in output frames
    pub fn output_delay(&self) -> usize {
        self.backend.output_delay()
    }

    /// Output rate divided by input rate
    pub fn ratio(&self) -> f64 {
        self.output_rate / self.input_rate
    }

    /// Input sample rate
    pub fn input_rate(&self) -> f64 {
        self.input_rate
    }

    /// Output sample rate
    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Filter preset
    pub fn complexity(&self) -> SrcComplexity {
        self.complexity
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        self.backend.reset();
    }
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("input_rate", &self.input_rate)
            .field("output_rate", &self.output_rate)
            .field("channels", &self.channels)
            .field("complexity", &self.complexity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_rates() {
        assert!(matches!(
            Resampler::new(0.0, 48_000.0, 2, SrcComplexity::Normal),
            Err(ResamplingError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            Resampler::new(44_100.0, 2_000_000.0, 2, SrcComplexity::Normal),
            Err(ResamplingError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn rejects_invalid_channel_counts() {
        assert!(matches!(
            Resampler::new(44_100.0, 48_000.0, 0, SrcComplexity::Linear),
            Err(ResamplingError::InvalidChannelCount(0))
        ));
        assert!(matches!(
            Resampler::new(44_100.0, 48_000.0, 33, SrcComplexity::Linear),
            Err(ResamplingError::InvalidChannelCount(33))
        ));
    }

    #[test]
    fn chunk_size_follows_complexity() {
        for complexity in [
            SrcComplexity::Linear,
            SrcComplexity::Normal,
            SrcComplexity::Mastering,
            SrcComplexity::Maximum,
        ] {
            let resampler = Resampler::new(44_100.0, 48_000.0, 2, complexity).unwrap();
            assert_eq!(resampler.chunk_size(), complexity.chunk_size());
            assert!(resampler.output_frames_max() >= complexity.chunk_size());
        }
    }

    #[test]
    fn errors_convert_to_configuration_domain() {
        let err: SoulError = ResamplingError::InvalidChannelCount(40).into();
        assert!(err.is_configuration());
    }
}

/// Desktop output errors
use soul_core::SoulError;
use thiserror::Error;

/// Result type for desktop output operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Desktop output errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to enumerate or query devices
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuildError(String),

    /// Failed to play stream
    #[error("Failed to play stream: {0}")]
    PlayError(String),

    /// Failed to pause stream
    #[error("Failed to pause stream: {0}")]
    PauseError(String),

    /// The audio thread is gone
    #[error("Audio thread unavailable: {0}")]
    AudioThread(String),

    /// Render pipeline error
    #[error(transparent)]
    Render(#[from] SoulError),
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AudioError::StreamBuildError(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AudioError::PlayError(err.to_string())
    }
}

impl From<cpal::PauseStreamError> for AudioError {
    fn from(err: cpal::PauseStreamError) -> Self {
        AudioError::PauseError(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        AudioError::DeviceError(err.to_string())
    }
}

impl From<cpal::DevicesError> for AudioError {
    fn from(err: cpal::DevicesError) -> Self {
        AudioError::DeviceError(err.to_string())
    }
}

impl From<cpal::DeviceNameError> for AudioError {
    fn from(err: cpal::DeviceNameError) -> Self {
        AudioError::DeviceError(err.to_string())
    }
}

impl From<AudioError> for SoulError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::DeviceNotFound(name) => SoulError::DeviceNotFound(name),
            AudioError::Render(err) => err,
            other => SoulError::device(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_core::ErrorDomain;

    #[test]
    fn device_errors_land_in_device_domain() {
        let err: SoulError = AudioError::StreamBuildError("busy".into()).into();
        assert_eq!(err.domain(), ErrorDomain::Device);

        let err: SoulError = AudioError::DeviceNotFound("USB DAC".into()).into();
        assert_eq!(err, SoulError::DeviceNotFound("USB DAC".into()));
    }

    #[test]
    fn render_errors_pass_through() {
        let original = SoulError::invalid_state("start graph", "closed");
        let err: SoulError = AudioError::from(original.clone()).into();
        assert_eq!(err, original);
        assert!(err.is_state());
    }
}

/// Core error types for Soul Render
use std::fmt;
use thiserror::Error;

/// Result type alias using `SoulError`
pub type Result<T> = std::result::Result<T, SoulError>;

/// Broad error category, used by callers to decide how to react
///
/// - `Configuration`: the request can never succeed as made (bad formats, unknown component)
/// - `Device`: hardware property access failed; retry or fall back to another device
/// - `Render`: something went wrong inside a render cycle and was surfaced afterwards
/// - `State`: the operation is not legal in the current lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Incompatible or unsupported configuration
    Configuration,
    /// Hardware property get/set failure
    Device,
    /// Failure observed inside the real-time path
    Render,
    /// Lifecycle violation
    State,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Device => "device",
            Self::Render => "render",
            Self::State => "state",
        };
        f.write_str(name)
    }
}

/// Core error type for Soul Render
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoulError {
    /// Sample representation or bit depth the pipeline cannot handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Source and destination cannot be bridged by the converter
    #[error("Incompatible formats: {from} -> {to}: {reason}")]
    IncompatibleFormats {
        from: String,
        to: String,
        reason: String,
    },

    /// Channel layout does not match the format it was paired with
    #[error("Invalid channel layout: {0}")]
    InvalidChannelLayout(String),

    /// Sample rate is zero, negative, not finite, or out of range
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// No registered unit matches the requested component descriptor
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// Effect handle does not name a node in the graph
    #[error("Unknown node handle: {0}")]
    UnknownNode(u64),

    /// Operation is not supported by this component
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Output device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Device property access failed
    #[error("Device error: {0}")]
    Device(String),

    /// Device does not expose the requested property
    #[error("Device '{device}' does not support property '{property}'")]
    PropertyUnsupported {
        property: &'static str,
        device: String,
    },

    /// Failure inside a render cycle, surfaced after the fact
    #[error("Render error: {0}")]
    Render(String),

    /// Decoder source failed while being pulled
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Operation rejected because of the current lifecycle state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}

impl SoulError {
    /// Create an unsupported format error
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create an incompatible formats error
    pub fn incompatible(
        from: impl fmt::Display,
        to: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::IncompatibleFormats {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid channel layout error
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidChannelLayout(msg.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a property-unsupported device error
    pub fn property_unsupported(property: &'static str, device: impl Into<String>) -> Self {
        Self::PropertyUnsupported {
            property,
            device: device.into(),
        }
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create a decoder error
    pub fn decoder(msg: impl Into<String>) -> Self {
        Self::Decoder(msg.into())
    }

    /// Create a state error
    pub fn invalid_state(operation: &'static str, state: impl fmt::Display) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Error domain for this error
    pub fn domain(&self) -> ErrorDomain {
        match self {
            Self::UnsupportedFormat(_)
            | Self::IncompatibleFormats { .. }
            | Self::InvalidChannelLayout(_)
            | Self::InvalidSampleRate(_)
            | Self::UnknownComponent(_)
            | Self::UnknownNode(_)
            | Self::Unsupported(_) => ErrorDomain::Configuration,
            Self::DeviceNotFound(_) | Self::Device(_) | Self::PropertyUnsupported { .. } => {
                ErrorDomain::Device
            }
            Self::Render(_) | Self::Decoder(_) => ErrorDomain::Render,
            Self::InvalidState { .. } => ErrorDomain::State,
        }
    }

    /// Stable numeric code, grouped by domain (1xx configuration, 2xx device,
    /// 3xx render, 4xx state)
    pub fn code(&self) -> u32 {
        match self {
            Self::UnsupportedFormat(_) => 101,
            Self::IncompatibleFormats { .. } => 102,
            Self::InvalidChannelLayout(_) => 103,
            Self::InvalidSampleRate(_) => 104,
            Self::UnknownComponent(_) => 105,
            Self::UnknownNode(_) => 106,
            Self::Unsupported(_) => 107,
            Self::DeviceNotFound(_) => 201,
            Self::Device(_) => 202,
            Self::PropertyUnsupported { .. } => 203,
            Self::Render(_) => 301,
            Self::Decoder(_) => 302,
            Self::InvalidState { .. } => 401,
        }
    }

    /// Whether this is a configuration error
    pub fn is_configuration(&self) -> bool {
        self.domain() == ErrorDomain::Configuration
    }

    /// Whether this is a state error
    pub fn is_state(&self) -> bool {
        self.domain() == ErrorDomain::State
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_group_variants() {
        assert_eq!(
            SoulError::unsupported_format("s8").domain(),
            ErrorDomain::Configuration
        );
        assert_eq!(SoulError::device("boom").domain(), ErrorDomain::Device);
        assert_eq!(SoulError::decoder("eof").domain(), ErrorDomain::Render);
        assert_eq!(
            SoulError::invalid_state("start", "closed").domain(),
            ErrorDomain::State
        );
    }

    #[test]
    fn codes_follow_domain_prefix() {
        let errors = [
            SoulError::InvalidSampleRate(0.0),
            SoulError::property_unsupported("volume", "null"),
            SoulError::render("overrun"),
            SoulError::invalid_state("reset", "closed"),
        ];

        for err in errors {
            let prefix = match err.domain() {
                ErrorDomain::Configuration => 1,
                ErrorDomain::Device => 2,
                ErrorDomain::Render => 3,
                ErrorDomain::State => 4,
            };
            assert_eq!(err.code() / 100, prefix, "{err}");
        }
    }

    #[test]
    fn state_error_message_names_operation() {
        let err = SoulError::invalid_state("start", "closed");
        assert_eq!(err.to_string(), "Cannot start while closed");
        assert!(err.is_state());
    }
}

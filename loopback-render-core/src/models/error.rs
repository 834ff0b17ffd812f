use std::fmt;

use thiserror::Error;

use super::format::RenderFormat;

/// Errors that can occur while driving a loopback render session.
///
/// Only [`RenderError::is_fatal`] errors always end a session; for the rest
/// the caller's [`FailurePolicy`](super::config::FailurePolicy) decides.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Extension or entry points that could not be resolved.
    #[error("capability missing: {}", .0.join(", "))]
    CapabilityMissing(Vec<String>),

    #[error("loopback device unavailable")]
    DeviceUnavailable,

    #[error("render format not supported: {0}")]
    FormatUnsupported(RenderFormat),

    #[error("could not create a render context: {0}")]
    ContextCreationFailed(String),

    #[error("{operation} failed: {code}")]
    PlatformOperationError {
        operation: &'static str,
        code: PlatformErrorCode,
    },

    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl RenderError {
    /// Whether this error ends the session regardless of policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable | Self::ContextCreationFailed(_) | Self::InvalidConfiguration(_)
        )
    }
}

/// Value of the platform's sticky last-error register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformErrorCode {
    InvalidName,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
    Other(i32),
}

impl PlatformErrorCode {
    /// Maps a raw AL error enum. `AL_NO_ERROR` maps to `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        use crate::constants::al;

        match raw {
            al::NO_ERROR => None,
            al::INVALID_NAME => Some(Self::InvalidName),
            al::INVALID_ENUM => Some(Self::InvalidEnum),
            al::INVALID_VALUE => Some(Self::InvalidValue),
            al::INVALID_OPERATION => Some(Self::InvalidOperation),
            al::OUT_OF_MEMORY => Some(Self::OutOfMemory),
            other => Some(Self::Other(other)),
        }
    }
}

impl fmt::Display for PlatformErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName => f.write_str("Invalid Name"),
            Self::InvalidEnum => f.write_str("Invalid Enum"),
            Self::InvalidValue => f.write_str("Invalid Value"),
            Self::InvalidOperation => f.write_str("Invalid Operation"),
            Self::OutOfMemory => f.write_str("Out of Memory"),
            Self::Other(raw) => write!(f, "Unknown Error 0x{raw:04x}"),
        }
    }
}

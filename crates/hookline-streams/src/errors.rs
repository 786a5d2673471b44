//! Stream error types.

use thiserror::Error;

/// Error returned by a subscriber callback.
///
/// Dispatch never propagates these; they are recorded in the
/// [`DispatchReport`](crate::report::DispatchReport) and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler tried to do its work and failed.
    #[error("handler failed: {message}")]
    Failed {
        /// What went wrong.
        message: String,
    },

    /// The handler declined to process the event.
    #[error("handler rejected event: {reason}")]
    Rejected {
        /// Why the event was declined.
        reason: String,
    },

    /// The handler panicked; the payload message is kept.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Shorthand for [`HandlerError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors from linking streams together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A stream was asked to become its own downstream.
    #[error("a stream cannot be chained into itself")]
    SelfChain,

    /// The stream already forwards into a downstream stream.
    #[error("stream is already chained into a downstream stream")]
    AlreadyChained,
}

/// Errors that can occur when loading stream settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was out of range.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

//! OAuth2 engine error types.

use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    /// Missing or invalid client settings, or a hook precondition failed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The `state` returned on the callback does not belong to the attempt.
    #[error("State parameter mismatch")]
    StateMismatch,

    /// The provider answered with a structured error body.
    #[error("Provider error: {code}{}", .description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Provider {
        code: String,
        description: Option<String>,
    },

    /// A required field is missing or malformed. Carries the field name.
    #[error("Failed to parse required field `{0}`")]
    Parse(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Discriminant of [`OAuth2Error`], cheap to copy into flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Network,
    StateMismatch,
    Provider,
    Parse,
    Cancelled,
    EntropyUnavailable,
}

impl OAuth2Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OAuth2Error::Configuration(_) => ErrorKind::Configuration,
            OAuth2Error::Network(_) => ErrorKind::Network,
            OAuth2Error::StateMismatch => ErrorKind::StateMismatch,
            OAuth2Error::Provider { .. } => ErrorKind::Provider,
            OAuth2Error::Parse(_) => ErrorKind::Parse,
            OAuth2Error::Cancelled => ErrorKind::Cancelled,
            OAuth2Error::EntropyUnavailable(_) => ErrorKind::EntropyUnavailable,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        OAuth2Error::Configuration(message.into())
    }

    pub(crate) fn parse(field: impl Into<String>) -> Self {
        OAuth2Error::Parse(field.into())
    }
}

impl From<url::ParseError> for OAuth2Error {
    fn from(err: url::ParseError) -> Self {
        OAuth2Error::Configuration(format!("invalid URL: {err}"))
    }
}

impl From<reqwest::Error> for OAuth2Error {
    fn from(err: reqwest::Error) -> Self {
        OAuth2Error::Network(err.to_string())
    }
}

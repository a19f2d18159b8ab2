//! Error types shared by the credential manager, the location resolver and
//! the tool layer.

use rmcp::ErrorData as McpError;
use thiserror::Error;

/// A specialized Result type for QWeather operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed startup configuration, including key material.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A location name produced no matches.
    #[error("No location found for '{0}'")]
    Resolution(String),

    /// A tool argument failed validation before any request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request never produced a response (connect, timeout, decode).
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status or an error code in the body.
    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for failures of the remote call itself.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::UpstreamStatus { .. })
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument(_) | Error::Resolution(_) => {
                McpError::invalid_params(err.to_string(), None)
            }
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_classification() {
        let status = Error::UpstreamStatus {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(status.is_upstream());
        assert!(!Error::Resolution("Atlantis".to_string()).is_upstream());
        assert!(!Error::config("missing host").is_upstream());
    }

    #[test]
    fn resolution_maps_to_invalid_params() {
        let err: McpError = Error::Resolution("Atlantis".to_string()).into();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("Atlantis"));

        let err: McpError = Error::UpstreamStatus {
            status: 500,
            body: String::new(),
        }
        .into();
        assert_eq!(err.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
    }
}

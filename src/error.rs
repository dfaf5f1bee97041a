//! Error types for the CAMARA gateway

use std::io;

use thiserror::Error;

/// Result type alias for the CAMARA gateway
pub type Result<T> = std::result::Result<T, Error>;

/// CAMARA gateway errors
///
/// Everything except [`Error::Config`] and [`Error::Io`] is recovered at
/// the invoker boundary and turned into a normalized failure payload; a
/// registry or configuration defect is fatal at startup instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation key or tool name is not declared
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Operation exists but has no path template for the selected version
    #[error("Operation '{operation}' has no template for version '{version}'")]
    UnsupportedVersion {
        /// Operation key
        operation: String,
        /// Version tag that was requested
        version: String,
    },

    /// A `{placeholder}` in the path template has no value in the map
    #[error("Missing path parameter: {0}")]
    MissingPathParameter(String),

    /// A required argument is absent or has the wrong type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Verb outside the GET/POST/DELETE contract
    #[error("Unsupported verb: {0}")]
    UnsupportedVerb(String),

    /// 200 response whose body is not parseable JSON
    #[error("Invalid response body: {0}")]
    InvalidResponseBody(String),

    /// Upstream returned a 4xx/5xx status
    #[error("HTTP error {status}")]
    HttpError {
        /// HTTP status code
        status: u16,
        /// Parsed problem JSON if available, else truncated text
        detail: serde_json::Value,
        /// Request URL the failure originated from
        url: String,
    },

    /// Transport-level failure (connect, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short classification label used in normalized failure payloads
    #[must_use]
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::UnknownOperation(_) => "unknown_operation",
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::MissingPathParameter(_) => "missing_path_parameter",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnsupportedVerb(_) => "unsupported_verb",
            Self::InvalidResponseBody(_) => "invalid_response_body",
            Self::HttpError { .. } => "http_error",
            Self::Network(_) => "network",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_labels_are_stable() {
        assert_eq!(
            Error::UnknownOperation("x".into()).classification(),
            "unknown_operation"
        );
        assert_eq!(
            Error::MissingPathParameter("id".into()).classification(),
            "missing_path_parameter"
        );
        assert_eq!(Error::Network("timeout".into()).classification(), "network");
    }

    #[test]
    fn http_error_displays_status_only() {
        let err = Error::HttpError {
            status: 404,
            detail: serde_json::json!({"message": "device not found"}),
            url: "https://api.example.com/x".into(),
        };
        assert_eq!(err.to_string(), "HTTP error 404");
    }
}

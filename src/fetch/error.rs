//! Errors surfaced by a fetch call-site

use thiserror::Error;

/// Errors that can settle a fetch
///
/// Payloads are kept as strings so the error can be cloned into published
/// state and handed to callbacks. Cancellation is not represented here: a
/// superseded or unmounted fetch ends silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not complete (DNS, connection reset, etc.)
    #[error("Network request failed: {0}")]
    Network(String),

    /// A response arrived with a non-2xx status
    #[error("HTTP error! status: {status}")]
    Http {
        /// The response status code
        status: u16,
    },

    /// The response body was not valid JSON for the requested type
    #[error("Failed to parse JSON response: {0}")]
    Parse(String),

    /// A configured header name or value could not be sent
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl FetchError {
    /// Status code carried by an HTTP error
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

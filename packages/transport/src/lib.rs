#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP transport for the ASRS analytics API.
//!
//! A [`Transport`] issues exactly one GET per logical query against a
//! fixed base path and returns the decoded JSON body. It never retries and
//! imposes no timeout; both are caller concerns. [`deadline`] provides an
//! optional wrapping policy for callers that want a deadline.

pub mod config;
pub mod deadline;
pub mod http;

use asrs_query_models::ParamSet;
use async_trait::async_trait;
use thiserror::Error;

pub use config::TransportConfig;
pub use deadline::DeadlineTransport;
pub use http::HttpTransport;

/// Network- or HTTP-level failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a status outside the success range.
    #[error("API error: {status} {status_text}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
    },

    /// The request never produced a response (DNS, refused connection,
    /// timeout imposed by a wrapping policy).
    #[error("Network error: {message}")]
    Network {
        /// Description of the failure.
        message: String,
    },

    /// A success response whose body is not JSON.
    #[error("Response decode error (status {status}): {message}")]
    Decode {
        /// HTTP status code of the response.
        status: u16,
        /// Parse error.
        message: String,
    },

    /// The transport is misconfigured (unparseable base URL, etc.).
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl TransportError {
    /// HTTP status associated with the failure, `0` when no response was
    /// received.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Status { status, .. } | Self::Decode { status, .. } => *status,
            Self::Network { .. } | Self::Config { .. } => 0,
        }
    }
}

/// Executes analytics requests.
///
/// Implementations must perform at most one network call per invocation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET for `path` (relative to the configured base path) with
    /// `params` encoded as the query string.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails, the status is not a
    /// success, or the body is not JSON.
    async fn execute(
        &self,
        path: &str,
        params: &ParamSet,
    ) -> Result<serde_json::Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(
        &self,
        path: &str,
        params: &ParamSet,
    ) -> Result<serde_json::Value, TransportError> {
        (**self).execute(path, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_report_status_zero() {
        let err = TransportError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), 0);
    }

    #[test]
    fn status_failures_render_status_and_reason() {
        let err = TransportError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "API error: 404 Not Found");
    }
}

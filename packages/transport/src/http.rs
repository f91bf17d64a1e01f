//! `reqwest`-backed [`Transport`].

use asrs_query_models::ParamSet;
use async_trait::async_trait;

use crate::{Transport, TransportConfig, TransportError};

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 200;

/// Issues analytics requests over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Creates a transport with a fresh [`reqwest::Client`].
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates a transport sharing an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    /// The configuration this transport was built with.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Builds the full request URL for `path`.
    ///
    /// Every entry of `params` is appended to the query string; absent
    /// values never reach a [`ParamSet`], so nothing is sent for them.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if the configured base URL does
    /// not combine with `path` into a valid URL.
    pub fn build_url(&self, path: &str, params: &ParamSet) -> Result<reqwest::Url, TransportError> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let raw = format!(
            "{}{}{path}",
            self.config.normalized_base_url(),
            self.config.normalized_base_path()
        );
        let mut url = reqwest::Url::parse(&raw).map_err(|e| TransportError::Config {
            message: format!("invalid request URL '{raw}': {e}"),
        })?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, &value.to_string());
            }
        }

        Ok(url)
    }
}

/// Maps a response status to an error when it is outside the success range.
fn check_status(status: reqwest::StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        return Ok(());
    }
    Err(TransportError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

fn decode_body(status: reqwest::StatusCode, text: &str) -> Result<serde_json::Value, TransportError> {
    serde_json::from_str(text).map_err(|e| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            let mut end = BODY_PREVIEW_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        } else {
            text.to_string()
        };
        log::warn!(
            "Response body is not JSON\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        TransportError::Decode {
            status: status.as_u16(),
            message: e.to_string(),
        }
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        path: &str,
        params: &ParamSet,
    ) -> Result<serde_json::Value, TransportError> {
        let url = self.build_url(path, params)?;
        log::debug!("GET {url}");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                log::warn!("GET {url} failed: {e}");
                TransportError::Network {
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if let Err(e) = check_status(status) {
            log::warn!("GET {url} returned {status}");
            return Err(e);
        }

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network {
                message: format!("failed to read response body: {e}"),
            })?;

        decode_body(status, &text)
    }
}

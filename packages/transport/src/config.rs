//! Transport configuration.
//!
//! The base path is an explicit value passed to the transport at
//! construction. It can come from defaults, environment variables
//! (`ASRS_API_URL`, `ASRS_API_BASE_PATH`) or a TOML file:
//!
//! ```toml
//! base_url = "http://127.0.0.1:8000"
//! base_path = "/api"
//! ```

use serde::Deserialize;

use crate::TransportError;

/// Default origin of the analytics API.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default prefix under which every analytics endpoint is rooted.
pub const DEFAULT_BASE_PATH: &str = "/api";

/// Where the analytics API lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    /// Scheme, host and port (e.g. `"http://127.0.0.1:8000"`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix for every endpoint (e.g. `"/api"`).
    #[serde(default = "default_base_path", alias = "basePath")]
    pub base_path: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            base_path: default_base_path(),
        }
    }
}

impl TransportConfig {
    /// Creates a config for `base_url` with the default base path.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            base_path: default_base_path(),
        }
    }

    /// Overrides the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Reads `ASRS_API_URL` and `ASRS_API_BASE_PATH`, falling back to the
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ASRS_API_URL") {
            log::debug!("Using ASRS_API_URL={url}");
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("ASRS_API_BASE_PATH") {
            log::debug!("Using ASRS_API_BASE_PATH={path}");
            config.base_path = path;
        }
        config
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if the document is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, TransportError> {
        toml::de::from_str(s).map_err(|e| TransportError::Config {
            message: format!("invalid transport config: {e}"),
        })
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, TransportError> {
        let contents = std::fs::read_to_string(path).map_err(|e| TransportError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Base path with a single leading `/` and no trailing `/`. An empty or
    /// `/` base path normalises to the empty string.
    #[must_use]
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Base URL without a trailing `/`.
    #[must_use]
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_path_is_api() {
        assert_eq!(TransportConfig::default().normalized_base_path(), "/api");
    }

    #[test]
    fn base_path_is_normalised() {
        let config = TransportConfig::new("http://localhost:8000/").with_base_path("v1/api/");
        assert_eq!(config.normalized_base_path(), "/v1/api");
        assert_eq!(config.normalized_base_url(), "http://localhost:8000");
        assert_eq!(
            TransportConfig::default()
                .with_base_path("/")
                .normalized_base_path(),
            ""
        );
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config = TransportConfig::from_toml_str("base_url = \"https://asrs.example\"").unwrap();
        assert_eq!(config.base_url, "https://asrs.example");
        assert_eq!(config.base_path, "/api");
    }

    #[test]
    fn accepts_camel_case_base_path() {
        let config = TransportConfig::from_toml_str("basePath = \"/analytics\"").unwrap();
        assert_eq!(config.base_path, "/analytics");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = TransportConfig::from_toml_str("base_url = ").unwrap_err();
        assert!(matches!(err, TransportError::Config { .. }));
    }
}

//! Error types for configuration resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the configuration resolver.
///
/// File- and environment-path errors are deterministic misconfigurations and
/// surface immediately. Discovery-path errors are retryable per attempt; only
/// [`ConfigError::ServiceUnavailable`] escapes the retry loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration was read before any resolution strategy completed.
    #[error("configuration accessed before resolution completed")]
    NotInitialized,

    /// File source: the config file does not exist at the given path.
    #[error("config file not found: {}", path.display())]
    MissingConfigFile { path: PathBuf },

    /// File source: the connection string has no `HostName=` segment.
    #[error("IOTHUB_CONNECTION_STRING must contain a HostName= segment")]
    InvalidConnectionString,

    /// Discovery source: the discovery resource lacks an expected link relation.
    #[error("discovery resource is missing the {rel} link relation")]
    DiscoveryProtocol { rel: String },

    /// Discovery source: a required setting is absent or empty.
    #[error("required setting {name} is missing or empty")]
    MissingSetting { name: &'static str },

    /// Discovery source: the retry budget ran out.
    #[error("config service unavailable after {attempts} attempts: {last_error}")]
    ServiceUnavailable { attempts: u32, last_error: String },

    /// File source: the file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File source: the file is not a valid YAML document.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Discovery source: a fetched resource did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// Discovery source: the fetch itself failed (network, HTTP status, body).
    #[error("fetch failed: {0}")]
    Fetch(#[from] anyhow::Error),
}

impl ConfigError {
    /// Whether a discovery-attempt failure should trigger another attempt.
    ///
    /// Every failure that can occur inside a single discovery attempt is
    /// retryable; the retry loop treats them uniformly.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConfigError::DiscoveryProtocol { .. }
                | ConfigError::MissingSetting { .. }
                | ConfigError::MalformedResponse(_)
                | ConfigError::Fetch(_)
        )
    }
}

/// Result type for resolver operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

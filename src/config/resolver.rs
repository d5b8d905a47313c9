//! Source selection, resolution strategies, and publication.

use crate::config::discovery::{RetryPolicy, poll_settings};
use crate::config::types::{
    Configuration, FileSettings, default_console_reporting, default_log_level, default_port,
    has_hostname_segment,
};
use crate::error::{ConfigError, ConfigResult};
use crate::fetch::{HttpFetcher, JsonFetcher};
use arc_swap::ArcSwapOption;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Environment variable naming the discovery-service base URL.
pub const CONFIG_URL_VAR: &str = "CONFIG_URL";
/// Environment variable carrying the listening-port override.
pub const PORT_VAR: &str = "PORT";
/// Environment variable read verbatim by the environment source.
pub const CONNECTION_STRING_VAR: &str = "IOTHUB_CONNECTION_STRING";

/// Which resolution strategy a startup run will execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    File,
    Environment,
    Discovery,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionSource::File => write!(f, "file"),
            ResolutionSource::Environment => write!(f, "environment"),
            ResolutionSource::Discovery => write!(f, "discovery"),
        }
    }
}

/// Pick the resolution strategy from the two optional inputs.
///
/// A discovery URL always wins, regardless of the port override: a centrally
/// managed deployment must never silently fall back to a local file.
pub fn select_source(config_url: Option<&str>, port: Option<&str>) -> ResolutionSource {
    match (config_url, port) {
        (Some(_), _) => ResolutionSource::Discovery,
        (None, Some(_)) => ResolutionSource::Environment,
        (None, None) => ResolutionSource::File,
    }
}

/// Shared read-only handle to the published configuration.
///
/// Cheap to clone; thread it through startup into every component that needs
/// the configuration instead of reaching for global state. Reads before the
/// first successful resolution fail with [`ConfigError::NotInitialized`];
/// a later resolution atomically overwrites the published value (last writer
/// wins).
#[derive(Clone, Default)]
pub struct ConfigHandle {
    slot: Arc<ArcSwapOption<Configuration>>,
}

impl ConfigHandle {
    /// Returns the published configuration.
    ///
    /// Repeated calls return the same `Arc` until another resolution
    /// overwrites the slot.
    pub fn get(&self) -> ConfigResult<Arc<Configuration>> {
        self.slot.load_full().ok_or(ConfigError::NotInitialized)
    }

    fn publish(&self, config: Configuration) -> Arc<Configuration> {
        let config = Arc::new(config);
        self.slot.store(Some(config.clone()));
        config
    }
}

/// Executes exactly one resolution strategy and publishes the result.
pub struct Resolver {
    fetcher: Arc<dyn JsonFetcher>,
    retry: RetryPolicy,
    handle: ConfigHandle,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver with the default HTTP fetcher and production retry policy.
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::new()))
    }

    /// Resolver with an injected fetch capability.
    pub fn with_fetcher(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            fetcher,
            retry: RetryPolicy::default(),
            handle: ConfigHandle::default(),
        }
    }

    /// Override the discovery retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// A shareable handle to the configuration this resolver publishes.
    pub fn handle(&self) -> ConfigHandle {
        self.handle.clone()
    }

    /// Returns the published configuration, failing before first resolution.
    pub fn get(&self) -> ConfigResult<Arc<Configuration>> {
        self.handle.get()
    }

    /// Resolve using the source selected from the process environment.
    ///
    /// `CONFIG_URL` triggers discovery resolution, `PORT` alone triggers
    /// environment resolution, neither falls back to the file at
    /// `default_file`. When discovery runs without a `PORT` override the
    /// port falls back to the file-source default.
    pub async fn resolve(&self, default_file: impl AsRef<Path>) -> ConfigResult<Arc<Configuration>> {
        let config_url = std::env::var(CONFIG_URL_VAR).ok();
        let port = std::env::var(PORT_VAR).ok();

        match (config_url, port) {
            (Some(base_url), port) => {
                self.resolve_from_discovery(&base_url, port.unwrap_or_else(default_port))
                    .await
            }
            (None, Some(port)) => self.resolve_from_environment(port),
            (None, None) => self.resolve_from_file(default_file),
        }
    }

    /// Load the configuration from a local YAML document.
    ///
    /// The connection string must carry a `HostName=` segment; the remaining
    /// fields default when absent ("both", "trace", "3003"). No auth settings
    /// on this path.
    pub fn resolve_from_file(&self, path: impl AsRef<Path>) -> ConfigResult<Arc<Configuration>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingConfigFile {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let settings: FileSettings = serde_yaml::from_str(&content)?;

        if !has_hostname_segment(&settings.iothub_connection_string) {
            return Err(ConfigError::InvalidConnectionString);
        }

        info!(path = %path.display(), "configuration resolved from file");
        Ok(self.handle.publish(Configuration {
            iothub_connection_string: settings.iothub_connection_string,
            console_reporting: settings.console_reporting,
            log_level: settings.log_level,
            port: settings.port,
            auth: None,
        }))
    }

    /// Build the configuration directly from the process environment.
    ///
    /// Deliberately permissive: the connection string is taken verbatim from
    /// `IOTHUB_CONNECTION_STRING` with no format validation, since this path
    /// serves trusted deployment environments. Reporting mode and log level
    /// are fixed to "both" and "trace".
    pub fn resolve_from_environment(
        &self,
        port: impl Into<String>,
    ) -> ConfigResult<Arc<Configuration>> {
        let connection_string = std::env::var(CONNECTION_STRING_VAR).unwrap_or_default();

        info!("configuration resolved from environment");
        Ok(self.handle.publish(Configuration {
            iothub_connection_string: connection_string,
            console_reporting: default_console_reporting(),
            log_level: default_log_level(),
            port: port.into(),
            auth: None,
        }))
    }

    /// Poll the discovery service until it yields a complete settings
    /// resource, then publish with auth populated.
    ///
    /// The port comes from the caller-supplied override, never from the
    /// service. Exhausting the retry budget fails with
    /// [`ConfigError::ServiceUnavailable`].
    pub async fn resolve_from_discovery(
        &self,
        base_url: &str,
        port: impl Into<String>,
    ) -> ConfigResult<Arc<Configuration>> {
        let settings = poll_settings(self.fetcher.as_ref(), base_url, self.retry).await?;

        info!(base_url, "configuration resolved from discovery service");
        Ok(self.handle.publish(Configuration {
            iothub_connection_string: settings.iothub_connection_string,
            console_reporting: settings.console_reporting,
            log_level: settings.log_level,
            port: port.into(),
            auth: Some(settings.auth),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_selection_table() {
        assert_eq!(select_source(None, None), ResolutionSource::File);
        assert_eq!(select_source(None, Some("80")), ResolutionSource::Environment);
        assert_eq!(
            select_source(Some("http://cfg"), None),
            ResolutionSource::Discovery
        );
        assert_eq!(
            select_source(Some("http://cfg"), Some("80")),
            ResolutionSource::Discovery
        );
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ResolutionSource::File.to_string(), "file");
        assert_eq!(ResolutionSource::Environment.to_string(), "environment");
        assert_eq!(ResolutionSource::Discovery.to_string(), "discovery");
    }

    #[test]
    fn test_handle_empty_until_published() {
        let handle = ConfigHandle::default();
        assert!(matches!(handle.get(), Err(ConfigError::NotInitialized)));
    }
}

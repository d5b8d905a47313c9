//! Bounded-retry polling protocol against the discovery service.
//!
//! One attempt is two sequential fetches: the discovery resource at
//! `/api/discovery`, then the settings resource behind its `settings:list`
//! link. Any failure inside an attempt (network, malformed body, missing
//! relation, missing field) is retried uniformly after a fixed delay until
//! the attempt budget runs out.

use crate::config::types::AuthSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::fetch::JsonFetcher;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Link relation on the discovery resource pointing at the settings resource.
pub const SETTINGS_LIST_REL: &str = "settings:list";

/// Path of the discovery resource, relative to the service base URL.
pub const DISCOVERY_PATH: &str = "/api/discovery";

/// Attempt budget for discovery resolution.
///
/// Deliberately a fixed delay with no backoff or jitter: this is a single
/// config fetch at process startup, not a high-volume dependency call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up. At least one attempt always runs.
    pub attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// 60 attempts at 5 seconds apart, roughly a five-minute budget.
    pub const DEFAULT_ATTEMPTS: u32 = 60;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: Self::DEFAULT_ATTEMPTS,
            delay: Self::DEFAULT_DELAY,
        }
    }
}

/// Discovery resource: a hypermedia document carrying link relations.
#[derive(Debug, Deserialize)]
struct DiscoveryResource {
    #[serde(default)]
    links: Vec<DiscoveryLink>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryLink {
    rel: String,
    href: String,
}

/// Settings resource as served by the config service.
///
/// Every field is optional on the wire so validation can name exactly which
/// one is missing instead of failing with an opaque deserialization error.
#[derive(Debug, Deserialize)]
struct SettingsResource {
    #[serde(rename = "iotHubConnStr", default)]
    iot_hub_conn_str: Option<String>,
    #[serde(rename = "loginUrl", default)]
    login_url: Option<String>,
    #[serde(rename = "mongoUri", default)]
    mongo_uri: Option<String>,
    #[serde(rename = "sessionSecret", default)]
    session_secret: Option<String>,
    #[serde(rename = "device-management", default)]
    device_management: Option<DeviceManagement>,
}

#[derive(Debug, Deserialize)]
struct DeviceManagement {
    #[serde(rename = "consoleReporting", default)]
    console_reporting: Option<String>,
    #[serde(rename = "logLevel", default)]
    log_level: Option<String>,
}

/// Settings extracted from a fully validated settings resource.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSettings {
    pub iothub_connection_string: String,
    pub console_reporting: String,
    pub log_level: String,
    pub auth: AuthSettings,
}

fn require(name: &'static str, value: Option<String>) -> ConfigResult<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingSetting { name }),
    }
}

impl SettingsResource {
    fn validate(self) -> ConfigResult<ResolvedSettings> {
        let iothub_connection_string = require("iotHubConnStr", self.iot_hub_conn_str)?;
        let login_url = require("loginUrl", self.login_url)?;
        let mongo_uri = require("mongoUri", self.mongo_uri)?;
        let session_secret = require("sessionSecret", self.session_secret)?;

        let device_management = self.device_management.ok_or(ConfigError::MissingSetting {
            name: "device-management",
        })?;
        let console_reporting = require(
            "device-management.consoleReporting",
            device_management.console_reporting,
        )?;
        let log_level = require("device-management.logLevel", device_management.log_level)?;

        Ok(ResolvedSettings {
            iothub_connection_string,
            console_reporting,
            log_level,
            auth: AuthSettings {
                login_url,
                mongo_uri,
                session_secret,
            },
        })
    }
}

/// One discovery attempt: fetch the discovery resource, follow the
/// `settings:list` link, validate the settings resource.
async fn fetch_settings(fetcher: &dyn JsonFetcher, base_url: &str) -> ConfigResult<ResolvedSettings> {
    let discovery_url = format!("{base_url}{DISCOVERY_PATH}");
    let body = fetcher.fetch_json(&discovery_url).await?;
    let discovery: DiscoveryResource = serde_json::from_value(body)?;

    let link = discovery
        .links
        .iter()
        .find(|link| link.rel == SETTINGS_LIST_REL)
        .ok_or_else(|| ConfigError::DiscoveryProtocol {
            rel: SETTINGS_LIST_REL.to_string(),
        })?;

    // The href is relative to the service base URL.
    let settings_url = format!("{base_url}{}", link.href);
    let body = fetcher.fetch_json(&settings_url).await?;
    let settings: SettingsResource = serde_json::from_value(body)?;

    settings.validate()
}

/// Run discovery attempts until one succeeds or the budget is exhausted.
///
/// Failures are logged as warnings and swallowed into the next attempt;
/// when the final attempt fails its error is wrapped in
/// [`ConfigError::ServiceUnavailable`].
pub(crate) async fn poll_settings(
    fetcher: &dyn JsonFetcher,
    base_url: &str,
    policy: RetryPolicy,
) -> ConfigResult<ResolvedSettings> {
    let attempts = policy.attempts.max(1);
    let mut remaining = attempts;

    loop {
        match fetch_settings(fetcher, base_url).await {
            Ok(settings) => return Ok(settings),
            Err(err) => {
                remaining -= 1;
                warn!(error = %err, remaining, "config service attempt failed");
                if remaining == 0 {
                    return Err(ConfigError::ServiceUnavailable {
                        attempts,
                        last_error: err.to_string(),
                    });
                }
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_validation_complete() {
        let settings: SettingsResource = serde_json::from_value(json!({
            "iotHubConnStr": "HostName=hub",
            "loginUrl": "https://login",
            "mongoUri": "mongodb://db",
            "sessionSecret": "s3cret",
            "device-management": { "consoleReporting": "both", "logLevel": "info" }
        }))
        .unwrap();

        let resolved = settings.validate().unwrap();
        assert_eq!(resolved.iothub_connection_string, "HostName=hub");
        assert_eq!(resolved.console_reporting, "both");
        assert_eq!(resolved.log_level, "info");
        assert_eq!(resolved.auth.session_secret, "s3cret");
    }

    #[test]
    fn test_settings_validation_names_missing_field() {
        let settings: SettingsResource = serde_json::from_value(json!({
            "iotHubConnStr": "HostName=hub",
            "loginUrl": "https://login",
            "mongoUri": "mongodb://db",
            "device-management": { "consoleReporting": "both", "logLevel": "info" }
        }))
        .unwrap();

        match settings.validate() {
            Err(ConfigError::MissingSetting { name }) => assert_eq!(name, "sessionSecret"),
            other => panic!("expected MissingSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_validation_rejects_empty_string() {
        let settings: SettingsResource = serde_json::from_value(json!({
            "iotHubConnStr": "",
            "loginUrl": "https://login",
            "mongoUri": "mongodb://db",
            "sessionSecret": "s3cret",
            "device-management": { "consoleReporting": "both", "logLevel": "info" }
        }))
        .unwrap();

        match settings.validate() {
            Err(ConfigError::MissingSetting { name }) => assert_eq!(name, "iotHubConnStr"),
            other => panic!("expected MissingSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_validation_requires_device_management() {
        let settings: SettingsResource = serde_json::from_value(json!({
            "iotHubConnStr": "HostName=hub",
            "loginUrl": "https://login",
            "mongoUri": "mongodb://db",
            "sessionSecret": "s3cret"
        }))
        .unwrap();

        match settings.validate() {
            Err(ConfigError::MissingSetting { name }) => assert_eq!(name, "device-management"),
            other => panic!("expected MissingSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 60);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }
}

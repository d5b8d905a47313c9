//! Configuration value types and the file-source document shape.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Auth settings, present only when resolved via the discovery service.
///
/// File and environment sources leave [`Configuration::auth`] fully absent
/// rather than populating it with empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    pub login_url: String,
    pub mongo_uri: String,
    pub session_secret: String,
}

/// Immutable runtime configuration, created once at process startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// IoT hub connection string. Validated for a `HostName=` segment only
    /// when sourced from a local file.
    pub iothub_connection_string: String,

    /// Open enumeration: "server", "client", "both".
    pub console_reporting: String,

    /// Free-form log-level label.
    pub log_level: String,

    /// Listening port, kept as a string.
    pub port: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSettings>,
}

pub(crate) fn default_console_reporting() -> String {
    "both".to_string()
}

pub(crate) fn default_log_level() -> String {
    "trace".to_string()
}

pub(crate) fn default_port() -> String {
    "3003".to_string()
}

/// File-source document.
///
/// Only the connection string is validated after parsing; the remaining
/// fields default silently when absent. An absent connection string defaults
/// to empty and is then rejected by the `HostName=` check.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSettings {
    #[serde(rename = "IOTHUB_CONNECTION_STRING", default)]
    pub iothub_connection_string: String,

    #[serde(rename = "CONSOLE_REPORTING", default = "default_console_reporting")]
    pub console_reporting: String,

    #[serde(rename = "LOG_LEVEL", default = "default_log_level")]
    pub log_level: String,

    #[serde(rename = "PORT", default = "default_port")]
    pub port: String,
}

/// Case-insensitive check for a `HostName=` segment at the start of the
/// string or immediately after a `;` separator.
pub fn has_hostname_segment(connection_string: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(?i)(^|;)hostname=").expect("hostname pattern is valid"));
    pattern.is_match(connection_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_segment_at_start() {
        assert!(has_hostname_segment("HostName=foo.azure-devices.net"));
        assert!(has_hostname_segment("hostname=abc"));
        assert!(has_hostname_segment("HOSTNAME=abc"));
    }

    #[test]
    fn test_hostname_segment_after_separator() {
        assert!(has_hostname_segment(
            "SharedAccessKeyName=device;HostName=foo;SharedAccessKey=bar"
        ));
        assert!(has_hostname_segment("a=b;hostname=c"));
    }

    #[test]
    fn test_hostname_segment_rejected() {
        assert!(!has_hostname_segment("Foo=bar"));
        assert!(!has_hostname_segment(""));
        // Must be a whole segment, not a suffix of another key.
        assert!(!has_hostname_segment("XHostName=abc"));
    }

    #[test]
    fn test_file_settings_defaults() {
        let settings: FileSettings =
            serde_yaml::from_str("IOTHUB_CONNECTION_STRING: HostName=foo").unwrap();
        assert_eq!(settings.console_reporting, "both");
        assert_eq!(settings.log_level, "trace");
        assert_eq!(settings.port, "3003");
    }

    #[test]
    fn test_file_settings_explicit_values() {
        let yaml = r#"
IOTHUB_CONNECTION_STRING: HostName=foo
CONSOLE_REPORTING: server
LOG_LEVEL: debug
PORT: "8080"
"#;
        let settings: FileSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.console_reporting, "server");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.port, "8080");
    }

    #[test]
    fn test_file_settings_missing_connection_string_defaults_empty() {
        let settings: FileSettings = serde_yaml::from_str("PORT: \"80\"").unwrap();
        assert!(settings.iothub_connection_string.is_empty());
    }
}

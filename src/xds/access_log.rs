//! File access log sink for the HTTP connection manager

use envoy_types::pb::envoy::config::accesslog::v3::{access_log::ConfigType as AccessLogConfigType, AccessLog};
use envoy_types::pb::envoy::config::core::v3::{substitution_format_string, SubstitutionFormatString};
use envoy_types::pb::envoy::extensions::access_loggers::file::v3::{file_access_log::AccessLogFormat, FileAccessLog};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::AccessLogSettings;
use crate::xds::filters::encode_any;

/// Envoy's file access logger extension name
pub const FILE_ACCESS_LOGGER_NAME: &str = "envoy.access_loggers.file";
const FILE_ACCESS_LOG_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.access_loggers.file.v3.FileAccessLog";

/// Log path used when no access log settings are configured
pub const DEFAULT_ACCESS_LOG_PATH: &str = "/tmp/envoy.access.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogConfig {
    pub path: String,
    /// Text format string; Envoy's default format when unset
    #[serde(default)]
    pub format: Option<String>,
}

impl AccessLogConfig {
    /// Resolve the sink from optional settings
    pub fn from_settings(settings: Option<&AccessLogSettings>) -> Self {
        match settings {
            Some(settings) => Self { path: settings.log_file.clone(), format: settings.format.clone() },
            None => Self { path: DEFAULT_ACCESS_LOG_PATH.to_string(), format: None },
        }
    }

    /// Build the Envoy access log.
    ///
    /// An encoding failure is logged and yields `None`: the listener is still
    /// usable without an access log.
    pub fn to_envoy_access_log(&self) -> Option<AccessLog> {
        let file_log = FileAccessLog {
            path: self.path.clone(),
            access_log_format: self.format.as_ref().map(|format| {
                AccessLogFormat::LogFormat(SubstitutionFormatString {
                    format: Some(substitution_format_string::Format::TextFormat(format.clone())),
                    ..Default::default()
                })
            }),
        };

        match encode_any(FILE_ACCESS_LOG_TYPE_URL, &file_log) {
            Ok(any) => Some(AccessLog {
                name: FILE_ACCESS_LOGGER_NAME.to_string(),
                filter: None,
                config_type: Some(AccessLogConfigType::TypedConfig(any)),
            }),
            Err(error) => {
                warn!(path = %self.path, error = %error, "Failed to encode access log, continuing without it");
                None
            }
        }
    }

    pub fn to_bootstrap_json(&self) -> Value {
        let mut typed_config = json!({
            "@type": FILE_ACCESS_LOG_TYPE_URL,
            "path": self.path,
        });
        if let Some(format) = &self.format {
            typed_config["log_format"] = json!({ "text_format": format });
        }

        json!({ "name": FILE_ACCESS_LOGGER_NAME, "typed_config": typed_config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn missing_settings_fall_back_to_default_path() {
        let config = AccessLogConfig::from_settings(None);
        assert_eq!(config.path, DEFAULT_ACCESS_LOG_PATH);
        assert!(config.format.is_none());
    }

    #[test]
    fn configured_format_is_encoded() {
        let settings = AccessLogSettings {
            log_file: "/var/log/envoy/access.log".into(),
            format: Some("[%START_TIME%] %REQ(:METHOD)%\n".into()),
        };
        let log = AccessLogConfig::from_settings(Some(&settings)).to_envoy_access_log().expect("access log");
        assert_eq!(log.name, FILE_ACCESS_LOGGER_NAME);

        let Some(AccessLogConfigType::TypedConfig(any)) = log.config_type else {
            panic!("expected typed config");
        };
        let decoded = FileAccessLog::decode(any.value.as_slice()).expect("decode");
        assert_eq!(decoded.path, "/var/log/envoy/access.log");
        assert!(matches!(decoded.access_log_format, Some(AccessLogFormat::LogFormat(_))));
    }

    #[test]
    fn bootstrap_json_contains_path() {
        let json = AccessLogConfig::from_settings(None).to_bootstrap_json();
        assert_eq!(json["typed_config"]["path"], DEFAULT_ACCESS_LOG_PATH);
        assert!(json["typed_config"].get("log_format").is_none());
    }
}

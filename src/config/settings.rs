//! # Configuration Settings
//!
//! Defines the configuration structure for oasproxy. The loaded `AppConfig` is
//! an immutable snapshot: it is read once at startup and handed to the
//! importer, compiler and control server by reference.

use crate::errors::{Error, Result};
use crate::xds::filters::http::HttpFilterConfigEntry;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Envoy listener and upstream defaults
    #[validate(nested)]
    #[serde(default)]
    pub envoy: EnvoyConfig,

    /// File access log settings; when absent the compiler falls back to
    /// Envoy's default format and a fixed log path
    #[serde(default)]
    pub access_logs: Option<AccessLogSettings>,

    /// Control HTTP server configuration
    #[validate(nested)]
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[validate(nested)]
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Gateway workload defaults
    #[validate(nested)]
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        self.validate_custom()?;

        Ok(())
    }

    fn validate_custom(&self) -> Result<()> {
        if self.server.port == self.envoy.listener_port {
            return Err(Error::validation(
                "Control server and Envoy listener ports cannot be the same",
            ));
        }

        if let Some(access_logs) = &self.access_logs {
            if access_logs.log_file.trim().is_empty() {
                return Err(Error::validation("Access log file path cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Envoy-facing defaults used by the compiler and the endpoint resolver
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EnvoyConfig {
    /// Address the generated listener binds to
    #[validate(length(min = 1, message = "Listener address cannot be empty"))]
    pub listener_address: String,

    /// Port the generated listener binds to
    #[validate(range(min = 1, message = "Listener port must be between 1 and 65535"))]
    pub listener_port: u16,

    /// Port used for upstream endpoints whose server URL omits one
    #[validate(range(min = 1, message = "Default API port must be between 1 and 65535"))]
    pub api_default_port: u16,

    /// Envoy admin interface address written into rendered bootstraps
    #[validate(length(min = 1, message = "Admin address cannot be empty"))]
    pub admin_address: String,

    /// Envoy admin interface port written into rendered bootstraps
    #[validate(range(min = 1, message = "Admin port must be between 1 and 65535"))]
    pub admin_port: u16,

    /// Upstream timeout for generated routes in seconds; Envoy's default when unset
    #[validate(range(min = 1, max = 3600, message = "Route timeout must be between 1 and 3600 seconds"))]
    pub route_timeout_seconds: Option<u64>,

    /// HTTP filters placed in front of the router, in order
    pub http_filters: Vec<HttpFilterConfigEntry>,
}

impl Default for EnvoyConfig {
    fn default() -> Self {
        Self {
            listener_address: "0.0.0.0".to_string(),
            listener_port: 10000,
            api_default_port: 80,
            admin_address: "0.0.0.0".to_string(),
            admin_port: 9000,
            route_timeout_seconds: None,
            http_filters: Vec::new(),
        }
    }
}

/// File access log settings for the HTTP connection manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogSettings {
    /// Path of the access log file inside the proxy container
    pub log_file: String,

    /// Envoy substitution format string (proxy default when unset)
    #[serde(default)]
    pub format: Option<String>,
}

/// Control HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Maximum accepted API description size in bytes
    #[validate(range(min = 1024, message = "Max body size must be at least 1KB"))]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8090, max_body_size: 4 * 1024 * 1024 }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Service name attached to startup logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false, service_name: "oasproxy".into() }
    }
}

/// Defaults for the gateway workload manifest
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Proxy container image
    #[validate(length(min = 1, message = "Image cannot be empty"))]
    pub image: String,

    /// HTTP port exposed by the gateway container
    #[validate(range(min = 1, message = "HTTP port must be between 1 and 65535"))]
    pub http_port: u16,

    /// Mount an emptyDir for API usage data
    pub analytics_enabled: bool,

    /// Expose the Prometheus port on the gateway container
    pub observability_enabled: bool,

    /// Prometheus port exposed when observability is enabled
    pub observability_port: u16,

    /// Name of the config map holding the rendered Envoy bootstrap
    #[validate(length(min = 1, message = "Config map name cannot be empty"))]
    pub config_map_name: String,

    pub resource_request_cpu: String,
    pub resource_request_memory: String,
    pub resource_limit_cpu: String,
    pub resource_limit_memory: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            image: "envoyproxy/envoy:v1.14.1".to_string(),
            http_port: 9090,
            analytics_enabled: false,
            observability_enabled: false,
            observability_port: 9095,
            config_map_name: "envoy-config".to_string(),
            resource_request_cpu: "1000m".to_string(),
            resource_request_memory: "512Mi".to_string(),
            resource_limit_cpu: "2000m".to_string(),
            resource_limit_memory: "512Mi".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.access_logs.is_none());
    }

    #[test]
    fn test_server_config_bind_address() {
        let config = ServerConfig { host: "127.0.0.1".to_string(), port: 8090, ..Default::default() };
        assert_eq!(config.bind_address(), "127.0.0.1:8090");
    }

    #[test]
    fn test_port_conflict_rejected() {
        let mut config = AppConfig::default();
        config.server.port = 10000;
        config.envoy.listener_port = 10000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_access_log_path_rejected() {
        let config = AppConfig {
            access_logs: Some(AccessLogSettings { log_file: " ".to_string(), format: None }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ports_rejected() {
        let mut config = AppConfig::default();
        config.envoy.api_default_port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.envoy.listener_address = String::new();
        assert!(config.validate().is_err());
    }
}

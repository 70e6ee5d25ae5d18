//! # Configuration Management
//!
//! Layered configuration for oasproxy: built-in defaults, then an optional
//! TOML/YAML file, then `OASPROXY__*` environment variables (`__` separates
//! nesting levels, e.g. `OASPROXY__ENVOY__API_DEFAULT_PORT=8080`).

mod settings;

use std::path::Path;

use crate::errors::{Error, Result};

pub use settings::{
    AccessLogSettings, AppConfig, DeploymentConfig, EnvoyConfig, ObservabilityConfig,
    ServerConfig,
};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "OASPROXY";

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Configuration file '{}' does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}

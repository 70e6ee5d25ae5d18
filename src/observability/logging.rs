//! # Structured Logging
//!
//! Logging setup and span macros built on the tracing ecosystem. `RUST_LOG`
//! always wins over the configured level. Output goes to stderr so the
//! `compile` command can print documents on stdout.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Create a tracing span for one compilation.
///
/// ```rust,ignore
/// let span = compile_span!("Petstore 1.0.0", "production");
/// ```
#[macro_export]
macro_rules! compile_span {
    ($api:expr, $upstream:expr) => {
        tracing::info_span!(
            "compile",
            api = %$api,
            upstream = %$upstream,
            compilation_id = %uuid::Uuid::new_v4()
        )
    };
    ($api:expr, $upstream:expr, $($field:tt)*) => {
        tracing::info_span!(
            "compile",
            api = %$api,
            upstream = %$upstream,
            compilation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for control API requests
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
}

/// Install the global subscriber.
///
/// Calling this twice is harmless: the second call finds a subscriber already
/// set (integration tests do this) and returns without touching it.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.log_level),
    }
    .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    let installed = if config.json_logging {
        fmt().json().with_env_filter(filter).with_current_span(true).with_writer(std::io::stderr).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }

    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service = %config.observability.service_name,
        server_address = %config.server.bind_address(),
        listener = %format!("{}:{}", config.envoy.listener_address, config.envoy.listener_port),
        api_default_port = config.envoy.api_default_port,
        http_filters = config.envoy.http_filters.len(),
        access_log = config.access_logs.as_ref().map(|a| a.log_file.as_str()).unwrap_or("<default>"),
        "oasproxy configuration"
    );
}

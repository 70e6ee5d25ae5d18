//! # Observability
//!
//! Structured logging for the compiler and the control server.

pub mod logging;

pub use logging::{init_logging, log_config_info};

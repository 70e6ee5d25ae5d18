//! # oasproxy
//!
//! Compiles OpenAPI v3 API descriptions into Envoy proxy configuration.
//!
//! ## Architecture
//!
//! ```text
//! OpenAPI document → Importer → ApiDefinition → Compiler → Listener + Clusters
//!                        ↓                                        ↓
//!               Endpoint resolution                     Bootstrap (JSON/YAML)
//! ```
//!
//! - [`openapi`]: parses documents and extracts resources, endpoints and extensions
//! - [`xds`]: builds Envoy listener, route and cluster resources from them
//! - [`assembly`]: ties import and compilation to the loaded configuration
//! - [`api`]: Axum control API that compiles and serves bootstrap documents
//! - [`deployment`]: renders the gateway workload manifest
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use oasproxy::{assembly::ConfigAssembler, config::AppConfig, openapi::ImportOptions};
//! use oasproxy::xds::{render_bootstrap, UpstreamSelection};
//!
//! fn main() -> oasproxy::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let document = std::fs::read("petstore.yaml")?;
//!     let compiled = ConfigAssembler::from_config(&config).import_and_assemble(
//!         &document,
//!         &ImportOptions::default(),
//!         UpstreamSelection::Production,
//!     )?;
//!     println!("{}", render_bootstrap(&compiled)?);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assembly;
pub mod cli;
pub mod config;
pub mod deployment;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod openapi;
pub mod xds;

pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

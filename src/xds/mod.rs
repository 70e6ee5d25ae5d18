//! Envoy configuration generation
//!
//! Builds Envoy v3 resources with `envoy-types`:
//! - [`compiler`]: API resources to listener, routes and clusters
//! - [`listener`], [`route`], [`cluster`], [`access_log`]: per-message builders
//! - [`filters`]: HTTP filter chain and typed config helpers
//! - [`bootstrap`]: static bootstrap documents for the data plane

pub mod access_log;
pub mod bootstrap;
pub mod cluster;
pub mod compiler;
pub mod filters;
pub mod listener;
pub mod route;

pub use bootstrap::{render_bootstrap, AdminEndpoint, BootstrapFormat};
pub use compiler::{
    compile, CompileRequest, CompilerSettings, ProxyConfigModel, ProxyConfigTree,
    UpstreamSelection,
};

/// Type URL for Cluster resources
pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
/// Type URL for Listener resources
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";

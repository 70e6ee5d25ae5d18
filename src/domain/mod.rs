//! Domain layer
//!
//! Pure data types describing an imported API independently of the proxy
//! that will serve it. Nothing here performs I/O.
//!
//! ## Module Organization
//!
//! - `api_definition`: the aggregate root produced by one import
//! - `resource`: operations (path + method) and their security requirements
//! - `endpoint`: resolved upstream targets

pub mod api_definition;
pub mod endpoint;
pub mod resource;

pub use api_definition::ApiDefinition;
pub use endpoint::{is_ip_literal, Endpoint};
pub use resource::{HttpMethod, Resource, SecurityRequirement};

/// Vendor extensions kept as plain JSON values, forwarded but never interpreted.
pub type VendorExtensions = serde_json::Map<String, serde_json::Value>;

//! API definition aggregate
//!
//! The normalized, proxy-agnostic form of one imported API description.
//! It is built once by the importer and only read afterwards.

use serde::{Deserialize, Serialize};

use super::{Endpoint, Resource, SecurityRequirement, VendorExtensions};

/// Normalized API description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    /// Version string of the source format, e.g. `3.0.3`
    pub schema_version: String,
    /// Operations in source declaration order
    pub resources: Vec<Resource>,
    /// Default upstreams for resources that declare none
    pub production_urls: Vec<Endpoint>,
    pub sandbox_urls: Vec<Endpoint>,
    /// Document-level security requirements
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(default)]
    pub vendor_extensions: VendorExtensions,
}

impl ApiDefinition {
    /// Human readable identity used in logs and error messages
    pub fn display_name(&self) -> String {
        format!("{} {}", self.title, self.version)
    }

    /// Production endpoints in effect for a resource
    pub fn production_endpoints_for<'a>(&'a self, resource: &'a Resource) -> &'a [Endpoint] {
        if resource.production_endpoints.is_empty() {
            &self.production_urls
        } else {
            &resource.production_endpoints
        }
    }

    /// Sandbox endpoints in effect for a resource
    pub fn sandbox_endpoints_for<'a>(&'a self, resource: &'a Resource) -> &'a [Endpoint] {
        if resource.sandbox_endpoints.is_empty() {
            &self.sandbox_urls
        } else {
            &resource.sandbox_endpoints
        }
    }
}

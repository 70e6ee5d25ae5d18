//! Static Envoy bootstrap rendering
//!
//! Turns a compiled API into a self-contained bootstrap document: the admin
//! interface plus the listener and clusters as static resources. Envoy can
//! start from this file directly, no control plane connection needed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::assembly::CompiledApi;
use crate::errors::{Error, Result};

/// Envoy admin interface location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEndpoint {
    pub address: String,
    pub port: u16,
}

/// Output encoding of a bootstrap document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapFormat {
    Json,
    #[default]
    Yaml,
}

impl BootstrapFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Yaml => "application/yaml",
        }
    }

    /// Serialize a rendered bootstrap
    pub fn serialize(&self, bootstrap: &Value) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(bootstrap).map_err(|source| {
                Error::Serialization { source, context: "bootstrap as JSON".to_string() }
            }),
            Self::Yaml => serde_yaml::to_string(bootstrap)
                .map_err(|e| Error::internal(format!("Failed to serialize bootstrap as YAML: {}", e))),
        }
    }
}

impl FromStr for BootstrapFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(Error::validation(format!("Unsupported bootstrap format '{}'", other))),
        }
    }
}

/// Render the compiled API as an Envoy v3 bootstrap document
pub fn render_bootstrap(compiled: &CompiledApi) -> Result<Value> {
    let model = &compiled.tree.model;

    Ok(json!({
        "admin": {
            "address": {
                "socket_address": {
                    "address": compiled.admin.address,
                    "port_value": compiled.admin.port,
                }
            }
        },
        "static_resources": {
            "listeners": [model.listener.to_bootstrap_json()?],
            "clusters": model.clusters.iter().map(|c| c.to_bootstrap_json()).collect::<Vec<_>>(),
        }
    }))
}

//! API resource (operation) domain types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::{Endpoint, VendorExtensions};

/// HTTP methods a resource can be routed on.
///
/// `OPTIONS` and `TRACE` are intentionally absent: operations declared with
/// them are skipped at import time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
}

impl HttpMethod {
    /// All recognized methods in emission order
    pub const ALL: [HttpMethod; 6] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

/// One security requirement: every listed scheme must be satisfied (AND),
/// each with the given scopes.
pub type SecurityRequirement = BTreeMap<String, BTreeSet<String>>;

/// One API operation: a path template bound to a single method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Alternative requirement sets (OR across entries)
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    /// Empty means the API-level production endpoints apply
    #[serde(default)]
    pub production_endpoints: Vec<Endpoint>,
    /// Empty means the API-level sandbox endpoints apply
    #[serde(default)]
    pub sandbox_endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub vendor_extensions: VendorExtensions,
}

impl Resource {
    /// Create a resource with only a path and a method set
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            security: Vec::new(),
            production_endpoints: Vec::new(),
            sandbox_endpoints: Vec::new(),
            vendor_extensions: VendorExtensions::new(),
        }
    }

    /// Whether the path template declares path parameters
    pub fn has_path_parameters(&self) -> bool {
        self.path.contains('{')
    }
}

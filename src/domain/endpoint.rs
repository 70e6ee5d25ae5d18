//! Upstream endpoint domain type

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved upstream target.
///
/// Endpoints only exist with a concrete port: the resolver fills the default
/// port before an endpoint is attached to an API or a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname or IP literal (IPv6 without brackets)
    pub host: String,
    /// Path prefix applied to resource paths, may be empty
    pub basepath: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, basepath: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), basepath: basepath.into(), port }
    }
}

/// Whether a host is an IP literal rather than a DNS name
pub fn is_ip_literal(host: &str) -> bool {
    host.parse::<std::net::IpAddr>().is_ok()
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}{}", self.host, self.port, self.basepath)
        } else {
            write!(f, "{}:{}{}", self.host, self.port, self.basepath)
        }
    }
}

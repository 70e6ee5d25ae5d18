//! Endpoint resolution for declared server URLs
//!
//! Server URLs in API descriptions are frequently partial: no scheme, no
//! port, sometimes nothing but a host. The resolver turns them into concrete
//! [`Endpoint`]s, filling the port from configuration when the URL omits it.

use url::{Host, Url};

use crate::config::EnvoyConfig;
use crate::domain::Endpoint;
use crate::errors::{Error, Result};

/// Scheme prepended to scheme-less URLs so they parse; it is discarded afterwards.
const ASSUMED_SCHEME: &str = "http://";

/// Resolves raw server URLs into endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointResolver {
    default_port: u16,
}

impl EndpointResolver {
    pub fn new(default_port: u16) -> Self {
        Self { default_port }
    }

    /// Build a resolver from the Envoy section of the configuration snapshot
    pub fn from_config(config: &EnvoyConfig) -> Self {
        Self::new(config.api_default_port)
    }

    /// Resolve a raw server URL.
    ///
    /// Port order: explicit port in the URL, then the configured default.
    /// A URL that cannot be parsed, is relative, has no host or resolves to
    /// port 0 is an error.
    pub fn resolve(&self, raw_url: &str) -> Result<Endpoint> {
        let trimmed = raw_url.trim();
        if trimmed.is_empty() {
            return Err(Error::endpoint_resolution(raw_url, "server URL is empty"));
        }

        let candidate = if let Some(rest) = trimmed.strip_prefix("//") {
            format!("{}{}", ASSUMED_SCHEME, rest)
        } else if trimmed.starts_with('/') {
            return Err(Error::endpoint_resolution(
                raw_url,
                "relative server URLs have no upstream host",
            ));
        } else if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{}{}", ASSUMED_SCHEME, trimmed)
        };

        // `http:///v3` would otherwise parse with `v3` as the host.
        let has_authority = candidate
            .split_once("://")
            .is_some_and(|(_, rest)| !rest.is_empty() && !rest.starts_with('/'));
        if !has_authority {
            return Err(Error::endpoint_resolution(raw_url, "server URL does not contain a host"));
        }

        let url = Url::parse(&candidate)
            .map_err(|err| Error::endpoint_resolution(raw_url, err.to_string()))?;

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => String::new(),
        };

        if host.is_empty() {
            return Err(Error::endpoint_resolution(raw_url, "server URL does not contain a host"));
        }

        // `Url::port` hides a port equal to the scheme default (`http://x:80`),
        // so fall back to reading the authority ourselves before using the default.
        let port = url
            .port()
            .or_else(|| explicit_authority_port(&candidate))
            .unwrap_or(self.default_port);
        if port == 0 {
            return Err(Error::endpoint_resolution(raw_url, "port 0 cannot be used for an upstream"));
        }

        Ok(Endpoint { host, basepath: normalize_basepath(url.path()), port })
    }

    /// Resolve a list of raw URLs, failing on the first bad one
    pub fn resolve_all<'a, I>(&self, raw_urls: I) -> Result<Vec<Endpoint>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        raw_urls.into_iter().map(|raw| self.resolve(raw)).collect()
    }
}

fn normalize_basepath(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn explicit_authority_port(url: &str) -> Option<u16> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;

    let port = if host_port.starts_with('[') {
        host_port.split_once("]:")?.1
    } else {
        host_port.rsplit_once(':')?.1
    };

    port.parse().ok()
}

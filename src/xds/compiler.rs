//! API-definition to Envoy configuration compiler
//!
//! Walks the normalized resources of one API and emits a listener whose
//! connection manager carries the inline route table, plus the clusters the
//! routes point at. Compilation is pure: the same request and settings always
//! produce the same tree, and nothing outside the returned value is touched.

use std::collections::BTreeSet;
use std::fmt;

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::listener::v3::Listener;
use envoy_types::pb::google::protobuf::Any as EnvoyAny;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AccessLogSettings, AppConfig};
use crate::domain::{Endpoint, Resource};
use crate::errors::{Error, Result};
use crate::xds::access_log::AccessLogConfig;
use crate::xds::cluster::ClusterConfig;
use crate::xds::filters::encode_any;
use crate::xds::filters::http::HttpFilterConfigEntry;
use crate::xds::listener::{HttpConnectionManagerConfig, ListenerConfig, INGRESS_STAT_PREFIX};
use crate::xds::{CLUSTER_TYPE_URL, LISTENER_TYPE_URL};
use crate::xds::route::{
    to_uri_template, HeaderMatchConfig, HostRewrite, PathMatch, RouteActionConfig, RouteConfig,
    RouteMatchConfig, RouteRule, VirtualHostConfig, METHOD_HEADER,
};

/// Which endpoint set the routes forward to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamSelection {
    #[default]
    Production,
    Sandbox,
}

impl UpstreamSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for UpstreamSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global inputs of a compilation taken from the configuration snapshot
#[derive(Debug, Clone, Default)]
pub struct CompilerSettings {
    pub access_logs: Option<AccessLogSettings>,
    /// Upstream timeout in seconds; Envoy's default when unset
    pub route_timeout: Option<u64>,
}

impl CompilerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            access_logs: config.access_logs.clone(),
            route_timeout: config.envoy.route_timeout_seconds,
        }
    }
}

/// Everything one compilation needs about the API being compiled
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub virtual_host_name: String,
    pub route_config_name: String,
    pub listener_name: String,
    pub listener_address: String,
    pub listener_port: u16,
    pub resources: Vec<Resource>,
    /// API-level endpoints used by resources that declare none
    pub production_urls: Vec<Endpoint>,
    pub sandbox_urls: Vec<Endpoint>,
    /// Filters placed before the router, in order
    pub http_filters: Vec<HttpFilterConfigEntry>,
    pub upstream: UpstreamSelection,
}

/// Serializable description of a compiled tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfigModel {
    pub listener: ListenerConfig,
    pub clusters: Vec<ClusterConfig>,
}

/// Result of one compilation
#[derive(Debug, Clone)]
pub struct ProxyConfigTree {
    pub listener: Listener,
    /// One cluster per distinct upstream endpoint set, in first-use order
    pub clusters: Vec<Cluster>,
    pub model: ProxyConfigModel,
}

impl ProxyConfigTree {
    /// Typed resources for distribution: clusters first, then the listener.
    pub fn to_resources(&self) -> Result<Vec<EnvoyAny>> {
        let mut resources = self
            .clusters
            .iter()
            .map(|cluster| encode_any(CLUSTER_TYPE_URL, cluster))
            .collect::<Result<Vec<_>>>()?;
        resources.push(encode_any(LISTENER_TYPE_URL, &self.listener)?);
        Ok(resources)
    }

    pub fn route_count(&self) -> usize {
        self.model
            .listener
            .http_connection_manager
            .route_config
            .virtual_hosts
            .iter()
            .map(|vh| vh.routes.len())
            .sum()
    }
}

/// Compile one API into an Envoy listener and its clusters.
///
/// Fails with [`Error::ConfigEncode`] when a resource has no upstream in the
/// selected set, when the members of one set disagree on the basepath, or
/// when any message cannot be encoded. No partial tree is returned.
pub fn compile(request: CompileRequest, settings: &CompilerSettings) -> Result<ProxyConfigTree> {
    let api_level = match request.upstream {
        UpstreamSelection::Production => &request.production_urls,
        UpstreamSelection::Sandbox => &request.sandbox_urls,
    };

    let mut clusters = ClusterRegistry::new(request.upstream);
    let mut routes = Vec::with_capacity(request.resources.len());

    for resource in &request.resources {
        let own = match request.upstream {
            UpstreamSelection::Production => &resource.production_endpoints,
            UpstreamSelection::Sandbox => &resource.sandbox_endpoints,
        };
        let endpoints = if own.is_empty() { api_level } else { own };

        let Some(primary) = endpoints.first() else {
            return Err(Error::config_encode(format!(
                "No {} endpoints for {} {}",
                request.upstream, resource.method, resource.path
            )));
        };

        if let Some(other) = endpoints.iter().find(|e| e.basepath != primary.basepath) {
            return Err(Error::config_encode(format!(
                "Endpoints of {} {} disagree on the basepath ('{}' on {} vs '{}' on {})",
                resource.method, resource.path, primary.basepath, primary, other.basepath, other
            )));
        }

        // A literal rewrite would send every member the first member's host.
        let host_rewrite = if endpoints.iter().all(|e| e.host == primary.host) {
            HostRewrite::Literal(primary.host.clone())
        } else {
            HostRewrite::Auto
        };

        let cluster = clusters.cluster_for(endpoints);
        let full_path = format!("{}{}", primary.basepath, resource.path);

        let path = if resource.has_path_parameters() {
            PathMatch::Template(to_uri_template(&full_path))
        } else {
            PathMatch::Exact(full_path)
        };

        routes.push(RouteRule {
            name: Some(
                resource
                    .operation_id
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", resource.method, resource.path)),
            ),
            r#match: RouteMatchConfig {
                path,
                headers: vec![HeaderMatchConfig {
                    name: METHOD_HEADER.to_string(),
                    exact: resource.method.as_str().to_string(),
                }],
            },
            action: RouteActionConfig {
                cluster,
                host_rewrite: Some(host_rewrite),
                timeout: settings.route_timeout,
            },
        });
    }

    let listener = ListenerConfig {
        name: request.listener_name,
        address: request.listener_address,
        port: request.listener_port,
        http_connection_manager: HttpConnectionManagerConfig {
            stat_prefix: INGRESS_STAT_PREFIX.to_string(),
            route_config: RouteConfig {
                name: request.route_config_name,
                virtual_hosts: vec![VirtualHostConfig {
                    name: request.virtual_host_name,
                    domains: vec!["*".to_string()],
                    routes,
                }],
            },
            http_filters: request.http_filters,
            access_log: AccessLogConfig::from_settings(settings.access_logs.as_ref()),
        },
    };

    let model = ProxyConfigModel { listener, clusters: clusters.into_configs() };

    let envoy_clusters = model
        .clusters
        .iter()
        .map(ClusterConfig::to_envoy_cluster)
        .collect::<Result<Vec<_>>>()?;
    let envoy_listener = model.listener.to_envoy_listener()?;

    debug!(
        listener = %model.listener.name,
        clusters = envoy_clusters.len(),
        "Compiled proxy configuration"
    );

    Ok(ProxyConfigTree { listener: envoy_listener, clusters: envoy_clusters, model })
}

/// Assigns stable, unique cluster names to endpoint sets
struct ClusterRegistry {
    upstream: UpstreamSelection,
    entries: Vec<(BTreeSet<(String, u16)>, ClusterConfig)>,
}

impl ClusterRegistry {
    fn new(upstream: UpstreamSelection) -> Self {
        Self { upstream, entries: Vec::new() }
    }

    fn cluster_for(&mut self, endpoints: &[Endpoint]) -> String {
        let key: BTreeSet<(String, u16)> =
            endpoints.iter().map(|e| (e.host.clone(), e.port)).collect();

        if let Some((_, config)) = self.entries.iter().find(|(existing, _)| *existing == key) {
            return config.name.clone();
        }

        let base = cluster_name(self.upstream, &key);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.entries.iter().any(|(_, config)| config.name == name) {
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }

        self.entries.push((key, ClusterConfig::for_endpoints(name.clone(), endpoints)));
        name
    }

    fn into_configs(self) -> Vec<ClusterConfig> {
        self.entries.into_iter().map(|(_, config)| config).collect()
    }
}

fn cluster_name(upstream: UpstreamSelection, members: &BTreeSet<(String, u16)>) -> String {
    let mut name = upstream.as_str().to_string();
    for (host, port) in members {
        name.push('_');
        name.extend(host.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }));
        name.push('_');
        name.push_str(&port.to_string());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;
    use envoy_types::pb::envoy::config::route::v3::route_match::PathSpecifier;

    fn request(resources: Vec<Resource>) -> CompileRequest {
        CompileRequest {
            virtual_host_name: "petstore-vh".into(),
            route_config_name: "petstore-routes".into(),
            listener_name: "petstore-listener".into(),
            listener_address: "0.0.0.0".into(),
            listener_port: 10000,
            resources,
            production_urls: vec![Endpoint::new("petstore.local", "/v1", 80)],
            sandbox_urls: Vec::new(),
            http_filters: Vec::new(),
            upstream: UpstreamSelection::Production,
        }
    }

    #[test]
    fn routes_follow_declaration_order() {
        let tree = compile(
            request(vec![
                Resource::new("/pets", HttpMethod::Get),
                Resource::new("/pets", HttpMethod::Post),
                Resource::new("/pets/{id}", HttpMethod::Get),
            ]),
            &CompilerSettings::default(),
        )
        .expect("compile");

        let routes = &tree.model.listener.http_connection_manager.route_config.virtual_hosts[0].routes;
        let methods: Vec<&str> =
            routes.iter().map(|r| r.r#match.headers[0].exact.as_str()).collect();
        assert_eq!(methods, vec!["GET", "POST", "GET"]);
        assert_eq!(routes[0].r#match.path, PathMatch::Exact("/v1/pets".into()));
        assert_eq!(routes[2].r#match.path, PathMatch::Template("/v1/pets/{id}".into()));
        assert_eq!(tree.route_count(), 3);
    }

    #[test]
    fn shared_endpoint_sets_share_one_cluster() {
        let mut special = Resource::new("/admin", HttpMethod::Get);
        special.production_endpoints = vec![Endpoint::new("admin.local", "", 8080)];

        let tree = compile(
            request(vec![Resource::new("/pets", HttpMethod::Get), special, Resource::new("/toys", HttpMethod::Get)]),
            &CompilerSettings::default(),
        )
        .expect("compile");

        let names: Vec<&str> = tree.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["production_petstore_local_80", "production_admin_local_8080"]);
    }

    #[test]
    fn multi_host_sets_use_auto_host_rewrite() {
        let mut req = request(vec![Resource::new("/pets", HttpMethod::Get)]);
        req.production_urls =
            vec![Endpoint::new("a.pets.local", "/v1", 80), Endpoint::new("b.pets.local", "/v1", 80)];

        let tree = compile(req, &CompilerSettings::default()).expect("compile");
        let route = &tree.model.listener.http_connection_manager.route_config.virtual_hosts[0].routes[0];

        assert_eq!(route.action.host_rewrite, Some(HostRewrite::Auto));
        assert_eq!(route.r#match.path, PathMatch::Exact("/v1/pets".into()));
        assert_eq!(tree.model.clusters[0].endpoints.len(), 2);
    }

    #[test]
    fn same_host_on_several_ports_keeps_literal_rewrite() {
        let mut req = request(vec![Resource::new("/pets", HttpMethod::Get)]);
        req.production_urls =
            vec![Endpoint::new("pets.local", "/v1", 80), Endpoint::new("pets.local", "/v1", 8080)];

        let tree = compile(req, &CompilerSettings::default()).expect("compile");
        let route = &tree.model.listener.http_connection_manager.route_config.virtual_hosts[0].routes[0];
        assert_eq!(route.action.host_rewrite, Some(HostRewrite::Literal("pets.local".into())));
    }

    #[test]
    fn differing_basepaths_in_one_set_fail() {
        let mut req = request(vec![Resource::new("/pets", HttpMethod::Get)]);
        req.production_urls =
            vec![Endpoint::new("a.pets.local", "/v1", 80), Endpoint::new("b.other.local", "/v2", 80)];

        let err = compile(req, &CompilerSettings::default()).expect_err("should fail");
        assert!(matches!(err, Error::ConfigEncode(_)));
        assert!(err.to_string().contains("basepath"));
    }

    #[test]
    fn configured_route_timeout_reaches_routes() {
        let mut config = AppConfig::default();
        config.envoy.route_timeout_seconds = Some(30);
        let settings = CompilerSettings::from_config(&config);

        let tree = compile(request(vec![Resource::new("/pets", HttpMethod::Get)]), &settings)
            .expect("compile");
        let route = &tree.model.listener.http_connection_manager.route_config.virtual_hosts[0].routes[0];
        assert_eq!(route.action.timeout, Some(30));
    }

    #[test]
    fn missing_sandbox_endpoints_fail() {
        let mut req = request(vec![Resource::new("/pets", HttpMethod::Get)]);
        req.upstream = UpstreamSelection::Sandbox;

        let err = compile(req, &CompilerSettings::default()).expect_err("should fail");
        assert!(matches!(err, Error::ConfigEncode(_)));
    }

    #[test]
    fn envoy_route_matches_exact_path() {
        let tree = compile(request(vec![Resource::new("/pets", HttpMethod::Get)]), &CompilerSettings::default())
            .expect("compile");
        let model_routes = &tree.model.listener.http_connection_manager.route_config;
        let envoy_routes = model_routes.to_envoy_route_configuration().expect("convert");

        let route_match = envoy_routes.virtual_hosts[0].routes[0].r#match.as_ref().expect("match");
        assert_eq!(route_match.path_specifier, Some(PathSpecifier::Path("/v1/pets".into())));
    }

    #[test]
    fn resources_put_clusters_before_listener() {
        let tree = compile(request(vec![Resource::new("/pets", HttpMethod::Get)]), &CompilerSettings::default())
            .expect("compile");
        let resources = tree.to_resources().expect("encode");

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].type_url, CLUSTER_TYPE_URL);
        assert_eq!(resources[1].type_url, LISTENER_TYPE_URL);
    }

    #[test]
    fn cluster_names_stay_unique_after_sanitizing() {
        let mut registry = ClusterRegistry::new(UpstreamSelection::Production);
        let first = registry.cluster_for(&[Endpoint::new("a.b", "", 80)]);
        let second = registry.cluster_for(&[Endpoint::new("a_b", "", 80)]);
        let again = registry.cluster_for(&[Endpoint::new("a.b", "/other", 80)]);

        assert_eq!(first, "production_a_b_80");
        assert_eq!(second, "production_a_b_80_2");
        assert_eq!(again, first);
    }
}

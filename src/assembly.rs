//! Config assembly
//!
//! Wires the importer and the compiler together and fills in everything the
//! API description cannot provide: listener bind address, HTTP filters,
//! access log settings and resource names.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compile_span;
use crate::config::AppConfig;
use crate::domain::ApiDefinition;
use crate::errors::Result;
use crate::openapi::{import_openapi, parse_document, EndpointResolver, ImportOptions};
use crate::xds::filters::http::HttpFilterConfigEntry;
use crate::xds::{compile, AdminEndpoint, CompileRequest, CompilerSettings, ProxyConfigTree, UpstreamSelection};

/// A compiled API together with what it was compiled from
#[derive(Debug, Clone)]
pub struct CompiledApi {
    /// Sanitized API name used as the prefix of every generated resource name
    pub name: String,
    pub api: ApiDefinition,
    pub upstream: UpstreamSelection,
    pub admin: AdminEndpoint,
    pub tree: ProxyConfigTree,
}

/// Short description of a compiled API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledSummary {
    pub name: String,
    pub title: String,
    pub version: String,
    pub upstream: UpstreamSelection,
    pub listener: String,
    pub routes: usize,
    pub clusters: Vec<String>,
}

impl CompiledApi {
    pub fn summary(&self) -> CompiledSummary {
        CompiledSummary {
            name: self.name.clone(),
            title: self.api.title.clone(),
            version: self.api.version.clone(),
            upstream: self.upstream,
            listener: self.tree.listener.name.clone(),
            routes: self.tree.route_count(),
            clusters: self.tree.clusters.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

/// Runs import and compilation against one configuration snapshot.
///
/// Holds no mutable state, so one assembler can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct ConfigAssembler {
    resolver: EndpointResolver,
    settings: CompilerSettings,
    listener_address: String,
    listener_port: u16,
    http_filters: Vec<HttpFilterConfigEntry>,
    admin: AdminEndpoint,
}

impl ConfigAssembler {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            resolver: EndpointResolver::from_config(&config.envoy),
            settings: CompilerSettings::from_config(config),
            listener_address: config.envoy.listener_address.clone(),
            listener_port: config.envoy.listener_port,
            http_filters: config.envoy.http_filters.clone(),
            admin: AdminEndpoint {
                address: config.envoy.admin_address.clone(),
                port: config.envoy.admin_port,
            },
        }
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Compile an imported API for the selected upstream
    pub fn assemble(&self, api: &ApiDefinition, upstream: UpstreamSelection) -> Result<ProxyConfigTree> {
        let name = sanitize_name(&api.title);
        let span = compile_span!(api.display_name(), upstream, resources = api.resources.len());
        let _guard = span.enter();

        let request = CompileRequest {
            virtual_host_name: format!("{}-vh", name),
            route_config_name: format!("{}-routes", name),
            listener_name: format!("{}-listener", name),
            listener_address: self.listener_address.clone(),
            listener_port: self.listener_port,
            resources: api.resources.clone(),
            production_urls: api.production_urls.clone(),
            sandbox_urls: api.sandbox_urls.clone(),
            http_filters: self.http_filters.clone(),
            upstream,
        };

        compile(request, &self.settings)
    }

    /// Compile and keep the source API alongside the tree
    pub fn compile_api(&self, api: ApiDefinition, upstream: UpstreamSelection) -> Result<CompiledApi> {
        let tree = self.assemble(&api, upstream)?;
        Ok(CompiledApi {
            name: sanitize_name(&api.title),
            api,
            upstream,
            admin: self.admin.clone(),
            tree,
        })
    }

    /// Parse, import and compile raw OpenAPI bytes
    pub fn import_and_assemble(
        &self,
        bytes: &[u8],
        options: &ImportOptions,
        upstream: UpstreamSelection,
    ) -> Result<CompiledApi> {
        let document = parse_document(bytes)?;
        let api = import_openapi(&document, &self.resolver, options)?;
        let compiled = self.compile_api(api, upstream)?;

        info!(
            api = %compiled.api.display_name(),
            listener = %compiled.tree.listener.name,
            routes = compiled.tree.route_count(),
            clusters = compiled.tree.clusters.len(),
            upstream = %upstream,
            "Compiled API"
        );

        Ok(compiled)
    }
}

/// Turn an API title into a resource-name-safe identifier
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        name.push_str("api");
    }

    if let Some(first_char) = name.chars().next() {
        if !first_char.is_ascii_alphabetic() && first_char != '_' {
            name.insert(0, '_');
        }
    }

    if name.len() > 48 {
        let mut cut = 48;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }

    name
}

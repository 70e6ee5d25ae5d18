//! OpenAPI v3 importer
//!
//! Turns an `openapiv3::OpenAPI` document into an [`ApiDefinition`]. The
//! importer is strict about the document identity (title, version, schema
//! version) and about server URLs, and lenient about individual operations:
//! unsupported methods and `$ref` path items are skipped, undecodable vendor
//! extensions degrade to an empty map.

use openapiv3::{OpenAPI, Operation, PathItem, ReferenceOr, Server};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    domain::{ApiDefinition, HttpMethod, Resource, SecurityRequirement, VendorExtensions},
    errors::{Error, Result},
};

pub mod endpoint;

pub use endpoint::EndpointResolver;

/// Major version prefix of the only supported document format
const SUPPORTED_SCHEMA_PREFIX: &str = "3.";

/// Operator-level inputs that the API description itself cannot carry.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Server URLs used when sandbox routing is requested
    pub sandbox_urls: Vec<String>,
}

/// Parse raw bytes as an OpenAPI document, JSON or YAML.
pub fn parse_document(bytes: &[u8]) -> Result<OpenAPI> {
    let looks_like_json =
        bytes.iter().find(|byte| !byte.is_ascii_whitespace()).is_some_and(|byte| *byte == b'{');

    let parsed = if looks_like_json {
        serde_json::from_slice::<OpenAPI>(bytes).map_err(|err| err.to_string())
    } else {
        serde_yaml::from_slice::<OpenAPI>(bytes).map_err(|err| err.to_string())
    };

    parsed.map_err(|message| {
        Error::import("<unparsed document>", format!("Invalid OpenAPI document: {}", message))
    })
}

/// Import an OpenAPI document into the normalized model.
pub fn import_openapi(
    document: &OpenAPI,
    resolver: &EndpointResolver,
    options: &ImportOptions,
) -> Result<ApiDefinition> {
    let title = document.info.title.trim();
    let version = document.info.version.trim();
    let display_name = format!("{} {}", title, version).trim().to_string();

    if title.is_empty() {
        return Err(Error::import(display_name, "info.title is missing or empty"));
    }
    if version.is_empty() {
        return Err(Error::import(display_name, "info.version is missing or empty"));
    }
    if !document.openapi.starts_with(SUPPORTED_SCHEMA_PREFIX) {
        return Err(Error::import(
            display_name,
            format!("unsupported schema version '{}'", document.openapi),
        ));
    }

    let security = convert_security(document.security.as_deref().unwrap_or_default());

    let production_urls = if server_url_available(&document.servers) {
        resolve_servers(&document.servers, resolver)?
    } else {
        Vec::new()
    };

    let sandbox_urls = resolver.resolve_all(options.sandbox_urls.iter().map(String::as_str))?;

    let resources = import_resources(document, resolver, &security)?;

    debug!(
        api = %display_name,
        resources = resources.len(),
        production_urls = production_urls.len(),
        sandbox_urls = sandbox_urls.len(),
        "Imported OpenAPI document"
    );

    Ok(ApiDefinition {
        title: title.to_string(),
        version: version.to_string(),
        description: document.info.description.clone(),
        schema_version: document.openapi.clone(),
        resources,
        production_urls,
        sandbox_urls,
        security,
        vendor_extensions: convert_extensions(&document.extensions, "document"),
    })
}

fn import_resources(
    document: &OpenAPI,
    resolver: &EndpointResolver,
    default_security: &[SecurityRequirement],
) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();

    for (path, item) in document.paths.paths.iter() {
        let item = match item {
            ReferenceOr::Item(item) => item,
            ReferenceOr::Reference { reference } => {
                warn!(path = %path, reference = %reference, "Skipping path item given as $ref");
                continue;
            }
        };

        if item.options.is_some() || item.trace.is_some() {
            debug!(path = %path, "Skipping OPTIONS/TRACE operations");
        }

        for (method, operation) in operations(item) {
            let servers =
                if operation.servers.is_empty() { &item.servers } else { &operation.servers };

            let production_endpoints = if server_url_available(servers) {
                resolve_servers(servers, resolver)?
            } else {
                Vec::new()
            };

            let security = match &operation.security {
                Some(requirements) => convert_security(requirements),
                None => default_security.to_vec(),
            };

            resources.push(Resource {
                path: path.clone(),
                method,
                operation_id: operation.operation_id.clone(),
                summary: operation.summary.clone(),
                description: operation.description.clone(),
                tags: operation.tags.clone(),
                security,
                production_endpoints,
                sandbox_endpoints: Vec::new(),
                vendor_extensions: convert_extensions(
                    &operation.extensions,
                    &format!("{} {}", method, path),
                ),
            });
        }
    }

    Ok(resources)
}

/// Recognized operations of a path item in emission order.
fn operations(item: &PathItem) -> impl Iterator<Item = (HttpMethod, &Operation)> {
    HttpMethod::ALL.into_iter().filter_map(move |method| {
        let operation = match method {
            HttpMethod::Get => item.get.as_ref(),
            HttpMethod::Post => item.post.as_ref(),
            HttpMethod::Put => item.put.as_ref(),
            HttpMethod::Delete => item.delete.as_ref(),
            HttpMethod::Head => item.head.as_ref(),
            HttpMethod::Patch => item.patch.as_ref(),
        };
        operation.map(|operation| (method, operation))
    })
}

fn server_url_available(servers: &[Server]) -> bool {
    servers.first().is_some_and(|server| !server.url.trim().is_empty())
}

fn resolve_servers(
    servers: &[Server],
    resolver: &EndpointResolver,
) -> Result<Vec<crate::domain::Endpoint>> {
    servers
        .iter()
        .filter(|server| !server.url.trim().is_empty())
        .map(|server| resolver.resolve(&substitute_server_variables(server)))
        .collect()
}

/// Replace `{name}` placeholders in a server URL with the variable defaults.
fn substitute_server_variables(server: &Server) -> String {
    let mut url = server.url.clone();
    if let Some(variables) = &server.variables {
        for (name, variable) in variables {
            url = url.replace(&format!("{{{}}}", name), &variable.default);
        }
    }
    url
}

fn convert_security(requirements: &[openapiv3::SecurityRequirement]) -> Vec<SecurityRequirement> {
    requirements
        .iter()
        .map(|requirement| {
            requirement
                .iter()
                .map(|(scheme, scopes)| (scheme.clone(), scopes.iter().cloned().collect()))
                .collect()
        })
        .collect()
}

/// Strip format-specific wrappers from extensions by round-tripping them
/// through plain JSON. Failures are logged and yield an empty map.
fn convert_extensions<T: Serialize>(extensions: &T, context: &str) -> VendorExtensions {
    let decoded = serde_json::to_value(extensions).and_then(serde_json::from_value);

    match decoded {
        Ok(map) => map,
        Err(source) => {
            let error = Error::ExtensionDecode { context: context.to_string(), source };
            warn!(error = %error, "Dropping vendor extensions");
            VendorExtensions::new()
        }
    }
}

//! Route configuration using envoy-types
//!
//! The compiler builds a serializable [`RouteConfig`] first and converts it to
//! the envoy-types `RouteConfiguration` in one step, so the same description
//! can also be rendered into a static bootstrap document.

use envoy_types::pb::envoy::config::core::v3::TypedExtensionConfig;
use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier, route::Action, route_action::ClusterSpecifier,
    route_action::HostRewriteSpecifier, route_match::PathSpecifier, HeaderMatcher, Route,
    RouteAction, RouteConfiguration, RouteMatch, VirtualHost,
};
use envoy_types::pb::envoy::extensions::path::r#match::uri_template::v3::UriTemplateMatchConfig;
use envoy_types::pb::envoy::r#type::matcher::v3::{string_matcher::MatchPattern, StringMatcher};
use envoy_types::pb::google::protobuf::BoolValue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::xds::filters::encode_any;

const URI_TEMPLATE_MATCHER_NAME: &str = "envoy.path.match.uri_template";
const URI_TEMPLATE_MATCH_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.path.match.uri_template.v3.UriTemplateMatchConfig";

/// Pseudo-header carrying the request method
pub const METHOD_HEADER: &str = ":method";

/// Route table with its virtual hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHostConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHostConfig {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<RouteRule>,
}

/// One route: match criteria plus the upstream cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub name: Option<String>,
    pub r#match: RouteMatchConfig,
    pub action: RouteActionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatchConfig {
    pub path: PathMatch,
    #[serde(default)]
    pub headers: Vec<HeaderMatchConfig>,
}

/// Path matching strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMatch {
    Exact(String),
    /// URI template such as `/pets/{id}`
    Template(String),
}

/// Exact match on a request header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMatchConfig {
    pub name: String,
    pub exact: String,
}

/// How the Host header is rewritten before forwarding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostRewrite {
    /// Fixed host, used when every cluster member shares it
    Literal(String),
    /// Host of whichever cluster member was picked
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteActionConfig {
    pub cluster: String,
    #[serde(default)]
    pub host_rewrite: Option<HostRewrite>,
    /// Upstream timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl RouteConfig {
    /// Convert to envoy-types RouteConfiguration
    pub fn to_envoy_route_configuration(&self) -> crate::Result<RouteConfiguration> {
        let virtual_hosts = self
            .virtual_hosts
            .iter()
            .map(VirtualHostConfig::to_envoy_virtual_host)
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(RouteConfiguration {
            name: self.name.clone(),
            virtual_hosts,
            ..Default::default()
        })
    }

    /// Envoy v3 JSON representation
    pub fn to_bootstrap_json(&self) -> Value {
        json!({
            "name": self.name,
            "virtual_hosts": self.virtual_hosts.iter().map(VirtualHostConfig::to_bootstrap_json).collect::<Vec<_>>(),
        })
    }
}

impl VirtualHostConfig {
    fn to_envoy_virtual_host(&self) -> crate::Result<VirtualHost> {
        let routes =
            self.routes.iter().map(RouteRule::to_envoy_route).collect::<crate::Result<Vec<_>>>()?;

        Ok(VirtualHost {
            name: self.name.clone(),
            domains: self.domains.clone(),
            routes,
            ..Default::default()
        })
    }

    fn to_bootstrap_json(&self) -> Value {
        json!({
            "name": self.name,
            "domains": self.domains,
            "routes": self.routes.iter().map(RouteRule::to_bootstrap_json).collect::<Vec<_>>(),
        })
    }
}

impl RouteRule {
    fn to_envoy_route(&self) -> crate::Result<Route> {
        Ok(Route {
            name: self.name.clone().unwrap_or_default(),
            r#match: Some(self.r#match.to_envoy_route_match()?),
            action: Some(Action::Route(self.action.to_envoy_route_action())),
            ..Default::default()
        })
    }

    fn to_bootstrap_json(&self) -> Value {
        let mut route = json!({
            "match": self.r#match.to_bootstrap_json(),
            "route": self.action.to_bootstrap_json(),
        });
        if let Some(name) = &self.name {
            route["name"] = json!(name);
        }
        route
    }
}

impl RouteMatchConfig {
    fn to_envoy_route_match(&self) -> crate::Result<RouteMatch> {
        let path_specifier = match &self.path {
            PathMatch::Exact(path) => PathSpecifier::Path(path.clone()),
            PathMatch::Template(template) => {
                let config = UriTemplateMatchConfig { path_template: template.clone() };
                PathSpecifier::PathMatchPolicy(TypedExtensionConfig {
                    name: URI_TEMPLATE_MATCHER_NAME.to_string(),
                    typed_config: Some(encode_any(URI_TEMPLATE_MATCH_TYPE_URL, &config)?),
                })
            }
        };

        let headers = self.headers.iter().map(HeaderMatchConfig::to_envoy_header_matcher).collect();

        Ok(RouteMatch { path_specifier: Some(path_specifier), headers, ..Default::default() })
    }

    fn to_bootstrap_json(&self) -> Value {
        let mut value = match &self.path {
            PathMatch::Exact(path) => json!({ "path": path }),
            PathMatch::Template(template) => json!({
                "path_match_policy": {
                    "name": URI_TEMPLATE_MATCHER_NAME,
                    "typed_config": {
                        "@type": URI_TEMPLATE_MATCH_TYPE_URL,
                        "path_template": template,
                    }
                }
            }),
        };

        if !self.headers.is_empty() {
            value["headers"] = self
                .headers
                .iter()
                .map(|header| json!({ "name": header.name, "string_match": { "exact": header.exact } }))
                .collect();
        }
        value
    }
}

impl HeaderMatchConfig {
    fn to_envoy_header_matcher(&self) -> HeaderMatcher {
        HeaderMatcher {
            name: self.name.clone(),
            header_match_specifier: Some(HeaderMatchSpecifier::StringMatch(StringMatcher {
                match_pattern: Some(MatchPattern::Exact(self.exact.clone())),
                ..Default::default()
            })),
            ..Default::default()
        }
    }
}

impl RouteActionConfig {
    fn to_envoy_route_action(&self) -> RouteAction {
        #[allow(deprecated)]
        RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(self.cluster.clone())),
            host_rewrite_specifier: self.host_rewrite.as_ref().map(|rewrite| match rewrite {
                HostRewrite::Literal(host) => HostRewriteSpecifier::HostRewriteLiteral(host.clone()),
                HostRewrite::Auto => HostRewriteSpecifier::AutoHostRewrite(BoolValue { value: true }),
            }),
            timeout: self
                .timeout
                .map(|t| envoy_types::pb::google::protobuf::Duration { seconds: t as i64, nanos: 0 }),
            ..Default::default()
        }
    }

    fn to_bootstrap_json(&self) -> Value {
        let mut value = json!({ "cluster": self.cluster });
        match &self.host_rewrite {
            Some(HostRewrite::Literal(host)) => value["host_rewrite_literal"] = json!(host),
            Some(HostRewrite::Auto) => value["auto_host_rewrite"] = json!(true),
            None => {}
        }
        if let Some(timeout) = self.timeout {
            value["timeout"] = json!(format!("{}s", timeout));
        }
        value
    }
}

/// Convert an OpenAPI path template into Envoy's URI template syntax.
///
/// Envoy only accepts `[A-Za-z0-9_]` in variable names, so other characters
/// inside `{...}` are replaced with `_`.
pub fn to_uri_template(path: &str) -> String {
    let mut template = String::with_capacity(path.len());
    let mut in_variable = false;

    for c in path.chars() {
        match c {
            '{' => {
                in_variable = true;
                template.push(c);
            }
            '}' => {
                in_variable = false;
                template.push(c);
            }
            c if in_variable && !(c.is_ascii_alphanumeric() || c == '_') => template.push('_'),
            c => template.push(c),
        }
    }

    template
}

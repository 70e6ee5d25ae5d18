//! HTTP filter chain entries
//!
//! The HTTP filter list of the connection manager is supplied from
//! configuration as an ordered sequence. Order is preserved as given; the
//! router filter always ends up last because Envoy requires a terminal filter.

pub mod local_rate_limit;

use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router as RouterFilter;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::http_filter::ConfigType as HttpFilterConfigType;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::HttpFilter;
use envoy_types::pb::google::protobuf::Any as EnvoyAny;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Error;
use crate::xds::filters::{encode_any, invalid_config, TypedConfig};

pub use local_rate_limit::{LocalRateLimitConfig, TokenBucketConfig};

/// Envoy's canonical router filter name
pub const ROUTER_FILTER_NAME: &str = "envoy.filters.http.router";
const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";

/// One entry of the HTTP filter chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpFilterConfigEntry {
    /// Optional override for the filter name used in Envoy configuration
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the filter should be marked optional in Envoy
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub disabled: bool,
    pub filter: HttpFilterKind,
}

/// Supported HTTP filter types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HttpFilterKind {
    /// Built-in Envoy router filter
    Router,
    /// Envoy Local Rate Limit filter
    LocalRateLimit(LocalRateLimitConfig),
    /// Arbitrary filter expressed as a typed config payload
    Custom {
        #[serde(flatten)]
        config: TypedConfig,
        /// Proto3 JSON body of the same message, needed for static bootstraps
        #[serde(default)]
        json: Option<Value>,
    },
}

impl HttpFilterKind {
    fn is_router(&self) -> bool {
        matches!(self, Self::Router)
    }

    fn default_name(&self) -> &'static str {
        match self {
            Self::Router => ROUTER_FILTER_NAME,
            Self::LocalRateLimit(_) => "envoy.filters.http.local_ratelimit",
            Self::Custom { .. } => "custom.http.filter",
        }
    }

    fn to_any(&self) -> crate::Result<EnvoyAny> {
        match self {
            Self::Router => encode_any(ROUTER_TYPE_URL, &RouterFilter::default()),
            Self::LocalRateLimit(cfg) => cfg.to_any(),
            Self::Custom { config, .. } => Ok(config.to_any()),
        }
    }

    fn to_bootstrap_json(&self, name: &str) -> crate::Result<Value> {
        let typed_config = match self {
            Self::Router => json!({ "@type": ROUTER_TYPE_URL }),
            Self::LocalRateLimit(cfg) => cfg.to_bootstrap_json(),
            Self::Custom { config, json: Some(body) } => {
                let mut typed = json!({ "@type": config.type_url });
                if let (Some(target), Some(fields)) = (typed.as_object_mut(), body.as_object()) {
                    target.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                typed
            }
            Self::Custom { json: None, .. } => {
                return Err(Error::config_encode(format!(
                    "HTTP filter '{}' has no JSON form and cannot be rendered into a bootstrap",
                    name
                )))
            }
        };

        Ok(json!({ "name": name, "typed_config": typed_config }))
    }
}

/// Build the ordered Envoy HTTP filter list with the router last.
pub fn build_http_filters(entries: &[HttpFilterConfigEntry]) -> crate::Result<Vec<HttpFilter>> {
    let mut filters = Vec::with_capacity(entries.len().max(1));
    let mut router_filter: Option<HttpFilter> = None;

    for entry in entries {
        let name = entry.name.clone().unwrap_or_else(|| entry.filter.default_name().to_string());

        let filter = HttpFilter {
            name: name.clone(),
            is_optional: entry.is_optional,
            disabled: entry.disabled,
            config_type: Some(HttpFilterConfigType::TypedConfig(entry.filter.to_any()?)),
        };

        if entry.filter.is_router() || name == ROUTER_FILTER_NAME {
            if router_filter.is_some() {
                return Err(invalid_config("Multiple router filters specified"));
            }
            router_filter = Some(filter);
        } else {
            filters.push(filter);
        }
    }

    let router_filter = match router_filter {
        Some(filter) => filter,
        None => default_router_filter()?,
    };
    filters.push(router_filter);

    Ok(filters)
}

/// Envoy v3 JSON form of the filter list, with the same ordering rules as
/// [`build_http_filters`].
pub fn http_filters_bootstrap_json(entries: &[HttpFilterConfigEntry]) -> crate::Result<Vec<Value>> {
    let mut filters = Vec::with_capacity(entries.len().max(1));
    let mut router: Option<Value> = None;

    for entry in entries {
        let name = entry.name.clone().unwrap_or_else(|| entry.filter.default_name().to_string());
        let mut value = entry.filter.to_bootstrap_json(&name)?;
        if entry.is_optional {
            value["is_optional"] = json!(true);
        }
        if entry.disabled {
            value["disabled"] = json!(true);
        }

        if entry.filter.is_router() || name == ROUTER_FILTER_NAME {
            if router.is_some() {
                return Err(invalid_config("Multiple router filters specified"));
            }
            router = Some(value);
        } else {
            filters.push(value);
        }
    }

    filters.push(router.unwrap_or_else(|| {
        json!({ "name": ROUTER_FILTER_NAME, "typed_config": { "@type": ROUTER_TYPE_URL } })
    }));
    Ok(filters)
}

fn default_router_filter() -> crate::Result<HttpFilter> {
    Ok(HttpFilter {
        name: ROUTER_FILTER_NAME.to_string(),
        is_optional: false,
        disabled: false,
        config_type: Some(HttpFilterConfigType::TypedConfig(encode_any(
            ROUTER_TYPE_URL,
            &RouterFilter::default(),
        )?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xds::filters::Base64Bytes;

    fn custom(name: &str) -> HttpFilterConfigEntry {
        HttpFilterConfigEntry {
            name: Some(name.into()),
            is_optional: true,
            disabled: false,
            filter: HttpFilterKind::Custom {
                config: TypedConfig {
                    type_url: "type.googleapis.com/test.Custom".into(),
                    value: Base64Bytes(vec![1, 2, 3]),
                },
                json: Some(json!({ "enabled": true })),
            },
        }
    }

    #[test]
    fn router_is_appended_when_missing() {
        let filters = build_http_filters(&[]).expect("build filters");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].name, ROUTER_FILTER_NAME);
    }

    #[test]
    fn router_must_be_unique() {
        let router = HttpFilterConfigEntry {
            name: None,
            is_optional: false,
            disabled: false,
            filter: HttpFilterKind::Router,
        };

        let err =
            build_http_filters(&[router.clone(), router]).expect_err("duplicate router fails");
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn supplied_order_is_preserved_and_router_moves_last() {
        let router = HttpFilterConfigEntry {
            name: None,
            is_optional: false,
            disabled: false,
            filter: HttpFilterKind::Router,
        };
        let entries = vec![custom("first"), router, custom("second")];

        let names: Vec<String> =
            build_http_filters(&entries).expect("build").into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["first", "second", ROUTER_FILTER_NAME]);
    }

    #[test]
    fn bootstrap_json_keeps_order_and_custom_fields() {
        let filters = http_filters_bootstrap_json(&[custom("first")]).expect("render");

        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0]["name"], "first");
        assert_eq!(filters[0]["is_optional"], true);
        assert_eq!(filters[0]["typed_config"]["@type"], "type.googleapis.com/test.Custom");
        assert_eq!(filters[0]["typed_config"]["enabled"], true);
        assert_eq!(filters[1]["name"], ROUTER_FILTER_NAME);
    }

    #[test]
    fn custom_filter_without_json_cannot_be_rendered() {
        let mut entry = custom("opaque");
        if let HttpFilterKind::Custom { json, .. } = &mut entry.filter {
            *json = None;
        }

        let err = http_filters_bootstrap_json(&[entry]).expect_err("should fail");
        assert!(matches!(err, Error::ConfigEncode(_)));
    }

    #[test]
    fn filter_entries_deserialize_from_tagged_json() {
        let entry: HttpFilterConfigEntry = serde_json::from_value(serde_json::json!({
            "filter": {
                "type": "local_rate_limit",
                "stat_prefix": "rl",
                "token_bucket": {"max_tokens": 10, "fill_interval_ms": 1000}
            }
        }))
        .expect("deserialize");

        assert!(matches!(entry.filter, HttpFilterKind::LocalRateLimit(_)));
        assert!(!entry.is_optional);
    }
}

//! Listener configuration using envoy-types
//!
//! A compiled API gets exactly one listener with one filter chain holding the
//! HTTP connection manager. Routes are inlined into the connection manager.

use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress,
};
use envoy_types::pb::envoy::config::listener::v3::{filter::ConfigType, Filter, FilterChain, Listener};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::{CodecType, RouteSpecifier},
    HttpConnectionManager,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::xds::access_log::AccessLogConfig;
use crate::xds::filters::encode_any;
use crate::xds::filters::http::{build_http_filters, http_filters_bootstrap_json, HttpFilterConfigEntry};
use crate::xds::route::RouteConfig;

pub const HTTP_CONNECTION_MANAGER_NAME: &str = "envoy.filters.network.http_connection_manager";
const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";

/// Statistics prefix of the ingress connection manager
pub const INGRESS_STAT_PREFIX: &str = "ingress_http";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub http_connection_manager: HttpConnectionManagerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConnectionManagerConfig {
    pub stat_prefix: String,
    pub route_config: RouteConfig,
    #[serde(default)]
    pub http_filters: Vec<HttpFilterConfigEntry>,
    pub access_log: AccessLogConfig,
}

impl ListenerConfig {
    /// Convert to envoy-types Listener
    pub fn to_envoy_listener(&self) -> crate::Result<Listener> {
        let socket_address = SocketAddress {
            address: self.address.clone(),
            port_specifier: Some(PortSpecifier::PortValue(u32::from(self.port))),
            ..Default::default()
        };

        let filter = Filter {
            name: HTTP_CONNECTION_MANAGER_NAME.to_string(),
            config_type: Some(ConfigType::TypedConfig(encode_any(
                HTTP_CONNECTION_MANAGER_TYPE_URL,
                &self.http_connection_manager.to_envoy_hcm()?,
            )?)),
        };

        Ok(Listener {
            name: self.name.clone(),
            address: Some(Address { address: Some(AddressType::SocketAddress(socket_address)) }),
            filter_chains: vec![FilterChain { filters: vec![filter], ..Default::default() }],
            ..Default::default()
        })
    }

    /// Envoy v3 JSON representation
    pub fn to_bootstrap_json(&self) -> crate::Result<Value> {
        let hcm = &self.http_connection_manager;
        let mut typed_config = json!({
            "@type": HTTP_CONNECTION_MANAGER_TYPE_URL,
            "stat_prefix": hcm.stat_prefix,
            "codec_type": "AUTO",
            "route_config": hcm.route_config.to_bootstrap_json(),
            "http_filters": http_filters_bootstrap_json(&hcm.http_filters)?,
        });
        typed_config["access_log"] = json!([hcm.access_log.to_bootstrap_json()]);

        Ok(json!({
            "name": self.name,
            "address": {
                "socket_address": { "address": self.address, "port_value": self.port }
            },
            "filter_chains": [{
                "filters": [{
                    "name": HTTP_CONNECTION_MANAGER_NAME,
                    "typed_config": typed_config,
                }]
            }]
        }))
    }
}

impl HttpConnectionManagerConfig {
    fn to_envoy_hcm(&self) -> crate::Result<HttpConnectionManager> {
        Ok(HttpConnectionManager {
            stat_prefix: self.stat_prefix.clone(),
            codec_type: CodecType::Auto as i32,
            route_specifier: Some(RouteSpecifier::RouteConfig(
                self.route_config.to_envoy_route_configuration()?,
            )),
            http_filters: build_http_filters(&self.http_filters)?,
            access_log: self.access_log.to_envoy_access_log().into_iter().collect(),
            ..Default::default()
        })
    }
}

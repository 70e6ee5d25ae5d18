//! Upstream clusters using envoy-types
//!
//! Every distinct upstream endpoint set referenced by a route becomes one
//! cluster; several endpoints in a set are load balanced round robin.

use envoy_types::pb::envoy::config::{
    cluster::v3::{
        cluster::{ClusterDiscoveryType, DiscoveryType, LbPolicy},
        Cluster,
    },
    core::v3::{address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress},
    endpoint::v3::{lb_endpoint::HostIdentifier, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints},
};
use envoy_types::pb::google::protobuf::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::domain;

/// Connect timeout applied to generated clusters
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Serializable description of an upstream cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClusterConfig {
    #[validate(length(min = 1, message = "Cluster name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "At least one endpoint is required"), nested)]
    pub endpoints: Vec<EndpointConfig>,

    #[validate(range(min = 1, max = 300, message = "Connect timeout must be between 1 and 300 seconds"))]
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EndpointConfig {
    #[validate(length(min = 1, message = "Endpoint address cannot be empty"))]
    pub address: String,

    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,
}

/// How Envoy discovers the members of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    Static,
    LogicalDns,
    StrictDns,
}

impl Discovery {
    fn as_envoy(self) -> DiscoveryType {
        match self {
            Discovery::Static => DiscoveryType::Static,
            Discovery::LogicalDns => DiscoveryType::LogicalDns,
            Discovery::StrictDns => DiscoveryType::StrictDns,
        }
    }

    fn as_json(self) -> &'static str {
        match self {
            Discovery::Static => "STATIC",
            Discovery::LogicalDns => "LOGICAL_DNS",
            Discovery::StrictDns => "STRICT_DNS",
        }
    }
}

impl ClusterConfig {
    /// Build a cluster for one endpoint set. Duplicate host/port pairs collapse.
    pub fn for_endpoints(name: impl Into<String>, endpoints: &[domain::Endpoint]) -> Self {
        let mut members: Vec<EndpointConfig> = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let member = EndpointConfig { address: endpoint.host.clone(), port: endpoint.port };
            if !members.contains(&member) {
                members.push(member);
            }
        }

        Self {
            name: name.into(),
            endpoints: members,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECONDS,
        }
    }

    /// IP-only clusters are static; hostnames need DNS resolution.
    pub fn discovery(&self) -> Discovery {
        let all_ips = self.endpoints.iter().all(|e| domain::is_ip_literal(&e.address));

        if all_ips {
            Discovery::Static
        } else if self.endpoints.len() <= 1 {
            Discovery::LogicalDns
        } else {
            Discovery::StrictDns
        }
    }

    /// Convert to envoy-types Cluster
    pub fn to_envoy_cluster(&self) -> crate::Result<Cluster> {
        self.validate()
            .map_err(|e| crate::Error::config_encode(format!("Cluster '{}' is invalid: {}", self.name, e)))?;

        let lb_endpoints = self.endpoints.iter().map(EndpointConfig::to_envoy_lb_endpoint).collect();

        Ok(Cluster {
            name: self.name.clone(),
            cluster_discovery_type: Some(ClusterDiscoveryType::Type(self.discovery().as_envoy() as i32)),
            lb_policy: LbPolicy::RoundRobin as i32,
            connect_timeout: Some(Duration { seconds: self.connect_timeout as i64, nanos: 0 }),
            load_assignment: Some(ClusterLoadAssignment {
                cluster_name: self.name.clone(),
                endpoints: vec![LocalityLbEndpoints { lb_endpoints, ..Default::default() }],
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// Envoy v3 JSON representation
    pub fn to_bootstrap_json(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.discovery().as_json(),
            "connect_timeout": format!("{}s", self.connect_timeout),
            "lb_policy": "ROUND_ROBIN",
            "load_assignment": {
                "cluster_name": self.name,
                "endpoints": [{
                    "lb_endpoints": self.endpoints.iter().map(|endpoint| json!({
                        "endpoint": {
                            "address": {
                                "socket_address": {
                                    "address": endpoint.address,
                                    "port_value": endpoint.port,
                                }
                            }
                        }
                    })).collect::<Vec<_>>(),
                }]
            }
        })
    }
}

impl EndpointConfig {
    fn to_envoy_lb_endpoint(&self) -> LbEndpoint {
        let socket_address = SocketAddress {
            address: self.address.clone(),
            port_specifier: Some(PortSpecifier::PortValue(u32::from(self.port))),
            ..Default::default()
        };

        LbEndpoint {
            host_identifier: Some(HostIdentifier::Endpoint(Endpoint {
                address: Some(Address { address: Some(AddressType::SocketAddress(socket_address)) }),
                ..Default::default()
            })),
            ..Default::default()
        }
    }
}

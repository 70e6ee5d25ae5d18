//! Gateway workload manifests
//!
//! Builds the Deployment that runs the Envoy gateway for one API. The
//! rendered bootstrap is expected in a config map mounted at `/etc/envoy`.
//! The container list is built per call; callers that need sidecars pass them
//! in through [`WorkloadRequest::extra_containers`].

pub mod manifest;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::DeploymentConfig;
use crate::errors::{Error, Result};

pub use manifest::{
    Container, ContainerPort, Deployment, EnvVar, LocalObjectReference, Volume, VolumeMount,
    VolumeSource,
};
use manifest::{DeploymentSpec, LabelSelector, ObjectMeta, OwnerReference, PodSpec, PodTemplateSpec, ResourceRequirements};

/// Mount path of the Envoy configuration volume
pub const ENVOY_CONFIG_MOUNT_PATH: &str = "/etc/envoy";
/// Mount path of the API usage data volume
pub const ANALYTICS_MOUNT_PATH: &str = "/home/ballerina/wso2/api-usage-data/";
/// Envoy admin port exposed by the gateway container
pub const ADMIN_PORT: u16 = 9000;
/// Envoy listener port exposed by the gateway container
pub const LISTENER_PORT: u16 = 10000;

const ENVOY_CONFIG_VOLUME: &str = "envoy-config";
const ANALYTICS_VOLUME: &str = "analytics";
const CONTAINER_PREFIX: &str = "mgw";

static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(\.[0-9]+)?|\.[0-9]+)(m|k|M|G|T|P|E|Ki|Mi|Gi|Ti|Pi|Ei|[eE][+-]?[0-9]+)?$")
        .expect("valid quantity regex")
});

/// A config map or secret the user wants mounted into the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UserVolume {
    #[validate(length(min = 1, message = "Volume name cannot be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "Mount path cannot be empty"))]
    pub mount_path: String,
    pub source: UserVolumeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum UserVolumeSource {
    ConfigMap(String),
    Secret(String),
}

/// Inputs for one gateway workload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct WorkloadRequest {
    #[validate(length(min = 1, max = 63, message = "Workload name must be 1-63 characters"))]
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[validate(range(min = 0, message = "Replicas cannot be negative"))]
    pub replicas: i32,
    /// Registry-level environment, emitted first
    #[serde(default)]
    pub registry_env: Vec<EnvVar>,
    /// `KEY=VALUE` strings from the API spec
    #[serde(default)]
    pub environment_variables: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub user_volumes: Vec<UserVolume>,
    /// Sidecars placed before the gateway container
    #[serde(default)]
    pub extra_containers: Vec<Container>,
    /// Registry credentials secrets for pulling private images
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
}

/// Builds gateway Deployments from the deployment defaults
#[derive(Debug, Clone)]
pub struct DeploymentBuilder {
    config: DeploymentConfig,
}

impl DeploymentBuilder {
    pub fn new(config: DeploymentConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, request: &WorkloadRequest) -> Result<Deployment> {
        request.validate()?;

        let labels: BTreeMap<String, String> =
            BTreeMap::from([("app".to_string(), request.name.clone())]);

        let (mut volumes, mut mounts) = user_volumes(&request.user_volumes);
        volumes.push(Volume::config_map(ENVOY_CONFIG_VOLUME, &self.config.config_map_name));
        mounts.push(VolumeMount {
            name: ENVOY_CONFIG_VOLUME.to_string(),
            mount_path: ENVOY_CONFIG_MOUNT_PATH.to_string(),
            read_only: false,
        });

        if self.config.analytics_enabled {
            volumes.push(Volume::empty_dir(ANALYTICS_VOLUME));
            mounts.push(VolumeMount {
                name: ANALYTICS_VOLUME.to_string(),
                mount_path: ANALYTICS_MOUNT_PATH.to_string(),
                read_only: false,
            });
        }

        let mut ports = vec![
            ContainerPort { container_port: self.config.http_port },
            ContainerPort { container_port: ADMIN_PORT },
            ContainerPort { container_port: LISTENER_PORT },
        ];
        if self.config.observability_enabled {
            ports.push(ContainerPort { container_port: self.config.observability_port });
        }

        let gateway = Container {
            name: format!("{}{}", CONTAINER_PREFIX, request.name),
            image: self.config.image.clone(),
            image_pull_policy: Some("IfNotPresent".to_string()),
            resources: Some(self.resources()?),
            volume_mounts: mounts,
            env: environment(&request.registry_env, &request.environment_variables)?,
            ports,
        };

        let mut containers = request.extra_containers.clone();
        containers.push(gateway);

        Ok(Deployment {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata: ObjectMeta {
                name: request.name.clone(),
                namespace: request.namespace.clone(),
                labels: labels.clone(),
                owner_references: request.owner_references.clone(),
            },
            spec: DeploymentSpec {
                replicas: request.replicas,
                selector: LabelSelector { match_labels: labels.clone() },
                template: PodTemplateSpec {
                    metadata: ObjectMeta { labels, ..Default::default() },
                    spec: PodSpec {
                        containers,
                        volumes,
                        image_pull_secrets: image_pull_secrets(&request.image_pull_secrets)?,
                    },
                },
            },
        })
    }

    fn resources(&self) -> Result<ResourceRequirements> {
        let quantity = |field: &str, value: &str| -> Result<(String, String)> {
            let value = value.trim();
            if QUANTITY_REGEX.is_match(value) {
                Ok((field.to_string(), value.to_string()))
            } else {
                Err(Error::validation(format!("Invalid {} quantity '{}'", field, value)))
            }
        };

        Ok(ResourceRequirements {
            requests: BTreeMap::from([
                quantity("cpu", &self.config.resource_request_cpu)?,
                quantity("memory", &self.config.resource_request_memory)?,
            ]),
            limits: BTreeMap::from([
                quantity("cpu", &self.config.resource_limit_cpu)?,
                quantity("memory", &self.config.resource_limit_memory)?,
            ]),
        })
    }
}

impl Deployment {
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::internal(format!("Failed to serialize deployment: {}", e)))
    }
}

fn user_volumes(user: &[UserVolume]) -> (Vec<Volume>, Vec<VolumeMount>) {
    user.iter()
        .map(|volume| {
            let source = match &volume.source {
                UserVolumeSource::ConfigMap(name) => VolumeSource::ConfigMap { name: name.clone() },
                UserVolumeSource::Secret(name) => VolumeSource::Secret { secret_name: name.clone() },
            };
            (
                Volume { name: volume.name.clone(), source },
                VolumeMount {
                    name: volume.name.clone(),
                    mount_path: volume.mount_path.clone(),
                    read_only: true,
                },
            )
        })
        .unzip()
}

fn image_pull_secrets(names: &[String]) -> Result<Vec<LocalObjectReference>> {
    names
        .iter()
        .map(|name| {
            let name = name.trim();
            if name.is_empty() {
                Err(Error::validation("Image pull secret name cannot be empty"))
            } else {
                Ok(LocalObjectReference { name: name.to_string() })
            }
        })
        .collect()
}

/// Registry entries first, then `KEY=VALUE` pairs split on the first `=`.
fn environment(registry: &[EnvVar], raw: &[String]) -> Result<Vec<EnvVar>> {
    let mut env = registry.to_vec();
    for entry in raw {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| Error::validation(format!("Environment variable '{}' is not KEY=VALUE", entry)))?;
        if name.trim().is_empty() {
            return Err(Error::validation(format!("Environment variable '{}' has an empty name", entry)));
        }
        env.push(EnvVar { name: name.to_string(), value: value.to_string() });
    }
    Ok(env)
}

//! Typed configuration helpers for Envoy filters.
//!
//! Every filter and extension in Envoy's v3 API is carried inside a
//! `google.protobuf.Any` envelope. This module provides the JSON-friendly
//! [`TypedConfig`] used in configuration files and the fallible
//! [`encode_any`] used by the compiler.

pub mod http;

use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Binary protobuf payload serialized as base64 in JSON/TOML/YAML.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Base64Bytes(pub Vec<u8>);

impl Serialize for Base64Bytes {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&BASE64_ENGINE.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = BASE64_ENGINE
            .decode(encoded.as_bytes())
            .map_err(|err| serde::de::Error::custom(err.to_string()))?;
        Ok(Base64Bytes(decoded))
    }
}

/// Pre-encoded typed payload: a type URL plus base64 protobuf bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedConfig {
    pub type_url: String,
    #[serde(default)]
    pub value: Base64Bytes,
}

impl TypedConfig {
    pub fn to_any(&self) -> Any {
        Any { type_url: self.type_url.clone(), value: self.value.0.clone() }
    }
}

/// Encode a protobuf message into an `Any` envelope.
///
/// Failure here means a message was built incorrectly, so callers treat it as
/// fatal for the compilation unless stated otherwise.
pub fn encode_any<M: Message>(type_url: &str, message: &M) -> Result<Any> {
    let mut value = Vec::with_capacity(message.encoded_len());
    message
        .encode(&mut value)
        .map_err(|err| Error::config_encode(format!("Failed to encode {}: {}", type_url, err)))?;

    Ok(Any { type_url: type_url.to_string(), value })
}

/// Error helper for invalid filter configuration.
pub fn invalid_config(msg: impl Into<String>) -> Error {
    Error::config(msg.into())
}

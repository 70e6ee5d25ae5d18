//! Local Rate Limit HTTP filter configuration helpers

use envoy_types::pb::envoy::config::core::v3::RuntimeFractionalPercent;
use envoy_types::pb::envoy::extensions::filters::http::local_ratelimit::v3::LocalRateLimit;
use envoy_types::pb::envoy::r#type::v3::{fractional_percent, FractionalPercent, TokenBucket};
use envoy_types::pb::google::protobuf::{Any as EnvoyAny, Duration as ProtoDuration, UInt32Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::xds::filters::{encode_any, invalid_config};

pub const LOCAL_RATE_LIMIT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.http.local_ratelimit.v3.LocalRateLimit";

/// Lightweight representation of Envoy's TokenBucket message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Maximum tokens available in the bucket
    pub max_tokens: u32,
    /// Tokens to add during each refill. Defaults to `max_tokens` if omitted.
    #[serde(default)]
    pub tokens_per_fill: Option<u32>,
    /// Fill interval in milliseconds
    pub fill_interval_ms: u64,
}

impl TokenBucketConfig {
    fn to_proto(&self) -> crate::Result<TokenBucket> {
        if self.fill_interval_ms == 0 {
            return Err(invalid_config(
                "LocalRateLimit token bucket fill_interval_ms must be greater than 0",
            ));
        }

        let seconds = (self.fill_interval_ms / 1000) as i64;
        let nanos = ((self.fill_interval_ms % 1000) * 1_000_000) as i32;

        Ok(TokenBucket {
            max_tokens: self.max_tokens,
            tokens_per_fill: Some(UInt32Value {
                value: self.tokens_per_fill.unwrap_or(self.max_tokens),
            }),
            fill_interval: Some(ProtoDuration { seconds, nanos }),
        })
    }
}

/// Gateway-wide local rate limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRateLimitConfig {
    /// Prefix for statistics emitted by the filter
    pub stat_prefix: String,
    pub token_bucket: TokenBucketConfig,
    /// HTTP status returned when the request is rate limited (4xx/5xx)
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Apply the limit per downstream connection instead of globally
    #[serde(default)]
    pub per_downstream_connection: bool,
}

impl LocalRateLimitConfig {
    // Envoy treats a missing filter_enabled/filter_enforced as 0%.
    fn always() -> RuntimeFractionalPercent {
        RuntimeFractionalPercent {
            runtime_key: String::new(),
            default_value: Some(FractionalPercent {
                numerator: 100,
                denominator: fractional_percent::DenominatorType::Hundred as i32,
            }),
        }
    }

    /// Status sent on rejection, clamped into the 4xx/5xx range
    fn status(&self) -> Option<i32> {
        self.status_code.map(|code| i32::from(code).clamp(400, 599))
    }

    /// Convert into Envoy Any payload
    pub fn to_any(&self) -> crate::Result<EnvoyAny> {
        if self.stat_prefix.trim().is_empty() {
            return Err(invalid_config("LocalRateLimit stat_prefix cannot be empty"));
        }

        let proto = LocalRateLimit {
            stat_prefix: self.stat_prefix.clone(),
            token_bucket: Some(self.token_bucket.to_proto()?),
            status: self.status().map(|code| envoy_types::pb::envoy::r#type::v3::HttpStatus { code }),
            filter_enabled: Some(Self::always()),
            filter_enforced: Some(Self::always()),
            local_rate_limit_per_downstream_connection: self.per_downstream_connection,
            ..Default::default()
        };

        encode_any(LOCAL_RATE_LIMIT_TYPE_URL, &proto)
    }

    /// Proto3 JSON form used in static bootstraps
    pub fn to_bootstrap_json(&self) -> Value {
        let bucket = &self.token_bucket;
        let always = json!({ "default_value": { "numerator": 100, "denominator": "HUNDRED" } });

        let mut value = json!({
            "@type": LOCAL_RATE_LIMIT_TYPE_URL,
            "stat_prefix": self.stat_prefix,
            "token_bucket": {
                "max_tokens": bucket.max_tokens,
                "tokens_per_fill": bucket.tokens_per_fill.unwrap_or(bucket.max_tokens),
                "fill_interval": format!("{}s", bucket.fill_interval_ms as f64 / 1000.0),
            },
            "filter_enabled": always.clone(),
            "filter_enforced": always,
            "local_rate_limit_per_downstream_connection": self.per_downstream_connection,
        });
        if let Some(code) = self.status() {
            value["status"] = json!({ "code": code });
        }
        value
    }
}

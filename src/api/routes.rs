use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::assembly::{CompiledSummary, ConfigAssembler};
use crate::config::AppConfig;

use super::handlers::{add_api_handler, get_api_config_handler, health_handler, list_apis_handler};

/// A compiled API kept by the control API, keyed by its sanitized name
#[derive(Debug, Clone)]
pub struct StoredApi {
    pub summary: CompiledSummary,
    pub bootstrap: Value,
}

#[derive(Clone)]
pub struct ApiState {
    pub assembler: Arc<ConfigAssembler>,
    pub apis: Arc<RwLock<BTreeMap<String, StoredApi>>>,
}

impl ApiState {
    pub fn new(assembler: ConfigAssembler) -> Self {
        Self { assembler: Arc::new(assembler), apis: Arc::new(RwLock::new(BTreeMap::new())) }
    }
}

pub fn build_router(config: &AppConfig) -> Router {
    build_router_with_state(ApiState::new(ConfigAssembler::from_config(config)), config.server.max_body_size)
}

pub fn build_router_with_state(state: ApiState, max_body_size: usize) -> Router {
    Router::new()
        .route("/api/add", post(add_api_handler))
        .route("/api/apis", get(list_apis_handler))
        .route("/api/apis/{name}/config", get(get_api_config_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Control API handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assembly::{CompiledApi, CompiledSummary};
use crate::openapi::ImportOptions;
use crate::request_span;
use crate::xds::{render_bootstrap, BootstrapFormat, UpstreamSelection};

use super::error::ApiError;
use super::routes::{ApiState, StoredApi};

#[derive(Debug, Default, Deserialize)]
pub struct AddApiQuery {
    /// Route to the sandbox endpoints instead of production
    #[serde(default)]
    pub sandbox: bool,
    /// Comma separated sandbox server URLs
    #[serde(default)]
    pub sandbox_urls: Option<String>,
    /// `json` or `yaml` (default)
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddApiResponse {
    pub api: CompiledSummary,
    pub format: BootstrapFormat,
    /// Serialized Envoy bootstrap
    pub bootstrap: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub apis: usize,
}

fn parse_format(raw: Option<&str>) -> Result<BootstrapFormat, ApiError> {
    match raw {
        Some(value) => value.parse().map_err(ApiError::from),
        None => Ok(BootstrapFormat::default()),
    }
}

/// `POST /api/add`: import, compile and store an OpenAPI document
pub async fn add_api_handler(
    State(state): State<ApiState>,
    Query(params): Query<AddApiQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<AddApiResponse>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("OpenAPI document body must not be empty"));
    }

    let format = parse_format(params.format.as_deref())?;
    let upstream =
        if params.sandbox { UpstreamSelection::Sandbox } else { UpstreamSelection::Production };
    let options = ImportOptions {
        sandbox_urls: params
            .sandbox_urls
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    };

    let assembler = Arc::clone(&state.assembler);
    let span = request_span!("POST", "/api/add");
    let compiled: CompiledApi = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        assembler.import_and_assemble(&body, &options, upstream)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Compilation task failed: {}", e)))??;

    let bootstrap = render_bootstrap(&compiled)?;
    let rendered = format.serialize(&bootstrap)?;
    let summary = compiled.summary();

    let replaced = {
        let mut apis = state.apis.write().await;
        apis.insert(summary.name.clone(), StoredApi { summary: summary.clone(), bootstrap })
            .is_some()
    };
    info!(api = %summary.name, routes = summary.routes, replaced, "Stored compiled API");

    Ok((StatusCode::CREATED, Json(AddApiResponse { api: summary, format, bootstrap: rendered })))
}

/// `GET /api/apis`
pub async fn list_apis_handler(State(state): State<ApiState>) -> Json<Vec<CompiledSummary>> {
    let apis = state.apis.read().await;
    Json(apis.values().map(|stored| stored.summary.clone()).collect())
}

/// `GET /api/apis/{name}/config`: the stored bootstrap document
pub async fn get_api_config_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<ConfigQuery>,
) -> Result<Response, ApiError> {
    let format = parse_format(params.format.as_deref())?;

    let bootstrap = {
        let apis = state.apis.read().await;
        apis.get(&name)
            .map(|stored| stored.bootstrap.clone())
            .ok_or_else(|| ApiError::not_found(format!("API '{}' has not been added", name)))?
    };

    let body = format.serialize(&bootstrap)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

/// `GET /health`
pub async fn health_handler(State(state): State<ApiState>) -> Json<HealthResponse> {
    let apis = state.apis.read().await.len();
    Json(HealthResponse { status: "ok".to_string(), apis })
}

//! HTTP control API
//!
//! Accepts OpenAPI documents, compiles them and serves the resulting Envoy
//! bootstrap documents back.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, build_router_with_state, ApiState, StoredApi};
pub use server::start_api_server;

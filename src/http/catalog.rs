//! Service banner and configuration catalog.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "title": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Compile, deploy and call smart contracts on configured networks",
        "routes": [
            {"prefix": "/contracts", "operations": ["compile", "compiled_contracts", "deploy", "metadata"]},
            {"prefix": "/inbox", "operations": ["message", "counter", "update", "maths"]},
        ],
    }))
}

#[derive(Debug, Serialize)]
pub struct NetworksResponse {
    pub networks: Vec<String>,
}

pub async fn networks(State(state): State<AppState>) -> Json<NetworksResponse> {
    Json(NetworksResponse {
        networks: state.config.network_names(),
    })
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<String>,
}

pub async fn users(State(state): State<AppState>) -> Json<UsersResponse> {
    Json(UsersResponse {
        users: state.config.account_names(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ExplorerQuery {
    pub network: String,
}

pub async fn explorer(
    State(state): State<AppState>,
    Query(query): Query<ExplorerQuery>,
) -> ApiResult<Json<Value>> {
    let network = state
        .config
        .network(&query.network)
        .ok_or_else(|| ApiError::not_found(format!("Network '{}' not found", query.network)))?;

    let explorer_url = network.explorer.as_deref().ok_or_else(|| {
        ApiError::not_found(format!(
            "No explorer URL configured for network '{}'",
            query.network
        ))
    })?;

    Ok(Json(json!({ "explorer_url": explorer_url })))
}

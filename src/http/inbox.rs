//! `/inbox` handlers for the Inbox example contract.
//!
//! Reads are soft: a revert yields a placeholder value instead of an error,
//! so a UI can render a half-working contract. Transport failures and the
//! state-changing update still fail the request.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::blockchain::contract::to_json;
use crate::blockchain::{
    BlockchainError, ContractHandle, NetworkClient, SigningIdentity, TransactionManager,
};
use crate::config::NetworkConfig;
use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;

const MESSAGE_PLACEHOLDER: &str = "Error fetching message";
const COUNTER_PLACEHOLDER: i64 = -1;

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub network: String,
    pub contract_name: String,
    pub contract_address: String,
}

async fn open_contract(
    state: &AppState,
    network: &str,
    contract_name: &str,
    contract_address: &str,
) -> ApiResult<(NetworkConfig, Arc<dyn NetworkClient>, ContractHandle)> {
    let address: Address = contract_address.parse().map_err(|_| {
        ApiError::from(BlockchainError::InvalidInput(format!(
            "'{contract_address}' is not a valid address"
        )))
    })?;
    state.network(network)?;
    let abi = state.artifacts.load_abi(contract_name).await?;
    let (network, client) = state.connect(network).await?;
    let handle = ContractHandle::at(abi, address, client.clone());
    Ok((network, client, handle))
}

/// First returned value, or the placeholder when the call reverted.
fn soft_read(
    function: &str,
    result: Result<Vec<DynSolValue>, BlockchainError>,
    placeholder: Value,
) -> ApiResult<Value> {
    match result {
        Ok(values) => Ok(values.first().map(to_json).unwrap_or(placeholder)),
        Err(BlockchainError::ContractLogic(reason)) => {
            tracing::warn!(function, reason = %reason, "Read reverted; returning placeholder");
            Ok(placeholder)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn message(State(state): State<AppState>, Query(query): Query<ContractQuery>) -> ApiResult<Json<Value>> {
    let (_, _, handle) = open_contract(&state, &query.network, &query.contract_name, &query.contract_address).await?;
    let message = soft_read("message", handle.call("message", &[]).await, json!(MESSAGE_PLACEHOLDER))?;
    Ok(Json(json!({ "message": message })))
}

pub async fn counter(State(state): State<AppState>, Query(query): Query<ContractQuery>) -> ApiResult<Json<Value>> {
    let (_, _, handle) = open_contract(&state, &query.network, &query.contract_name, &query.contract_address).await?;
    let count = soft_read("counter", handle.call("counter", &[]).await, json!(COUNTER_PLACEHOLDER))?;
    Ok(Json(json!({ "count": count })))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub message: String,
    pub network: String,
    pub contract_name: String,
    pub contract_address: String,
    pub user: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub tx_hash: String,
}

/// Set a new message and wait for the transaction to confirm.
pub async fn update(State(state): State<AppState>, Json(request): Json<UpdateRequest>) -> ApiResult<Json<UpdateResponse>> {
    let tasks = state.tasks.clone();
    match tasks.spawn(run_update(state, request)).await {
        Ok(result) => result.map(Json),
        Err(_) => Err(ApiError::internal("Update task failed")),
    }
}

async fn run_update(state: AppState, request: UpdateRequest) -> ApiResult<UpdateResponse> {
    let (network, client, handle) = open_contract(
        &state,
        &request.network,
        &request.contract_name,
        &request.contract_address,
    )
    .await?;
    let identity = SigningIdentity::resolve(&request.user, &state.config.accounts, &network, client)?;
    let manager = TransactionManager::new(identity, state.lifecycle_settings(), state.clock.clone());

    let receipt = manager
        .transact(&handle, "setMessage", &[json!(request.message)])
        .await?;

    tracing::info!(
        contract = %request.contract_address,
        tx_hash = %receipt.transaction_hash,
        "Message updated"
    );
    Ok(UpdateResponse {
        success: true,
        tx_hash: receipt.transaction_hash.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct MathRequest {
    pub a: i64,
    pub b: i64,
    pub network: String,
    pub contract_name: String,
    pub contract_address: String,
}

/// `doMath(a, b)` → `{sum, diff, product, is_zero}`.
pub async fn maths(State(state): State<AppState>, Json(request): Json<MathRequest>) -> ApiResult<Json<Value>> {
    let (_, _, handle) = open_contract(
        &state,
        &request.network,
        &request.contract_name,
        &request.contract_address,
    )
    .await?;

    match handle.call("doMath", &[json!(request.a), json!(request.b)]).await {
        Ok(values) if values.len() == 4 => Ok(Json(json!({
            "sum": to_json(&values[0]),
            "diff": to_json(&values[1]),
            "product": to_json(&values[2]),
            "is_zero": to_json(&values[3]),
        }))),
        Ok(values) => {
            tracing::warn!(outputs = values.len(), "doMath returned an unexpected shape");
            Ok(Json(json!({ "error": "Math operation failed" })))
        }
        Err(BlockchainError::ContractLogic(reason)) => {
            tracing::warn!(reason = %reason, "Math operation reverted");
            Ok(Json(json!({ "error": "Math operation failed" })))
        }
        Err(BlockchainError::Abi(reason)) => {
            tracing::warn!(reason = %reason, "Invalid input for math operation");
            Ok(Json(json!({ "error": "Invalid input" })))
        }
        Err(e) => Err(e.into()),
    }
}

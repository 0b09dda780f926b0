//! `/contracts` handlers: compile, list, deploy, metadata.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::{ContractHandle, SigningIdentity, TransactionManager};
use crate::compiler::base_name;
use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::metadata::DeploymentView;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CompileResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Save an uploaded source file and compile it.
///
/// Compiler failures are reported in the body with `success: false`; only a
/// malformed upload is an HTTP error.
pub async fn compile(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<CompileResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("Uploaded file has no filename"))?;
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        upload = Some((filename, content));
        break;
    }
    let (filename, content) = upload.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    let (stored_name, path) = match state.artifacts.save_upload(&filename, &content).await {
        Ok(saved) => saved,
        Err(e) => return Ok(Json(compile_failure(format!("Failed to store upload: {e}")))),
    };

    let contract_name = base_name(&filename);
    let compiled = match state.compiler.compile(&path, &contract_name).await {
        Ok(compiled) => compiled,
        Err(e) => {
            tracing::error!(file = %stored_name, error = %e, "Compilation failed");
            return Ok(Json(compile_failure(format!("Compilation failed: {e}"))));
        }
    };

    if let Err(e) = state
        .artifacts
        .save(&contract_name, &compiled.abi, &compiled.bin)
        .await
    {
        tracing::error!(contract = %contract_name, error = %e, "Failed to write artifacts");
        return Ok(Json(compile_failure(format!("Failed to write artifacts: {e}"))));
    }

    tracing::info!(contract = %contract_name, file = %stored_name, "Contract compiled");
    Ok(Json(CompileResponse {
        success: true,
        message: "Contract compiled successfully".to_string(),
        filename: Some(stored_name),
    }))
}

fn compile_failure(message: String) -> CompileResponse {
    CompileResponse {
        success: false,
        message,
        filename: None,
    }
}

#[derive(Debug, Serialize)]
pub struct CompiledContractEntry {
    pub name: String,
}

pub async fn compiled_contracts(State(state): State<AppState>) -> ApiResult<Json<Vec<CompiledContractEntry>>> {
    let names = state.artifacts.list().await?;
    Ok(Json(
        names
            .into_iter()
            .map(|name| CompiledContractEntry { name })
            .collect(),
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    pub network_name: String,
    pub contract_name: String,
    pub user: String,
    #[serde(default)]
    pub constructor_args: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeployResponse {
    pub contract_address: String,
}

/// Deploy a compiled contract and wait for confirmation.
///
/// Runs on a tracked task: if the client goes away the deployment still
/// reaches a terminal state and, on success, is recorded. Shutdown waits for
/// it within the grace period.
pub async fn deploy(State(state): State<AppState>, Json(request): Json<DeployRequest>) -> ApiResult<Json<DeployResponse>> {
    let tasks = state.tasks.clone();
    match tasks.spawn(run_deploy(state, request)).await {
        Ok(result) => result.map(Json),
        Err(_) => Err(ApiError::internal("Deployment task failed")),
    }
}

async fn run_deploy(state: AppState, request: DeployRequest) -> ApiResult<DeployResponse> {
    state.network(&request.network_name)?;
    let artifact = state.artifacts.load(&request.contract_name).await?;
    let (network, client) = state.connect(&request.network_name).await?;

    let identity = SigningIdentity::resolve(&request.user, &state.config.accounts, &network, client.clone())?;
    let handle = ContractHandle::for_deployment(&artifact, client)?;
    let manager = TransactionManager::new(identity, state.lifecycle_settings(), state.clock.clone());

    let record = manager
        .deploy(
            &handle,
            &request.contract_name,
            &request.constructor_args,
            &request.network_name,
            state.store.as_ref(),
        )
        .await?;

    Ok(DeployResponse {
        contract_address: record.contract_address.to_checksum(None),
    })
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub contracts: Vec<DeploymentView>,
}

/// Every recorded deployment, with the network's explorer URL attached.
pub async fn metadata(State(state): State<AppState>) -> ApiResult<Json<MetadataResponse>> {
    let records = state.store.list_all().await?;
    let contracts = records
        .into_iter()
        .map(|record| {
            let explorer_url = state
                .config
                .network(&record.network)
                .and_then(|n| n.explorer.clone());
            DeploymentView {
                record,
                explorer_url,
            }
        })
        .collect();
    Ok(Json(MetadataResponse { contracts }))
}

//! Shared harness for the HTTP integration tests.
//!
//! Builds the real router over in-process doubles: a stub ledger behind the
//! `ClientFactory` seam, a stub compiler, an in-memory metadata store and a
//! clock that never waits.

#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use contract_gateway::blockchain::types::{PendingTxInfo, TxReceipt};
use contract_gateway::blockchain::{BlockchainError, BlockchainResult, ClientFactory, Clock, NetworkClient};
use contract_gateway::compiler::{ArtifactStore, CompileError, CompiledContract, Compiler};
use contract_gateway::config::{AccountConfig, AppConfig, NetworkConfig};
use contract_gateway::lifecycle::InFlight;
use contract_gateway::metadata::MemoryStore;
use contract_gateway::{AppState, HttpServer};

pub const ALICE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const ALICE_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const LOTTERY_ABI: &str = r#"[
  {"type":"constructor","inputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"manager","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"}
]"#;

pub const INBOX_ABI: &str = r#"[
  {"type":"constructor","inputs":[{"name":"initialMessage","type":"string"}],"stateMutability":"nonpayable"},
  {"type":"function","name":"message","inputs":[],"outputs":[{"name":"","type":"string"}],"stateMutability":"view"},
  {"type":"function","name":"counter","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"setMessage","inputs":[{"name":"newMessage","type":"string"}],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"doMath","inputs":[{"name":"a","type":"int256"},{"name":"b","type":"int256"}],"outputs":[{"name":"sum","type":"int256"},{"name":"diff","type":"int256"},{"name":"product","type":"int256"},{"name":"is_zero","type":"bool"}],"stateMutability":"pure"}
]"#;

/// The address every stub deployment lands at.
pub fn deployed_address() -> Address {
    "0xABC0000000000000000000000000000000000001".parse().unwrap()
}

/// Ledger double.
pub struct StubLedger {
    pub balance: Mutex<U256>,
    pub confirm: Mutex<bool>,
    pub call_result: Mutex<Result<Bytes, String>>,
    pub submissions: Mutex<Vec<TxHash>>,
}

impl Default for StubLedger {
    fn default() -> Self {
        Self {
            balance: Mutex::new(U256::from(10u128.pow(20))),
            confirm: Mutex::new(true),
            call_result: Mutex::new(Ok(Bytes::new())),
            submissions: Mutex::new(Vec::new()),
        }
    }
}

impl StubLedger {
    pub fn submissions(&self) -> Vec<TxHash> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn set_balance(&self, balance: U256) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn set_call_result(&self, result: Result<Bytes, String>) {
        *self.call_result.lock().unwrap() = result;
    }
}

#[async_trait]
impl NetworkClient for StubLedger {
    async fn get_balance(&self, _address: Address) -> BlockchainResult<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.submissions.lock().unwrap().len() as u64)
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        Ok(1_000_000_000)
    }

    async fn submit_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let hash = keccak256(&raw);
        self.submissions.lock().unwrap().push(hash);
        Ok(hash)
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        if !*self.confirm.lock().unwrap() || !self.submissions.lock().unwrap().contains(&hash) {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: hash,
            contract_address: Some(deployed_address()),
            status: true,
            block_number: Some(1),
        }))
    }

    async fn get_pending_transaction(&self, _hash: TxHash) -> BlockchainResult<Option<PendingTxInfo>> {
        Ok(None)
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> BlockchainResult<u64> {
        Ok(50_000)
    }

    async fn call(&self, _tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.call_result
            .lock()
            .unwrap()
            .clone()
            .map_err(BlockchainError::ContractLogic)
    }
}

/// Hands out the shared stub ledger, or fails like an unreachable node.
pub struct StubFactory {
    pub ledger: Arc<StubLedger>,
    pub reachable: bool,
}

#[async_trait]
impl ClientFactory for StubFactory {
    async fn connect(&self, network: &NetworkConfig) -> BlockchainResult<Arc<dyn NetworkClient>> {
        if !self.reachable {
            return Err(BlockchainError::Connection {
                url: network.url.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.ledger.clone())
    }
}

/// Compiler double: succeeds for sources containing `contract`.
pub struct StubCompiler;

#[async_trait]
impl Compiler for StubCompiler {
    async fn compile(&self, source: &Path, preferred: &str) -> Result<CompiledContract, CompileError> {
        let text = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| CompileError::Output(e.to_string()))?;
        if !text.contains("contract") {
            return Err(CompileError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "ParserError: Expected pragma, import directive or contract".to_string(),
            });
        }
        Ok(CompiledContract {
            name: preferred.to_string(),
            abi: serde_json::from_str(INBOX_ABI).unwrap(),
            bin: "6080604052".to_string(),
        })
    }
}

/// Clock whose sleeps return immediately.
pub struct InstantClock;

#[async_trait]
impl Clock for InstantClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.networks.insert(
        "sepolia".to_string(),
        NetworkConfig {
            url: "https://sepolia.example.org/v3/0123456789abcdef".to_string(),
            chain_id: 11155111,
            explorer: Some("https://sepolia.etherscan.io".to_string()),
        },
    );
    config.networks.insert(
        "local".to_string(),
        NetworkConfig {
            url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            explorer: None,
        },
    );
    config.accounts.insert(
        "alice".to_string(),
        AccountConfig {
            address: ALICE_ADDRESS.to_string(),
            private_key: SecretString::from(ALICE_KEY.to_string()),
        },
    );
    config.compiler.build_dir = dir.path().join("build").display().to_string();
    config.compiler.uploads_dir = dir.path().join("uploads").display().to_string();
    config
}

/// A router over stubs plus handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<StubLedger>,
    pub store: MemoryStore,
    pub artifacts: Arc<ArtifactStore>,
    pub tasks: InFlight,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(true).await
    }

    pub async fn unreachable_ledger() -> Self {
        Self::build(false).await
    }

    async fn build(reachable: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let artifacts = Arc::new(ArtifactStore::from_config(&config.compiler));
        artifacts.ensure_dirs().await.unwrap();
        artifacts
            .save("Lottery", &serde_json::from_str(LOTTERY_ABI).unwrap(), "0x6080604052")
            .await
            .unwrap();
        artifacts
            .save("Inbox", &serde_json::from_str(INBOX_ABI).unwrap(), "6080604052")
            .await
            .unwrap();

        let ledger = Arc::new(StubLedger::default());
        let store = MemoryStore::new();
        let tasks = InFlight::new();
        let state = AppState {
            config: Arc::new(config),
            clients: Arc::new(StubFactory {
                ledger: ledger.clone(),
                reachable,
            }),
            store: Arc::new(store.clone()),
            artifacts: artifacts.clone(),
            compiler: Arc::new(StubCompiler),
            clock: Arc::new(InstantClock),
            tasks: tasks.clone(),
        };

        Self {
            router: HttpServer::build_router(state),
            ledger,
            store,
            artifacts,
            tasks,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (u16, serde_json::Value) {
        let response = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        into_json(response).await
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        into_json(self.send(request).await).await
    }
}

pub async fn into_json(response: Response<Body>) -> (u16, serde_json::Value) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).to_string())
        })
    };
    (status, json)
}

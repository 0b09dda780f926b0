//! `solc` subprocess driver.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to run solc at '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solc exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Unexpected solc output: {0}")]
    Output(String),

    #[error("No contracts found in {0}")]
    NoContracts(String),
}

/// One contract from a compiler run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub name: String,
    /// Interface descriptor as a JSON array.
    pub abi: Value,
    /// Creation bytecode, hex without `0x`.
    pub bin: String,
}

/// Source file in, interface descriptor + bytecode out.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `source` and return the contract named `preferred`, or the
    /// last deployable contract in the file when none has that name.
    async fn compile(&self, source: &Path, preferred: &str) -> Result<CompiledContract, CompileError>;
}

#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc_path: PathBuf,
}

impl SolcCompiler {
    pub fn new(solc_path: impl Into<PathBuf>) -> Self {
        Self {
            solc_path: solc_path.into(),
        }
    }
}

#[async_trait]
impl Compiler for SolcCompiler {
    async fn compile(&self, source: &Path, preferred: &str) -> Result<CompiledContract, CompileError> {
        tracing::info!(source = %source.display(), solc = %self.solc_path.display(), "Compiling");

        let output = Command::new(&self.solc_path)
            .arg("--combined-json")
            .arg("abi,bin")
            .arg(source)
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                path: self.solc_path.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let compiled = parse_combined_json(&stdout, preferred)
            .map_err(|e| match e {
                CompileError::NoContracts(_) => CompileError::NoContracts(source.display().to_string()),
                other => other,
            })?;
        tracing::info!(contract = %compiled.name, bytecode_len = compiled.bin.len() / 2, "Compiled");
        Ok(compiled)
    }
}

/// Pick one contract out of `solc --combined-json abi,bin` output.
///
/// Older solc releases emit each `abi` as a JSON-encoded string; newer ones
/// emit the array directly.
pub fn parse_combined_json(stdout: &str, preferred: &str) -> Result<CompiledContract, CompileError> {
    let root: Value = serde_json::from_str(stdout).map_err(|e| CompileError::Output(e.to_string()))?;
    let contracts = root
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| CompileError::Output("missing 'contracts' object".to_string()))?;

    let mut candidates = Vec::new();
    for (key, entry) in contracts {
        let name = key.rsplit(':').next().unwrap_or(key).to_string();
        let bin = entry
            .get("bin")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let abi = match entry.get("abi") {
            Some(Value::String(text)) => {
                serde_json::from_str(text).map_err(|e| CompileError::Output(format!("{name}: {e}")))?
            }
            Some(abi @ Value::Array(_)) => abi.clone(),
            _ => return Err(CompileError::Output(format!("{name}: missing abi"))),
        };
        candidates.push(CompiledContract { name, abi, bin });
    }

    if let Some(position) = candidates.iter().position(|c| c.name == preferred) {
        return Ok(candidates.swap_remove(position));
    }
    candidates
        .into_iter()
        .rev()
        .find(|c| !c.bin.is_empty())
        .ok_or_else(|| CompileError::NoContracts(preferred.to_string()))
}

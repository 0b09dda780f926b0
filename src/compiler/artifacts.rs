//! On-disk compiled artifacts.
//!
//! A contract named `Inbox` is stored as `<build_dir>/InboxABI.json` (the
//! interface descriptor as a JSON array) and `<build_dir>/InboxBIN.json`
//! (creation bytecode as hex, with or without `0x`).

use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::blockchain::contract::ContractArtifact;
use crate::config::CompilerConfig;

const ABI_SUFFIX: &str = "ABI.json";
const BIN_SUFFIX: &str = "BIN.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Compiled contract '{0}' not found")]
    NotFound(String),

    #[error("Invalid contract name '{0}'")]
    InvalidName(String),

    #[error("Malformed artifact for '{name}': {reason}")]
    Malformed { name: String, reason: String },

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Base contract name of a source file: `contracts/Inbox.sol` → `Inbox`.
pub fn base_name(filename: &str) -> String {
    let file = Path::new(filename)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(filename);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ArtifactError::InvalidName(name.to_string()))
    }
}

/// Build and upload directories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    build_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(build_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(&config.build_dir, &config.uploads_dir)
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.build_dir).await?;
        fs::create_dir_all(&self.uploads_dir).await?;
        Ok(())
    }

    /// Names of all compiled contracts, sorted.
    pub async fn list(&self) -> Result<Vec<String>, ArtifactError> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.build_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|f| f.strip_suffix(ABI_SUFFIX))
                .filter(|n| !n.is_empty())
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Interface descriptor of `name`.
    pub async fn load_abi(&self, name: &str) -> Result<JsonAbi, ArtifactError> {
        validate_name(name)?;
        let path = self.build_dir.join(format!("{name}{ABI_SUFFIX}"));
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Interface descriptor plus bytecode of `name`.
    pub async fn load(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let abi = self.load_abi(name).await?;
        let path = self.build_dir.join(format!("{name}{BIN_SUFFIX}"));
        let bytecode = match fs::read_to_string(&path).await {
            Ok(content) => Some(decode_bytecode(name, &content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(ContractArtifact {
            name: name.to_string(),
            abi,
            bytecode,
        })
    }

    /// Write the ABI and BIN files for `name`.
    pub async fn save(&self, name: &str, abi: &serde_json::Value, bin: &str) -> Result<(), ArtifactError> {
        validate_name(name)?;
        fs::create_dir_all(&self.build_dir).await?;
        let abi_json = serde_json::to_string(abi).map_err(|e| ArtifactError::Malformed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        fs::write(self.build_dir.join(format!("{name}{ABI_SUFFIX}")), abi_json).await?;
        fs::write(self.build_dir.join(format!("{name}{BIN_SUFFIX}")), bin).await?;
        tracing::info!(contract = %name, build_dir = %self.build_dir.display(), "Artifacts written");
        Ok(())
    }

    /// Store an uploaded source file under a unique name.
    ///
    /// Returns the stored file name (`<uuid>_<filename>`) and its path.
    pub async fn save_upload(&self, filename: &str, content: &[u8]) -> Result<(String, PathBuf), ArtifactError> {
        let file = Path::new(filename)
            .file_name()
            .and_then(|f| f.to_str())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ArtifactError::InvalidName(filename.to_string()))?;

        fs::create_dir_all(&self.uploads_dir).await?;
        let unique = format!("{}_{}", uuid::Uuid::new_v4(), file);
        let path = self.uploads_dir.join(&unique);
        fs::write(&path, content).await?;
        Ok((unique, path))
    }
}

fn decode_bytecode(name: &str, content: &str) -> Result<Bytes, ArtifactError> {
    let hex = content.trim().trim_matches('"');
    alloy::hex::decode(hex)
        .map(Bytes::from)
        .map_err(|e| ArtifactError::Malformed {
            name: name.to_string(),
            reason: format!("bytecode is not hex: {e}"),
        })
}

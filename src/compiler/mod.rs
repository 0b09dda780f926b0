//! Solidity compilation and compiled-artifact storage.
//!
//! # Data Flow
//! ```text
//! multipart upload
//!     → artifacts.rs (saved as uploads/<uuid>_<filename>)
//!     → solc.rs (solc --combined-json abi,bin)
//!     → artifacts.rs (build/<Name>ABI.json, build/<Name>BIN.json)
//!     → ContractArtifact for deploy and contract calls
//! ```

pub mod artifacts;
pub mod solc;

pub use artifacts::{base_name, ArtifactError, ArtifactStore};
pub use solc::{CompileError, CompiledContract, Compiler, SolcCompiler};

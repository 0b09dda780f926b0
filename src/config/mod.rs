//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env (optional, via dotenvy)
//!     → config file (TOML)
//!     → loader.rs (parse, ${VAR} substitution via env.rs)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed explicitly (Arc) to every subsystem
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup and never mutated
//! - All sections have defaults to allow minimal configs
//! - Secrets are only ever logged masked

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AccountConfig, ApiServerConfig, AppConfig, CompilerConfig, LifecycleConfig, NetworkConfig,
    ObservabilityConfig, RpcConfig, StorageConfig,
};

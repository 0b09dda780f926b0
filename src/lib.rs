//! Contract gateway library.
//!
//! Named identities compile, deploy and call smart contracts on configured
//! EVM networks; every confirmed deployment is recorded.

pub mod blockchain;
pub mod compiler;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod metadata;
pub mod observability;

mod testing;

pub use config::schema::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;

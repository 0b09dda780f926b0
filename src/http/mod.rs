//! HTTP presentation layer.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, trace span)
//!     → catalog.rs / contracts.rs / inbox.rs (handlers)
//!     → blockchain + metadata + compiler subsystems
//!     → response.rs (error → status + {"detail"})
//! ```

pub mod catalog;
pub mod contracts;
pub mod inbox;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, ApiResult};
pub use server::{AppState, HttpServer};

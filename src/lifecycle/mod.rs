//! Process lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Store readiness → Artifact dirs → AppState → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections
//!         → Drain in-flight transactions (tasks.rs) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then storage, then listeners
//! - Fail fast: a store that is not ready stops the process

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod tasks;

pub use shutdown::Shutdown;
pub use startup::{build_state, StartupError};
pub use tasks::InFlight;

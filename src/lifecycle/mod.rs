//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build collaborators → Resolver barrier → First pass
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Event loop stops → In-flight pass completes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Request a reconciliation pass
//! ```
//!
//! # Design Decisions
//! - Fail fast: a resolver barrier failure is fatal
//! - No pass is cancelled midway; shutdown waits for it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

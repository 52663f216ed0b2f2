//! Keeps a reverse proxy's upstream configuration in sync with backend
//! definitions and the addresses their host names resolve to.

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod observability;
pub mod reconcile;
pub mod reload;
pub mod render;
pub mod resilience;
pub mod resolver;
pub mod scheduler;

pub use config::ReloaderConfig;
pub use engine::{Engine, EngineEvent, EventBus};
pub use lifecycle::Shutdown;
pub use reconcile::{ReconcileOutcome, Reconciler};

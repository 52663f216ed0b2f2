//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ReloaderConfig (validated, immutable)
//!     → store.rs (backends + settings published as snapshots)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → store.rs swaps the snapshot and notifies subscribers
//! ```
//!
//! # Design Decisions
//! - Consumers only ever receive owned snapshots, never the live data
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use schema::{
    BackendDefinition, BalancePolicy, ReloaderConfig, RestartConfig, ServerEntry,
    UnresolvedHostPolicy, DEFAULT_KEEPALIVE_CONNECTIONS,
};
pub use store::{ConfigSnapshot, ConfigStore, SharedConfigStore};

//! Proxy reload subsystem.
//!
//! # Responsibilities
//! - Ask the running proxy to re-read its configuration file
//! - Bound every attempt with a timeout
//!
//! # Design Decisions
//! - Invoked only after the new document is on disk
//! - A failed reload never rolls the document back; the next successful
//!   reload or a proxy restart picks it up

pub mod command;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use command::CommandReload;

/// Errors from a reload attempt.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The command could not be started.
    #[error("failed to start reload command: {0}")]
    Spawn(#[source] std::io::Error),

    /// The command did not finish in time and was killed.
    #[error("reload command timed out after {0:?}")]
    Timeout(Duration),

    /// The command exited unsuccessfully.
    #[error("reload command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Sends the proxy its "re-read configuration" command.
#[async_trait]
pub trait ReloadTrigger: Send + Sync {
    async fn reload(&self) -> Result<(), ReloadError>;
}

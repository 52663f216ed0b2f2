//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! reconcile()
//!     → resolver.resolve_pending (hosts new to the config)
//!     → config store snapshot (owned copy)
//!     → render::build_context (normalize + cached addresses)
//!     → TemplateRenderer::render
//!     → document.rs read + byte compare
//!         identical → Unchanged (no write, no reload)
//!         different → atomic replace → ReloadTrigger::reload → Applied
//! ```
//!
//! # Design Decisions
//! - Passes are serialized; a second caller waits for the first to finish
//! - Any failure before the write leaves the previous document authoritative
//! - Reload failures are logged, not propagated

pub mod document;
pub mod reconciler;

use thiserror::Error;

pub use document::{DocumentStore, FileDocument};
pub use reconciler::{Collaborators, Reconciler};

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Rendered text matched the document on disk.
    Unchanged,
    /// A new document was written; `reloaded` reports the proxy reload.
    Applied { reloaded: bool },
}

impl ReconcileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Applied { reloaded: true } => "applied",
            ReconcileOutcome::Applied { reloaded: false } => "applied_reload_failed",
        }
    }
}

/// Failures that abort a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },
}

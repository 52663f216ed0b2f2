//! Routing document rendering.
//!
//! # Data Flow
//! ```text
//! ConfigSnapshot (owned copy)
//!     → context.rs (drop empty backends, normalize, attach cached addresses)
//!     → RenderContext (serializable)
//!     → template.rs (pure render)
//!     → document text
//! ```
//!
//! # Design Decisions
//! - Rendering is deterministic: identical snapshot and cache give identical bytes
//! - Frontend hosts are sorted so set ordering never shows up as a diff
//! - A host with no address is degraded data, not an error, unless configured otherwise

pub mod context;
pub mod template;

use thiserror::Error;

pub use context::{build_context, RenderContext, RenderedBackend, ResolvedServer};
pub use template::{JinjaRenderer, TemplateRenderer};

/// Errors raised while producing a document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template could not be read from disk.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Template failed to compile or render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// A host had no address and the policy says to abort.
    #[error("backend '{backend}' host '{host}' has no resolved address")]
    UnresolvedHost { backend: String, host: String },
}

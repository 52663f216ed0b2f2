//! The render → diff → write → reload pipeline.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::schema::UnresolvedHostPolicy;
use crate::config::store::ConfigStore;
use crate::engine::events::{EngineEvent, EventBus};
use crate::observability::metrics;
use crate::reconcile::{DocumentStore, ReconcileError, ReconcileOutcome};
use crate::reload::ReloadTrigger;
use crate::render::{build_context, RenderError, TemplateRenderer};
use crate::resolver::NameResolver;

/// External collaborators of a [`Reconciler`].
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ConfigStore>,
    pub resolver: Arc<dyn NameResolver>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub document: Arc<dyn DocumentStore>,
    pub proxy: Arc<dyn ReloadTrigger>,
}

/// Keeps the routing document in line with the store and the resolver cache.
pub struct Reconciler {
    parts: Collaborators,
    unresolved: UnresolvedHostPolicy,
    events: EventBus,
    /// Held for the whole pass so two passes never interleave.
    pass: Mutex<()>,
}

impl Reconciler {
    pub fn new(parts: Collaborators, unresolved: UnresolvedHostPolicy, events: EventBus) -> Self {
        Self {
            parts,
            unresolved,
            events,
            pass: Mutex::new(()),
        }
    }

    /// Render the document for the current snapshot without touching disk.
    pub fn render(&self) -> Result<String, RenderError> {
        let snapshot = self.parts.store.snapshot();
        tracing::debug!(backends = snapshot.backends.len(), "Rendering snapshot");
        let context = build_context(snapshot, self.parts.resolver.as_ref(), self.unresolved)?;
        self.parts.renderer.render(&context)
    }

    /// Run one full pass.
    ///
    /// Hosts without a cached address are looked up before rendering. Writes and reloads only when the rendered bytes differ from the file.
    /// A reload failure still yields `Applied { reloaded: false }`.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let _pass = self.pass.lock().await;
        let started = Instant::now();

        let result = self.run_pass().await;
        match &result {
            Ok(outcome) => {
                tracing::info!(outcome = outcome.label(), "Reconciliation finished");
                metrics::record_reconcile(outcome.label(), started);
            }
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation failed");
                metrics::record_reconcile("error", started);
            }
        }
        result
    }

    async fn run_pass(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let cached = self.parts.resolver.resolve_pending().await;
        if cached > 0 {
            tracing::debug!(hosts = cached, "Resolved hosts new to the config");
        }

        let content = self
            .render()
            .map_err(|e| ReconcileError::Render(e.to_string()))?;

        let document = &self.parts.document;
        let path = document.path().to_path_buf();

        let current = document.read().await.map_err(|e| ReconcileError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if current.as_deref() == Some(content.as_bytes()) {
            tracing::info!(path = %path.display(), "Routing config already up-to-date - skipping");
            return Ok(ReconcileOutcome::Unchanged);
        }

        document
            .replace(&content)
            .await
            .map_err(|e| ReconcileError::Write {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(path = %path.display(), bytes = content.len(), "Routing config written");
        metrics::record_document_write();
        self.events.emit(EngineEvent::DocumentWritten { path });

        let reloaded = match self.parts.proxy.reload().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Proxy reload failed; new config applies on next reload");
                false
            }
        };
        metrics::record_proxy_reload(reloaded);

        Ok(ReconcileOutcome::Applied { reloaded })
    }
}

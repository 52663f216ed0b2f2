//! Startup orchestration: subsystem construction and the resolver barrier.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ReloaderConfig, SharedConfigStore};
use crate::engine::{Engine, EventBus};
use crate::reconcile::{Collaborators, FileDocument, Reconciler};
use crate::reload::CommandReload;
use crate::render::{JinjaRenderer, RenderError};
use crate::resolver::{DnsResolver, NameResolver, ResolverError, SystemLookup};
use crate::scheduler::RestartPolicy;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("initial name resolution failed: {0}")]
    Resolver(#[from] ResolverError),
}

/// Block until the resolver finished its first full pass.
///
/// Serving with an empty or partial cache would render backends without
/// addresses, so a failure here must stop the process.
pub async fn wait_for_resolver(resolver: &dyn NameResolver) -> Result<(), StartupError> {
    tracing::info!("Waiting for initial name resolution");
    resolver.resolve_all().await?;
    tracing::info!("Initial name resolution complete");
    Ok(())
}

/// Subsystems built from a configuration, in dependency order.
pub struct Components {
    pub store: Arc<SharedConfigStore>,
    pub resolver: Arc<DnsResolver>,
    pub reconciler: Arc<Reconciler>,
    pub events: EventBus,
    policy: RestartPolicy,
}

impl Components {
    /// Build every subsystem. Fails when the template cannot be compiled.
    pub fn build(config: &ReloaderConfig) -> Result<Self, RenderError> {
        let store = Arc::new(SharedConfigStore::new(config));
        let lookup = Arc::new(SystemLookup::new(Duration::from_secs(
            config.resolver.lookup_timeout_secs,
        )));
        let resolver = Arc::new(DnsResolver::new(
            store.clone(),
            lookup,
            config.resolver.clone(),
        ));
        let renderer = Arc::new(JinjaRenderer::from_file(Path::new(&config.paths.template))?);
        let events = EventBus::new();

        let reconciler = Arc::new(Reconciler::new(
            Collaborators {
                store: store.clone(),
                resolver: resolver.clone(),
                renderer,
                document: Arc::new(FileDocument::new(&config.paths.output)),
                proxy: Arc::new(CommandReload::from_config(&config.reload)),
            },
            config.resolver.unresolved_host,
            events.clone(),
        ));

        tracing::info!(
            backends = config.apis.len(),
            template = %config.paths.template,
            output = %config.paths.output,
            "Subsystems initialized"
        );

        Ok(Self {
            store,
            resolver,
            reconciler,
            events,
            policy: RestartPolicy::from(&config.restart),
        })
    }

    /// Engine driving these components.
    pub fn engine(&self) -> Engine {
        Engine::new(
            self.reconciler.clone(),
            self.store.clone(),
            self.resolver.clone(),
            self.policy,
            self.events.clone(),
        )
    }
}

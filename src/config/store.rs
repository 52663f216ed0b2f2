//! Live backend definitions with snapshot and change-notification access.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::config::schema::{BackendDefinition, ReloaderConfig};

/// Owned copy of everything a reconciliation pass reads from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub backends: Vec<BackendDefinition>,
    pub settings: Map<String, Value>,
}

impl From<&ReloaderConfig> for ConfigSnapshot {
    fn from(config: &ReloaderConfig) -> Self {
        Self {
            backends: config.apis.clone(),
            settings: config.settings.clone(),
        }
    }
}

/// Source of backend definitions.
///
/// Notifications carry no payload; subscribers re-read the full snapshot.
pub trait ConfigStore: Send + Sync {
    /// Deep copy of the current definitions.
    fn snapshot(&self) -> ConfigSnapshot;

    /// Subscribe to "definitions changed" notifications.
    fn subscribe(&self) -> broadcast::Receiver<()>;
}

/// Config store backed by an atomically swapped snapshot.
pub struct SharedConfigStore {
    current: ArcSwap<ConfigSnapshot>,
    changes: broadcast::Sender<()>,
}

impl SharedConfigStore {
    pub fn new(config: &ReloaderConfig) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            current: ArcSwap::from_pointee(ConfigSnapshot::from(config)),
            changes,
        }
    }

    /// Swap in a newly loaded configuration.
    ///
    /// Subscribers are notified only when the backends or settings differ from
    /// the current ones. Returns whether a notification was sent.
    pub fn replace(&self, config: &ReloaderConfig) -> bool {
        let next = ConfigSnapshot::from(config);
        if **self.current.load() == next {
            tracing::debug!("Config reloaded without backend changes");
            return false;
        }

        tracing::info!(backends = next.backends.len(), "Backend definitions changed");
        self.current.store(Arc::new(next));
        let _ = self.changes.send(());
        true
    }
}

impl ConfigStore for SharedConfigStore {
    fn snapshot(&self) -> ConfigSnapshot {
        self.current.load().as_ref().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

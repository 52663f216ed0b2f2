//! Process-wide notifications for supervisors and tests.

use std::path::PathBuf;

use tokio::sync::broadcast;

use crate::reconcile::{ReconcileError, ReconcileOutcome};

/// What asked for a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileCause {
    /// Unconditional pass after the startup barrier.
    Startup,
    /// Backend definitions changed.
    ConfigChanged,
    /// The restart scheduler fired after host address changes.
    HostChanged,
    /// A configured host got its first address.
    HostResolved,
    /// Operator request (SIGHUP).
    Signal,
}

/// Observable engine events.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A new document replaced the old one on disk.
    DocumentWritten { path: PathBuf },
    /// A pass finished; `causes` lists every request coalesced into it.
    ReconcileCompleted {
        causes: Vec<ReconcileCause>,
        result: Result<ReconcileOutcome, ReconcileError>,
    },
    /// The startup barrier failed; no pass will run.
    StartupFailed { reason: String },
}

/// Broadcast fan-out of [`EngineEvent`]s. Sending never blocks or fails.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

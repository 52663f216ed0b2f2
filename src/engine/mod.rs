//! Reconciliation engine: the event loop tying the subsystems together.
//!
//! # Data Flow
//! ```text
//! resolve_all() barrier ──fail──▶ StartupFailed, exit
//!        │
//!        ▼
//! startup pass
//!        │
//!        ▼
//! event loop (single consumer)
//!     config change ─────────────────────────────▶ worker.rs queue
//!     host first resolved ───────────────────────▶ worker.rs queue
//!     host change ──▶ RestartScheduler ──timer──▶ worker.rs queue
//!                           ▲                        │
//!                           └──── pass finished ◀────┘
//!
//! worker.rs: one pass at a time, queued requests coalesced
//! ```
//!
//! # Design Decisions
//! - Triggers never run passes directly; all go through one queue
//! - The loop keeps serving timers and events while a pass runs
//! - Host changes during a host-triggered pass schedule one follow-up,
//!   subject to the cooldown that pass opens
//! - A host's first address is a config matter: plain pass, no cooldown
//! - Errors from a pass are reported, never fatal

pub mod events;
pub mod worker;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};

use crate::config::store::ConfigStore;
use crate::lifecycle::startup::{wait_for_resolver, StartupError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::reconcile::Reconciler;
use crate::resolver::NameResolver;
use crate::scheduler::{HostChangeDecision, RestartPolicy, RestartScheduler, TimerAction};

pub use events::{EngineEvent, EventBus, ReconcileCause};
pub use worker::{reconcile_channel, PassResult, ReconcileHandle, ReconcileWorker};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Startup(#[from] StartupError),
}

/// Owns the event loop of one reloader process.
pub struct Engine {
    store: Arc<dyn ConfigStore>,
    resolver: Arc<dyn NameResolver>,
    policy: RestartPolicy,
    events: EventBus,
    handle: ReconcileHandle,
    worker: ReconcileWorker,
}

impl Engine {
    pub fn new(
        reconciler: Arc<Reconciler>,
        store: Arc<dyn ConfigStore>,
        resolver: Arc<dyn NameResolver>,
        policy: RestartPolicy,
        events: EventBus,
    ) -> Self {
        let (handle, worker) = reconcile_channel(reconciler, events.clone());
        Self {
            store,
            resolver,
            policy,
            events,
            handle,
            worker,
        }
    }

    /// Handle for requesting passes from outside the loop.
    pub fn handle(&self) -> ReconcileHandle {
        self.handle.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run until `shutdown` fires.
    ///
    /// Returns an error only when the startup barrier fails.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), EngineError> {
        let Engine {
            store,
            resolver,
            policy,
            events,
            handle,
            worker,
        } = self;

        let mut stop = shutdown.subscribe();
        let mut config_changes = store.subscribe();
        let worker_task = tokio::spawn(worker.run(shutdown.subscribe()));

        if let Err(e) = wait_for_resolver(resolver.as_ref()).await {
            tracing::error!(error = %e, "Reloader startup failed");
            events.emit(EngineEvent::StartupFailed {
                reason: e.to_string(),
            });
            worker_task.abort();
            return Err(e.into());
        }
        let mut host_changes = resolver.subscribe();

        // Outcome is already logged and broadcast by the worker.
        let _ = handle.request_with_ack(ReconcileCause::Startup).await;

        let mut scheduler = RestartScheduler::new(policy);
        let (fired_tx, mut fired_rx) = mpsc::unbounded_channel::<()>();
        let mut fired_in_flight = false;
        // Host changes seen while the fired pass is queued or running.
        let mut changed_during_pass = false;
        let mut watching_config = true;
        let mut watching_hosts = true;

        loop {
            let deadline = if fired_in_flight {
                None
            } else {
                scheduler.next_deadline()
            };

            tokio::select! {
                biased;
                _ = stop.recv() => {
                    tracing::info!("Engine received shutdown signal, exiting loop");
                    break;
                }
                change = host_changes.recv(), if watching_hosts => match change {
                    Ok(change) if change.previous.is_none() => {
                        tracing::info!(host = %change.host, "Host resolved for the first time");
                        handle.request(ReconcileCause::HostResolved);
                    }
                    Ok(change) => {
                        tracing::info!(host = %change.host, "IP changes detected");
                        if fired_in_flight {
                            changed_during_pass = true;
                        } else {
                            on_host_changed(&mut scheduler);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Host change events dropped");
                        if fired_in_flight {
                            changed_during_pass = true;
                        } else {
                            on_host_changed(&mut scheduler);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => watching_hosts = false,
                },
                change = config_changes.recv(), if watching_config => match change {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        tracing::info!("Backend definitions changed");
                        handle.request(ReconcileCause::ConfigChanged);
                    }
                    Err(broadcast::error::RecvError::Closed) => watching_config = false,
                },
                Some(()) = fired_rx.recv(), if fired_in_flight => {
                    fired_in_flight = false;
                    scheduler.on_reconciled(Instant::now());
                    tracing::debug!(state = ?scheduler.state(), "Host-triggered pass finished");
                    if std::mem::take(&mut changed_during_pass) {
                        on_host_changed(&mut scheduler);
                    }
                }
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    match scheduler.on_timer(Instant::now()) {
                        TimerAction::Fire => {
                            tracing::info!("IP changes - restarting now");
                            fired_in_flight = true;
                            let ack = handle.request_with_ack(ReconcileCause::HostChanged);
                            let done = fired_tx.clone();
                            tokio::spawn(async move {
                                let _ = ack.await;
                                let _ = done.send(());
                            });
                        }
                        TimerAction::CooldownElapsed => {
                            tracing::debug!("Restart cooldown elapsed");
                        }
                        TimerAction::Wait => {}
                    }
                }
            }
        }

        drop(handle);
        if let Err(e) = worker_task.await {
            tracing::error!(error = %e, "Reconcile worker panicked");
        }
        Ok(())
    }
}

fn on_host_changed(scheduler: &mut RestartScheduler) {
    match scheduler.on_host_changed(Instant::now()) {
        HostChangeDecision::Scheduled {
            delay, throttled, ..
        } => {
            let kind = if throttled { "cooldown" } else { "debounce" };
            tracing::info!(delay_ms = delay.as_millis() as u64, kind, "IP changes - scheduling restart");
            metrics::record_restart_scheduled(kind);
        }
        HostChangeDecision::Coalesced => {
            tracing::info!("IP changes - restart already scheduled");
            metrics::record_restart_scheduled("coalesced");
        }
    }
}

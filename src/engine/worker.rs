//! Serialized, coalescing execution of reconciliation passes.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::engine::events::{EngineEvent, EventBus, ReconcileCause};
use crate::reconcile::{ReconcileError, ReconcileOutcome, Reconciler};

pub type PassResult = Result<ReconcileOutcome, ReconcileError>;

struct ReconcileRequest {
    cause: ReconcileCause,
    ack: Option<oneshot::Sender<PassResult>>,
}

/// Cheap handle for asking the worker to run a pass.
#[derive(Clone)]
pub struct ReconcileHandle {
    tx: mpsc::UnboundedSender<ReconcileRequest>,
}

impl ReconcileHandle {
    /// Queue a pass. Returns false once the worker has stopped.
    pub fn request(&self, cause: ReconcileCause) -> bool {
        self.tx.send(ReconcileRequest { cause, ack: None }).is_ok()
    }

    /// Queue a pass and get its result back.
    ///
    /// The receiver errors if the worker stops before running the pass.
    pub fn request_with_ack(&self, cause: ReconcileCause) -> oneshot::Receiver<PassResult> {
        let (ack, rx) = oneshot::channel();
        let _ = self.tx.send(ReconcileRequest {
            cause,
            ack: Some(ack),
        });
        rx
    }
}

/// Single consumer of reconciliation requests.
///
/// Every request queued while a pass runs is folded into one follow-up pass.
pub struct ReconcileWorker {
    reconciler: Arc<Reconciler>,
    rx: mpsc::UnboundedReceiver<ReconcileRequest>,
    events: EventBus,
}

/// Create a worker and its handle.
pub fn reconcile_channel(
    reconciler: Arc<Reconciler>,
    events: EventBus,
) -> (ReconcileHandle, ReconcileWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ReconcileHandle { tx },
        ReconcileWorker {
            reconciler,
            rx,
            events,
        },
    )
}

impl ReconcileWorker {
    /// Process requests until shutdown. A running pass is never interrupted.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let first = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                request = self.rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let mut batch = vec![first];
            while let Ok(more) = self.rx.try_recv() {
                batch.push(more);
            }
            self.run_batch(batch).await;
        }
        tracing::info!("Reconcile worker stopped");
    }

    async fn run_batch(&self, batch: Vec<ReconcileRequest>) {
        let causes: Vec<ReconcileCause> = batch.iter().map(|r| r.cause).collect();
        if causes.len() > 1 {
            tracing::debug!(requests = causes.len(), "Coalesced reconciliation requests");
        }
        tracing::info!(cause = ?causes[0], "Reconciling");

        let result = self.reconciler.reconcile().await;

        for request in batch {
            if let Some(ack) = request.ack {
                let _ = ack.send(result.clone());
            }
        }
        self.events.emit(EngineEvent::ReconcileCompleted { causes, result });
    }
}

//! OS signal handling.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::engine::events::ReconcileCause;
use crate::engine::worker::ReconcileHandle;

/// Resolve on SIGINT or SIGTERM.
pub async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT received"),
            _ = term.recv() => tracing::info!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Ctrl-C received");
    }
}

/// Turn every SIGHUP into a reconciliation request until shutdown.
pub fn forward_reload_signals(
    handle: ReconcileHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut hup = match signal(SignalKind::hangup()) {
                Ok(hup) => hup,
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot listen for SIGHUP");
                    let _ = shutdown.recv().await;
                    return;
                }
            };
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    received = hup.recv() => match received {
                        Some(()) => {
                            tracing::info!("SIGHUP received, requesting reconciliation");
                            handle.request(ReconcileCause::Signal);
                        }
                        None => break,
                    },
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = handle;
            let _ = shutdown.recv().await;
        }
    })
}

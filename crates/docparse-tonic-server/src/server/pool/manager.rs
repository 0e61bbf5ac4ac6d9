//! Idle-queue routing across worker slots.
//!
//! This module defines the [`WorkerPool`] struct, which fronts the set
//! of per-device worker tasks. A slot advertises readiness by pushing
//! its own sender onto a shared idle queue: once at startup and again
//! after every finished job. Dispatch pops the next idle slot off that
//! queue and hands it exactly one job, so a busy slot can never shadow
//! an idle one and at most one job per slot is inside the pool at any
//! time. Waiting on the idle queue is the only backpressure mechanism
//! in the system.
//!
//! The pool also coordinates graceful shutdown via a shared
//! [`CancellationToken`].

use crate::server::{
    pool::request::WorkRequest,
    service::handler::{get_requests_inflight, set_global_shutdown},
};
use core::time::Duration;
use docparse_tonic_core::Error;
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

/// Channel on which idle workers advertise their own sender.
pub type IdleQueue = mpsc::UnboundedSender<mpsc::Sender<WorkRequest>>;

/// Routes [`WorkRequest`]s to idle worker slots.
///
/// Slots whose initialization failed never advertise on the idle
/// queue; they never receive work. The pool supports graceful,
/// cancellable shutdown.
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    idle: Mutex<mpsc::UnboundedReceiver<mpsc::Sender<WorkRequest>>>,
    shutdown_token: CancellationToken,
    shutdown_timeout: u64,
}

impl WorkerPool {
    /// Constructs a new [`WorkerPool`] from initialized worker channels,
    /// the receiving end of the idle queue, and a shared cancellation
    /// token.
    pub fn new(
        workers: Vec<mpsc::Sender<WorkRequest>>,
        idle: mpsc::UnboundedReceiver<mpsc::Sender<WorkRequest>>,
        shutdown_token: CancellationToken,
        shutdown_timeout: u64,
    ) -> Self {
        Self {
            workers,
            idle: Mutex::new(idle),
            shutdown_token,
            shutdown_timeout,
        }
    }

    /// Sends a [`WorkRequest`] to the next idle worker slot, waiting
    /// until one advertises when every live slot is busy.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service is shutting down (`shutdown_token` was cancelled).
    /// - No live worker slot remains (every worker task exited).
    pub async fn dispatch(&self, mut request: WorkRequest) -> Result<(), Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let mut idle = self.idle.lock().await;
        loop {
            let slot = tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    return Err(Error::ServiceShutdown);
                }
                slot = idle.recv() => slot,
            };
            let Some(slot) = slot else {
                return Err(Error::Channel {
                    context: "all worker slots terminated".to_string(),
                });
            };
            // An advertised slot has an empty channel, so this only
            // fails when the worker died after advertising; move on to
            // the next idle slot.
            match slot.try_send(request) {
                Ok(()) => return Ok(()),
                Err(e) => request = e.into_inner(),
            }
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Stops accepting new requests.
    /// - Waits (up to `shutdown_timeout`) for in-flight requests to
    ///   drain.
    /// - Cancels the shared [`CancellationToken`].
    /// - Sends a [`WorkRequest::Shutdown`] to each worker and waits for
    ///   acknowledgements with a per-worker timeout.
    pub async fn shutdown(&self) -> Result<(), Error> {
        // === Phase 0: Stop accepting new requests ===
        tracing::info!("Refusing new requests");
        set_global_shutdown();

        // === Phase 1: Wait for in-flight requests to drain ===
        tracing::info!(
            "Draining in-flight requests ({} active)",
            get_requests_inflight()
        );
        let drain_result = timeout(Duration::from_secs(self.shutdown_timeout), async {
            while get_requests_inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => {
                tracing::debug!("All in-flight requests drained successfully");
            }
            Err(_) => {
                tracing::warn!(
                    "Graceful drain timed out ({} requests still active)",
                    get_requests_inflight()
                );
            }
        }

        // === Phase 2: Cancel any remaining work ===
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();

        // === Phase 3: Notify workers to shut down ===
        tracing::debug!("Notifying all workers to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.workers.len());

        for (i, worker) in self.workers.iter().enumerate() {
            if worker.is_closed() {
                // Slot failed at initialization; nothing to stop.
                continue;
            }
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                tracing::error!("Failed to send shutdown to worker {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        tracing::debug!("Waiting for up to 3s per worker for shutdown acknowledgements");

        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(Duration::from_secs(3), rx).await {
                Ok(Ok(())) => {
                    tracing::trace!("Worker {i} shutdown acknowledged");
                }
                Ok(Err(e)) => {
                    tracing::error!("Worker {i} returned error: {e}");
                }
                Err(_) => {
                    tracing::warn!("Worker {i} shutdown timed out");
                }
            }
        });

        futures::future::join_all(timeout_futures).await;

        tracing::info!("Worker pool shutdown complete");

        Ok(())
    }
}

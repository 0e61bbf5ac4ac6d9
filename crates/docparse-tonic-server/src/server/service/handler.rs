//! gRPC service implementation for document parsing.
//!
//! This module defines [`ParseService`], the concrete implementation of
//! the `DocParser` gRPC service defined in the protobuf specification.
//! It is the server-side entry point for every job: it decodes and
//! normalizes the incoming request, routes it to an available worker
//! slot, and shapes the outgoing response.
//!
//! ## Responsibilities
//!
//! - Spawn one worker task per configured (device, worker-index) pair.
//! - Decode the transport payload and apply option defaults.
//! - Route work to an idle slot (blocking until one advertises - the
//!   natural backpressure mechanism).
//! - Translate every per-request failure into a structured status; a
//!   bad request never crashes the process.
//! - Handle the optional request deadline and graceful shutdown.

use crate::server::{
    config::{DeviceBinding, ServerConfig},
    engine::ParseEngine,
    pool::{manager::WorkerPool, request::WorkRequest, worker::WorkerSlot, worker::worker_loop},
};
use docparse_tonic_core::{
    Error, OptionSet, codec,
    proto::{ParseRequest, ParseResponse, doc_parser_server::DocParser},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

static REQUESTS_INFLIGHT: AtomicUsize = AtomicUsize::new(0);
static GLOBAL_SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Number of requests currently being processed.
pub fn get_requests_inflight() -> usize {
    REQUESTS_INFLIGHT.load(Ordering::SeqCst)
}

/// Marks the service as shutting down; new requests are refused.
pub fn set_global_shutdown() {
    GLOBAL_SHUTDOWN.store(true, Ordering::SeqCst);
}

fn is_shutting_down() -> bool {
    GLOBAL_SHUTDOWN.load(Ordering::SeqCst)
}

/// Decrements the in-flight count on every exit path of a request.
struct InflightGuard;

impl InflightGuard {
    fn enter() -> Self {
        REQUESTS_INFLIGHT.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        REQUESTS_INFLIGHT.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Client-facing gRPC service for GPU-bound document parsing.
///
/// Implements the `DocParser` service defined in the protobuf schema.
/// Internally it routes each request to a pool of worker slots, one per
/// configured (device, worker-index) pair, each exclusively owning a
/// loaded engine instance.
#[derive(Clone)]
pub struct ParseService {
    config: ServerConfig,
    worker_pool: Arc<WorkerPool>,
}

impl ParseService {
    /// Creates a `ParseService` and spawns one worker task per slot.
    ///
    /// `load_engine` is called once per slot with the slot's fixed
    /// [`DeviceBinding`]; the binding is decided here, before the
    /// engine gets any chance to observe accelerators. A slot whose
    /// engine fails to load is logged, left with a closed channel, and
    /// excluded from routing; its siblings are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when every slot failed to
    /// initialize - a server with no live slot must not start.
    pub fn new<E, F>(config: ServerConfig, mut load_engine: F) -> Result<Self, Error>
    where
        E: ParseEngine,
        F: FnMut(DeviceBinding) -> Result<E, Error>,
    {
        let shutdown_token = CancellationToken::new();
        let mut workers = Vec::with_capacity(config.num_slots());
        let mut live_slots = 0;
        // Only worker tasks keep a sender to the idle queue; when the
        // last worker exits, the queue closes and routing reports it.
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();

        for device_id in 0..config.devices {
            for worker_index in 0..config.workers_per_device {
                let worker_id = device_id * config.workers_per_device + worker_index;
                let binding = DeviceBinding {
                    device_id,
                    accelerator: config.accelerator,
                };

                // Capacity 1: the channel only ever carries the single
                // job a slot advertised for on the idle queue.
                let (tx, rx) = mpsc::channel(1);

                match load_engine(binding.clone()) {
                    Ok(engine) => {
                        let slot = WorkerSlot::new(worker_id, binding, engine);
                        tokio::spawn(worker_loop(
                            worker_id,
                            tx.clone(),
                            rx,
                            idle_tx.clone(),
                            slot,
                        ));
                        live_slots += 1;
                    }
                    Err(e) => {
                        // Dropping `rx` closes the channel; the slot
                        // never advertises idle and never routes.
                        tracing::error!(
                            worker_id,
                            device = %binding,
                            error = %e,
                            "worker slot failed to initialize; excluded from routing"
                        );
                    }
                }
                workers.push(tx);
            }
        }

        if live_slots == 0 {
            return Err(Error::Configuration {
                detail: "no worker slot initialized".to_string(),
            });
        }
        tracing::info!(
            live_slots,
            total_slots = workers.len(),
            "worker pool ready"
        );

        let shutdown_timeout = config.shutdown_timeout_secs;
        Ok(Self {
            config,
            worker_pool: Arc::new(WorkerPool::new(
                workers,
                idle_rx,
                shutdown_token,
                shutdown_timeout,
            )),
        })
    }

    /// Initiates a graceful shutdown of the worker pool.
    ///
    /// New requests are refused, in-flight requests get a bounded drain
    /// window, and the call blocks until each worker acknowledges
    /// termination.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.worker_pool.shutdown().await
    }
}

#[tonic::async_trait]
impl DocParser for ParseService {
    /// Handles one parse request end to end.
    ///
    /// Decode failures are answered as client errors before any slot is
    /// touched. Processing failures come back as server errors; in both
    /// cases the batch dispatcher treats the job as failed and keeps
    /// going. When a request deadline is configured, expiry answers the
    /// client without interrupting the device work already in flight
    /// (best effort only).
    async fn parse(
        &self,
        request: Request<ParseRequest>,
    ) -> Result<Response<ParseResponse>, Status> {
        if is_shutting_down() {
            return Err(Error::ServiceShutdown.into());
        }

        let request = request.into_inner();

        // Normalize before routing: a malformed payload never reaches a
        // slot.
        let document = codec::decode(&request.file).map_err(Status::from)?;
        let options = OptionSet::from_map(request.kwargs);

        let _inflight = InflightGuard::enter();

        let (reply_tx, reply_rx) = oneshot::channel();
        self.worker_pool
            .dispatch(WorkRequest::Parse {
                document,
                options,
                reply: reply_tx,
            })
            .await
            .map_err(Status::from)?;

        let outcome = match self.config.request_timeout {
            Some(deadline) => match timeout(deadline, reply_rx).await {
                Ok(received) => received,
                Err(_) => return Err(Error::Timeout.into()),
            },
            None => reply_rx.await,
        };

        match outcome {
            Ok(Ok(output_dir)) => Ok(Response::new(ParseResponse { output_dir })),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Status::from(Error::Channel {
                context: "worker dropped the reply channel".to_string(),
            })),
        }
    }
}

use crate::server::{
    config::DeviceBinding, engine::ParseEngine, pool::manager::IdleQueue,
    pool::request::WorkRequest,
};
use docparse_tonic_core::{OptionSet, Result};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A server-side unit bound exclusively to one accelerator device.
///
/// The slot owns its engine instance; processing is strictly serial
/// because the owning worker task holds the engine `&mut` across each
/// job, including cleanup.
pub struct WorkerSlot<E> {
    worker_id: usize,
    binding: DeviceBinding,
    engine: E,
}

impl<E: ParseEngine> WorkerSlot<E> {
    /// Binds a slot to its device. The binding is fixed before the
    /// engine was loaded and never changes afterwards.
    pub fn new(worker_id: usize, binding: DeviceBinding, engine: E) -> Self {
        Self {
            worker_id,
            binding,
            engine,
        }
    }

    /// Processes one job: generates a fresh output identifier, runs the
    /// engine, and returns the identifier as the output location.
    ///
    /// Memory reclamation runs exactly once on every exit path, bound
    /// to the call scope via [`ReclaimGuard`].
    ///
    /// # Errors
    ///
    /// Engine failures surface to the caller unchanged; the slot does
    /// not retry.
    pub fn process(&mut self, document: &[u8], options: &OptionSet) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        tracing::debug!(worker_id = self.worker_id, job_id, "processing job");
        let mut guard = ReclaimGuard::new(&mut self.engine, &self.binding);
        guard.run(document, &job_id, options)?;
        Ok(job_id)
    }
}

/// Guaranteed-run memory reclamation, tied to one `process` call.
///
/// Dropping the guard - on success, on error, or during unwind -
/// triggers the engine's reclaim hook. Reclaim failures are the
/// engine's to log; they never replace the processing outcome.
struct ReclaimGuard<'a, E: ParseEngine> {
    engine: &'a mut E,
    binding: &'a DeviceBinding,
}

impl<'a, E: ParseEngine> ReclaimGuard<'a, E> {
    fn new(engine: &'a mut E, binding: &'a DeviceBinding) -> Self {
        Self { engine, binding }
    }

    fn run(&mut self, document: &[u8], job_id: &str, options: &OptionSet) -> Result<()> {
        self.engine.parse(document, job_id, options)
    }
}

impl<E: ParseEngine> Drop for ReclaimGuard<'_, E> {
    fn drop(&mut self) {
        self.engine.reclaim();
        tracing::trace!(device = %self.binding, "memory reclaimed");
    }
}

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// Each worker owns its own [`WorkerSlot`] and listens on a bounded
/// MPSC channel until a shutdown signal arrives. The engine call runs
/// inline on this task, so at most one job is ever in flight per slot.
///
/// The worker advertises itself on the idle queue before its first job
/// and again after every finished one; while a job runs, the slot is
/// absent from the queue and routing cannot pick it.
pub async fn worker_loop<E: ParseEngine>(
    worker_id: usize,
    tx: mpsc::Sender<WorkRequest>,
    mut rx: mpsc::Receiver<WorkRequest>,
    idle_tx: IdleQueue,
    mut slot: WorkerSlot<E>,
) {
    tracing::trace!("Worker slot {worker_id} started");

    if idle_tx.send(tx.clone()).is_err() {
        tracing::debug!("Worker slot {worker_id}: pool gone before first job");
        return;
    }

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Parse {
                document,
                options,
                reply,
            } => {
                let result = slot.process(&document, &options);
                if let Err(e) = &result {
                    tracing::error!(worker_id, error = %e, "job failed");
                }
                if reply.send(result).is_err() {
                    tracing::debug!("Worker slot {worker_id}: caller gone before reply");
                }
                if idle_tx.send(tx.clone()).is_err() {
                    tracing::debug!("Worker slot {worker_id}: pool gone, stopping");
                    break;
                }
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker slot {worker_id} received shutdown signal");
                if response.send(()).is_err() {
                    tracing::error!("Worker slot {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker slot {worker_id} stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use docparse_tonic_core::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        parses: Arc<AtomicUsize>,
        reclaims: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ParseEngine for CountingEngine {
        fn parse(&mut self, _document: &[u8], _job_id: &str, _opts: &OptionSet) -> Result<()> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Processing {
                    detail: "synthetic failure".into(),
                });
            }
            Ok(())
        }

        fn reclaim(&mut self) {
            self.reclaims.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn slot(fail: bool) -> (WorkerSlot<CountingEngine>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let parses = Arc::new(AtomicUsize::new(0));
        let reclaims = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            parses: Arc::clone(&parses),
            reclaims: Arc::clone(&reclaims),
            fail,
        };
        let binding = DeviceBinding {
            device_id: 0,
            accelerator: crate::server::config::Accelerator::Cpu,
        };
        (WorkerSlot::new(0, binding, engine), parses, reclaims)
    }

    #[test]
    fn reclaim_runs_once_on_success() {
        let (mut slot, parses, reclaims) = slot(false);
        let out = slot.process(b"doc", &OptionSet::default()).unwrap();
        assert!(Uuid::parse_str(&out).is_ok());
        assert_eq!(parses.load(Ordering::SeqCst), 1);
        assert_eq!(reclaims.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reclaim_runs_once_on_engine_failure() {
        let (mut slot, _parses, reclaims) = slot(true);
        let err = slot.process(b"doc", &OptionSet::default()).unwrap_err();
        assert!(matches!(err, Error::Processing { .. }));
        assert_eq!(reclaims.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn output_locations_are_unique_per_job() {
        let (mut slot, _parses, _reclaims) = slot(false);
        let a = slot.process(b"a", &OptionSet::default()).unwrap();
        let b = slot.process(b"b", &OptionSet::default()).unwrap();
        assert_ne!(a, b);
    }
}

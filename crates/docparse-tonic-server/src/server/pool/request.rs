use docparse_tonic_core::{OptionSet, Result};
use tokio::sync::oneshot;

/// Message processed by a worker slot task.
#[derive(Debug)]
pub enum WorkRequest {
    /// One decoded document plus its normalized options. The reply
    /// carries the job's output location or the processing error.
    Parse {
        document: Vec<u8>,
        options: OptionSet,
        reply: oneshot::Sender<Result<String>>,
    },

    /// Signals the worker to stop and acknowledge shutdown.
    Shutdown { response: oneshot::Sender<()> },
}

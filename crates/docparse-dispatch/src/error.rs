//! Dispatcher-side error type.
//!
//! Only setup-time conditions surface here: an unreachable processing
//! tier, discovery/persistence I/O failures, and a malformed target
//! endpoint. Per-job failures are data, not errors - they become
//! failed entries in the result set.

pub type Result<T> = core::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The readiness probe exhausted its budget; no job was dispatched.
    #[error("target {host}:{port} unreachable after {attempts} attempts")]
    UnreachableTarget {
        host: String,
        port: u16,
        attempts: usize,
    },

    /// The configured host/port does not form a valid endpoint URI.
    #[error("invalid target endpoint {endpoint}: {detail}")]
    InvalidTarget { endpoint: String, detail: String },

    /// Document discovery or result persistence failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The aggregated result set could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

//! Error types for the document parsing service.
//!
//! This module defines the central `Error` enum, which captures all
//! recoverable and reportable error cases within the parsing system. It
//! implements `From<Error>` for `tonic::Status` to enable seamless gRPC
//! error propagation to clients with appropriate status codes and
//! messages.
//!
//! ## Error Cases
//! - `Decode`: The transport payload was malformed; answered as a
//!   client error before any worker slot is touched.
//! - `Processing`: The parsing engine failed for one job. Cleanup still
//!   runs; the failure never escalates past that job.
//! - `Configuration`: A worker slot could not bind its device or load
//!   its engine. Fatal for that slot only.
//! - `Channel`: An internal communication failure between tasks or
//!   workers.
//! - `Timeout`: The request exceeded the configured deadline. The
//!   underlying device work is not guaranteed to be interrupted.
//! - `ServiceShutdown`: A request arrived while the service was
//!   shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the document parsing service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The transport-encoded payload could not be decoded.
    #[error("Decode error: {reason}")]
    Decode { reason: String },

    /// The parsing engine failed while processing a job.
    #[error("Processing error: {detail}")]
    Processing { detail: String },

    /// Invalid device or accelerator setup at slot initialization.
    #[error("Configuration error: {detail}")]
    Configuration { detail: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    Channel { context: String },

    /// The request exceeded the configured deadline.
    #[error("Request timed out")]
    Timeout,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Decode { reason } => Status::invalid_argument(format!("Decode error: {reason}")),
            Error::Processing { detail } => {
                Status::internal(format!("Processing error: {detail}"))
            }
            Error::Configuration { detail } => {
                Status::failed_precondition(format!("Configuration error: {detail}"))
            }
            Error::Channel { context } => Status::internal(format!("Channel error: {context}")),
            Error::Timeout => Status::deadline_exceeded("Request timed out"),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}

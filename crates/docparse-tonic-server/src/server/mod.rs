//! Processing tier internals.
//!
//! - [`config`] - CLI surface and validated server configuration.
//! - [`engine`] - the seam to the external parsing operation.
//! - [`pool`] - worker slots bound to accelerator devices and the
//!   routing pool in front of them.
//! - [`service`] - the client-facing gRPC handler.
//! - [`telemetry`] - tracing subscriber setup.

pub mod config;
pub mod engine;
pub mod pool;
pub mod service;
pub mod telemetry;

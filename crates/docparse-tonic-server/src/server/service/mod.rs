//! gRPC service implementation and worker coordination logic.
//!
//! This module contains the core logic for handling client-facing gRPC
//! requests and delegating work to the per-device worker slots. It
//! implements the `DocParser` service and manages request
//! normalization, routing, error shaping, and shutdown coordination.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`ParseService`).

pub mod handler;

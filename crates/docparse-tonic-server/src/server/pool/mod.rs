//! Worker slots and the routing pool in front of them.
//!
//! - [`manager`] - availability-based routing and coordinated shutdown.
//! - [`request`] - the message type exchanged with worker tasks.
//! - [`worker`] - the per-slot task, its engine ownership, and the
//!   memory-reclaim guard.

pub mod manager;
pub mod request;
pub mod worker;

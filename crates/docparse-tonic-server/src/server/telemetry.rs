//! Tracing subscriber setup for the server binary.
//!
//! Spans and events are printed as human-readable output via
//! `tracing_subscriber::fmt`; the filter comes from `RUST_LOG` and
//! falls back to `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_file(true),
        )
        .init();
}

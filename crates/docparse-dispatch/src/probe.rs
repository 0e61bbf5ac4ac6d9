//! Readiness probe for the processing tier.
//!
//! A bare TCP connection attempt to `host:port`, no payload. The retry
//! interval is deliberately flat - these batches are small and
//! short-lived, so exponential backoff buys nothing here.

use core::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Per-attempt connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls `host:port` until it accepts connections or the retry budget
/// is exhausted.
///
/// Returns `true` as soon as a connection succeeds. On connection
/// failure or timeout, sleeps `delay` and retries; after `max_attempts`
/// failed attempts returns `false`, having slept `(max_attempts - 1) *
/// delay` in total (no sleep after the last attempt).
///
/// This call blocks the caller for up to `max_attempts * delay`; do not
/// invoke it from a context that cannot tolerate that.
pub async fn wait_until_ready(host: &str, port: u16, max_attempts: usize, delay: Duration) -> bool {
    let addr = format!("{host}:{port}");

    for attempt in 1..=max_attempts {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                tracing::info!("Server is ready on {addr}");
                return true;
            }
            Ok(Err(_)) | Err(_) => {
                if attempt < max_attempts {
                    tracing::warn!(
                        "Server not ready (attempt {attempt}/{max_attempts}), waiting {:?}...",
                        delay
                    );
                    sleep(delay).await;
                } else {
                    tracing::warn!(
                        "Server not ready (attempt {attempt}/{max_attempts}), giving up"
                    );
                }
            }
        }
    }

    false
}

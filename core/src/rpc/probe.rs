//! Liveness Probe
//!
//! Decides whether the assistant daemon is worth offering as a backend
//! choice. Advisory only: a successful probe does not guarantee the next
//! real request will succeed, and the probe connection is dropped the
//! moment it opens.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

/// Probe `addr` (`host:port`) for a listening peer
///
/// Returns `true` on a successful connect within `limit`, `false` on
/// connection error or timeout. This is the one transport operation with
/// an intrinsic timeout.
pub async fn probe(addr: &str, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!(addr, error = %e, "liveness probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(addr, timeout_ms = limit.as_millis() as u64, "liveness probe timed out");
            false
        }
    }
}

//! Operator interrupts
//!
//! The first signal cancels the run: devices not started yet are skipped and
//! job polling stops at its next sleep. Requests already on the wire keep
//! running, so a second signal asks the caller to abort the process.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `cancel` on the first signal, then wait for another one
///
/// Returns true when a second signal arrived, false when `signals` ended first.
pub async fn watch_signals<S>(mut signals: S, cancel: CancellationToken) -> bool
where
    S: Stream<Item = &'static str> + Unpin,
{
    match signals.next().await {
        Some(name) => info!("{} received, cancelling...", name),
        None => return false,
    }
    cancel.cancel();

    match signals.next().await {
        Some(name) => {
            warn!("{} received again, aborting in-flight requests", name);
            true
        }
        None => false,
    }
}

//! Periodic eviction of dead and expired sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::registry::SessionRegistry;

/// Sweep both registries on a fixed interval until shutdown.
///
/// The interval is independent of the heartbeat timeout, so a silent session
/// can outlive its timeout by up to one interval before eviction.
#[instrument(skip_all, name = "session_sweeper")]
pub async fn run_sweeper(
    users: Arc<SessionRegistry>,
    stores: Arc<SessionRegistry>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = users.sweep() + stores.sweep();
                if removed > 0 {
                    info!(removed, "expired sessions evicted");
                }
            }
        }
    }
    debug!("session sweeper stopped");
}

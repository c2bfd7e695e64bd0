use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::registry::SubscriptionRegistry;

/// Shortest period the sweeper ticks at. `tokio::time::interval` rejects zero.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically drops pending markers whose creator never finished.
///
/// `get_or_create` already ignores expired markers on its own, so this only keeps
/// `pending_count` honest for a registry that sees no further traffic on a key.
/// Abort the returned handle to stop sweeping. Intervals below `MIN_SWEEP_INTERVAL` are raised
/// to it.
pub fn spawn_pending_sweeper<H>(
    registry: Arc<SubscriptionRegistry<H>>,
    interval: Duration,
) -> JoinHandle<()>
where
    H: Send + Sync + 'static,
{
    let interval = if interval < MIN_SWEEP_INTERVAL {
        tracing::warn!(
            requested_ms = interval.as_millis() as u64,
            "pending sweep interval too short, using the minimum"
        );
        MIN_SWEEP_INTERVAL
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let expired = registry.sweep_expired_pending();
            if expired > 0 {
                tracing::debug!(expired, "pending sweep finished");
            }
        }
    })
}

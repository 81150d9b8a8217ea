use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::room::RoomRegistry;

/// Periodically evict rooms nobody is subscribed to once they have been
/// idle for `ttl`.
pub async fn start_eviction_timer(registry: Arc<RoomRegistry>, ttl: Duration, every: Duration) {
    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        "Idle room eviction enabled (ttl: {:?}, sweep every {:?})",
        ttl,
        every
    );

    loop {
        timer.tick().await;

        let evicted = registry.prune_idle(ttl).await;
        if evicted > 0 {
            tracing::info!(
                "Evicted {} idle room(s), {} remaining",
                evicted,
                registry.room_count().await
            );
        }
    }
}

/// Spawn the eviction timer; `None` when `ttl` is zero (eviction disabled)
pub fn spawn_eviction_timer(
    registry: Arc<RoomRegistry>,
    ttl: Duration,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if ttl.is_zero() || every.is_zero() {
        return None;
    }

    Some(tokio::spawn(start_eviction_timer(registry, ttl, every)))
}

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::RoomRegistry;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Runs the timeout sweep over every room on a fixed interval until the
/// returned handle is aborted.
pub fn spawn_timeout_sweeper(registry: Arc<RoomRegistry>, interval: Duration) -> JoinHandle<()> {
    info!("Starting timeout sweeper (every {:?})", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow pass should not be followed by a burst of catch-up passes.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            registry.sweep_all().await;
        }
    })
}

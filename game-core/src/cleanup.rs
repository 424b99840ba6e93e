use chrono::{DateTime, Duration, Utc};
use game_types::RoomPhase;
use tracing::{debug, info};

use crate::{Room, RoomRegistry};

/// When idle rooms are evicted from the registry.
#[derive(Debug, Clone, Copy)]
pub struct RoomCleanup {
    pub idle_threshold: Duration,     // 2 hours without activity
    pub finished_threshold: Duration, // 10 minutes after the last activity of a finished room
}

impl Default for RoomCleanup {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::hours(2),
            finished_threshold: Duration::minutes(10),
        }
    }
}

impl RoomCleanup {
    pub fn new(idle_threshold: Duration, finished_threshold: Duration) -> Self {
        Self {
            idle_threshold,
            finished_threshold,
        }
    }

    /// Removes every room past its threshold and returns how many went.
    ///
    /// Rooms busy with a request are skipped until the next pass.
    pub fn cleanup_idle_rooms(&self, registry: &RoomRegistry) -> usize {
        let now = registry.env().now();
        let mut removed = 0;

        for room_id in registry.room_ids() {
            let mut reason = None;
            let evicted = registry.remove_room_if(&room_id, |room| {
                reason = self.eviction_reason(room, now);
                reason.is_some()
            });
            if evicted {
                info!(
                    "Evicted room {}: {}",
                    room_id,
                    reason.unwrap_or("inactivity timeout")
                );
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("{} room(s) remain after cleanup", registry.room_count());
        }
        removed
    }

    fn eviction_reason(&self, room: &Room, now: DateTime<Utc>) -> Option<&'static str> {
        if room.state.phase == RoomPhase::Finished && room.is_idle(now, self.finished_threshold) {
            Some("finished and idle")
        } else if room.is_idle(now, self.idle_threshold) {
            Some("inactivity timeout")
        } else {
            None
        }
    }
}

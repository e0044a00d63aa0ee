//! Over-speed warnings

use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::event::NavigationEvent;
use super::fix::LocationFix;
use super::options::NavigationOptions;
use super::tracker::elapsed;

/// Compares the reported speed against the active limit.
///
/// Warnings need the speed strictly above `limit + tolerance` and are
/// throttled by their own cooldown, independent of route announcements.
pub struct SpeedMonitor {
    current_kmh: u32,
    last_warning: Option<OffsetDateTime>,
    tolerance_kmh: u32,
    cooldown: Duration,
}

impl SpeedMonitor {
    pub fn new(options: &NavigationOptions) -> Self {
        Self {
            current_kmh: 0,
            last_warning: None,
            tolerance_kmh: options.speed_tolerance_kmh,
            cooldown: options.speed_warning_cooldown(),
        }
    }

    pub fn current_kmh(&self) -> u32 {
        self.current_kmh
    }

    pub fn update(&mut self, fix: &LocationFix, limit: Option<u32>) -> Option<NavigationEvent> {
        self.check(fix.speed_kmh(), limit, fix.time)
    }

    /// Record `speed_kmh` as the current speed and warn if it is too high
    pub fn check(
        &mut self,
        speed_kmh: u32,
        limit: Option<u32>,
        now: OffsetDateTime,
    ) -> Option<NavigationEvent> {
        self.current_kmh = speed_kmh;

        let limit = limit?;
        if speed_kmh <= limit.saturating_add(self.tolerance_kmh) {
            return None;
        }

        if !elapsed(self.last_warning, now, self.cooldown) {
            debug!(speed_kmh, limit, "Over-speed warning throttled");
            return None;
        }

        self.last_warning = Some(now);

        Some(NavigationEvent::SpeedExceeded {
            limit,
            speed: speed_kmh,
        })
    }
}

//! Navigation tunables

use serde::Deserialize;
use time::Duration;

use super::zones::VehicleClass;

/// Thresholds and cooldowns of the navigation engine
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavigationOptions {
    /// Minimum seconds between two route announcements
    pub announcement_cooldown_secs: f64,
    /// Distances to the leg end announced on approach, largest first
    pub proximity_thresholds: Vec<f64>,
    /// Arrival radius around every leg end
    pub arrival_radius_m: f64,
    /// Outer pre-arrival warning distance stored on each leg
    pub warning_distance_m: f64,
    pub deviation_end_factor: f64,
    pub deviation_start_factor: f64,
    /// Deviation alerts wait this many announcement cooldowns
    pub deviation_cooldown_factor: f64,
    /// Speed over the limit tolerated before warning
    pub speed_tolerance_kmh: u32,
    pub speed_warning_cooldown_secs: f64,
    /// Vehicle class used to pick zone speed limits
    pub vehicle_class: VehicleClass,
    /// Speed assumed for time remaining estimates
    pub average_speed_kmh: f64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            announcement_cooldown_secs: 5.0,
            proximity_thresholds: vec![500.0, 300.0, 100.0],
            arrival_radius_m: 100.0,
            warning_distance_m: 500.0,
            deviation_end_factor: 1.5,
            deviation_start_factor: 0.5,
            deviation_cooldown_factor: 3.0,
            speed_tolerance_kmh: 5,
            speed_warning_cooldown_secs: 30.0,
            vehicle_class: VehicleClass::Light,
            average_speed_kmh: 60.0,
        }
    }
}

impl NavigationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announcement_cooldown(&self) -> Duration {
        seconds(self.announcement_cooldown_secs)
    }

    pub fn deviation_cooldown(&self) -> Duration {
        seconds(self.announcement_cooldown_secs * self.deviation_cooldown_factor)
    }

    pub fn speed_warning_cooldown(&self) -> Duration {
        seconds(self.speed_warning_cooldown_secs)
    }

    /// Thresholds sorted from the farthest to the nearest
    pub(crate) fn sorted_thresholds(&self) -> Vec<f64> {
        let mut thresholds: Vec<f64> = self
            .proximity_thresholds
            .iter()
            .copied()
            .filter(|t| t.is_finite() && *t > 0.0)
            .collect();
        thresholds.sort_by(|a, b| b.total_cmp(a));
        thresholds.dedup();

        thresholds
    }
}

/// Non finite or negative settings collapse to zero
fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::seconds_f64(secs.min(1.0e9))
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::NavigationOptions;
    use crate::navigation::zones::VehicleClass;

    #[test]
    fn parse_partial_yaml() -> Result<(), String> {
        let yaml = "announcement_cooldown_secs: 2\nproximity_thresholds: [100, 1000, 300]\nvehicle_class: hazmat";

        let op: NavigationOptions = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
        assert_eq!(Duration::seconds(2), op.announcement_cooldown());
        assert_eq!(Duration::seconds(6), op.deviation_cooldown());
        assert_eq!(vec![1000.0, 300.0, 100.0], op.sorted_thresholds());
        assert_eq!(VehicleClass::Hazmat, op.vehicle_class);
        assert_eq!(100.0, op.arrival_radius_m);
        assert_eq!(5, op.speed_tolerance_kmh);

        Ok(())
    }

    #[test]
    fn defaults() {
        let op = NavigationOptions::new();
        assert_eq!(Duration::seconds(5), op.announcement_cooldown());
        assert_eq!(Duration::seconds(15), op.deviation_cooldown());
        assert_eq!(Duration::seconds(30), op.speed_warning_cooldown());
        assert_eq!(vec![500.0, 300.0, 100.0], op.sorted_thresholds());
    }
}

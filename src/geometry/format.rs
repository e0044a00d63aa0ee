//! Human readable distances and durations for narration

/// `"850 m"`, `"4.2 km"` or `"85 km"`
pub fn format_distance(meters: f64) -> String {
    match meters {
        m if m < 1000.0 => format!("{} m", m as i64),
        m if m < 10_000.0 => format!("{:.1} km", m / 1000.0),
        m => format!("{:.0} km", m / 1000.0),
    }
}

/// `"45 min"`, `"2 h"` or `"2 h 15 min"`
pub fn format_duration(hours: f64) -> String {
    let total_minutes = (hours * 60.0) as i64;
    let h = total_minutes / 60;
    let m = total_minutes % 60;

    match (h, m) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}

//! Announcements emitted by the engine

use std::fmt;

/// Everything the engine may want to say.
///
/// `Display` renders the narration text handed to the speaker.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationEvent {
    Started {
        route_name: String,
        total_km: u64,
    },
    /// Reached the end of a leg
    Arrived { segment: String },
    /// Narration of the leg that just became current
    Instruction { segment: usize, text: String },
    Completed,
    Proximity {
        threshold: u32,
        instruction: String,
    },
    Deviation,
    SpeedExceeded { limit: u32, speed: u32 },
    ZoneEntered { zone: String, limit: Option<u32> },
    ZoneLeft,
    Stopped,
}

impl NavigationEvent {
    /// Events that belong to route guidance and update the current instruction
    pub fn is_guidance(&self) -> bool {
        matches!(
            self,
            NavigationEvent::Started { .. }
                | NavigationEvent::Arrived { .. }
                | NavigationEvent::Instruction { .. }
                | NavigationEvent::Completed
                | NavigationEvent::Proximity { .. }
                | NavigationEvent::Deviation
        )
    }
}

impl fmt::Display for NavigationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationEvent::Started {
                route_name,
                total_km,
            } => write!(
                f,
                "Starting navigation toward {}. Total distance: {} kilometers.",
                route_name, total_km
            ),
            NavigationEvent::Arrived { segment } => write!(f, "Arrived at {}", segment),
            NavigationEvent::Instruction { text, .. } => f.write_str(text),
            NavigationEvent::Completed => {
                f.write_str("Arrived at final destination. Navigation complete.")
            }
            NavigationEvent::Proximity {
                threshold,
                instruction,
            } => match threshold {
                t if *t >= 500 => write!(f, "In {} meters, {}", t, instruction),
                t if *t >= 100 => write!(f, "In {} meters", t),
                t => write!(f, "Next checkpoint in {} meters", t),
            },
            NavigationEvent::Deviation => {
                f.write_str("Possible route deviation detected. Recalculating.")
            }
            NavigationEvent::SpeedExceeded { limit, speed } => write!(
                f,
                "Speed exceeded. Limit {} km/h. Current speed {} km/h.",
                limit, speed
            ),
            NavigationEvent::ZoneEntered {
                zone,
                limit: Some(limit),
            } => write!(f, "Entering {}. Speed limit {} km/h", zone, limit),
            NavigationEvent::ZoneEntered { zone, limit: None } => write!(f, "Entering {}", zone),
            NavigationEvent::ZoneLeft => f.write_str("Leaving controlled-speed zone"),
            NavigationEvent::Stopped => f.write_str("Navigation stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationEvent;

    #[test]
    fn proximity_wording_scales_with_distance() {
        let far = NavigationEvent::Proximity {
            threshold: 500,
            instruction: "Continue north for 3.0 km".to_string(),
        };
        let mid = NavigationEvent::Proximity {
            threshold: 300,
            instruction: "ignored".to_string(),
        };
        let near = NavigationEvent::Proximity {
            threshold: 50,
            instruction: "ignored".to_string(),
        };

        assert_eq!("In 500 meters, Continue north for 3.0 km", far.to_string());
        assert_eq!("In 300 meters", mid.to_string());
        assert_eq!("Next checkpoint in 50 meters", near.to_string());
    }

    #[test]
    fn narration() {
        assert_eq!(
            "Speed exceeded. Limit 40 km/h. Current speed 52 km/h.",
            NavigationEvent::SpeedExceeded { limit: 40, speed: 52 }.to_string()
        );
        assert_eq!(
            "Entering Tajo Norte. Speed limit 30 km/h",
            NavigationEvent::ZoneEntered {
                zone: "Tajo Norte".to_string(),
                limit: Some(30)
            }
            .to_string()
        );
        assert_eq!(
            "Arrived at Tramo 2",
            NavigationEvent::Arrived {
                segment: "Tramo 2".to_string()
            }
            .to_string()
        );
        assert!(!NavigationEvent::ZoneLeft.is_guidance());
        assert!(NavigationEvent::Completed.is_guidance());
    }
}

//! Location fix definition

use geo::geometry::Point;
use time::OffsetDateTime;

/// One GPS or network location sample
#[derive(Clone, Debug, PartialEq)]
pub struct LocationFix {
    pub position: Point,
    pub time: OffsetDateTime,
    /// Horizontal accuracy in meters, informational only
    pub accuracy: Option<f32>,
    /// Ground speed in m/s
    pub speed: Option<f64>,
    /// Course over ground in degrees
    pub bearing: Option<f64>,
}

impl LocationFix {
    pub fn basic(position: Point, time: OffsetDateTime) -> Self {
        Self {
            position,
            time,
            accuracy: None,
            speed: None,
            bearing: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);

        self
    }

    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = Some(accuracy);

        self
    }

    /// Reported speed in whole km/h. Missing or negative speeds read as 0.
    pub fn speed_kmh(&self) -> u32 {
        match self.speed {
            Some(mps) if mps.is_finite() && mps > 0.0 => (mps * 3.6) as u32,
            _ => 0,
        }
    }
}

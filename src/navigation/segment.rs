//! Route legs and the segment builder

use geo::geometry::Point;
use time::Duration;

use crate::geometry::{bearing_degrees, bearing_to_cardinal, distance_meters, format_distance};

/// A route as handed over by a route provider
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub id: String,
    /// Display name, used in narration
    pub name: String,
    /// Ordered polyline of the route
    pub waypoints: Vec<Point>,
    /// Nominal distance in meters, when the provider knows it
    pub distance: Option<f64>,
    pub estimated_time: Option<Duration>,
}

impl Route {
    pub fn new(id: String, name: String, waypoints: Vec<Point>) -> Self {
        Self {
            id,
            name,
            waypoints,
            distance: None,
            estimated_time: None,
        }
    }

    /// Nominal distance, or the polyline length when unknown
    pub fn total_distance(&self) -> f64 {
        match self.distance {
            Some(d) => d,
            None => self
                .waypoints
                .windows(2)
                .map(|w| distance_meters(&w[0], &w[1]))
                .sum(),
        }
    }
}

/// One directional leg of a route
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Ordinal of the leg inside its route
    pub id: usize,
    pub name: String,
    pub start_point: Point,
    pub end_point: Point,
    /// Arrival radius around `end_point`
    pub radius_meters: f64,
    /// Narration for this leg
    pub instruction: String,
    /// km/h
    pub speed_limit: Option<u32>,
    pub warning_distance: f64,
}

impl Segment {
    pub fn length(&self) -> f64 {
        distance_meters(&self.start_point, &self.end_point)
    }
}

/// Speed limit guessed from the leg length.
///
/// Short legs are urban or mine roads, long ones are highway stretches.
pub fn speed_limit_for_distance(distance: f64) -> u32 {
    match distance {
        d if d < 5_000.0 => 40,
        d if d < 20_000.0 => 60,
        _ => 80,
    }
}

pub struct SegmentBuilder {
    /// Route name, used by the first leg narration
    pub route_name: String,
    pub radius_meters: f64,
    pub warning_distance: f64,
}

impl SegmentBuilder {
    pub fn new(route_name: String) -> Self {
        Self {
            route_name,
            radius_meters: 100.0,
            warning_distance: 500.0,
        }
    }

    pub fn radius(&mut self, radius: f64) -> &mut Self {
        self.radius_meters = if radius > 0.0 { radius } else { 100.0 };

        self
    }

    pub fn warning_distance(&mut self, distance: f64) -> &mut Self {
        self.warning_distance = if distance > 0.0 { distance } else { 500.0 };

        self
    }

    /// One segment per consecutive waypoint pair. Fewer than two waypoints
    /// yield no segment at all.
    pub fn build(&self, waypoints: &[Point]) -> Vec<Segment> {
        if waypoints.len() < 2 {
            return vec![];
        }

        let last = waypoints.len() - 2;

        waypoints
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let (from, to) = (pair[0], pair[1]);
                let direction = bearing_to_cardinal(bearing_degrees(&from, &to));
                let distance = distance_meters(&from, &to);

                let instruction = match i {
                    0 => format!(
                        "Starting route toward {}, continue {}",
                        self.route_name, direction
                    ),
                    i if i == last => format!(
                        "Approaching final destination in {}",
                        format_distance(distance)
                    ),
                    _ => format!("Continue {} for {}", direction, format_distance(distance)),
                };

                Segment {
                    id: i,
                    name: format!("Tramo {}", i + 1),
                    start_point: from,
                    end_point: to,
                    radius_meters: self.radius_meters,
                    instruction,
                    speed_limit: Some(speed_limit_for_distance(distance)),
                    warning_distance: self.warning_distance,
                }
            })
            .collect()
    }
}

/// Segments of `waypoints` with the default radius and warning distance
pub fn build_segments(waypoints: &[Point], route_name: &str) -> Vec<Segment> {
    SegmentBuilder::new(route_name.to_string()).build(waypoints)
}

//! Route progress and geofence state machine

use geo::geometry::Point;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::event::NavigationEvent;
use super::fix::LocationFix;
use super::options::NavigationOptions;
use super::segment::Segment;
use crate::geometry::{distance_meters, estimate_travel_time_hours};

/// Walks a cursor through the legs of one navigation session.
///
/// Each leg goes approaching, then entered once the fix falls inside its
/// arrival radius, after which the cursor moves to the next leg. The cursor
/// equal to the number of legs means the destination was reached.
pub struct ProgressTracker {
    segments: Vec<Segment>,
    current_index: usize,
    /// Latch so a leg arrival fires only once
    has_entered: bool,
    last_announcement: Option<OffsetDateTime>,
    /// Proximity thresholds already spoken for the current leg
    announced: Vec<f64>,
    thresholds: Vec<f64>,
    cooldown: Duration,
    deviation_cooldown: Duration,
    deviation_end_factor: f64,
    deviation_start_factor: f64,
    average_speed_kmh: f64,
}

impl ProgressTracker {
    pub fn new(segments: Vec<Segment>, options: &NavigationOptions) -> Self {
        Self {
            segments,
            current_index: 0,
            has_entered: false,
            last_announcement: None,
            announced: vec![],
            thresholds: options.sorted_thresholds(),
            cooldown: options.announcement_cooldown(),
            deviation_cooldown: options.deviation_cooldown(),
            deviation_end_factor: options.deviation_end_factor,
            deviation_start_factor: options.deviation_start_factor,
            average_speed_kmh: options.average_speed_kmh,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.segments.get(self.current_index)
    }

    pub fn is_complete(&self) -> bool {
        !self.segments.is_empty() && self.current_index >= self.segments.len()
    }

    /// Fraction of legs completed, 0 without legs
    pub fn progress(&self) -> f32 {
        self.current_index as f32 / self.segments.len().max(1) as f32
    }

    /// Back to the first leg with every latch cleared
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.has_entered = false;
        self.last_announcement = None;
        self.announced.clear();
    }

    /// Feed one fix and collect the announcements it triggers
    pub fn update(&mut self, fix: &LocationFix) -> Vec<NavigationEvent> {
        let mut events = vec![];

        let Some(seg) = self.segments.get(self.current_index) else {
            return events;
        };

        let now = fix.time;
        let start = seg.start_point;
        let end = seg.end_point;
        let leg_length = seg.length();
        let distance_to_end = distance_meters(&fix.position, &end);

        debug!(
            segment = seg.id,
            distance_to_end, "Checking progress on {}", seg.name
        );

        if distance_to_end <= seg.radius_meters && !self.has_entered {
            self.has_entered = true;

            if elapsed(self.last_announcement, now, self.cooldown) {
                events.push(NavigationEvent::Arrived {
                    segment: seg.name.clone(),
                });
                self.last_announcement = Some(now);
            }

            self.current_index += 1;
            self.announced.clear();

            match self.segments.get(self.current_index) {
                Some(next) => {
                    events.push(NavigationEvent::Instruction {
                        segment: next.id,
                        text: next.instruction.clone(),
                    });
                    self.has_entered = false;
                }
                None => events.push(NavigationEvent::Completed),
            }
        } else if !self.has_entered && elapsed(self.last_announcement, now, self.cooldown) {
            let threshold = self
                .thresholds
                .iter()
                .copied()
                .find(|t| distance_to_end <= *t && !self.announced.contains(t));

            if let Some(t) = threshold {
                events.push(NavigationEvent::Proximity {
                    threshold: t as u32,
                    instruction: seg.instruction.clone(),
                });
                self.announced.push(t);
                self.last_announcement = Some(now);
            }
        }

        // Box test around the leg, not a cross-track distance
        let distance_to_start = distance_meters(&fix.position, &start);
        if leg_length > 0.0
            && distance_to_end > leg_length * self.deviation_end_factor
            && distance_to_start > leg_length * self.deviation_start_factor
            && elapsed(self.last_announcement, now, self.deviation_cooldown)
        {
            events.push(NavigationEvent::Deviation);
            self.last_announcement = Some(now);
        }

        events
    }

    /// Meters left: to the end of the current leg plus every later leg
    pub fn remaining_distance_m(&self, position: &Point) -> f64 {
        match self.segments.get(self.current_index) {
            Some(current) => {
                distance_meters(position, &current.end_point)
                    + self.segments[self.current_index + 1..]
                        .iter()
                        .map(Segment::length)
                        .sum::<f64>()
            }
            None => 0.0,
        }
    }

    pub fn estimated_time_remaining_hours(&self, position: &Point) -> f64 {
        estimate_travel_time_hours(self.remaining_distance_m(position), self.average_speed_kmh)
    }
}

/// Whether more than `cooldown` passed since `last`. Never announced counts
/// as elapsed.
pub(crate) fn elapsed(last: Option<OffsetDateTime>, now: OffsetDateTime, cooldown: Duration) -> bool {
    match last {
        Some(last) => now - last > cooldown,
        None => true,
    }
}

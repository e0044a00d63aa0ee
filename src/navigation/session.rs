//! Navigation session lifecycle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::event::NavigationEvent;
use super::fix::LocationFix;
use super::options::NavigationOptions;
use super::segment::{Route, SegmentBuilder};
use super::speaker::{Announcer, Speaker};
use super::speed::SpeedMonitor;
use super::tracker::ProgressTracker;
use super::zones::{GeoZone, GeozoneMatcher};
use crate::sources::{GeoZoneSource, LocationSource, RouteProvider};
use crate::Error;

/// Health of the location feed
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GpsStatus {
    #[default]
    Searching,
    Connected {
        accuracy_m: Option<f32>,
    },
    Unavailable,
}

/// Everything a UI needs to render the session
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub is_navigating: bool,
    pub route_name: Option<String>,
    /// Completed legs over total legs, in `[0, 1]`
    pub progress_fraction: f32,
    pub current_segment_index: usize,
    pub segment_count: usize,
    pub current_instruction: Option<String>,
    pub current_speed_kmh: u32,
    pub active_speed_limit: Option<u32>,
    pub current_zone: Option<String>,
    pub remaining_distance_m: f64,
    pub estimated_time_remaining_hours: f64,
    pub gps_status: GpsStatus,
    pub last_fix: Option<LocationFix>,
}

/// Latest published snapshot, readable from any thread.
///
/// The version grows by one with every publication.
#[derive(Clone, Default)]
pub struct StateWatch {
    inner: Arc<RwLock<(u64, SessionSnapshot)>>,
}

impl StateWatch {
    pub fn latest(&self) -> SessionSnapshot {
        self.inner.read().1.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().0
    }

    /// The snapshot if something was published after `version`
    pub fn changed_since(&self, version: u64) -> Option<(u64, SessionSnapshot)> {
        let guard = self.inner.read();
        if guard.0 > version {
            Some((guard.0, guard.1.clone()))
        } else {
            None
        }
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        let mut guard = self.inner.write();
        guard.0 += 1;
        guard.1 = snapshot;
    }
}

/// Route being navigated and its progress
struct ActiveRoute {
    name: String,
    tracker: ProgressTracker,
}

/// Wires progress tracking, speed monitoring and zone matching to a speaker.
///
/// Fixes must be fed in time order, one at a time. Zone matching runs with
/// or without an active route.
pub struct NavigationSession {
    options: NavigationOptions,
    announcer: Announcer,
    matcher: GeozoneMatcher,
    active: Option<ActiveRoute>,
    speed: SpeedMonitor,
    segment_limit: Option<u32>,
    current_instruction: Option<String>,
    gps_status: GpsStatus,
    last_fix: Option<LocationFix>,
    watch: StateWatch,
}

impl NavigationSession {
    pub fn new(options: NavigationOptions, speaker: Box<dyn Speaker>) -> Self {
        let matcher = GeozoneMatcher::new(Arc::new(vec![]), options.vehicle_class);
        let speed = SpeedMonitor::new(&options);

        let session = Self {
            options,
            announcer: Announcer::new(speaker),
            matcher,
            active: None,
            speed,
            segment_limit: None,
            current_instruction: None,
            gps_status: GpsStatus::Searching,
            last_fix: None,
            watch: StateWatch::default(),
        };
        session.publish();

        session
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    /// Handle onto the observable state
    pub fn watch(&self) -> StateWatch {
        self.watch.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.watch.latest()
    }

    pub fn is_navigating(&self) -> bool {
        self.active.is_some()
    }

    pub fn tracker(&self) -> Option<&ProgressTracker> {
        self.active.as_ref().map(|a| &a.tracker)
    }

    pub fn zones(&self) -> &Arc<Vec<GeoZone>> {
        self.matcher.zones()
    }

    /// Replace the zone list. Zones apply from the next fix on.
    pub fn load_zones(&mut self, zones: Arc<Vec<GeoZone>>) {
        info!("Loaded {} geozones", zones.len());

        self.matcher.load(zones);
        self.publish();
    }

    pub fn load_zones_from<S: GeoZoneSource>(&mut self, source: &mut S) -> Result<usize, Error> {
        let zones = source.zones()?;
        let count = zones.len();
        self.load_zones(Arc::new(zones));

        Ok(count)
    }

    /// Begin guidance along `route`, replacing any running session
    pub fn start(&mut self, route: &Route) -> Vec<NavigationEvent> {
        info!(
            route = %route.id,
            waypoints = route.waypoints.len(),
            "Starting navigation toward {}", route.name
        );

        let segments = SegmentBuilder::new(route.name.clone())
            .radius(self.options.arrival_radius_m)
            .warning_distance(self.options.warning_distance_m)
            .build(&route.waypoints);

        if segments.is_empty() {
            warn!(route = %route.id, "Route has fewer than 2 waypoints, nothing to navigate");
        }

        self.segment_limit = segments.first().and_then(|s| s.speed_limit);
        self.speed = SpeedMonitor::new(&self.options);

        let mut tracker = ProgressTracker::new(segments, &self.options);
        tracker.reset();
        self.active = Some(ActiveRoute {
            name: route.name.clone(),
            tracker,
        });

        let event = NavigationEvent::Started {
            route_name: route.name.clone(),
            total_km: (route.total_distance() / 1000.0) as u64,
        };
        self.current_instruction = Some(event.to_string());
        self.announcer.announce(&event.to_string());
        self.publish();

        vec![event]
    }

    /// Fetch `route_id` and start on it. An unknown route starts nothing.
    pub fn start_with<P: RouteProvider + ?Sized>(
        &mut self,
        provider: &P,
        route_id: &str,
    ) -> Result<Vec<NavigationEvent>, Error> {
        match provider.route(route_id)? {
            Some(route) => Ok(self.start(&route)),
            None => {
                warn!("Route not found: {}", route_id);
                Ok(vec![])
            }
        }
    }

    /// Process one fix and announce whatever it triggers
    pub fn on_fix(&mut self, fix: &LocationFix) -> Vec<NavigationEvent> {
        let mut events = vec![];

        self.gps_status = GpsStatus::Connected {
            accuracy_m: fix.accuracy,
        };
        self.last_fix = Some(fix.clone());

        if let Some(event) = self.matcher.update(&fix.position) {
            events.push(event);
        }

        if let Some(active) = self.active.as_mut() {
            let guidance = active.tracker.update(fix);

            if let Some(seg) = active
                .tracker
                .current_segment()
                .or_else(|| active.tracker.segments().last())
            {
                self.segment_limit = seg.speed_limit;
            }
            if let Some(last) = guidance.last() {
                self.current_instruction = Some(last.to_string());
            }
            if active.tracker.is_complete() && guidance.contains(&NavigationEvent::Completed) {
                info!("Navigation toward {} complete", active.name);
            }

            events.extend(guidance);
        }

        if let Some(event) = self.speed.update(fix, self.active_speed_limit()) {
            events.push(event);
        }

        for event in &events {
            self.announcer.announce(&event.to_string());
        }
        self.publish();

        events
    }

    /// Location provider availability changes
    pub fn on_availability(&mut self, available: bool) {
        self.gps_status = match (available, &self.gps_status) {
            (false, _) => GpsStatus::Unavailable,
            (true, GpsStatus::Connected { accuracy_m }) => GpsStatus::Connected {
                accuracy_m: *accuracy_m,
            },
            (true, _) => GpsStatus::Searching,
        };
        self.publish();
    }

    /// End guidance. The zone list stays loaded but the current zone is
    /// forgotten.
    pub fn stop(&mut self) -> Vec<NavigationEvent> {
        if let Some(active) = self.active.take() {
            info!("Navigation toward {} stopped", active.name);
        }

        self.segment_limit = None;
        self.current_instruction = None;
        self.speed = SpeedMonitor::new(&self.options);
        self.matcher.reset();
        self.announcer.clear();

        let event = NavigationEvent::Stopped;
        self.announcer.announce(&event.to_string());
        self.publish();

        vec![event]
    }

    /// Tell the session its speaker finished initializing
    pub fn speaker_ready(&mut self) {
        self.announcer.flush();
    }

    /// Zone limit when inside a limited zone, otherwise the leg limit
    pub fn active_speed_limit(&self) -> Option<u32> {
        self.matcher.active_limit().or(self.segment_limit)
    }

    fn publish(&self) {
        let tracker = self.active.as_ref().map(|a| &a.tracker);
        let position = self.last_fix.as_ref().map(|f| f.position);

        let (remaining, hours) = match (tracker, position) {
            (Some(t), Some(p)) => (t.remaining_distance_m(&p), t.estimated_time_remaining_hours(&p)),
            _ => (0.0, 0.0),
        };

        self.watch.publish(SessionSnapshot {
            is_navigating: self.active.is_some(),
            route_name: self.active.as_ref().map(|a| a.name.clone()),
            progress_fraction: tracker.map(|t| t.progress()).unwrap_or(0.0),
            current_segment_index: tracker.map(|t| t.current_index()).unwrap_or(0),
            segment_count: tracker.map(|t| t.segments().len()).unwrap_or(0),
            current_instruction: self.current_instruction.clone(),
            current_speed_kmh: self.speed.current_kmh(),
            active_speed_limit: self.active_speed_limit(),
            current_zone: self.matcher.current_zone().map(|z| z.name.clone()),
            remaining_distance_m: remaining,
            estimated_time_remaining_hours: hours,
            gps_status: self.gps_status.clone(),
            last_fix: self.last_fix.clone(),
        });
    }
}

/// A session behind a mutex, so `start`, `on_fix` and `stop` coming from
/// different threads never see each other half done.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<NavigationSession>>,
    watch: StateWatch,
}

impl SharedSession {
    pub fn new(session: NavigationSession) -> Self {
        let watch = session.watch();

        Self {
            inner: Arc::new(Mutex::new(session)),
            watch,
        }
    }

    pub fn watch(&self) -> StateWatch {
        self.watch.clone()
    }

    pub fn start(&self, route: &Route) -> Vec<NavigationEvent> {
        self.inner.lock().start(route)
    }

    pub fn on_fix(&self, fix: &LocationFix) -> Vec<NavigationEvent> {
        self.inner.lock().on_fix(fix)
    }

    pub fn stop(&self) -> Vec<NavigationEvent> {
        self.inner.lock().stop()
    }

    /// Run `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut NavigationSession) -> R) -> R {
        let mut session = self.inner.lock();
        f(&mut *session)
    }

    /// Pump fixes from `source` until it runs dry or `running` turns false.
    /// Returns the number of fixes processed.
    pub fn drive<L: LocationSource + ?Sized>(
        &self,
        source: &mut L,
        running: &AtomicBool,
    ) -> Result<usize, Error> {
        source.start()?;

        let mut count = 0;
        while running.load(Ordering::Acquire) {
            match source.next_fix() {
                Ok(Some(fix)) => {
                    self.on_fix(&fix);
                    count += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    source.stop();
                    return Err(e);
                }
            }
        }

        source.stop();

        Ok(count)
    }
}

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use super::event::NavigationEvent;
use super::fix::LocationFix;
use super::options::NavigationOptions;
use super::segment::Route;
use super::session::{GpsStatus, NavigationSession, SharedSession};
use super::speaker::MemorySpeaker;
use super::zones::GeoZone;
use crate::geometry::{latlng, EARTH_RADIUS_METERS};
use crate::sources::VecSource;

/// Meters per degree of latitude
const DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

const LNG: f64 = -75.0;
const A: f64 = -15.0;
const B: f64 = -14.99;
const C: f64 = -14.98;

fn t0() -> OffsetDateTime {
    datetime!(2024-03-01 8:00 UTC)
}

/// Fix on the route meridian, `secs` after the first one
fn fix(lat: f64, secs: i64) -> LocationFix {
    LocationFix::basic(latlng(lat, LNG), t0() + Duration::seconds(secs))
}

/// Latitude `meters` south of `lat`
fn south_of(lat: f64, meters: f64) -> f64 {
    lat - meters / DEGREE
}

/// Two legs of about 1112 m heading north
fn route() -> Route {
    Route::new(
        "test".to_string(),
        "Test".to_string(),
        vec![latlng(A, LNG), latlng(B, LNG), latlng(C, LNG)],
    )
}

fn session() -> (NavigationSession, MemorySpeaker) {
    let speaker = MemorySpeaker::new();
    let session = NavigationSession::new(NavigationOptions::default(), Box::new(speaker.clone()));

    (session, speaker)
}

#[test]
fn start_announces() {
    let (mut session, speaker) = session();

    let events = session.start(&route());
    assert_eq!(
        vec![NavigationEvent::Started {
            route_name: "Test".to_string(),
            total_km: 2
        }],
        events
    );
    assert_eq!(
        vec!["Starting navigation toward Test. Total distance: 2 kilometers.".to_string()],
        speaker.spoken()
    );

    let snapshot = session.snapshot();
    assert!(snapshot.is_navigating);
    assert_eq!(Some("Test".to_string()), snapshot.route_name);
    assert_eq!(2, snapshot.segment_count);
    assert_eq!(Some(40), snapshot.active_speed_limit);
}

#[test]
fn full_traversal() {
    let (mut session, speaker) = session();
    session.start(&route());

    assert!(session.on_fix(&fix(A, 0)).is_empty());

    let events = session.on_fix(&fix(south_of(B, 450.0), 10));
    assert_eq!(1, events.len());
    assert_eq!(
        "In 500 meters, Starting route toward Test, continue north",
        events[0].to_string()
    );

    let events = session.on_fix(&fix(south_of(B, 250.0), 20));
    assert_eq!(vec!["In 300 meters".to_string()], texts(&events));

    let events = session.on_fix(&fix(south_of(B, 50.0), 30));
    assert_eq!(
        vec![
            "Arrived at Tramo 1".to_string(),
            "Approaching final destination in 1.1 km".to_string()
        ],
        texts(&events)
    );
    assert_relative_eq!(0.5, session.snapshot().progress_fraction);

    let events = session.on_fix(&fix(C, 40));
    assert_eq!(
        vec![
            NavigationEvent::Arrived {
                segment: "Tramo 2".to_string()
            },
            NavigationEvent::Completed
        ],
        events
    );

    // the destination is never reached twice
    assert!(session.on_fix(&fix(C, 50)).is_empty());
    assert!(session.on_fix(&fix(C, 60)).is_empty());

    let completed = speaker
        .spoken()
        .iter()
        .filter(|s| s.as_str() == "Arrived at final destination. Navigation complete.")
        .count();
    assert_eq!(1, completed);

    let snapshot = session.snapshot();
    assert_relative_eq!(1.0, snapshot.progress_fraction);
    assert_eq!(2, snapshot.current_segment_index);
    assert_eq!(
        Some("Arrived at final destination. Navigation complete.".to_string()),
        snapshot.current_instruction
    );
    assert_eq!(0.0, snapshot.remaining_distance_m);
    // the last leg limit stays once complete
    assert_eq!(Some(40), snapshot.active_speed_limit);
}

#[test]
fn arrival_fires_once() {
    let (mut session, _) = session();
    session.start(&route());

    let events = session.on_fix(&fix(B, 0));
    assert_eq!(2, events.len());
    assert_eq!(
        NavigationEvent::Arrived {
            segment: "Tramo 1".to_string()
        },
        events[0]
    );
    assert!(matches!(events[1], NavigationEvent::Instruction { segment: 1, .. }));

    // parked at the first leg end: now measured against the second leg
    for secs in [10, 20, 30] {
        let events = session.on_fix(&fix(B, secs));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, NavigationEvent::Arrived { .. })),
            "unexpected {:?}",
            events
        );
    }

    assert_eq!(Some(1), session.tracker().map(|t| t.current_index()));
}

#[test]
fn proximity_jitter() {
    let (mut session, _) = session();
    session.start(&route());

    let events = session.on_fix(&fix(south_of(B, 450.0), 0));
    assert!(matches!(events[..], [NavigationEvent::Proximity { threshold: 500, .. }]));

    // GPS noise around the same distance
    for (i, d) in [460.0, 440.0, 455.0, 445.0].iter().enumerate() {
        let secs = 10 * (i as i64 + 1);
        assert!(session.on_fix(&fix(south_of(B, *d), secs)).is_empty());
    }

    let events = session.on_fix(&fix(south_of(B, 290.0), 50));
    assert!(matches!(events[..], [NavigationEvent::Proximity { threshold: 300, .. }]));

    for (i, d) in [285.0, 295.0, 280.0].iter().enumerate() {
        let secs = 60 + 10 * i as i64;
        assert!(session.on_fix(&fix(south_of(B, *d), secs)).is_empty());
    }
}

#[test]
fn announcement_cooldown() {
    let (mut session, _) = session();
    session.start(&route());

    assert_eq!(1, session.on_fix(&fix(south_of(B, 450.0), 0)).len());

    // 3 s later: still cooling down
    assert!(session.on_fix(&fix(south_of(B, 250.0), 3)).is_empty());
    // exactly 5 s: the cooldown must be exceeded
    assert!(session.on_fix(&fix(south_of(B, 250.0), 5)).is_empty());

    let events = session.on_fix(&fix(south_of(B, 250.0), 6));
    assert!(matches!(events[..], [NavigationEvent::Proximity { threshold: 300, .. }]));
}

#[test]
fn arrival_inside_cooldown() {
    let (mut session, speaker) = session();
    session.start(&route());

    let events = session.on_fix(&fix(south_of(B, 450.0), 0));
    assert!(matches!(events[..], [NavigationEvent::Proximity { threshold: 500, .. }]));

    // "Arrived" is muted, the cursor still moves on
    let events = session.on_fix(&fix(south_of(B, 50.0), 2));
    assert_eq!(vec!["Approaching final destination in 1.1 km"], texts(&events));
    assert_eq!(Some(1), session.tracker().map(|t| t.current_index()));
    assert!(!speaker.spoken().iter().any(|s| s.starts_with("Arrived at")));
}

#[test]
fn deviation() {
    let (mut session, speaker) = session();
    session.start(&route());

    // 3.3 km behind the leg end, 2.2 km behind its start
    let lost = -15.02;

    let events = session.on_fix(&fix(lost, 0));
    assert_eq!(vec![NavigationEvent::Deviation], events);

    // deviation alerts wait three announcement cooldowns
    assert!(session.on_fix(&fix(lost, 10)).is_empty());
    assert!(session.on_fix(&fix(lost, 15)).is_empty());
    assert_eq!(vec![NavigationEvent::Deviation], session.on_fix(&fix(lost, 16)));

    assert_eq!(
        Some("Possible route deviation detected. Recalculating.".to_string()),
        speaker.spoken().last().cloned()
    );
    assert_eq!(Some(0), session.tracker().map(|t| t.current_index()));
}

#[test]
fn zones_without_route() {
    let (mut session, speaker) = session();
    session.load_zones(Arc::new(vec![GeoZone::circle(
        "crusher",
        "Crusher area",
        latlng(A, LNG),
        1_000.0,
        30,
    )]));

    // 72 km/h
    let events = session.on_fix(&fix(A, 0).with_speed(20.0));
    assert_eq!(
        vec![
            NavigationEvent::ZoneEntered {
                zone: "Crusher area".to_string(),
                limit: Some(30)
            },
            NavigationEvent::SpeedExceeded {
                limit: 30,
                speed: 72
            },
        ],
        events
    );
    assert_eq!(Some(30), session.active_speed_limit());
    assert_eq!(Some("Crusher area".to_string()), session.snapshot().current_zone);

    // staying inside is silent; the speed warning is throttled
    assert!(session.on_fix(&fix(A, 10).with_speed(20.0)).is_empty());

    let events = session.on_fix(&fix(-15.02, 20).with_speed(20.0));
    assert_eq!(vec![NavigationEvent::ZoneLeft], events);
    assert_eq!(None, session.active_speed_limit());
    assert_eq!(None, session.snapshot().current_zone);

    assert_eq!(
        vec![
            "Entering Crusher area. Speed limit 30 km/h".to_string(),
            "Speed exceeded. Limit 30 km/h. Current speed 72 km/h.".to_string(),
            "Leaving controlled-speed zone".to_string(),
        ],
        speaker.spoken()
    );
}

#[test]
fn zone_limit_overrides_leg_limit() {
    let (mut session, _) = session();
    session.load_zones(Arc::new(vec![GeoZone::circle(
        "gate",
        "Gate",
        latlng(A, LNG),
        200.0,
        20,
    )]));
    session.start(&route());
    assert_eq!(Some(40), session.active_speed_limit());

    // 43 km/h: fine on the leg, too fast at the gate
    let events = session.on_fix(&fix(A, 0).with_speed(12.0));
    assert!(events.contains(&NavigationEvent::SpeedExceeded {
        limit: 20,
        speed: 43
    }));

    let events = session.on_fix(&fix(south_of(B, 600.0), 10).with_speed(12.0));
    assert_eq!(vec![NavigationEvent::ZoneLeft], events);
    assert_eq!(Some(40), session.active_speed_limit());
}

#[test]
fn stop_resets() {
    let (mut session, speaker) = session();
    session.load_zones(Arc::new(vec![GeoZone::circle(
        "gate",
        "Gate",
        latlng(A, LNG),
        200.0,
        20,
    )]));
    session.start(&route());
    session.on_fix(&fix(A, 0));
    assert!(session.snapshot().current_zone.is_some());

    assert_eq!(vec![NavigationEvent::Stopped], session.stop());
    assert_eq!(Some("Navigation stopped".to_string()), speaker.spoken().last().cloned());

    let snapshot = session.snapshot();
    assert!(!snapshot.is_navigating);
    assert_eq!(None, snapshot.route_name);
    assert_eq!(None, snapshot.current_instruction);
    assert_eq!(None, snapshot.active_speed_limit);
    assert_eq!(None, snapshot.current_zone);
    assert_eq!(0, snapshot.segment_count);
    assert!(session.tracker().is_none());
    assert_eq!(1, session.zones().len());

    // fixes after stop only drive zone matching
    let events = session.on_fix(&fix(A, 10));
    assert_eq!(
        vec![NavigationEvent::ZoneEntered {
            zone: "Gate".to_string(),
            limit: Some(20)
        }],
        events
    );
}

#[test]
fn restart_replaces_route() {
    let (mut session, _) = session();
    session.start(&route());
    session.on_fix(&fix(B, 0));
    assert_eq!(Some(1), session.tracker().map(|t| t.current_index()));

    session.start(&route());
    assert_eq!(Some(0), session.tracker().map(|t| t.current_index()));

    // a new session starts with no cooldown pending
    let events = session.on_fix(&fix(B, 1));
    assert!(matches!(events[0], NavigationEvent::Arrived { .. }));
}

#[test]
fn short_route() {
    let (mut session, _) = session();
    let route = Route::new("one".to_string(), "One".to_string(), vec![latlng(A, LNG)]);

    session.start(&route);
    assert!(session.is_navigating());
    assert!(session.on_fix(&fix(A, 0)).is_empty());

    let snapshot = session.snapshot();
    assert_eq!(0, snapshot.segment_count);
    assert_eq!(0.0, snapshot.progress_fraction);
    assert_eq!(None, snapshot.active_speed_limit);
}

#[test]
fn speaker_warming_up() {
    let speaker = MemorySpeaker::warming_up();
    let mut session = NavigationSession::new(NavigationOptions::default(), Box::new(speaker.clone()));

    session.start(&route());
    session.on_fix(&fix(south_of(B, 450.0), 0));
    assert!(speaker.spoken().is_empty());

    speaker.set_ready(true);
    session.speaker_ready();

    let spoken = speaker.spoken();
    assert_eq!(2, spoken.len());
    assert!(spoken[0].starts_with("Starting navigation toward Test"));
    assert!(spoken[1].starts_with("In 500 meters"));
}

#[test]
fn remaining_distance() {
    let (mut session, _) = session();
    session.start(&route());
    let leg = (B - A) * DEGREE;

    session.on_fix(&fix(A, 0));
    let snapshot = session.snapshot();
    assert_relative_eq!(2.0 * leg, snapshot.remaining_distance_m, max_relative = 1e-9);
    assert_relative_eq!(
        2.0 * leg / 1000.0 / 60.0,
        snapshot.estimated_time_remaining_hours,
        max_relative = 1e-9
    );

    session.on_fix(&fix(B, 10));
    assert_relative_eq!(leg, session.snapshot().remaining_distance_m, max_relative = 1e-9);
}

#[test]
fn gps_status() {
    let (mut session, _) = session();
    assert_eq!(GpsStatus::Searching, session.snapshot().gps_status);

    session.on_fix(&fix(A, 0).with_accuracy(4.5));
    assert_eq!(
        GpsStatus::Connected {
            accuracy_m: Some(4.5)
        },
        session.snapshot().gps_status
    );

    session.on_availability(false);
    assert_eq!(GpsStatus::Unavailable, session.snapshot().gps_status);

    session.on_availability(true);
    assert_eq!(GpsStatus::Searching, session.snapshot().gps_status);
}

#[test]
fn watch_versions() {
    let (mut session, _) = session();
    let watch = session.watch();
    let first = watch.version();

    assert!(watch.changed_since(first).is_none());

    session.start(&route());
    let (version, snapshot) = watch.changed_since(first).unwrap();
    assert!(version > first);
    assert!(snapshot.is_navigating);

    session.on_fix(&fix(A, 0));
    assert!(watch.version() > version);
    assert!(watch.changed_since(watch.version()).is_none());
}

#[test]
fn shared_drive() -> Result<(), String> {
    let speaker = MemorySpeaker::new();
    let shared = SharedSession::new(NavigationSession::new(
        NavigationOptions::default(),
        Box::new(speaker.clone()),
    ));
    shared.start(&route());

    let mut source = VecSource::new(vec![
        fix(A, 0),
        fix(south_of(B, 250.0), 10),
        fix(B, 20),
        fix(C, 30),
    ]);
    let running = AtomicBool::new(true);

    let count = shared
        .drive(&mut source, &running)
        .map_err(|e| e.to_string())?;
    assert_eq!(4, count);

    let snapshot = shared.watch().latest();
    assert_relative_eq!(1.0, snapshot.progress_fraction);
    assert_eq!(
        Some("Arrived at final destination. Navigation complete.".to_string()),
        speaker.spoken().last().cloned()
    );

    Ok(())
}

#[test]
fn shared_stop_from_other_thread() -> Result<(), String> {
    let shared = SharedSession::new(NavigationSession::new(
        NavigationOptions::default(),
        Box::new(MemorySpeaker::new()),
    ));
    shared.start(&route());

    let remote = shared.clone();
    let events = thread::spawn(move || remote.stop())
        .join()
        .map_err(|_| "stop thread panicked".to_string())?;
    assert_eq!(vec![NavigationEvent::Stopped], events);
    assert!(!shared.watch().latest().is_navigating);

    // a stopped feed processes nothing
    let running = AtomicBool::new(false);
    let mut source = VecSource::new(vec![fix(A, 0)]);
    let count = shared
        .drive(&mut source, &running)
        .map_err(|e| e.to_string())?;
    assert_eq!(0, count);

    assert!(!shared.with(|s| s.is_navigating()));

    Ok(())
}

fn texts(events: &[NavigationEvent]) -> Vec<String> {
    events.iter().map(|e| e.to_string()).collect()
}

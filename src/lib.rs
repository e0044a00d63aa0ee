//! routecopilot - Voice-guided route progress and speed zones for haul roads

mod error;
pub mod geometry;
pub mod navigation;
pub mod sources;

pub use error::Error;
pub use navigation::event::NavigationEvent;
pub use navigation::fix::LocationFix;
pub use navigation::options::NavigationOptions;
pub use navigation::segment::{build_segments, Route, Segment, SegmentBuilder};
pub use navigation::session::{GpsStatus, NavigationSession, SessionSnapshot, SharedSession, StateWatch};
pub use navigation::speaker::{Announcer, ConsoleSpeaker, MemorySpeaker, Speaker};
pub use navigation::speed::SpeedMonitor;
pub use navigation::tracker::ProgressTracker;
pub use navigation::zones::{GeoZone, GeozoneMatcher, SpeedLimits, VehicleClass, ZoneArea};
pub use sources::{FieldsConfiguration, GeoZoneSource, LocationSource, RouteProvider};

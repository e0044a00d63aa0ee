//! External collaborators: location feeds, route providers and zone data

use std::collections::VecDeque;

use serde::Deserialize;

use crate::navigation::fix::LocationFix;
use crate::navigation::segment::Route;
use crate::navigation::zones::GeoZone;
use crate::Error;

/// Producer of location fixes, in time order
pub trait LocationSource {
    fn start(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn stop(&mut self) {}

    /// Next fix, `None` once the feed is exhausted
    fn next_fix(&mut self) -> Result<Option<LocationFix>, Error>;
}

/// Lookup of pre-computed routes
pub trait RouteProvider {
    /// The route with this identifier, `None` when unknown
    fn route(&self, id: &str) -> Result<Option<Route>, Error>;
}

/// Loader of speed-controlled zones
pub trait GeoZoneSource {
    fn zones(&mut self) -> Result<Vec<GeoZone>, Error>;
}

/// Field names of a recorded fix
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldsConfiguration {
    pub device_id: String,
    pub time: String,
    pub coordinates: String,
    pub speed: String,
    pub accuracy: String,
    pub bearing: String,
    /// Coordinates stored as `lat, lng` instead of `lng, lat`
    pub flip_coordinates: bool,
}

impl Default for FieldsConfiguration {
    fn default() -> Self {
        Self {
            device_id: "device".to_string(),
            time: "time".to_string(),
            coordinates: "coordinates".to_string(),
            speed: "speed".to_string(),
            accuracy: "accuracy".to_string(),
            bearing: "bearing".to_string(),
            flip_coordinates: false,
        }
    }
}

impl FieldsConfiguration {
    pub fn device(mut self, name: &str) -> Self {
        self.device_id = name.to_lowercase();

        self
    }

    pub fn time(mut self, name: &str) -> Self {
        self.time = name.to_lowercase();

        self
    }

    pub fn coordinates(mut self, name: &str) -> Self {
        self.coordinates = name.to_lowercase();

        self
    }

    pub fn speed(mut self, name: &str) -> Self {
        self.speed = name.to_lowercase();

        self
    }

    pub fn flip(mut self) -> Self {
        self.flip_coordinates = true;

        self
    }
}

pub mod catalog;
#[cfg(feature = "csv")]
mod csv_file;
mod gpx_file;
mod kml;
#[cfg(feature = "mongo")]
mod mongo;

pub use catalog::{builtin_zones, FallbackRoutes};
#[cfg(feature = "csv")]
pub use csv_file::CsvSource;
pub use gpx_file::{GpxRouteProvider, GpxTrackSource};
pub use kml::KmlZoneSource;
#[cfg(feature = "mongo")]
pub use mongo::MongoDbSource;

/// Replays fixes already in memory
pub struct VecSource {
    fixes: VecDeque<LocationFix>,
}

impl VecSource {
    pub fn new(fixes: Vec<LocationFix>) -> Self {
        Self {
            fixes: fixes.into(),
        }
    }
}

impl LocationSource for VecSource {
    fn next_fix(&mut self) -> Result<Option<LocationFix>, Error> {
        Ok(self.fixes.pop_front())
    }
}

/// Split `"lng, lat"` style text with `,`, `;` or blanks as separator
pub(crate) fn parse_coordinates(raw: &str, flip: bool) -> Result<Option<(f64, f64)>, String> {
    let separator = match raw {
        s if s.contains(',') => ',',
        s if s.contains(';') => ';',
        _ => ' ',
    };
    let parts: Vec<&str> = raw
        .split(separator)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 2 {
        return Ok(None);
    }

    let (ilat, ilng) = if flip { (0, 1) } else { (1, 0) };

    let lat = parts[ilat]
        .parse::<f64>()
        .map_err(|e| format!("Invalid latitude format: {}", e))?;
    let lng = parts[ilng]
        .parse::<f64>()
        .map_err(|e| format!("Invalid longitude format: {}", e))?;

    Ok(Some((lat, lng)))
}

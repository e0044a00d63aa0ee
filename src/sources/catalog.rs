//! Built-in corridor data: cities, offline routes and speed zones

use geo::geometry::Point;
use time::Duration;

use super::RouteProvider;
use crate::geometry::latlng;
use crate::navigation::segment::Route;
use crate::navigation::zones::GeoZone;
use crate::Error;

/// A named stop of the corridor
#[derive(Clone, Debug, PartialEq)]
pub struct City {
    pub id: &'static str,
    /// Short form used in route ids
    pub key: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl City {
    pub fn position(&self) -> Point {
        latlng(self.lat, self.lng)
    }
}

pub const CITIES: [City; 4] = [
    City {
        id: "arequipa",
        key: "arequipa",
        name: "Arequipa",
        lat: -16.4090,
        lng: -71.5375,
    },
    City {
        id: "nazca",
        key: "nazca",
        name: "Nazca",
        lat: -14.8309,
        lng: -74.9278,
    },
    City {
        id: "marcona",
        key: "marcona",
        name: "Marcona",
        lat: -15.3500,
        lng: -75.1100,
    },
    City {
        id: "garita_mina_justa",
        key: "garita",
        name: "Garita Mina Justa",
        lat: -15.3947,
        lng: -75.1789,
    },
];

pub fn city(id: &str) -> Option<&'static City> {
    CITIES.iter().find(|c| c.id == id || c.key == id)
}

/// Pairs with their nominal road distance (m) and duration (s)
const LINKS: [(&str, &str, f64, i64); 6] = [
    ("marcona", "nazca", 135_000.0, 6_300),
    ("marcona", "arequipa", 620_000.0, 27_000),
    ("marcona", "garita_mina_justa", 12_000.0, 900),
    ("nazca", "arequipa", 565_000.0, 25_200),
    ("nazca", "garita_mina_justa", 148_000.0, 7_200),
    ("arequipa", "garita_mina_justa", 632_000.0, 28_800),
];

/// Straight routes between every pair of cities, usable without a
/// directions service. Each pair is available in both directions.
pub struct FallbackRoutes {
    routes: Vec<Route>,
}

impl Default for FallbackRoutes {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackRoutes {
    pub fn new() -> Self {
        let mut routes = vec![];

        for (a, b, distance, secs) in LINKS {
            let (Some(a), Some(b)) = (city(a), city(b)) else {
                continue;
            };
            routes.push(fallback_route(a, b, distance, secs));
            routes.push(fallback_route(b, a, distance, secs));
        }

        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes leaving `origin` toward `destination`, by city id
    pub fn between(&self, origin: &str, destination: &str) -> Vec<Route> {
        let (Some(origin), Some(destination)) = (city(origin), city(destination)) else {
            return vec![];
        };
        let id = route_id(origin, destination);

        self.routes.iter().filter(|r| r.id == id).cloned().collect()
    }
}

fn route_id(from: &City, to: &City) -> String {
    format!("fallback_{}_{}", from.key, to.key)
}

fn fallback_route(from: &City, to: &City, distance: f64, secs: i64) -> Route {
    let mut route = Route::new(
        route_id(from, to),
        format!("{} → {}", from.name, to.name),
        vec![from.position(), to.position()],
    );
    route.distance = Some(distance);
    route.estimated_time = Some(Duration::seconds(secs));

    route
}

impl RouteProvider for FallbackRoutes {
    fn route(&self, id: &str) -> Result<Option<Route>, Error> {
        Ok(self.routes.iter().find(|r| r.id == id).cloned())
    }
}

/// Circular speed zones of the corridor
pub fn builtin_zones() -> Vec<GeoZone> {
    vec![
        GeoZone::circle(
            "marcona_urban",
            "Marcona urban zone",
            latlng(-15.3500, -75.1100),
            3_000.0,
            40,
        ),
        GeoZone::circle(
            "nazca_urban",
            "Nazca urban zone",
            latlng(-14.8309, -74.9278),
            5_000.0,
            40,
        ),
        GeoZone::circle(
            "mina_justa_industrial",
            "Mina Justa industrial zone",
            latlng(-15.4000, -75.2000),
            2_000.0,
            30,
        ),
        GeoZone::circle(
            "panamericana_1",
            "Panamericana Sur stretch 1",
            latlng(-15.2000, -75.0500),
            10_000.0,
            90,
        ),
        GeoZone::circle(
            "panamericana_2",
            "Panamericana Sur stretch 2",
            latlng(-15.0000, -74.9500),
            10_000.0,
            90,
        ),
    ]
}

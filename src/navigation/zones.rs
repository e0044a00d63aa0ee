//! Speed-controlled geozones

use std::sync::Arc;

use geo::geometry::Point;
use serde::Deserialize;
use tracing::{debug, info};

use super::event::NavigationEvent;
use crate::geometry::{distance_meters, point_in_polygon};
use crate::Error;

/// Vehicle classes with their own limits inside a zone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    #[default]
    Light,
    Personnel,
    Empty,
    Loaded,
    Hazmat,
}

impl VehicleClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" | "liviano" => Some(VehicleClass::Light),
            "personnel" | "personal" => Some(VehicleClass::Personnel),
            "empty" | "vacio" => Some(VehicleClass::Empty),
            "loaded" | "cargado" => Some(VehicleClass::Loaded),
            "hazmat" | "matpel" => Some(VehicleClass::Hazmat),
            _ => None,
        }
    }
}

/// Speed limits of a zone, km/h per vehicle class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeedLimits {
    pub light: u32,
    pub personnel: u32,
    pub empty: u32,
    pub loaded: u32,
    pub hazmat: u32,
}

impl SpeedLimits {
    /// Same limit for every class
    pub fn uniform(limit: u32) -> Self {
        Self {
            light: limit,
            personnel: limit,
            empty: limit,
            loaded: limit,
            hazmat: limit,
        }
    }

    pub fn for_class(&self, class: VehicleClass) -> u32 {
        match class {
            VehicleClass::Light => self.light,
            VehicleClass::Personnel => self.personnel,
            VehicleClass::Empty => self.empty,
            VehicleClass::Loaded => self.loaded,
            VehicleClass::Hazmat => self.hazmat,
        }
    }
}

/// Area covered by a zone
#[derive(Clone, Debug, PartialEq)]
pub enum ZoneArea {
    Polygon(Vec<Point>),
    Circle { center: Point, radius_m: f64 },
}

/// A named area with its own speed policy
#[derive(Clone, Debug, PartialEq)]
pub struct GeoZone {
    pub id: String,
    pub name: String,
    pub area: ZoneArea,
    pub speed_limits: Option<SpeedLimits>,
}

impl GeoZone {
    /// Polygon zone. The id is derived from the name.
    pub fn polygon(
        name: &str,
        polygon: Vec<Point>,
        speed_limits: Option<SpeedLimits>,
    ) -> Result<Self, Error> {
        let distinct = match (polygon.first(), polygon.last()) {
            (Some(first), Some(last)) if polygon.len() > 1 && first == last => polygon.len() - 1,
            _ => polygon.len(),
        };
        if distinct < 3 {
            return Err(Error::InvalidZone {
                name: name.to_string(),
                reason: format!("polygon needs at least 3 points, got {}", distinct),
            });
        }
        if polygon.iter().any(|p| !p.x().is_finite() || !p.y().is_finite()) {
            return Err(Error::InvalidZone {
                name: name.to_string(),
                reason: "non finite coordinate".to_string(),
            });
        }

        Ok(Self {
            id: zone_id(name),
            name: name.to_string(),
            area: ZoneArea::Polygon(polygon),
            speed_limits,
        })
    }

    /// Circular zone with a single limit for every class
    pub fn circle(id: &str, name: &str, center: Point, radius_m: f64, limit: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            area: ZoneArea::Circle { center, radius_m },
            speed_limits: Some(SpeedLimits::uniform(limit)),
        }
    }

    pub fn contains(&self, position: &Point) -> bool {
        match &self.area {
            ZoneArea::Polygon(polygon) => point_in_polygon(position, polygon, true),
            ZoneArea::Circle { center, radius_m } => distance_meters(position, center) <= *radius_m,
        }
    }

    pub fn limit_for(&self, class: VehicleClass) -> Option<u32> {
        self.speed_limits.map(|l| l.for_class(class))
    }
}

/// Zone id derived from a display name: lowercase, spaces as underscores
pub fn zone_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Tracks which zone currently holds the vehicle.
///
/// Zones are assumed not to overlap; when they do, the first one in load
/// order wins. The zone list is shared read-only and may outlive sessions.
pub struct GeozoneMatcher {
    zones: Arc<Vec<GeoZone>>,
    vehicle_class: VehicleClass,
    current: Option<usize>,
}

impl GeozoneMatcher {
    pub fn new(zones: Arc<Vec<GeoZone>>, vehicle_class: VehicleClass) -> Self {
        Self {
            zones,
            vehicle_class,
            current: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Arc::new(vec![]), VehicleClass::default())
    }

    pub fn zones(&self) -> &Arc<Vec<GeoZone>> {
        &self.zones
    }

    /// Swap the zone list, forgetting the current match
    pub fn load(&mut self, zones: Arc<Vec<GeoZone>>) {
        self.zones = zones;
        self.current = None;
    }

    pub fn current_zone(&self) -> Option<&GeoZone> {
        self.current.and_then(|i| self.zones.get(i))
    }

    /// Limit of the zone currently holding the vehicle
    pub fn active_limit(&self) -> Option<u32> {
        self.current_zone()
            .and_then(|z| z.limit_for(self.vehicle_class))
    }

    pub fn find(&self, position: &Point) -> Option<usize> {
        self.zones.iter().position(|z| z.contains(position))
    }

    /// Match a position and report a zone change, if any
    pub fn update(&mut self, position: &Point) -> Option<NavigationEvent> {
        let matched = self.find(position);

        // zone ids come from names, two zones may share one
        if matched == self.current {
            return None;
        }

        let previous_id = self.current_zone().map(|z| z.id.clone());
        self.current = matched;

        match self.current_zone() {
            Some(zone) => {
                let limit = zone.limit_for(self.vehicle_class);
                info!(zone = %zone.id, ?limit, "Entered zone {}", zone.name);
                Some(NavigationEvent::ZoneEntered {
                    zone: zone.name.clone(),
                    limit,
                })
            }
            None => {
                debug!(zone = ?previous_id, "Left zone");
                Some(NavigationEvent::ZoneLeft)
            }
        }
    }

    /// Forget the current match, keeping the zones
    pub fn reset(&mut self) {
        self.current = None;
    }
}

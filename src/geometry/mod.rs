//! Geometry kernel
//!
//! Pure functions over WGS84 coordinates. Coordinates are `geo` points with
//! `x` = longitude and `y` = latitude, in degrees.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use geo::{BoundingRect, Contains, LineString, MultiPoint, Point, Polygon, Rect};

mod format;

pub use format::{format_distance, format_duration};

/// Mean earth radius used by every distance computation
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Build a coordinate from latitude and longitude, in that order
pub fn latlng(lat: f64, lng: f64) -> Point {
    Point::new(lng, lat)
}

/// Haversine great-circle distance in meters
pub fn distance_meters(a: &Point, b: &Point) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from `from` to `to`, in `[0, 360)`
pub fn bearing_degrees(from: &Point, to: &Point) -> f64 {
    let lat1 = from.y().to_radians();
    let lat2 = to.y().to_radians();
    let dlng = (to.x() - from.x()).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// One of the eight compass sectors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinal {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinal::North => "north",
            Cardinal::Northeast => "northeast",
            Cardinal::East => "east",
            Cardinal::Southeast => "southeast",
            Cardinal::South => "south",
            Cardinal::Southwest => "southwest",
            Cardinal::West => "west",
            Cardinal::Northwest => "northwest",
        };
        f.write_str(name)
    }
}

/// Map a bearing to its 45° compass sector.
///
/// Sector boundaries sit on odd multiples of 22.5°. Out of range values are
/// wrapped into `[0, 360)` first.
pub fn bearing_to_cardinal(bearing: f64) -> Cardinal {
    let bearing = bearing.rem_euclid(360.0);

    match bearing {
        b if b < 22.5 || b >= 337.5 => Cardinal::North,
        b if b < 67.5 => Cardinal::Northeast,
        b if b < 112.5 => Cardinal::East,
        b if b < 157.5 => Cardinal::Southeast,
        b if b < 202.5 => Cardinal::South,
        b if b < 247.5 => Cardinal::Southwest,
        b if b < 292.5 => Cardinal::West,
        _ => Cardinal::Northwest,
    }
}

/// Containment test against an implicitly closed polygon.
///
/// With `geodesic` the edges are great-circle arcs; otherwise the polygon is
/// planar in lat/lng space. Fewer than three distinct vertices never contain
/// anything.
pub fn point_in_polygon(point: &Point, polygon: &[Point], geodesic: bool) -> bool {
    let ring = open_ring(polygon);
    if ring.len() < 3 {
        return false;
    }

    if geodesic {
        contains_geodesic(point, ring)
    } else {
        let exterior = LineString::from(ring.to_vec());
        Polygon::new(exterior, vec![]).contains(point)
    }
}

/// Drop the closing vertex when the ring repeats its first point
fn open_ring(polygon: &[Point]) -> &[Point] {
    match (polygon.first(), polygon.last()) {
        (Some(first), Some(last)) if polygon.len() > 1 && first == last => {
            &polygon[..polygon.len() - 1]
        }
        _ => polygon,
    }
}

/// Ray casting toward the north pole with great-circle edges
fn contains_geodesic(point: &Point, ring: &[Point]) -> bool {
    let lat3 = point.y().to_radians();
    let lng3 = point.x().to_radians();

    let mut prev = ring[ring.len() - 1];
    let mut crossings = 0usize;

    for vertex in ring {
        let lat1 = prev.y().to_radians();
        let lng1 = prev.x().to_radians();
        let dlng3 = wrap(lng3 - lng1, -PI, PI);

        if lat3 == lat1 && dlng3 == 0.0 {
            return true;
        }

        let lat2 = vertex.y().to_radians();
        let dlng2 = wrap(vertex.x().to_radians() - lng1, -PI, PI);

        if crosses(lat1, lat2, dlng2, lat3, dlng3) {
            crossings += 1;
        }

        prev = *vertex;
    }

    crossings % 2 == 1
}

/// Whether the meridian segment north of (lat3, lng3) crosses the edge from
/// (lat1, 0) to (lat2, lng2). Longitudes are relative to the edge start.
fn crosses(lat1: f64, lat2: f64, lng2: f64, lat3: f64, lng3: f64) -> bool {
    if (lng3 >= 0.0 && lng3 >= lng2) || (lng3 < 0.0 && lng3 < lng2) {
        return false;
    }
    if lat3 <= -FRAC_PI_2 {
        return false;
    }
    if lat1 <= -FRAC_PI_2 || lat2 <= -FRAC_PI_2 || lat1 >= FRAC_PI_2 || lat2 >= FRAC_PI_2 {
        return false;
    }
    if lng2 <= -PI {
        return false;
    }

    let linear_lat = (lat1 * (lng2 - lng3) + lat2 * lng3) / lng2;
    if lat1 >= 0.0 && lat2 >= 0.0 && lat3 < linear_lat {
        return false;
    }
    if lat1 <= 0.0 && lat2 <= 0.0 && lat3 >= linear_lat {
        return true;
    }
    if lat3 >= FRAC_PI_2 {
        return true;
    }

    let tan_lat_gc = (lat1.tan() * (lng2 - lng3).sin() + lat2.tan() * lng3.sin()) / lng2.sin();
    lat3.tan() >= tan_lat_gc
}

fn wrap(n: f64, min: f64, max: f64) -> f64 {
    if n >= min && n < max {
        n
    } else {
        (n - min).rem_euclid(max - min) + min
    }
}

/// `n + 1` points linearly spaced in lat/lng from `a` to `b`, both included
pub fn interpolate(a: &Point, b: &Point, n: usize) -> Vec<Point> {
    if n == 0 {
        return vec![*a];
    }

    (0..=n)
        .map(|i| {
            let fraction = i as f64 / n as f64;
            latlng(
                a.y() + (b.y() - a.y()) * fraction,
                a.x() + (b.x() - a.x()) * fraction,
            )
        })
        .collect()
}

/// Great-circle midpoint
pub fn midpoint(a: &Point, b: &Point) -> Point {
    let lat1 = a.y().to_radians();
    let lng1 = a.x().to_radians();
    let lat2 = b.y().to_radians();
    let dlng = (b.x() - a.x()).to_radians();

    let bx = lat2.cos() * dlng.cos();
    let by = lat2.cos() * dlng.sin();

    let lat3 = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by.powi(2)).sqrt());
    let lng3 = lng1 + by.atan2(lat1.cos() + bx);

    latlng(lat3.to_degrees(), lng3.to_degrees())
}

/// Hours needed to cover `distance_m` at `avg_speed_kmh`
pub fn estimate_travel_time_hours(distance_m: f64, avg_speed_kmh: f64) -> f64 {
    if avg_speed_kmh <= 0.0 {
        return 0.0;
    }
    (distance_m / 1000.0) / avg_speed_kmh
}

/// Bounding rectangle of a set of points, `None` when empty
pub fn route_bounds(points: &[Point]) -> Option<Rect> {
    MultiPoint::from(points.to_vec()).bounding_rect()
}

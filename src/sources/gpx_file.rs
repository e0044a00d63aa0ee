//! GPX files as route provider and as recorded drive

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use gpx::Gpx;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::{LocationSource, RouteProvider};
use crate::navigation::fix::LocationFix;
use crate::navigation::segment::Route;
use crate::navigation::zones::zone_id;
use crate::Error;

/// Routes of a GPX document.
///
/// Both `<rte>` elements and tracks count as routes; a track contributes
/// the points of all its segments in order.
pub struct GpxRouteProvider {
    routes: Vec<Route>,
}

impl GpxRouteProvider {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let doc = gpx::read(reader)?;

        Ok(Self::from_gpx(&doc))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;

        Self::from_reader(BufReader::new(file))
    }

    pub fn from_gpx(doc: &Gpx) -> Self {
        let mut routes = vec![];

        for rte in &doc.routes {
            let points = rte.points.iter().map(|wp| wp.point()).collect();
            routes.push(named_route(rte.name.as_deref(), routes.len(), points));
        }

        for trk in &doc.tracks {
            let points = trk
                .segments
                .iter()
                .flat_map(|s| s.points.iter().map(|wp| wp.point()))
                .collect();
            routes.push(named_route(trk.name.as_deref(), routes.len(), points));
        }

        info!("Loaded {} routes from GPX", routes.len());

        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

fn named_route(name: Option<&str>, index: usize, waypoints: Vec<geo::Point>) -> Route {
    let name = match name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => format!("Route {}", index + 1),
    };

    Route::new(zone_id(&name), name, waypoints)
}

impl RouteProvider for GpxRouteProvider {
    /// Matches the route id, or else its display name
    fn route(&self, id: &str) -> Result<Option<Route>, Error> {
        let found = self
            .routes
            .iter()
            .find(|r| r.id == id)
            .or_else(|| self.routes.iter().find(|r| r.name == id));

        Ok(found.cloned())
    }
}

/// Track points of a GPX document replayed as fixes.
///
/// Points without a timestamp cannot be placed in the feed and are skipped.
pub struct GpxTrackSource {
    fixes: VecDeque<LocationFix>,
}

impl GpxTrackSource {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let doc = gpx::read(reader)?;

        Ok(Self::from_gpx(&doc))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;

        Self::from_reader(BufReader::new(file))
    }

    pub fn from_gpx(doc: &Gpx) -> Self {
        let mut fixes = vec![];

        for wp in doc
            .tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .flat_map(|s| s.points.iter())
        {
            let Some(time) = &wp.time else {
                debug!("Skipping track point without time");
                continue;
            };

            let parsed = time.format().map_err(Error::from).and_then(|t| {
                OffsetDateTime::parse(&t, &Rfc3339).map_err(|e| Error::InvalidFix(e.to_string()))
            });

            let time = match parsed {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping track point with invalid time: {}", e);
                    continue;
                }
            };

            let mut fix = LocationFix::basic(wp.point(), time);
            fix.speed = wp.speed;
            fixes.push(fix);
        }

        fixes.sort_by_key(|f| f.time);

        Self {
            fixes: fixes.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.fixes.len()
    }
}

impl LocationSource for GpxTrackSource {
    fn next_fix(&mut self) -> Result<Option<LocationFix>, Error> {
        Ok(self.fixes.pop_front())
    }
}

//! KML placemarks as speed zones

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, warn};

use super::GeoZoneSource;
use crate::geometry::latlng;
use crate::navigation::zones::{GeoZone, SpeedLimits, VehicleClass};
use crate::Error;

/// Zones of a KML document, parsed once on first use
pub struct KmlZoneSource<R: Read> {
    reader: Option<R>,
    zones: Vec<GeoZone>,
}

impl KmlZoneSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> KmlZoneSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            zones: vec![],
        }
    }
}

impl<R: Read> GeoZoneSource for KmlZoneSource<R> {
    fn zones(&mut self) -> Result<Vec<GeoZone>, Error> {
        if let Some(reader) = self.reader.take() {
            self.zones = parse_kml(BufReader::new(reader))?;
        }

        Ok(self.zones.clone())
    }
}

/// Placemark being read
#[derive(Default)]
struct Placemark {
    name: String,
    points: Vec<geo::Point>,
    data: HashMap<String, String>,
}

impl Placemark {
    /// Uniform `speed_limit` value, overridden per vehicle class. Without a
    /// uniform value, classes left out get the strictest class limit.
    fn speed_limits(&self) -> Option<SpeedLimits> {
        let value = |key: &str| self.data.get(key).and_then(|v| v.trim().parse::<u32>().ok());

        let per_class: Vec<(VehicleClass, u32)> = self
            .data
            .iter()
            .filter_map(|(key, raw)| Some((VehicleClass::parse(key)?, raw.trim().parse().ok()?)))
            .collect();

        let base = value("speed_limit")
            .or_else(|| value("limit"))
            .or_else(|| per_class.iter().map(|(_, l)| *l).min())?;
        let mut l = SpeedLimits::uniform(base);

        for (class, limit) in per_class {
            match class {
                VehicleClass::Light => l.light = limit,
                VehicleClass::Personnel => l.personnel = limit,
                VehicleClass::Empty => l.empty = limit,
                VehicleClass::Loaded => l.loaded = limit,
                VehicleClass::Hazmat => l.hazmat = limit,
            }
        }

        Some(l)
    }
}

/// Read every polygon placemark of a KML document.
///
/// Only the outer boundary of a polygon is kept. Placemarks without a name
/// or with fewer than 3 points are skipped; an unparseable coordinate fails
/// the whole document.
pub fn parse_kml<B: BufRead>(input: B) -> Result<Vec<GeoZone>, Error> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = vec![];
    let mut current: Option<Placemark> = None;
    let mut data_name: Option<String> = None;
    let mut zones = vec![];
    let mut placemarks = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();

                match name.as_slice() {
                    b"Placemark" => {
                        placemarks += 1;
                        current = Some(Placemark::default());
                    }
                    b"Data" | b"SimpleData" => {
                        data_name = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.local_name().as_ref() == b"name")
                            .and_then(|a| a.unescape_value().ok())
                            .map(|v| v.trim().to_lowercase());
                    }
                    _ => {}
                }

                path.push(name);
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    continue;
                };

                if name.as_slice() == b"Placemark" {
                    if let Some(placemark) = current.take() {
                        finish_placemark(placemark, &mut zones);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                handle_text(&text, &path, current.as_mut(), data_name.as_deref())?;
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t).to_string();
                handle_text(&text, &path, current.as_mut(), data_name.as_deref())?;
            }
            _ => {}
        }
        buf.clear();
    }

    info!(placemarks, "Loaded {} geozones from KML", zones.len());

    Ok(zones)
}

fn handle_text(
    text: &str,
    path: &[Vec<u8>],
    placemark: Option<&mut Placemark>,
    data_name: Option<&str>,
) -> Result<(), Error> {
    let Some(placemark) = placemark else {
        return Ok(());
    };
    let Some(element) = path.last() else {
        return Ok(());
    };
    let parent = path.len().checked_sub(2).and_then(|i| path.get(i));

    match element.as_slice() {
        b"name" if parent.map(|p| p.as_slice()) == Some(b"Placemark".as_slice()) => {
            placemark.name = text.trim().to_string();
        }
        b"coordinates" => {
            let inner = path.iter().any(|p| p.as_slice() == b"innerBoundaryIs");
            if !inner && placemark.points.is_empty() {
                placemark.points = parse_coordinates(text)?;
            }
        }
        b"value" | b"SimpleData" => {
            if let Some(key) = data_name {
                placemark.data.insert(key.to_string(), text.trim().to_string());
            }
        }
        _ => {}
    }

    Ok(())
}

/// `lng,lat[,alt]` tuples separated by whitespace
fn parse_coordinates(text: &str) -> Result<Vec<geo::Point>, Error> {
    text.split_whitespace()
        .map(|token| {
            let mut parts = token.split(',');
            let lng = parts.next().map(|v| v.parse::<f64>());
            let lat = parts.next().map(|v| v.parse::<f64>());

            match (lng, lat) {
                (Some(Ok(lng)), Some(Ok(lat))) => Ok(latlng(lat, lng)),
                _ => Err(Error::Kml(format!("Invalid coordinate `{}`", token))),
            }
        })
        .collect()
}

fn finish_placemark(placemark: Placemark, zones: &mut Vec<GeoZone>) {
    if placemark.name.is_empty() || placemark.points.is_empty() {
        warn!("Skipping placemark without name or points");
        return;
    }

    let limits = placemark.speed_limits();
    match GeoZone::polygon(&placemark.name, placemark.points, limits) {
        Ok(zone) => {
            debug!(zone = %zone.id, ?limits, "Loaded zone {}", zone.name);
            zones.push(zone);
        }
        Err(e) => warn!("Skipping placemark: {}", e),
    }
}

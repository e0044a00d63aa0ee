//! CSV recording replayed as a location feed

use std::collections::VecDeque;
use std::io::Read;

use csv::{Reader, StringRecord};
use time::format_description::well_known;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::{parse_coordinates, FieldsConfiguration, LocationSource};
use crate::geometry::latlng;
use crate::navigation::fix::LocationFix;
use crate::Error;

/// Fixes recorded in a CSV file
pub struct CsvSource<T>
where
    T: Read,
{
    rdr: Reader<T>,
    fields: FieldsConfiguration,
    device: Option<String>,
    window: Option<(OffsetDateTime, OffsetDateTime)>,
    fixes: Option<VecDeque<LocationFix>>,
}

impl<T> CsvSource<T>
where
    T: Read,
{
    pub fn new(rdr: Reader<T>, fields: Option<FieldsConfiguration>) -> Self {
        Self {
            rdr,
            fields: match fields {
                Some(f) => f,
                None => FieldsConfiguration::default(),
            },
            device: None,
            window: None,
            fixes: None,
        }
    }

    /// Keep only the rows of this device
    pub fn device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());

        self
    }

    /// Keep only the fixes between `start` and `end`, both included
    pub fn window(mut self, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        self.window = Some((start, end));

        self
    }

    fn load(&mut self) -> Result<VecDeque<LocationFix>, Error> {
        let mut fixes = vec![];

        let mut header = self.rdr.headers()?.clone();
        let header_idx = parse_header(&self.fields, &mut header)?;

        let mut recs = self.rdr.records();
        while let Some(row) = recs.next() {
            let mut rec = row?;

            if rec.len() < 2 {
                continue;
            }

            let row_fix = match parse_row(&header_idx, &self.fields, &mut rec) {
                Ok(fix) => Ok(fix),
                Err(e) => Err(Error::InvalidFix(format!("Error with row {:?}: {}", rec, e))),
            }?;

            let Some((device, fix)) = row_fix else {
                debug!("Skipping row without coordinates: {:?}", rec);
                continue;
            };

            if let (Some(wanted), Some(device)) = (&self.device, &device) {
                if wanted != device {
                    continue;
                }
            }

            if let Some((start, end)) = self.window {
                if fix.time < start || fix.time > end {
                    continue;
                }
            }

            fixes.push(fix);
        }

        fixes.sort_by_key(|f| f.time);
        info!("Loaded {} fixes from CSV", fixes.len());

        Ok(fixes.into())
    }
}

impl<T> LocationSource for CsvSource<T>
where
    T: Read,
{
    fn start(&mut self) -> Result<(), Error> {
        if self.fixes.is_none() {
            self.fixes = Some(self.load()?);
        }

        Ok(())
    }

    fn next_fix(&mut self) -> Result<Option<LocationFix>, Error> {
        self.start()?;

        Ok(self.fixes.as_mut().and_then(|f| f.pop_front()))
    }
}

/// Field to index map
#[derive(Debug)]
struct FieldsIndex {
    coordinates: usize,
    time: usize,
    device: Option<usize>,
    speed: Option<usize>,
    accuracy: Option<usize>,
    bearing: Option<usize>,
}

fn parse_header(fields: &FieldsConfiguration, header: &mut StringRecord) -> Result<FieldsIndex, Error> {
    header.trim();

    let position = |name: &str| header.iter().position(|h| h.to_lowercase() == name);

    let coordinates = position(&fields.coordinates)
        .ok_or_else(|| Error::InvalidFix("Coordinates header not found".to_string()))?;
    let time = position(&fields.time)
        .ok_or_else(|| Error::InvalidFix("Time header not found".to_string()))?;

    Ok(FieldsIndex {
        coordinates,
        time,
        device: position(&fields.device_id),
        speed: position(&fields.speed),
        accuracy: position(&fields.accuracy),
        bearing: position(&fields.bearing),
    })
}

fn parse_row(
    header: &FieldsIndex,
    fields: &FieldsConfiguration,
    row: &mut StringRecord,
) -> Result<Option<(Option<String>, LocationFix)>, String> {
    row.trim();

    let raw_coordinates = row
        .get(header.coordinates)
        .ok_or("Coordinates field not found")?;
    let Some((lat, lng)) = parse_coordinates(raw_coordinates, fields.flip_coordinates)? else {
        return Ok(None);
    };

    let time = match row.get(header.time) {
        Some(d) => OffsetDateTime::parse(d, &well_known::Rfc3339)
            .map_err(|e| format!("Failed on parse the time: {}", e)),
        None => Err("Time field not found".to_string()),
    }?;

    let mut fix = LocationFix::basic(latlng(lat, lng), time);

    let number = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .and_then(|d| d.parse::<f64>().ok())
    };

    fix.speed = number(header.speed);
    fix.accuracy = number(header.accuracy).map(|a| a as f32);
    fix.bearing = number(header.bearing);

    let device = header
        .device
        .and_then(|i| row.get(i))
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string());

    Ok(Some((device, fix)))
}

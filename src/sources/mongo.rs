//! Mongodb collection replayed as a location feed

use std::collections::VecDeque;

use bson::{doc, Bson, DateTime, Document};
use mongodb::sync::Collection;
use time::format_description::well_known;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::{parse_coordinates, FieldsConfiguration, LocationSource};
use crate::geometry::latlng;
use crate::navigation::fix::LocationFix;
use crate::Error;

/// Fixes recorded in a MongoDB collection
pub struct MongoDbSource {
    collection: Collection<Document>,
    fields: FieldsConfiguration,
    device: Option<String>,
    window: Option<(OffsetDateTime, OffsetDateTime)>,
    fixes: Option<VecDeque<LocationFix>>,
}

impl MongoDbSource {
    pub fn new(collection: Collection<Document>, fields: Option<FieldsConfiguration>) -> Self {
        Self {
            collection,
            fields: match fields {
                Some(f) => f,
                None => FieldsConfiguration::default(),
            },
            device: None,
            window: None,
            fixes: None,
        }
    }

    /// Keep only the documents of this device
    pub fn device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());

        self
    }

    /// Keep only the fixes between `start` and `end`, both included
    pub fn window(mut self, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        self.window = Some((start, end));

        self
    }

    fn filter(&self) -> Document {
        let mut filter = doc! {};

        if let Some((start, end)) = self.window {
            filter.insert(
                self.fields.time.clone(),
                doc! {
                    "$gte": DateTime::from_time_0_3(start),
                    "$lte": DateTime::from_time_0_3(end)
                },
            );
        }
        if let Some(device) = &self.device {
            filter.insert(self.fields.device_id.clone(), device.clone());
        }

        filter
    }

    fn load(&mut self) -> Result<VecDeque<LocationFix>, Error> {
        let mut fixes = vec![];

        let cursor = self.collection.find(self.filter(), None)?;

        for rdoc in cursor {
            let doc = rdoc?;

            let fix = match parse_doc(&self.fields, &doc) {
                Ok(fix) => Ok(fix),
                Err(e) => Err(Error::InvalidFix(format!(
                    "Error with doc {:?}: {}",
                    doc.get("_id"),
                    e
                ))),
            }?;

            let Some(fix) = fix else {
                debug!("Skipping doc without coordinates: {:?}", doc.get("_id"));
                continue;
            };

            fixes.push(fix);
        }

        fixes.sort_by_key(|f| f.time);
        info!("Loaded {} fixes from MongoDB", fixes.len());

        Ok(fixes.into())
    }
}

impl LocationSource for MongoDbSource {
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

fn number(value: Option<&Bson>) -> Option<f64> {
    match value {
        Some(Bson::Double(v)) => Some(*v),
        Some(Bson::Int32(v)) => Some(*v as f64),
        Some(Bson::Int64(v)) => Some(*v as f64),
        _ => None,
    }
}

fn parse_doc(fields: &FieldsConfiguration, doc: &Document) -> Result<Option<LocationFix>, String> {
    let (lat, lng) = match doc.get(&fields.coordinates) {
        Some(Bson::Array(coordinates)) => {
            if coordinates.len() != 2 {
                return Err("Coordinates size invalid".to_string());
            }
            let first = number(coordinates.first()).ok_or("Invalid type of coordinate")?;
            let second = number(coordinates.get(1)).ok_or("Invalid type of coordinate")?;

            if fields.flip_coordinates {
                (first, second)
            } else {
                (second, first)
            }
        }
        Some(Bson::String(raw)) => match parse_coordinates(raw, fields.flip_coordinates)? {
            Some(pair) => pair,
            None => return Ok(None),
        },
        Some(Bson::Null) | None => return Ok(None),
        Some(_) => return Err("Coordinates field type not supported".to_string()),
    };

    let time = match doc.get(&fields.time) {
        Some(Bson::String(tm)) => OffsetDateTime::parse(tm, &well_known::Rfc3339)
            .map_err(|e| format!("Failed on parse the time: {}", e)),
        Some(Bson::DateTime(tm)) => Ok(tm.to_time_0_3()),
        Some(Bson::Timestamp(tm)) => OffsetDateTime::from_unix_timestamp(tm.time.into())
            .map_err(|e| format!("Failed on parse the time timestamp: {}", e)),
        Some(_) => Err("Time field type not supported".to_string()),
        None => Err("Time field not found".to_string()),
    }?;

    let mut fix = LocationFix::basic(latlng(lat, lng), time);
    fix.speed = number(doc.get(&fields.speed));
    fix.accuracy = number(doc.get(&fields.accuracy)).map(|a| a as f32);
    fix.bearing = number(doc.get(&fields.bearing));

    Ok(Some(fix))
}

#[cfg(test)]
pub mod tests {
    use bson::{doc, Document};
    use mongodb::sync::{Client, Collection};
    use time::macros::datetime;

    use super::MongoDbSource;
    use crate::geometry::latlng;
    use crate::sources::{FieldsConfiguration, LocationSource};

    fn collection() -> Result<Collection<Document>, String> {
        let client = Client::with_uri_str("mongodb://localhost:27017").map_err(|e| e.to_string())?;
        let db = client.database("routecopilot_tests");
        let collection = db.collection::<Document>("fixes");
        collection.drop(None).map_err(|e| e.to_string())?;

        Ok(collection)
    }

    fn drain(mut source: MongoDbSource) -> Result<Vec<crate::LocationFix>, String> {
        let mut fixes = vec![];
        while let Some(fix) = source.next_fix().map_err(|e| e.to_string())? {
            fixes.push(fix);
        }

        Ok(fixes)
    }

    #[test]
    #[ignore = "needs a MongoDB server on localhost"]
    fn mongo_replay() -> Result<(), String> {
        let collection = collection()?;

        let docs = vec![
            doc! { "device": "HT-07", "coordinates": [-75.10, -15.34], "time": "2024-03-01T08:00:10Z", "speed": 12.5 },
            doc! { "device": "HT-07", "coordinates": [-75.11, -15.35], "time": "2024-03-01T08:00:00Z" },
            doc! { "device": "HT-07", "coordinates": [-75.09, -15.33], "time": "2024-03-01T08:00:20Z", "speed": 13 },
        ];
        collection.insert_many(docs, None).map_err(|e| e.to_string())?;

        let fixes = drain(MongoDbSource::new(collection, None))?;
        assert_eq!(3, fixes.len());
        assert_eq!(latlng(-15.35, -75.11), fixes[0].position);
        assert_eq!(Some(12.5), fixes[1].speed);
        assert_eq!(Some(13.0), fixes[2].speed);

        Ok(())
    }

    #[test]
    #[ignore = "needs a MongoDB server on localhost"]
    fn mongo_filter() -> Result<(), String> {
        let collection = collection()?;

        let docs = vec![
            doc! { "device": "HT-07", "coordinates": [-75.11, -15.35], "time": datetime!(2024-03-01 8:00 UTC) },
            doc! { "device": "HT-09", "coordinates": [-75.11, -15.35], "time": datetime!(2024-03-01 8:00 UTC) },
            doc! { "device": "HT-07", "coordinates": [-75.11, -15.35], "time": datetime!(2024-03-02 8:00 UTC) },
        ];
        collection.insert_many(docs, None).map_err(|e| e.to_string())?;

        let source = MongoDbSource::new(collection, None)
            .device("HT-07")
            .window(datetime!(2024-03-01 0:00 UTC), datetime!(2024-03-01 23:59 UTC));

        assert_eq!(1, drain(source)?.len());

        Ok(())
    }

    #[test]
    #[ignore = "needs a MongoDB server on localhost"]
    fn mongo_custom_fields() -> Result<(), String> {
        let collection = collection()?;

        let docs = vec![
            doc! { "truck": "HT-07", "pos": [-15.35, -75.11], "ts": "2024-03-01T08:00:00Z" },
        ];
        collection.insert_many(docs, None).map_err(|e| e.to_string())?;

        let fields = FieldsConfiguration::default()
            .device("truck")
            .coordinates("pos")
            .time("ts")
            .flip();
        let fixes = drain(MongoDbSource::new(collection, Some(fields)))?;

        assert_eq!(latlng(-15.35, -75.11), fixes[0].position);

        Ok(())
    }
}

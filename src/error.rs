//! Crate error type

/// Failures of the data-loading collaborators.
///
/// The navigation engine itself never fails: a missing zone or limit is
/// `None`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("Invalid KML: {0}")]
    Kml(String),
    #[cfg(feature = "mongo")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid zone `{name}`: {reason}")]
    InvalidZone { name: String, reason: String },
    #[error("Invalid fix: {0}")]
    InvalidFix(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Kml(e.to_string())
    }
}

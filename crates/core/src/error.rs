//! Error types for legalmap

use thiserror::Error;

/// Main error type for legalmap operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid configuration file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Missing required configuration value: {key}")]
    MissingConfig { key: &'static str },

    #[error("Could not find project root using marker {marker}")]
    ProjectRootNotFound { marker: String },

    #[error("Unknown layer: {name}")]
    UnknownLayer { name: String },

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Layer has no CRS; cannot reproject")]
    MissingCrs,

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported vector format: {0}")]
    UnsupportedFormat(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("No input: {0}")]
    EmptyInput(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for legalmap operations
pub type Result<T> = std::result::Result<T, Error>;

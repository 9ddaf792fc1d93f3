//! I/O operations for reading and writing vector layers
//!
//! GeoJSON is always handled natively. GeoPackage, Shapefile and FileGDB
//! go through GDAL and need the `gdal` feature.

#[cfg(feature = "gdal")]
mod gdal_io;
mod native;
mod store;

pub use native::{read_geojson_from_str, write_geojson_to_string};
pub use store::{ExportPaths, LayerStore};

use crate::error::{Error, Result};
use crate::vector::FeatureCollection;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Vector container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorDriver {
    GeoJson,
    GeoPackage,
    Shapefile,
    /// Esri file geodatabase (read-only)
    FileGdb,
}

impl VectorDriver {
    /// File extension written for this driver
    pub fn extension(&self) -> &'static str {
        match self {
            VectorDriver::GeoJson => "geojson",
            VectorDriver::GeoPackage => "gpkg",
            VectorDriver::Shapefile => "shp",
            VectorDriver::FileGdb => "gdb",
        }
    }

    /// GDAL/OGR short driver name
    pub fn gdal_name(&self) -> &'static str {
        match self {
            VectorDriver::GeoJson => "GeoJSON",
            VectorDriver::GeoPackage => "GPKG",
            VectorDriver::Shapefile => "ESRI Shapefile",
            VectorDriver::FileGdb => "OpenFileGDB",
        }
    }

    /// Whether this driver works without GDAL
    pub fn is_native(&self) -> bool {
        matches!(self, VectorDriver::GeoJson)
    }

    /// Guess the driver from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "geojson" | "json" => Ok(VectorDriver::GeoJson),
            "gpkg" => Ok(VectorDriver::GeoPackage),
            "shp" => Ok(VectorDriver::Shapefile),
            "gdb" => Ok(VectorDriver::FileGdb),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl Default for VectorDriver {
    /// GeoPackage when GDAL is available, GeoJSON otherwise
    fn default() -> Self {
        if cfg!(feature = "gdal") {
            VectorDriver::GeoPackage
        } else {
            VectorDriver::GeoJson
        }
    }
}

impl fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gdal_name())
    }
}

impl FromStr for VectorDriver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "geojson" | "json" => Ok(VectorDriver::GeoJson),
            "gpkg" | "geopackage" => Ok(VectorDriver::GeoPackage),
            "shp" | "shapefile" | "esri shapefile" => Ok(VectorDriver::Shapefile),
            "gdb" | "filegdb" | "openfilegdb" => Ok(VectorDriver::FileGdb),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

#[cfg(not(feature = "gdal"))]
fn requires_gdal(driver: VectorDriver) -> Error {
    Error::UnsupportedFormat(format!(
        "{} requires building with the `gdal` feature",
        driver.gdal_name()
    ))
}

/// Read a vector layer.
///
/// # Arguments
/// * `path` - Dataset path (file or `.gdb` directory)
/// * `layer` - Layer name inside a multi-layer dataset; first layer if `None`
///
/// # Example
/// ```ignore
/// let roads = read_layer("mvum.gdb", Some("MVUM_Roads_CO_Valid"))?;
/// ```
pub fn read_layer<P: AsRef<Path>>(path: P, layer: Option<&str>) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let driver = VectorDriver::from_path(path)?;
    debug!("Reading {} ({}, layer {:?})", path.display(), driver, layer);

    if driver.is_native() {
        return native::read_geojson(path);
    }

    #[cfg(feature = "gdal")]
    {
        gdal_io::read_layer(path, layer)
    }
    #[cfg(not(feature = "gdal"))]
    {
        Err(requires_gdal(driver))
    }
}

/// Write a collection to `path`, replacing any existing file.
///
/// Parent directories are created as needed.
pub fn write_layer<P: AsRef<Path>>(
    fc: &FeatureCollection,
    path: P,
    driver: VectorDriver,
) -> Result<()> {
    let path = path.as_ref();
    if driver == VectorDriver::FileGdb {
        return Err(Error::UnsupportedFormat("FileGDB output is not supported".into()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Writing {} features to {} ({})", fc.len(), path.display(), driver);

    if driver.is_native() {
        return native::write_geojson(fc, path);
    }

    #[cfg(feature = "gdal")]
    {
        gdal_io::write_layer(fc, path, driver)
    }
    #[cfg(not(feature = "gdal"))]
    {
        Err(requires_gdal(driver))
    }
}

/// List the layer names of a dataset.
pub fn list_layers<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let driver = VectorDriver::from_path(path)?;

    if driver.is_native() {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("layer")
            .to_string();
        return Ok(vec![name]);
    }

    #[cfg(feature = "gdal")]
    {
        gdal_io::list_layers(path)
    }
    #[cfg(not(feature = "gdal"))]
    {
        Err(requires_gdal(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CRS;
    use crate::vector::Feature;
    use geo_types::{line_string, Geometry};
    use tempfile::tempdir;

    #[test]
    fn test_driver_from_path() {
        assert_eq!(
            VectorDriver::from_path(Path::new("a/b.GPKG")).unwrap(),
            VectorDriver::GeoPackage
        );
        assert_eq!(
            VectorDriver::from_path(Path::new("roads.shp")).unwrap(),
            VectorDriver::Shapefile
        );
        assert_eq!(
            VectorDriver::from_path(Path::new("x.geojson")).unwrap(),
            VectorDriver::GeoJson
        );
        assert!(VectorDriver::from_path(Path::new("x.csv")).is_err());
    }

    #[test]
    fn test_driver_parse() {
        assert_eq!("GPKG".parse::<VectorDriver>().unwrap(), VectorDriver::GeoPackage);
        assert_eq!("shapefile".parse::<VectorDriver>().unwrap(), VectorDriver::Shapefile);
        assert!("kml".parse::<VectorDriver>().is_err());
    }

    #[test]
    fn test_write_creates_parents_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/roads.geojson");

        let mut fc = FeatureCollection::with_crs(CRS::from_epsg(26913));
        fc.push(
            Feature::new(Geometry::LineString(line_string![
                (x: 0.0, y: 0.0),
                (x: 100.0, y: 0.0),
            ]))
            .with_property("ID", "FS-100"),
        );
        write_layer(&fc, &path, VectorDriver::GeoJson).unwrap();

        fc.push(Feature::empty());
        write_layer(&fc, &path, VectorDriver::GeoJson).unwrap();

        let loaded = read_layer(&path, None).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.crs, Some(CRS::from_epsg(26913)));
        assert_eq!(list_layers(&path).unwrap(), vec!["roads".to_string()]);
    }

    #[cfg(not(feature = "gdal"))]
    #[test]
    fn test_gpkg_without_gdal_is_unsupported() {
        let dir = tempdir().unwrap();
        let err = write_layer(
            &FeatureCollection::new(),
            dir.path().join("out.gpkg"),
            VectorDriver::GeoPackage,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}

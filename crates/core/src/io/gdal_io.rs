//! Vector layer reading and writing using GDAL/OGR

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::VectorDriver;
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    FieldValue, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType, ToGdal,
};
use gdal::{Dataset, DriverManager};
use std::path::Path;
use tracing::{debug, warn};

/// wkb25DBit, set on legacy 2.5D geometry type codes
const WKB_25D_BIT: u32 = 0x8000_0000;

/// Read one layer of an OGR dataset
///
/// # Arguments
/// * `path` - Dataset path
/// * `layer` - Layer name, or the first layer if `None`
pub fn read_layer(path: &Path, layer: Option<&str>) -> Result<FeatureCollection> {
    let dataset = Dataset::open(path)?;
    let mut layer = match layer {
        Some(name) => dataset.layer_by_name(name)?,
        None => dataset.layer(0)?,
    };

    let crs = layer.spatial_ref().map(|srs| crs_from_srs(&srs));
    let mut fc = FeatureCollection::from_features(Vec::new(), crs);
    let mut with_z = 0usize;

    for feature in layer.features() {
        let geometry = match feature.geometry() {
            Some(geom) => {
                if has_extra_ordinates(geom.geometry_type()) {
                    with_z += 1;
                }
                // to_geo() keeps X/Y only
                Some(geom.to_geo()?)
            }
            None => None,
        };

        let properties = feature
            .fields()
            .map(|(name, value)| (name, value.map(decode_field).unwrap_or(AttributeValue::Null)))
            .collect();

        fc.push(Feature {
            geometry,
            properties,
            id: feature.fid().map(|fid| fid.to_string()),
        });
    }

    if with_z > 0 {
        warn!(
            "{}: dropped Z/M ordinates from {} feature(s)",
            path.display(),
            with_z
        );
    }
    debug!("Read {} features from {}", fc.len(), path.display());
    Ok(fc)
}

/// Write a collection as a single-layer OGR dataset
pub fn write_layer(fc: &FeatureCollection, path: &Path, driver: VectorDriver) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let ogr_driver = DriverManager::get_driver_by_name(driver.gdal_name())?;
    let mut dataset = ogr_driver.create_vector_only(path)?;

    let srs = fc.crs.as_ref().map(srs_from_crs).transpose()?;
    let layer_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layer")
        .to_string();

    let mut layer = dataset.create_layer(LayerOptions {
        name: &layer_name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbUnknown,
        options: None,
    })?;

    let columns = fc.columns();
    let field_defs: Vec<(&str, OGRFieldType::Type)> = columns
        .iter()
        .map(|name| (name.as_str(), field_type(fc, name)))
        .collect();
    layer.create_defn_fields(&field_defs)?;

    let mut skipped = 0usize;
    for feature in fc.iter() {
        let Some(geometry) = &feature.geometry else {
            skipped += 1;
            continue;
        };

        let mut names = Vec::with_capacity(feature.properties.len());
        let mut values = Vec::with_capacity(feature.properties.len());
        for (name, value) in &feature.properties {
            if let Some(v) = encode_field(value) {
                names.push(name.as_str());
                values.push(v);
            }
        }

        layer.create_feature_fields(geometry.to_gdal()?, &names, &values)?;
    }

    if skipped > 0 {
        warn!("{}: skipped {} feature(s) without geometry", path.display(), skipped);
    }
    Ok(())
}

/// List the layer names of an OGR dataset
pub fn list_layers(path: &Path) -> Result<Vec<String>> {
    let dataset = Dataset::open(path)?;
    Ok(dataset.layers().map(|layer| layer.name()).collect())
}

fn has_extra_ordinates(ty: OGRwkbGeometryType::Type) -> bool {
    // ISO codes: 1000s = Z, 2000s = M, 3000s = ZM
    ty & WKB_25D_BIT != 0 || (1000..4000).contains(&(ty & 0xffff))
}

fn crs_from_srs(srs: &SpatialRef) -> CRS {
    if let Ok(code) = srs.auth_code() {
        return CRS::from_epsg(code as u32);
    }
    match srs.to_wkt() {
        Ok(wkt) => CRS::from_wkt(wkt),
        Err(_) => CRS::default(),
    }
}

fn srs_from_crs(crs: &CRS) -> Result<SpatialRef> {
    if let Some(epsg) = crs.epsg() {
        return Ok(SpatialRef::from_epsg(epsg)?);
    }
    if let Some(wkt) = crs.wkt() {
        return Ok(SpatialRef::from_wkt(wkt)?);
    }
    if let Some(proj) = crs.proj() {
        return Ok(SpatialRef::from_proj4(proj)?);
    }
    Err(Error::UnsupportedCrs(crs.identifier()))
}

/// OGR field type from the first non-null value of a column
fn field_type(fc: &FeatureCollection, column: &str) -> OGRFieldType::Type {
    let first = fc
        .iter()
        .filter_map(|f| f.get_property(column))
        .find(|v| !v.is_null());
    match first {
        Some(AttributeValue::Int(_)) => OGRFieldType::OFTInteger64,
        Some(AttributeValue::Float(_)) => OGRFieldType::OFTReal,
        Some(AttributeValue::Bool(_)) => OGRFieldType::OFTInteger,
        _ => OGRFieldType::OFTString,
    }
}

fn decode_field(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::IntegerValue(i) => AttributeValue::Int(i as i64),
        FieldValue::Integer64Value(i) => AttributeValue::Int(i),
        FieldValue::RealValue(f) => AttributeValue::Float(f),
        FieldValue::StringValue(s) => AttributeValue::String(s),
        other => other
            .into_string()
            .map(AttributeValue::String)
            .unwrap_or(AttributeValue::Null),
    }
}

fn encode_field(value: &AttributeValue) -> Option<FieldValue> {
    match value {
        AttributeValue::Null => None,
        AttributeValue::Bool(b) => Some(FieldValue::IntegerValue(*b as i32)),
        AttributeValue::Int(i) => Some(FieldValue::Integer64Value(*i)),
        AttributeValue::Float(f) => Some(FieldValue::RealValue(*f)),
        AttributeValue::String(s) => Some(FieldValue::StringValue(s.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Geometry};
    use tempfile::tempdir;

    #[test]
    fn test_gpkg_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("water_polygon_clean.gpkg");

        let mut fc = FeatureCollection::with_crs(CRS::from_epsg(26913));
        fc.push(
            Feature::new(Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 60.96, y: 0.0),
                (x: 60.96, y: 60.96),
                (x: 0.0, y: 60.96),
            ]))
            .with_property("GNIS_NAME", "Dillon Reservoir")
            .with_property("FTYPE", 390_i64),
        );

        write_layer(&fc, &path, VectorDriver::GeoPackage).unwrap();
        let loaded = read_layer(&path, None).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.crs.as_ref().and_then(|c| c.epsg()), Some(26913));
        assert_eq!(
            loaded.features[0].get_property("GNIS_NAME"),
            Some(&AttributeValue::from("Dillon Reservoir"))
        );
        assert_eq!(list_layers(&path).unwrap(), vec!["water_polygon_clean".to_string()]);
    }
}

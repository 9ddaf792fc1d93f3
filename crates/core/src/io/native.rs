//! Native GeoJSON reading/writing (without GDAL dependency)
//!
//! Uses the `geojson` crate. The layer CRS is carried in the legacy
//! (2008) `crs` member, which GDAL and QGIS both honour; files without it
//! are read as WGS84 per RFC 7946, and an unreadable one is an error.
//! For GeoPackage / Shapefile / FileGDB, enable the `gdal` feature.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use std::path::Path;
use tracing::{debug, warn};

/// Read a GeoJSON file into a FeatureCollection
pub fn read_geojson(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)?;
    let (fc, with_z) = decode_geojson(&text)?;
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

/// Parse GeoJSON text into a FeatureCollection
///
/// Same as `read_geojson` but operates on an in-memory string.
pub fn read_geojson_from_str(text: &str) -> Result<FeatureCollection> {
    decode_geojson(text).map(|(fc, _)| fc)
}

/// Write a FeatureCollection as a GeoJSON file
pub fn write_geojson(fc: &FeatureCollection, path: &Path) -> Result<()> {
    std::fs::write(path, write_geojson_to_string(fc)?)?;
    Ok(())
}

/// Serialize a FeatureCollection to GeoJSON text
pub fn write_geojson_to_string(fc: &FeatureCollection) -> Result<String> {
    let features = fc.iter().map(encode_feature).collect();

    let foreign_members = fc.crs.as_ref().and_then(|crs| crs.urn()).map(|urn| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({ "type": "name", "properties": { "name": urn } }),
        );
        members
    });

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };
    Ok(serde_json::to_string(&GeoJson::FeatureCollection(collection))?)
}

/// Internal: decode GeoJSON text, returning the collection and the
/// number of features whose coordinates carried more than two ordinates.
fn decode_geojson(text: &str) -> Result<(FeatureCollection, usize)> {
    let parsed: GeoJson = text.parse()?;

    let (features, crs) = match parsed {
        GeoJson::FeatureCollection(collection) => {
            let crs = match &collection.foreign_members {
                Some(members) => crs_member(members)?,
                None => None,
            }
            .unwrap_or_else(CRS::wgs84);
            (collection.features, crs)
        }
        GeoJson::Feature(feature) => (vec![feature], CRS::wgs84()),
        GeoJson::Geometry(geometry) => (
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            CRS::wgs84(),
        ),
    };

    let mut with_z = 0;
    let mut fc = FeatureCollection::with_crs(crs);
    for feature in features {
        if feature
            .geometry
            .as_ref()
            .is_some_and(|g| has_extra_ordinates(&g.value))
        {
            with_z += 1;
        }
        fc.push(decode_feature(feature)?);
    }
    Ok((fc, with_z))
}

/// CRS named by the legacy `crs` member; `None` when the member is absent
fn crs_member(members: &JsonObject) -> Result<Option<CRS>> {
    let Some(member) = members.get("crs") else {
        return Ok(None);
    };
    let name = member
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| Error::UnsupportedCrs(format!("unreadable crs member: {}", member)))?;
    name.parse().map(Some)
}

fn decode_feature(feature: geojson::Feature) -> Result<Feature> {
    // geo-types is 2D: conversion keeps the first two ordinates of each position
    let geometry = feature
        .geometry
        .map(|g| geo_types::Geometry::<f64>::try_from(g.value))
        .transpose()?;

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, decode_value(value)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn decode_value(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map(AttributeValue::Float).unwrap_or(AttributeValue::Null),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn encode_feature(feature: &Feature) -> geojson::Feature {
    let geometry = feature
        .geometry
        .as_ref()
        .map(|g| geojson::Geometry::new(geojson::Value::from(g)));

    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry,
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn encode_value(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn has_extra_ordinates(value: &geojson::Value) -> bool {
    use geojson::Value;

    let over = |p: &Vec<f64>| p.len() > 2;
    match value {
        Value::Point(p) => over(p),
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.iter().any(over),
        Value::MultiLineString(rings) | Value::Polygon(rings) => rings.iter().flatten().any(over),
        Value::MultiPolygon(polys) => polys.iter().flatten().flatten().any(over),
        Value::GeometryCollection(geoms) => geoms.iter().any(|g| has_extra_ordinates(&g.value)),
    }
}

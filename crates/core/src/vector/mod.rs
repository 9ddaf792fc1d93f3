//! Vector data structures
//!
//! - `Feature`: optional geometry + attributes
//! - `FeatureCollection`: features sharing one CRS tag

use crate::crs::{Transformer, CRS};
use crate::error::{Error, Result};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "NULL"),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry; `None` for rows with a missing shape
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Geometry type name, `None` when the geometry is missing
    pub fn geometry_type(&self) -> Option<&'static str> {
        let name = match self.geometry.as_ref()? {
            Geometry::Point(_) => "Point",
            Geometry::Line(_) => "Line",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
            Geometry::Rect(_) => "Rect",
            Geometry::Triangle(_) => "Triangle",
        };
        Some(name)
    }
}

/// Collection of features sharing a single CRS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            crs: None,
        }
    }

    pub fn with_crs(crs: CRS) -> Self {
        Self {
            features: Vec::new(),
            crs: Some(crs),
        }
    }

    pub fn from_features(features: Vec<Feature>, crs: Option<CRS>) -> Self {
        Self { features, crs }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Feature> {
        self.features.iter_mut()
    }

    /// Sorted union of every attribute name present in the collection
    pub fn columns(&self) -> Vec<String> {
        self.features
            .iter()
            .flat_map(|f| f.properties.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Keep only features matching `keep`; returns how many were removed
    pub fn retain(&mut self, keep: impl FnMut(&Feature) -> bool) -> usize {
        let before = self.features.len();
        self.features.retain(keep);
        before - self.features.len()
    }

    /// Replace every present geometry with `f(geometry)`; `None` clears it
    pub fn map_geometries(
        mut self,
        mut f: impl FnMut(Geometry<f64>) -> Option<Geometry<f64>>,
    ) -> Self {
        for feature in &mut self.features {
            feature.geometry = feature.geometry.take().and_then(&mut f);
        }
        self
    }

    /// Reproject every geometry to `target` and retag the collection.
    ///
    /// Returns the collection unchanged when it is already in an
    /// equivalent CRS.
    pub fn to_crs(self, target: &CRS) -> Result<Self> {
        let source = self.crs.clone().ok_or(Error::MissingCrs)?;
        if source.is_equivalent(target) {
            return Ok(self);
        }

        let transformer = Transformer::new(&source, target)?;
        let mut out = self.map_geometries(|g| Some(transformer.transform_geometry(&g)));
        out.crs = Some(target.clone());
        Ok(out)
    }

    /// Keep features whose `column` equals `value` (string comparison)
    pub fn filter_eq(mut self, column: &str, value: &str) -> Self {
        self.features.retain(|f| {
            f.get_property(column)
                .map(|v| v.to_string() == value)
                .unwrap_or(false)
        });
        self
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

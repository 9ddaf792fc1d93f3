//! Geometry cleaning
//!
//! Raw layers arrive with missing shapes, self-intersecting polygons and a
//! mix of single and multi part geometries. Cleaning runs three passes:
//! 1. drop features without geometry
//! 2. rebuild polygonal geometry through a unary union (the zero-width
//!    buffer trick), which resolves self-intersections
//! 3. drop whatever is still invalid
//!
//! Z/M ordinates are already gone at this point: the readers keep X/Y only.

use geo::{unary_union, Geometry, MultiLineString, MultiPoint, MultiPolygon, Validation};
use legalmap_core::vector::FeatureCollection;
use legalmap_core::{Algorithm, Error, Result};
use tracing::{debug, warn};

/// Parameters for [`clean_layer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanParams {
    pub repair: bool,
    pub drop_invalid: bool,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            repair: true,
            drop_invalid: true,
        }
    }
}

/// What cleaning changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Features dropped for having no geometry
    pub missing: usize,
    /// Invalid polygons the repair pass turned valid
    pub repaired: usize,
    /// Features dropped as invalid or empty after repair
    pub invalid: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.missing + self.invalid
    }
}

/// Remove features with no geometry; returns the removed count
pub fn drop_missing_geometry(fc: &mut FeatureCollection) -> usize {
    fc.retain(|f| f.geometry.is_some())
}

/// Rebuild polygonal geometry through a unary union.
///
/// Non-polygonal geometry passes through unchanged. Returns `None` when the
/// union comes out empty (a fully degenerate polygon).
pub fn repair_geometry(geom: Geometry<f64>) -> Option<Geometry<f64>> {
    let rebuilt = match &geom {
        Geometry::Polygon(p) => unary_union(std::iter::once(p)),
        Geometry::MultiPolygon(mp) => unary_union(mp.0.iter()),
        Geometry::Rect(r) => return Some(Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => return Some(Geometry::Polygon(t.to_polygon())),
        _ => return Some(geom),
    };
    if rebuilt.0.is_empty() {
        None
    } else {
        Some(Geometry::MultiPolygon(rebuilt))
    }
}

/// Remove features whose geometry fails validation; returns the removed count
pub fn drop_invalid_geometry(fc: &mut FeatureCollection) -> usize {
    fc.retain(|f| f.geometry.as_ref().map(|g| g.is_valid()).unwrap_or(false))
}

/// Promote single-part geometry to its multi-part form
pub fn to_multi(geom: Geometry<f64>) -> Geometry<f64> {
    match geom {
        Geometry::Point(p) => Geometry::MultiPoint(MultiPoint::new(vec![p])),
        Geometry::LineString(ls) => Geometry::MultiLineString(MultiLineString::new(vec![ls])),
        Geometry::Polygon(p) => Geometry::MultiPolygon(MultiPolygon::new(vec![p])),
        other => other,
    }
}

/// Promote every geometry of a layer so each layer has one geometry type
pub fn promote_to_multi(fc: FeatureCollection) -> FeatureCollection {
    fc.map_geometries(|g| Some(to_multi(g)))
}

/// Run the cleaning passes over a layer.
pub fn clean_layer(fc: &mut FeatureCollection, params: CleanParams) -> CleanReport {
    let mut report = CleanReport {
        missing: drop_missing_geometry(fc),
        ..CleanReport::default()
    };

    if params.repair {
        for feature in fc.iter_mut() {
            let Some(geom) = feature.geometry.take() else {
                continue;
            };
            let broken_polygon = matches!(geom, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
                && !geom.is_valid();
            feature.geometry = repair_geometry(geom);
            if broken_polygon && feature.geometry.as_ref().is_some_and(|g| g.is_valid()) {
                report.repaired += 1;
            }
        }
        // repairs that collapsed to nothing
        report.invalid += drop_missing_geometry(fc);
    }

    if params.drop_invalid {
        report.invalid += drop_invalid_geometry(fc);
    }

    if report.missing > 0 {
        warn!("Dropped {} features with missing geometry", report.missing);
    }
    if report.repaired > 0 {
        warn!("Repaired {} invalid geometries", report.repaired);
    }
    if report.invalid > 0 {
        warn!("Dropped {} invalid geometries", report.invalid);
    }
    debug!("{} features after cleaning", fc.len());
    report
}

/// Cleaning algorithm
#[derive(Debug, Clone, Default)]
pub struct CleanFeatures;

impl Algorithm for CleanFeatures {
    type Input = FeatureCollection;
    type Output = (FeatureCollection, CleanReport);
    type Params = CleanParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Clean"
    }

    fn description(&self) -> &'static str {
        "Drop missing geometry, repair polygons and drop invalid geometry"
    }

    fn execute(&self, mut input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let report = clean_layer(&mut input, params);
        Ok((input, report))
    }
}

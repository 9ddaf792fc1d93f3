//! Geometry simplification
//!
//! - Douglas-Peucker: distance tolerance, keeps shape character
//! - Visvalingam-Whyatt: area tolerance, smoother for display layers

use geo::{Geometry, LineString, MultiLineString, MultiPolygon, Polygon};
use geo::{Simplify, SimplifyVw};
use legalmap_core::vector::FeatureCollection;
use tracing::debug;

/// Simplification algorithm to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimplifyMethod {
    #[default]
    DouglasPeucker,
    VisvalingamWhyatt,
}

/// Parameters for [`simplify_layer`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifyParams {
    /// Distance (DP) or area (VW) tolerance in CRS units
    pub tolerance: f64,
    pub method: SimplifyMethod,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            method: SimplifyMethod::DouglasPeucker,
        }
    }
}

/// Apply `simplify_ring` to every ring and line of a geometry.
///
/// Holes that collapse below four coordinates are dropped. A polygon whose
/// exterior would collapse is kept unsimplified.
fn map_rings(geom: &Geometry<f64>, simplify_ring: impl Fn(&LineString<f64>) -> LineString<f64>) -> Geometry<f64> {
    let polygon = |p: &Polygon<f64>| -> Option<Polygon<f64>> {
        let exterior = simplify_ring(p.exterior());
        if exterior.0.len() < 4 {
            return None;
        }
        let interiors = p
            .interiors()
            .iter()
            .map(&simplify_ring)
            .filter(|ring| ring.0.len() >= 4)
            .collect();
        Some(Polygon::new(exterior, interiors))
    };

    match geom {
        Geometry::LineString(ls) => Geometry::LineString(simplify_ring(ls)),
        Geometry::MultiLineString(mls) => {
            Geometry::MultiLineString(MultiLineString::new(mls.0.iter().map(&simplify_ring).collect()))
        }
        Geometry::Polygon(p) => match polygon(p) {
            Some(p) => Geometry::Polygon(p),
            None => geom.clone(),
        },
        Geometry::MultiPolygon(mp) => {
            let kept: Vec<Polygon<f64>> = mp.0.iter().filter_map(polygon).collect();
            if kept.is_empty() {
                geom.clone()
            } else {
                Geometry::MultiPolygon(MultiPolygon::new(kept))
            }
        }
        other => other.clone(),
    }
}

/// Simplify a geometry with Douglas-Peucker.
///
/// Vertices closer than `tolerance` to the simplified line are removed.
/// Points pass through unchanged.
pub fn simplify_dp(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    map_rings(geom, |ls| ls.simplify(tolerance))
}

/// Simplify a geometry with Visvalingam-Whyatt.
///
/// Vertices whose effective triangle area is below `tolerance` are removed.
pub fn simplify_vw(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    map_rings(geom, |ls| ls.simplify_vw(tolerance))
}

/// Simplify every geometry of a layer.
pub fn simplify_layer(fc: FeatureCollection, params: &SimplifyParams) -> FeatureCollection {
    debug!(
        "Simplifying {} features ({:?}, tolerance {})",
        fc.len(),
        params.method,
        params.tolerance
    );
    let tolerance = params.tolerance;
    match params.method {
        SimplifyMethod::DouglasPeucker => fc.map_geometries(|g| Some(simplify_dp(&g, tolerance))),
        SimplifyMethod::VisvalingamWhyatt => fc.map_geometries(|g| Some(simplify_vw(&g, tolerance))),
    }
}

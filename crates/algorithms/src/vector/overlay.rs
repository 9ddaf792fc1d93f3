//! Dissolve and overlay
//!
//! Polygon unions and intersections go through `geo`'s boolean ops.

use geo::{
    unary_union, BooleanOps, BoundingRect, Geometry, Intersects, MultiLineString, MultiPolygon,
};
use legalmap_core::vector::{AttributeValue, Feature, FeatureCollection};
use legalmap_core::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Polygonal part of a geometry, if any
fn as_multi_polygon(geom: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

fn as_multi_line(geom: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match geom {
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        Geometry::Line(l) => Some(MultiLineString::new(vec![(*l).into()])),
        _ => None,
    }
}

/// Union a set of features' polygonal geometry into one multipolygon.
///
/// Returns the union and how many features had no polygonal geometry.
fn union_features<'a>(features: impl IntoIterator<Item = &'a Feature>) -> (MultiPolygon<f64>, usize) {
    let mut skipped = 0;
    let mut polygons = Vec::new();
    for feature in features {
        match feature.geometry.as_ref().and_then(as_multi_polygon) {
            Some(mp) => polygons.extend(mp.0),
            None => skipped += 1,
        }
    }
    (unary_union(polygons.iter()), skipped)
}

/// Merge every polygon of a layer into a single feature.
///
/// The output feature keeps the first input feature's attributes.
/// Non-polygonal geometry is left out of the union.
pub fn dissolve(fc: FeatureCollection) -> FeatureCollection {
    let crs = fc.crs.clone();
    let Some(first) = fc.features.first() else {
        return fc;
    };
    let properties = first.properties.clone();

    let (union, skipped) = union_features(fc.iter());
    if skipped > 0 {
        warn!("Dissolve ignored {} non-polygonal features", skipped);
    }
    debug!(
        "Dissolved {} features into {} polygons",
        fc.len(),
        union.0.len()
    );

    let mut out = FeatureCollection::from_features(Vec::new(), crs);
    if !union.0.is_empty() {
        out.push(Feature {
            geometry: Some(Geometry::MultiPolygon(union)),
            properties,
            id: None,
        });
    }
    out
}

/// Merge polygons that share a value of `column`; one output feature per
/// distinct value. Features without the column group under null.
pub fn dissolve_by(fc: FeatureCollection, column: &str) -> FeatureCollection {
    let crs = fc.crs.clone();
    let mut groups: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
    for feature in fc {
        let key = feature
            .get_property(column)
            .unwrap_or(&AttributeValue::Null)
            .to_string();
        groups.entry(key).or_default().push(feature);
    }

    let mut out = FeatureCollection::from_features(Vec::new(), crs);
    for (key, members) in groups {
        let (union, _) = union_features(members.iter());
        if union.0.is_empty() {
            debug!("Group {}={} has no polygonal geometry", column, key);
            continue;
        }
        let mut properties = members[0].properties.clone();
        if !properties.contains_key(column) {
            properties.insert(column.to_string(), AttributeValue::Null);
        }
        out.push(Feature {
            geometry: Some(Geometry::MultiPolygon(union)),
            properties,
            id: None,
        });
    }
    out
}

fn intersect_geometries(a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
    if let (Some(ra), Some(rb)) = (a.bounding_rect(), b.bounding_rect()) {
        if !ra.intersects(&rb) {
            return None;
        }
    }

    match (as_multi_polygon(a), as_multi_polygon(b)) {
        (Some(pa), Some(pb)) => {
            let mp = pa.intersection(&pb);
            (!mp.0.is_empty()).then_some(Geometry::MultiPolygon(mp))
        }
        (None, Some(poly)) => clip_to(a, &poly),
        (Some(poly), None) => clip_to(b, &poly),
        (None, None) => None,
    }
}

/// Lines are clipped to the polygon; points are kept when they fall in it
fn clip_to(geom: &Geometry<f64>, poly: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    if let Some(lines) = as_multi_line(geom) {
        let clipped = poly.clip(&lines, false);
        return (!clipped.0.is_empty()).then_some(Geometry::MultiLineString(clipped));
    }
    match geom {
        Geometry::Point(_) | Geometry::MultiPoint(_) if poly.intersects(geom) => Some(geom.clone()),
        _ => None,
    }
}

fn merge_properties(
    left: &BTreeMap<String, AttributeValue>,
    right: &BTreeMap<String, AttributeValue>,
) -> BTreeMap<String, AttributeValue> {
    let mut merged = left.clone();
    for (key, value) in right {
        if merged.contains_key(key) {
            merged.insert(format!("{}_2", key), value.clone());
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Intersect two layers.
///
/// Every pair of overlapping features yields one output feature carrying
/// both attribute sets; right-hand names that collide with left-hand ones
/// get a `_2` suffix. Polygon pairs intersect, lines and points are clipped
/// to the polygon side. Both layers must share a CRS.
pub fn intersect_layers(a: &FeatureCollection, b: &FeatureCollection) -> Result<FeatureCollection> {
    let same_crs = match (&a.crs, &b.crs) {
        (Some(ca), Some(cb)) => ca.is_equivalent(cb),
        (None, None) => true,
        _ => false,
    };
    if !same_crs {
        let name = |c: &Option<legalmap_core::CRS>| {
            c.as_ref().map(|c| c.identifier()).unwrap_or_else(|| "none".into())
        };
        return Err(Error::CrsMismatch(name(&a.crs), name(&b.crs)));
    }

    let mut out = FeatureCollection::from_features(Vec::new(), a.crs.clone());
    for fa in a.iter() {
        let Some(ga) = &fa.geometry else { continue };
        for fb in b.iter() {
            let Some(gb) = &fb.geometry else { continue };
            if let Some(geometry) = intersect_geometries(ga, gb) {
                out.push(Feature {
                    geometry: Some(geometry),
                    properties: merge_properties(&fa.properties, &fb.properties),
                    id: None,
                });
            }
        }
    }
    debug!(
        "Intersection of {} x {} features produced {}",
        a.len(),
        b.len(),
        out.len()
    );
    Ok(out)
}

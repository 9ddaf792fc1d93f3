//! Geometric measurements: area, length, perimeter
//!
//! All values are in CRS units; project to a metric CRS for metres.

use geo::{Area as GeoArea, Euclidean, Geometry, Length};
use legalmap_core::vector::FeatureCollection;

/// Unsigned area of a geometry; zero for points and lines.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        Geometry::Triangle(t) => t.unsigned_area(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(area).sum(),
        _ => 0.0,
    }
}

/// Length of a linear geometry.
pub fn length(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::LineString(ls) => Euclidean.length(ls),
        Geometry::MultiLineString(mls) => Euclidean.length(mls),
        Geometry::Line(l) => Euclidean.length(l),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(length).sum(),
        _ => 0.0,
    }
}

/// Total ring length (exterior and holes) of a polygonal geometry.
pub fn perimeter(geom: &Geometry<f64>) -> f64 {
    let polygon = |p: &geo::Polygon<f64>| -> f64 {
        Euclidean.length(p.exterior())
            + p.interiors().iter().map(|r| Euclidean.length(r)).sum::<f64>()
    };
    match geom {
        Geometry::Polygon(p) => polygon(p),
        Geometry::MultiPolygon(mp) => mp.0.iter().map(polygon).sum(),
        Geometry::Rect(r) => polygon(&r.to_polygon()),
        _ => 0.0,
    }
}

/// Summed area of every geometry in a layer
pub fn total_area(fc: &FeatureCollection) -> f64 {
    fc.iter().filter_map(|f| f.geometry.as_ref()).map(area).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, Line, LineString, MultiLineString, Polygon};
    use legalmap_core::vector::Feature;

    fn square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        )
    }

    #[test]
    fn test_area_square_and_triangle() {
        assert!((area(&Geometry::Polygon(square())) - 100.0).abs() < 1e-10);
        let triangle = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        assert!((area(&Geometry::Polygon(triangle)) - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_of_line_is_zero() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]));
        assert_eq!(area(&line), 0.0);
    }

    #[test]
    fn test_lengths() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (3.0, 4.0)]));
        assert!((length(&line) - 5.0).abs() < 1e-10);

        let mls = Geometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 0.0), (0.0, 5.0)]),
        ]));
        assert!((length(&mls) - 15.0).abs() < 1e-10);

        let seg = Geometry::Line(Line::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 6.0, y: 8.0 }));
        assert!((length(&seg) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_perimeter_with_hole() {
        let poly = Polygon::new(
            square().exterior().clone(),
            vec![LineString::from(vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0), (2.0, 2.0)])],
        );
        // 40 exterior + 24 hole
        assert!((perimeter(&Geometry::Polygon(poly)) - 64.0).abs() < 1e-10);
    }

    #[test]
    fn test_total_area_skips_missing() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::Polygon(square())));
        fc.push(Feature::new(Geometry::Polygon(square())));
        fc.push(Feature::empty());
        assert!((total_area(&fc) - 200.0).abs() < 1e-10);
    }
}

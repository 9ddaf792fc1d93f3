//! Buffer operations
//!
//! Expand every geometry of a layer outward by a fixed distance. Buffering
//! itself is delegated to `geo`; this module handles units, cap styles and
//! the layer bookkeeping.

use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap};
use geo::Geometry;
use legalmap_core::vector::FeatureCollection;
use legalmap_core::{Algorithm, Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// International foot
pub const FEET_TO_METERS: f64 = 0.3048;

/// Convert feet to metres
pub fn feet_to_meters(feet: f64) -> f64 {
    feet * FEET_TO_METERS
}

/// End cap style for buffered lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapStyle {
    #[default]
    Round,
    /// Cut square at the line end
    Flat,
    /// Square extending past the line end by the buffer distance
    Square,
}

impl CapStyle {
    /// Buffer style for `distance`; `BufferStyle` caps are round by default
    fn style(self, distance: f64) -> BufferStyle<f64> {
        let style = BufferStyle::new(distance);
        match self {
            CapStyle::Round => style,
            CapStyle::Flat => style.line_cap(LineCap::Butt),
            CapStyle::Square => style.line_cap(LineCap::Square),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapStyle::Round => "round",
            CapStyle::Flat => "flat",
            CapStyle::Square => "square",
        }
    }
}

impl fmt::Display for CapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round" | "1" => Ok(CapStyle::Round),
            "flat" | "butt" | "2" => Ok(CapStyle::Flat),
            "square" | "3" => Ok(CapStyle::Square),
            _ => Err(Error::InvalidParameter {
                name: "cap_style",
                value: s.to_string(),
                reason: "expected round, flat or square".into(),
            }),
        }
    }
}

/// Parameters for buffer operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferParams {
    /// Buffer distance in CRS units
    pub distance: f64,
    pub cap_style: CapStyle,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            cap_style: CapStyle::Round,
        }
    }
}

impl BufferParams {
    pub fn new(distance: f64, cap_style: CapStyle) -> Self {
        Self {
            distance,
            cap_style,
        }
    }

    /// Distance given in feet, for layers in a metre-based CRS
    pub fn from_feet(distance_ft: f64, cap_style: CapStyle) -> Self {
        Self::new(feet_to_meters(distance_ft), cap_style)
    }
}

/// Buffer a single geometry.
///
/// Returns `None` when the buffer is empty (e.g. a negative distance that
/// erodes a polygon away).
pub fn buffer_geometry(geom: &Geometry<f64>, params: &BufferParams) -> Option<Geometry<f64>> {
    let buffered = geom.buffer_with_style(params.cap_style.style(params.distance));
    if buffered.0.is_empty() {
        None
    } else {
        Some(Geometry::MultiPolygon(buffered))
    }
}

fn check_params(fc: &FeatureCollection, params: &BufferParams) -> Result<()> {
    if !params.distance.is_finite() {
        return Err(Error::InvalidParameter {
            name: "distance",
            value: params.distance.to_string(),
            reason: "buffer distance must be finite".into(),
        });
    }
    if let Some(crs) = &fc.crs {
        if crs.is_geographic() {
            return Err(Error::InvalidParameter {
                name: "crs",
                value: crs.identifier(),
                reason: "buffer distances need a projected CRS; reproject first".into(),
            });
        }
    }
    Ok(())
}

/// Buffer every geometry of a layer.
///
/// Attributes are kept. Features with no geometry, or whose buffer comes
/// out empty, are dropped.
///
/// # Arguments
/// * `fc` - Layer in a projected CRS
/// * `params` - Distance (CRS units) and cap style
pub fn buffer_layer(fc: FeatureCollection, params: &BufferParams) -> Result<FeatureCollection> {
    check_params(&fc, params)?;
    debug!(
        "Buffering {} features by {} ({} caps)",
        fc.len(),
        params.distance,
        params.cap_style
    );

    let crs = fc.crs.clone();
    let before = fc.len();
    let features: Vec<_> = fc
        .into_iter()
        .filter_map(|mut feature| {
            let buffered = feature
                .geometry
                .as_ref()
                .and_then(|g| buffer_geometry(g, params))?;
            feature.geometry = Some(buffered);
            Some(feature)
        })
        .collect();

    let dropped = before - features.len();
    if dropped > 0 {
        warn!("Dropped {} features with empty buffers", dropped);
    }
    Ok(FeatureCollection::from_features(features, crs))
}

/// Buffer a layer by a distance in feet
pub fn buffer_layer_feet(
    fc: FeatureCollection,
    distance_ft: f64,
    cap_style: CapStyle,
) -> Result<FeatureCollection> {
    buffer_layer(fc, &BufferParams::from_feet(distance_ft, cap_style))
}

/// Buffer algorithm
#[derive(Debug, Clone, Default)]
pub struct BufferFeatures;

impl Algorithm for BufferFeatures {
    type Input = FeatureCollection;
    type Output = FeatureCollection;
    type Params = BufferParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Buffer"
    }

    fn description(&self) -> &'static str {
        "Expand every geometry of a layer by a fixed distance"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        buffer_layer(input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::measurements::area;
    use approx::assert_relative_eq;
    use geo::{line_string, point};
    use legalmap_core::vector::Feature;
    use legalmap_core::CRS;

    fn utm() -> CRS {
        CRS::from_epsg(26913)
    }

    fn road_layer() -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(utm());
        fc.push(
            Feature::new(Geometry::LineString(line_string![
                (x: 0.0, y: 0.0),
                (x: 1000.0, y: 0.0),
            ]))
            .with_property("ID", "FS-100"),
        );
        fc
    }

    #[test]
    fn test_feet_to_meters() {
        assert_relative_eq!(feet_to_meters(300.0), 91.44, epsilon = 1e-9);
        assert_relative_eq!(feet_to_meters(200.0), 60.96, epsilon = 1e-9);
        assert_relative_eq!(
            BufferParams::from_feet(100.0, CapStyle::Flat).distance,
            30.48,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_cap_style_parse() {
        assert_eq!("round".parse::<CapStyle>().unwrap(), CapStyle::Round);
        assert_eq!("1".parse::<CapStyle>().unwrap(), CapStyle::Round);
        assert_eq!("FLAT".parse::<CapStyle>().unwrap(), CapStyle::Flat);
        assert_eq!("2".parse::<CapStyle>().unwrap(), CapStyle::Flat);
        assert_eq!("3".parse::<CapStyle>().unwrap(), CapStyle::Square);
        assert!("mitre".parse::<CapStyle>().is_err());
    }

    #[test]
    fn test_point_buffer_is_roughly_a_circle() {
        let p = Geometry::Point(point!(x: 500.0, y: 500.0));
        let buffered = buffer_geometry(&p, &BufferParams::new(10.0, CapStyle::Round)).unwrap();
        let a = area(&buffered);
        let circle = std::f64::consts::PI * 100.0;
        assert!((a - circle).abs() / circle < 0.02, "area {}", a);
    }

    #[test]
    fn test_flat_caps_are_smaller_than_round() {
        let line = &road_layer().features[0];
        let geom = line.geometry.as_ref().unwrap();
        let flat = area(&buffer_geometry(geom, &BufferParams::new(50.0, CapStyle::Flat)).unwrap());
        let round = area(&buffer_geometry(geom, &BufferParams::new(50.0, CapStyle::Round)).unwrap());

        // 1000 m x 100 m rectangle, plus two half discs for round caps
        assert!((flat - 100_000.0).abs() < 100.0, "flat {}", flat);
        assert!(round > flat + 7_000.0, "round {} flat {}", round, flat);
    }

    #[test]
    fn test_square_caps_extend_past_line_ends() {
        let geom = road_layer().features[0].geometry.clone().unwrap();
        let square = area(&buffer_geometry(&geom, &BufferParams::new(50.0, CapStyle::Square)).unwrap());
        // 1100 m x 100 m
        assert!((square - 110_000.0).abs() < 100.0, "square {}", square);
    }

    #[test]
    fn test_area_grows_with_distance() {
        let small = buffer_layer_feet(road_layer(), 100.0, CapStyle::Round).unwrap();
        let large = buffer_layer_feet(road_layer(), 300.0, CapStyle::Round).unwrap();
        let a_small = area(small.features[0].geometry.as_ref().unwrap());
        let a_large = area(large.features[0].geometry.as_ref().unwrap());
        assert!(a_large > a_small * 2.5);
    }

    #[test]
    fn test_buffer_layer_keeps_attributes_and_drops_missing() {
        let mut fc = road_layer();
        fc.push(Feature::empty().with_property("ID", "ghost"));

        let out = buffer_layer(fc, &BufferParams::new(10.0, CapStyle::Round)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.crs, Some(utm()));
        assert_eq!(out.features[0].get_property("ID").unwrap().as_str(), Some("FS-100"));
        assert!(matches!(
            out.features[0].geometry,
            Some(Geometry::MultiPolygon(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite_distance() {
        let err = buffer_layer(road_layer(), &BufferParams::new(f64::NAN, CapStyle::Round))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "distance", .. }));
    }

    #[test]
    fn test_rejects_geographic_crs() {
        let mut fc = road_layer();
        fc.crs = Some(CRS::wgs84());
        let err = buffer_layer(fc, &BufferParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "crs", .. }));
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = BufferFeatures;
        assert_eq!(algo.name(), "Buffer");
        let out = algo.execute_default(road_layer()).unwrap();
        assert_eq!(out.len(), 1);
    }
}

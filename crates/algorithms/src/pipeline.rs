//! Layer preparation: reproject, clean, buffer, dissolve, simplify
//!
//! One call takes a raw layer to its interim form. Stages run in a fixed
//! order and each is skipped when its parameter is unset.

use crate::vector::{
    buffer_layer, clean_layer, dissolve, promote_to_multi, reproject, simplify_layer, BufferParams,
    CleanParams, CleanReport, SimplifyParams,
};
use legalmap_core::vector::FeatureCollection;
use legalmap_core::{Result, CRS};
use tracing::debug;

/// Stages to run in [`prepare_layer`]
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareParams {
    /// Working CRS; `None` keeps the input CRS
    pub target_crs: Option<CRS>,
    pub clean: bool,
    pub buffer: Option<BufferParams>,
    pub dissolve: bool,
    /// Douglas-Peucker tolerance in working CRS units
    pub simplify_tolerance: Option<f64>,
    pub promote_multi: bool,
}

impl Default for PrepareParams {
    fn default() -> Self {
        Self {
            target_crs: None,
            clean: true,
            buffer: None,
            dissolve: false,
            simplify_tolerance: None,
            promote_multi: true,
        }
    }
}

impl PrepareParams {
    pub fn in_crs(crs: CRS) -> Self {
        Self {
            target_crs: Some(crs),
            ..Self::default()
        }
    }

    pub fn with_buffer(mut self, buffer: BufferParams) -> Self {
        self.buffer = Some(buffer);
        self
    }

    pub fn dissolved(mut self, dissolve: bool) -> Self {
        self.dissolve = dissolve;
        self
    }
}

/// Feature counts through [`prepare_layer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub input: usize,
    pub clean: CleanReport,
    pub output: usize,
}

/// Run the preparation stages over a layer.
pub fn prepare_layer(
    fc: FeatureCollection,
    params: &PrepareParams,
) -> Result<(FeatureCollection, PrepareReport)> {
    let mut report = PrepareReport {
        input: fc.len(),
        ..PrepareReport::default()
    };

    let mut fc = match &params.target_crs {
        Some(crs) => reproject(fc, crs)?,
        None => fc,
    };

    if params.clean {
        report.clean = clean_layer(&mut fc, CleanParams::default());
    }

    if let Some(buffer) = &params.buffer {
        fc = buffer_layer(fc, buffer)?;
    }

    if params.dissolve {
        fc = dissolve(fc);
    }

    if let Some(tolerance) = params.simplify_tolerance {
        fc = simplify_layer(
            fc,
            &SimplifyParams {
                tolerance,
                ..SimplifyParams::default()
            },
        );
    }

    if params.promote_multi {
        fc = promote_to_multi(fc);
    }

    report.output = fc.len();
    debug!("Prepared layer: {} -> {} features", report.input, report.output);
    Ok((fc, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::CapStyle;
    use geo::{line_string, Geometry};
    use legalmap_core::vector::Feature;

    fn flowlines_wgs84() -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(CRS::wgs84());
        fc.push(Feature::new(Geometry::LineString(line_string![
            (x: -105.80, y: 39.55),
            (x: -105.79, y: 39.56),
        ])));
        fc.push(Feature::empty());
        fc
    }

    #[test]
    fn test_defaults_clean_and_promote() {
        let (fc, report) = prepare_layer(flowlines_wgs84(), &PrepareParams::default()).unwrap();
        assert_eq!(report.input, 2);
        assert_eq!(report.clean.missing, 1);
        assert_eq!(report.output, 1);
        assert_eq!(fc.crs, Some(CRS::wgs84()));
        assert!(matches!(fc.features[0].geometry, Some(Geometry::MultiLineString(_))));
    }

    #[test]
    fn test_reproject_then_buffer() {
        let params = PrepareParams::in_crs(CRS::from_epsg(26913))
            .with_buffer(BufferParams::from_feet(200.0, CapStyle::Flat))
            .dissolved(true);
        let (fc, report) = prepare_layer(flowlines_wgs84(), &params).unwrap();
        assert_eq!(report.output, 1);
        assert_eq!(fc.crs, Some(CRS::from_epsg(26913)));
        assert!(matches!(fc.features[0].geometry, Some(Geometry::MultiPolygon(_))));
    }

    #[test]
    fn test_buffer_in_geographic_crs_is_rejected() {
        let params = PrepareParams::default().with_buffer(BufferParams::from_feet(200.0, CapStyle::Round));
        assert!(prepare_layer(flowlines_wgs84(), &params).is_err());
    }
}

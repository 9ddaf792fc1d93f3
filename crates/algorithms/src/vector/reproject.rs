//! Layer reprojection

use legalmap_core::vector::FeatureCollection;
use legalmap_core::{Algorithm, Error, Result, CRS};
use tracing::debug;

/// Reproject a layer to `target`.
///
/// A no-op when the layer already carries an equivalent CRS. Fails with
/// [`Error::MissingCrs`] when the layer is untagged.
pub fn reproject(fc: FeatureCollection, target: &CRS) -> Result<FeatureCollection> {
    let source = fc.crs.as_ref().ok_or(Error::MissingCrs)?;
    debug!("Reprojecting {} features: {} -> {}", fc.len(), source, target);
    fc.to_crs(target)
}

/// Parameters for [`Reproject`]
#[derive(Debug, Clone, Default)]
pub struct ReprojectParams {
    pub target: CRS,
}

/// Reprojection algorithm
#[derive(Debug, Clone, Default)]
pub struct Reproject;

impl Algorithm for Reproject {
    type Input = FeatureCollection;
    type Output = FeatureCollection;
    type Params = ReprojectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Reproject"
    }

    fn description(&self) -> &'static str {
        "Transform every geometry of a layer to another CRS"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        reproject(input, &params.target)
    }
}

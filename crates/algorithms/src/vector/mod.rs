//! Vector layer operations
//!
//! - Reproject: move a layer to another CRS
//! - Buffer: expand geometries by a fixed distance
//! - Clean: drop missing/invalid geometry, repair polygons
//! - Overlay: dissolve and intersection
//! - Simplify: reduce vertex count (Douglas-Peucker, Visvalingam)
//! - Area / Length: geometric measurements

mod buffer;
mod clean;
mod measurements;
mod overlay;
mod reproject;
mod simplify;

pub use buffer::{
    buffer_geometry, buffer_layer, buffer_layer_feet, feet_to_meters, BufferFeatures,
    BufferParams, CapStyle, FEET_TO_METERS,
};
pub use clean::{
    clean_layer, drop_invalid_geometry, drop_missing_geometry, promote_to_multi,
    repair_geometry, to_multi, CleanFeatures, CleanParams, CleanReport,
};
pub use measurements::{area, length, perimeter, total_area};
pub use overlay::{dissolve, dissolve_by, intersect_layers};
pub use reproject::{reproject, Reproject, ReprojectParams};
pub use simplify::{simplify_dp, simplify_layer, simplify_vw, SimplifyMethod, SimplifyParams};

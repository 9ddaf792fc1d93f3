//! # legalmap algorithms
//!
//! Layer operations for the legalmap pipeline.
//!
//! ## Modules
//!
//! - **vector**: reproject, buffer, clean, dissolve/intersect, simplify, measurements
//! - **legality**: legality schema tagging and merging
//! - **pipeline**: the per-layer stage sequence used by the CLI tasks

pub mod legality;
pub mod pipeline;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::legality::{merge_legality_layers, tag_legality, Legality, LegalityTag};
    pub use crate::pipeline::{prepare_layer, PrepareParams, PrepareReport};
    pub use crate::vector::{
        buffer_layer, buffer_layer_feet, clean_layer, dissolve, intersect_layers, reproject,
        simplify_layer, BufferFeatures, BufferParams, CapStyle, CleanFeatures, CleanParams,
        Reproject,
    };
    pub use legalmap_core::prelude::*;
}

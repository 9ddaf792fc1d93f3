//! # legalmap core
//!
//! Core types, configuration and I/O for the legalmap layer preparation
//! pipeline.
//!
//! This crate provides:
//! - `FeatureCollection`: features sharing one CRS tag
//! - `CRS` and `Transformer`: coordinate systems and pure-Rust reprojection
//! - `PipelineConfig`: project root discovery, `legalmap.toml` and env overrides
//! - `LayerRegistry` / `LayerStore`: named raw, interim and display layers
//! - Algorithm trait for consistent step APIs

pub mod config;
pub mod crs;
pub mod error;
pub mod io;
pub mod registry;
pub mod vector;

pub use config::PipelineConfig;
pub use crs::{Transformer, CRS};
pub use error::{Error, Result};
pub use io::{LayerStore, VectorDriver};
pub use registry::LayerRegistry;
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for pipeline steps.
///
/// Steps are pure functions that transform a layer according to parameters.
pub trait Algorithm {
    /// Input type for the step
    type Input;
    /// Output type for the step
    type Output;
    /// Parameters controlling step behavior
    type Params: Default;
    /// Error type for step execution
    type Error: std::error::Error;

    /// Returns the step name
    fn name(&self) -> &'static str;

    /// Returns a description of what the step does
    fn description(&self) -> &'static str;

    /// Execute the step
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

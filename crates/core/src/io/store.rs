//! Named layer access on top of the registry

use super::{read_layer, write_layer, VectorDriver};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::registry::LayerRegistry;
use crate::vector::FeatureCollection;
use std::path::PathBuf;
use tracing::info;

/// Files written by [`LayerStore::export_interim`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub interim: PathBuf,
    /// Set when the layer is flagged for display
    pub display: Option<PathBuf>,
}

/// Reads raw and interim layers by name and exports derived layers
#[derive(Debug, Clone)]
pub struct LayerStore {
    config: PipelineConfig,
    registry: LayerRegistry,
    driver: VectorDriver,
}

impl LayerStore {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let driver = match config.driver.as_deref() {
            Some(name) => name.parse()?,
            None => VectorDriver::default(),
        };
        let registry = LayerRegistry::from_config(&config);
        Ok(Self {
            config,
            registry,
            driver,
        })
    }

    pub fn with_driver(mut self, driver: VectorDriver) -> Self {
        self.driver = driver;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn driver(&self) -> VectorDriver {
        self.driver
    }

    /// Read a raw input layer by registry name
    pub fn read_raw(&self, name: &str) -> Result<FeatureCollection> {
        let source = self.registry.raw_source(name)?;
        read_layer(&source.path, source.layer.as_deref())
    }

    /// Read a previously exported interim layer by registry name
    pub fn read_interim(&self, name: &str) -> Result<FeatureCollection> {
        read_layer(self.registry.interim_path(name, self.driver)?, None)
    }

    /// Save a layer to the interim directory; if it is marked for display,
    /// also save a copy reprojected to the display CRS into the processed
    /// directory.
    pub fn export_interim(&self, fc: &FeatureCollection, name: &str) -> Result<ExportPaths> {
        let interim = self.registry.interim_path(name, self.driver)?;
        write_layer(fc, &interim, self.driver)?;
        info!("Saved to interim: {}", interim.display());

        let display = if self.registry.is_display(name) {
            let path = self.registry.display_path(name, self.driver)?;
            let display_fc = fc.clone().to_crs(&self.config.display_crs)?;
            write_layer(&display_fc, &path, self.driver)?;
            info!("Also saved to processed: {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(ExportPaths { interim, display })
    }
}

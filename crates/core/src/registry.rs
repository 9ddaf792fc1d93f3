//! Layer registry: named raw sources, interim outputs and the display subset

use crate::config::{PipelineConfig, RawSourceEntry};
use crate::error::{Error, Result};
use crate::io::VectorDriver;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Where a raw layer lives before resolution against configured roots
#[derive(Debug, Clone, PartialEq)]
enum RawLocation {
    /// Relative to the raw data directory, optionally one layer of it
    Data { path: PathBuf, layer: Option<String> },
    /// A layer of the configured geodatabase
    Gdb { layer: String },
}

/// A resolved raw input
#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    pub path: PathBuf,
    pub layer: Option<String>,
}

/// Lookup tables mapping layer names to files
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    raw_root: PathBuf,
    gdb: Option<PathBuf>,
    interim_dir: PathBuf,
    processed_dir: PathBuf,
    raw: BTreeMap<String, RawLocation>,
    interim: BTreeMap<String, String>,
    display: BTreeSet<String>,
}

fn data(path: &str, layer: Option<&str>) -> RawLocation {
    RawLocation::Data {
        path: PathBuf::from(path),
        layer: layer.map(str::to_string),
    }
}

fn gdb(layer: &str) -> RawLocation {
    RawLocation::Gdb {
        layer: layer.to_string(),
    }
}

const NHD_GDB: &str =
    "NHDPlus_H_National_Release_2_GDB/NHDPlus_H_National_Release_2.gdb";

/// Built-in raw sources
fn default_raw() -> BTreeMap<String, RawLocation> {
    [
        (
            "state_boundary_raw",
            data("tl_2024_us_state/tl_2024_us_state.shp", None),
        ),
        (
            "land_ownership_raw",
            data("PADUS4_1_State_CO_GDB_KMZ/PADUS4_1_StateCO.gdb", None),
        ),
        ("nhd", data(NHD_GDB, None)),
        ("nhd_flowline", data(NHD_GDB, Some("NHDFlowline"))),
        ("nhd_waterbody", data(NHD_GDB, Some("NHDWaterbody"))),
        (
            "mvum_raw",
            data(
                "Motor_Vehicle_Use_Map%3A_Roads_(Feature_Layer)/Motor_Vehicle_Use_Map%3A_Roads_(Feature_Layer).shp",
                None,
            ),
        ),
        ("mvum_gdb", gdb("MVUM_Roads_CO_Valid")),
        ("water_flow_gdb", gdb("Water_Flow_CO")),
        ("water_area_gdb", gdb("Water_Area_CO")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Built-in interim layers (key doubles as file stem)
const DEFAULT_INTERIM: &[&str] = &[
    "state_boundary_buffered",
    "water_polygon_clean",
    "flowline_clean",
    "mvum_clean",
    "land_ownership_clean",
    "mvum_buffered",
    "water_flowline_buffered",
    "water_polygon_buffered",
    "legality_mask",
];

/// Interim layers also exported for display
const DEFAULT_DISPLAY: &[&str] = &[
    "water_polygon_clean",
    "flowline_clean",
    "mvum_clean",
    "land_ownership_clean",
    "legality_mask",
];

impl LayerRegistry {
    /// Build the registry from defaults plus config-file overrides
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut raw = default_raw();
        for (name, entry) in &config.registry.raw {
            if let Some(location) = location_from_entry(entry) {
                raw.insert(name.clone(), location);
            }
        }

        let mut interim: BTreeMap<String, String> = DEFAULT_INTERIM
            .iter()
            .map(|k| (k.to_string(), k.to_string()))
            .collect();
        interim.extend(
            config
                .registry
                .interim
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let display = config
            .registry
            .display
            .clone()
            .unwrap_or_else(|| DEFAULT_DISPLAY.iter().map(|k| k.to_string()).collect());

        Self {
            raw_root: config.raw_data.clone(),
            gdb: config.gdb.clone(),
            interim_dir: config.interim.clone(),
            processed_dir: config.processed.clone(),
            raw,
            interim,
            display,
        }
    }

    /// Resolve a raw source by name
    pub fn raw_source(&self, name: &str) -> Result<RawSource> {
        match self.raw.get(name) {
            Some(RawLocation::Data { path, layer }) => Ok(RawSource {
                path: self.raw_root.join(path),
                layer: layer.clone(),
            }),
            Some(RawLocation::Gdb { layer }) => {
                let gdb = self.gdb.as_ref().ok_or(Error::MissingConfig { key: "paths.gdb" })?;
                Ok(RawSource {
                    path: gdb.clone(),
                    layer: Some(layer.clone()),
                })
            }
            None => Err(unknown(name)),
        }
    }

    /// Interim file for `name`, with the driver's extension
    pub fn interim_path(&self, name: &str, driver: VectorDriver) -> Result<PathBuf> {
        let stem = self.interim.get(name).ok_or_else(|| unknown(name))?;
        Ok(self
            .interim_dir
            .join(stem)
            .with_extension(driver.extension()))
    }

    /// Display copy of an interim layer: same file name, processed directory
    pub fn display_path(&self, name: &str, driver: VectorDriver) -> Result<PathBuf> {
        let interim = self.interim_path(name, driver)?;
        let file_name = interim.file_name().ok_or_else(|| unknown(name))?;
        Ok(self.processed_dir.join(file_name))
    }

    pub fn is_display(&self, name: &str) -> bool {
        self.display.contains(name)
    }

    pub fn raw_names(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    pub fn interim_names(&self) -> impl Iterator<Item = &str> {
        self.interim.keys().map(String::as_str)
    }

    pub fn interim_dir(&self) -> &Path {
        &self.interim_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }
}

fn location_from_entry(entry: &RawSourceEntry) -> Option<RawLocation> {
    match (&entry.path, &entry.gdb_layer) {
        (Some(path), _) => Some(RawLocation::Data {
            path: path.clone(),
            layer: entry.layer.clone(),
        }),
        (None, Some(layer)) => Some(gdb(layer)),
        (None, None) => None,
    }
}

fn unknown(name: &str) -> Error {
    Error::UnknownLayer {
        name: name.to_string(),
    }
}

//! Pipeline configuration
//!
//! Settings come from three places, later ones winning:
//! 1. built-in defaults (working CRS, buffer distances, directory layout)
//! 2. `legalmap.toml` at the project root, which also marks the root
//! 3. environment variables (optionally from a `.env` file at the root)

use crate::crs::CRS;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker file that identifies the project root
pub const CONFIG_FILE: &str = "legalmap.toml";

pub const ENV_RAW_DATA_PATH: &str = "LEGALMAP_RAW_DATA_PATH";
pub const ENV_INTERIM_PATH: &str = "LEGALMAP_INTERIM_PATH";
pub const ENV_PROCESSED_PATH: &str = "LEGALMAP_PROCESSED_PATH";
pub const ENV_GDB_PATH: &str = "LEGALMAP_GDB_PATH";

/// Working CRS for buffering: NAD83 / UTM zone 13N (Colorado)
pub const DEFAULT_BUFFER_EPSG: u32 = 26913;
/// Display CRS for processed layers
pub const DEFAULT_DISPLAY_EPSG: u32 = 4326;

/// Buffer distances in feet, per feature class
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BufferDistances {
    pub road: f64,
    pub water: f64,
    pub state_boundary: f64,
}

impl Default for BufferDistances {
    fn default() -> Self {
        Self {
            road: 300.0,
            water: 200.0,
            state_boundary: 300.0,
        }
    }
}

/// A raw source declared in the config file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSourceEntry {
    /// Path relative to the raw data directory
    pub path: Option<PathBuf>,
    /// Layer inside the configured geodatabase (`paths.gdb`)
    pub gdb_layer: Option<String>,
    /// Layer inside `path` when it is a multi-layer container
    pub layer: Option<String>,
}

/// Registry additions and overrides from the config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistryOverrides {
    pub raw: BTreeMap<String, RawSourceEntry>,
    /// interim key -> file stem
    pub interim: BTreeMap<String, String>,
    /// Replaces the default display set when present
    pub display: Option<BTreeSet<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathsSection {
    raw_data: Option<PathBuf>,
    interim: Option<PathBuf>,
    processed: Option<PathBuf>,
    output: Option<PathBuf>,
    gdb: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrsSection {
    buffer: Option<CRS>,
    display: Option<CRS>,
}

/// On-disk shape of `legalmap.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    paths: PathsSection,
    crs: CrsSection,
    buffer_ft: BufferDistances,
    driver: Option<String>,
    #[serde(flatten)]
    registry: RegistryOverrides,
}

/// Resolved configuration for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub raw_data: PathBuf,
    pub interim: PathBuf,
    pub processed: PathBuf,
    pub output: PathBuf,
    pub gdb: Option<PathBuf>,
    pub buffer_crs: CRS,
    pub display_crs: CRS,
    pub buffer_ft: BufferDistances,
    /// Output driver name; `None` uses the build default
    pub driver: Option<String>,
    pub registry: RegistryOverrides,
}

impl PipelineConfig {
    /// Find the project root from the working directory and load it
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let root = find_project_root(&cwd, CONFIG_FILE)?;
        Self::load(&root)
    }

    /// Load configuration for a known project root
    pub fn load(root: &Path) -> Result<Self> {
        let env_file = root.join(".env");
        if env_file.exists() {
            dotenv::from_path(&env_file)
                .map_err(|e| Error::Other(format!("{}: {}", env_file.display(), e)))?;
            debug!("Loaded environment from {}", env_file.display());
        }

        let config_path = root.join(CONFIG_FILE);
        let text = if config_path.exists() {
            std::fs::read_to_string(&config_path)?
        } else {
            String::new()
        };

        Self::from_toml(root, &text, |key| std::env::var(key).ok())
    }

    /// Build a configuration from TOML text and an environment lookup
    pub fn from_toml(
        root: &Path,
        text: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };
        let pick = |var: &str, fallback: Option<PathBuf>| {
            env(var)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or(fallback)
                .map(resolve)
        };

        let raw_data = pick(ENV_RAW_DATA_PATH, file.paths.raw_data).ok_or(Error::MissingConfig {
            key: "paths.raw_data",
        })?;
        let interim =
            pick(ENV_INTERIM_PATH, file.paths.interim).unwrap_or_else(|| root.join("data/interim"));
        let processed = pick(ENV_PROCESSED_PATH, file.paths.processed)
            .unwrap_or_else(|| root.join("data/processed"));
        let output = file
            .paths
            .output
            .map(resolve)
            .unwrap_or_else(|| root.join("outputs"));
        let gdb = pick(ENV_GDB_PATH, file.paths.gdb);

        Ok(Self {
            root: root.to_path_buf(),
            raw_data,
            interim,
            processed,
            output,
            gdb,
            buffer_crs: file
                .crs
                .buffer
                .unwrap_or_else(|| CRS::from_epsg(DEFAULT_BUFFER_EPSG)),
            display_crs: file
                .crs
                .display
                .unwrap_or_else(|| CRS::from_epsg(DEFAULT_DISPLAY_EPSG)),
            buffer_ft: file.buffer_ft,
            driver: file.driver,
            registry: file.registry,
        })
    }
}

/// Walk up parent directories until `marker` is found
pub fn find_project_root(start: &Path, marker: &str) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::ProjectRootNotFound {
            marker: marker.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_with_minimal_file() {
        let root = Path::new("/work/legalmap");
        let cfg = PipelineConfig::from_toml(root, "[paths]\nraw_data = \"data/raw\"\n", no_env)
            .unwrap();

        assert_eq!(cfg.raw_data, root.join("data/raw"));
        assert_eq!(cfg.interim, root.join("data/interim"));
        assert_eq!(cfg.processed, root.join("data/processed"));
        assert_eq!(cfg.output, root.join("outputs"));
        assert_eq!(cfg.gdb, None);
        assert_eq!(cfg.buffer_crs, CRS::from_epsg(26913));
        assert_eq!(cfg.display_crs, CRS::from_epsg(4326));
        assert_eq!(cfg.buffer_ft, BufferDistances::default());
    }

    #[test]
    fn test_missing_raw_data_is_an_error() {
        let err = PipelineConfig::from_toml(Path::new("/p"), "", no_env).unwrap_err();
        assert!(matches!(err, Error::MissingConfig { key: "paths.raw_data" }));
    }

    #[test]
    fn test_environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_RAW_DATA_PATH, "/mnt/research/raw"),
            (ENV_GDB_PATH, "gdb/co.gdb"),
            (ENV_INTERIM_PATH, ""),
        ]
        .into_iter()
        .collect();

        let text = r#"
            driver = "gpkg"

            [paths]
            raw_data = "data/raw"
            interim = "scratch"

            [crs]
            buffer = "EPSG:32613"
            display = "EPSG:3857"

            [buffer_ft]
            road = 150
        "#;
        let cfg = PipelineConfig::from_toml(Path::new("/p"), text, |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(cfg.raw_data, PathBuf::from("/mnt/research/raw"));
        assert_eq!(cfg.gdb, Some(PathBuf::from("/p/gdb/co.gdb")));
        // blank variables do not override
        assert_eq!(cfg.interim, PathBuf::from("/p/scratch"));
        assert_eq!(cfg.buffer_crs.epsg(), Some(32613));
        assert_eq!(cfg.display_crs.epsg(), Some(3857));
        assert_eq!(cfg.buffer_ft.road, 150.0);
        assert_eq!(cfg.buffer_ft.water, 200.0);
        assert_eq!(cfg.driver.as_deref(), Some("gpkg"));
    }

    #[test]
    fn test_registry_overrides_parse() {
        let text = r#"
            display = ["mvum_clean"]

            [paths]
            raw_data = "raw"

            [raw.blm_roads]
            path = "BLM/roads.shp"

            [raw.trails]
            gdb_layer = "Trails_CO"

            [interim]
            blm_roads_buffered = "blm_roads_buffered_v2"
        "#;
        let cfg = PipelineConfig::from_toml(Path::new("/p"), text, no_env).unwrap();
        let reg = &cfg.registry;
        assert_eq!(reg.raw["blm_roads"].path, Some(PathBuf::from("BLM/roads.shp")));
        assert_eq!(reg.raw["trails"].gdb_layer.as_deref(), Some("Trails_CO"));
        assert_eq!(reg.interim["blm_roads_buffered"], "blm_roads_buffered_v2");
        assert!(reg.display.as_ref().unwrap().contains("mvum_clean"));
    }

    #[test]
    fn test_invalid_toml_reports_config_error() {
        let err = PipelineConfig::from_toml(Path::new("/p"), "paths = 3", no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let nested = dir.path().join("notebooks/exploration");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_project_root(&nested, CONFIG_FILE).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_find_project_root_fails_without_marker() {
        let dir = tempdir().unwrap();
        let err = find_project_root(dir.path(), "no-such-marker.toml").unwrap_err();
        assert!(matches!(err, Error::ProjectRootNotFound { .. }));
    }

    #[test]
    fn test_load_reads_file_from_root() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[paths]\nraw_data = \"raw\"\n",
        )
        .unwrap();
        let cfg = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.root, dir.path());
    }

    #[test]
    fn test_load_applies_dotenv_over_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[paths]\nraw_data = \"raw\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(".env"),
            format!("{}=shared/raw\n", ENV_RAW_DATA_PATH),
        )
        .unwrap();

        let cfg = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.raw_data, dir.path().join("shared/raw"));
    }

    #[test]
    fn test_load_rejects_malformed_dotenv() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "this line has no equals sign\n").unwrap();
        let err = PipelineConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Other(msg) if msg.contains(".env")));
    }
}

//! Built-in layer preparation tasks

use anyhow::{Context, Result};
use legalmap_algorithms::pipeline::{prepare_layer, PrepareParams, PrepareReport};
use legalmap_algorithms::vector::{BufferParams, CapStyle};
use legalmap_core::config::PipelineConfig;
use legalmap_core::io::{write_layer, ExportPaths, LayerStore};
use std::path::PathBuf;
use tracing::info;

/// Which configured buffer distance a task uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Road,
    Water,
    StateBoundary,
}

impl Distance {
    pub fn feet(self, config: &PipelineConfig) -> f64 {
        match self {
            Distance::Road => config.buffer_ft.road,
            Distance::Water => config.buffer_ft.water,
            Distance::StateBoundary => config.buffer_ft.state_boundary,
        }
    }
}

/// One entry of the task table
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: &'static str,
    pub description: &'static str,
    /// Raw registry key
    pub source: &'static str,
    /// Keep only features whose column equals the value
    pub filter: Option<(&'static str, &'static str)>,
    pub buffer: Option<(Distance, CapStyle)>,
    pub dissolve: bool,
    /// Interim registry key
    pub output: &'static str,
    /// Folder under the output directory that also receives the result
    pub copy: Option<&'static str>,
}

pub const TASKS: &[Task] = &[
    Task {
        name: "state-boundary",
        description: "Colorado boundary, buffered",
        source: "state_boundary_raw",
        filter: Some(("STUSPS", "CO")),
        buffer: Some((Distance::StateBoundary, CapStyle::Round)),
        dissolve: true,
        output: "state_boundary_buffered",
        copy: None,
    },
    Task {
        name: "mvum-clean",
        description: "Motor vehicle use map roads, cleaned",
        source: "mvum_raw",
        filter: None,
        buffer: None,
        dissolve: false,
        output: "mvum_clean",
        copy: None,
    },
    Task {
        name: "mvum-roads",
        description: "Valid MVUM roads from the geodatabase, buffered",
        source: "mvum_gdb",
        filter: None,
        buffer: Some((Distance::Road, CapStyle::Round)),
        dissolve: false,
        output: "mvum_buffered",
        copy: Some("mvum_roads_buffered"),
    },
    Task {
        name: "flowline-clean",
        description: "NHD flowlines, cleaned",
        source: "nhd_flowline",
        filter: None,
        buffer: None,
        dissolve: false,
        output: "flowline_clean",
        copy: None,
    },
    Task {
        name: "water-flowlines",
        description: "Colorado flowlines from the geodatabase, buffered",
        source: "water_flow_gdb",
        filter: None,
        buffer: Some((Distance::Water, CapStyle::Round)),
        dissolve: false,
        output: "water_flowline_buffered",
        copy: Some("water_flowlines_buffered"),
    },
    Task {
        name: "water-polygon-clean",
        description: "NHD waterbodies, cleaned",
        source: "nhd_waterbody",
        filter: None,
        buffer: None,
        dissolve: false,
        output: "water_polygon_clean",
        copy: None,
    },
    Task {
        name: "water-areas",
        description: "Colorado water areas from the geodatabase, buffered",
        source: "water_area_gdb",
        filter: None,
        buffer: Some((Distance::Water, CapStyle::Round)),
        dissolve: false,
        output: "water_polygon_buffered",
        copy: Some("water_areas_buffered"),
    },
    Task {
        name: "land-ownership-clean",
        description: "PAD-US land ownership, cleaned",
        source: "land_ownership_raw",
        filter: None,
        buffer: None,
        dissolve: false,
        output: "land_ownership_clean",
        copy: None,
    },
];

pub fn find(name: &str) -> Option<&'static Task> {
    TASKS.iter().find(|t| t.name == name)
}

/// Files written by one task
#[derive(Debug)]
pub struct TaskOutcome {
    pub report: PrepareReport,
    pub export: ExportPaths,
    /// Copy under the output directory, for tasks with a copy folder
    pub output: Option<PathBuf>,
}

impl Task {
    pub fn params(&self, config: &PipelineConfig) -> PrepareParams {
        let mut params = PrepareParams::in_crs(config.buffer_crs.clone()).dissolved(self.dissolve);
        if let Some((distance, cap)) = self.buffer {
            params = params.with_buffer(BufferParams::from_feet(distance.feet(config), cap));
        }
        params
    }

    pub fn run(&self, store: &LayerStore) -> Result<TaskOutcome> {
        let mut fc = store
            .read_raw(self.source)
            .with_context(|| format!("Failed to read raw layer {}", self.source))?;
        info!("{}: read {} features from {}", self.name, fc.len(), self.source);

        if let Some((column, value)) = self.filter {
            fc = fc.filter_eq(column, value);
            info!("{}: {} features where {} = {}", self.name, fc.len(), column, value);
        }

        let (fc, report) = prepare_layer(fc, &self.params(store.config()))
            .with_context(|| format!("Failed to prepare {}", self.name))?;

        let export = store
            .export_interim(&fc, self.output)
            .with_context(|| format!("Failed to export {}", self.output))?;

        let output = match self.copy {
            Some(folder) => {
                let path = store
                    .config()
                    .output
                    .join(folder)
                    .join(folder)
                    .with_extension(store.driver().extension());
                write_layer(&fc, &path, store.driver())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Saved buffered layer to: {}", path.display());
                Some(path)
            }
            None => None,
        };

        Ok(TaskOutcome {
            report,
            export,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalmap_core::registry::LayerRegistry;
    use legalmap_core::VectorDriver;
    use std::collections::HashSet;
    use std::path::Path;

    fn config() -> PipelineConfig {
        PipelineConfig::from_toml(
            Path::new("/proj"),
            "[paths]\nraw_data = \"raw\"\ngdb = \"co.gdb\"\n",
            |_| None,
        )
        .unwrap()
    }

    #[test]
    fn test_task_names_unique() {
        let names: HashSet<_> = TASKS.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), TASKS.len());
    }

    #[test]
    fn test_tasks_reference_registered_layers() {
        let cfg = config();
        let registry = LayerRegistry::from_config(&cfg);
        for task in TASKS {
            assert!(registry.raw_source(task.source).is_ok(), "{}", task.source);
            assert!(
                registry.interim_path(task.output, VectorDriver::GeoJson).is_ok(),
                "{}",
                task.output
            );
        }
    }

    #[test]
    fn test_copy_folders_match_buffer_tasks() {
        assert_eq!(find("mvum-roads").unwrap().copy, Some("mvum_roads_buffered"));
        assert_eq!(find("water-flowlines").unwrap().copy, Some("water_flowlines_buffered"));
        assert_eq!(find("water-areas").unwrap().copy, Some("water_areas_buffered"));
        assert!(TASKS.iter().filter(|t| t.copy.is_some()).all(|t| t.buffer.is_some()));
    }

    const RAW_ROADS: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26913" } },
        "features": [
            {
                "type": "Feature",
                "properties": { "STATE": "CO", "NAME": "FR 100" },
                "geometry": { "type": "LineString", "coordinates": [[412000, 4380000], [413000, 4380000]] }
            },
            {
                "type": "Feature",
                "properties": { "STATE": "UT", "NAME": "FR 200" },
                "geometry": { "type": "LineString", "coordinates": [[412000, 4390000], [413000, 4390000]] }
            },
            {
                "type": "Feature",
                "properties": { "STATE": "CO", "NAME": "ghost" },
                "geometry": null
            }
        ]
    }"#;

    fn project(root: &Path) -> LayerStore {
        std::fs::create_dir_all(root.join("raw")).unwrap();
        std::fs::write(root.join("raw/roads.geojson"), RAW_ROADS).unwrap();
        let text = r#"
            driver = "geojson"
            display = ["roads_buffered"]

            [paths]
            raw_data = "raw"

            [raw.roads]
            path = "roads.geojson"

            [interim]
            roads_buffered = "roads_buffered"
            roads_clean = "roads_clean"
        "#;
        LayerStore::new(PipelineConfig::from_toml(root, text, |_| None).unwrap()).unwrap()
    }

    #[test]
    fn test_buffered_task_writes_interim_display_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = project(dir.path());
        let task = Task {
            name: "roads",
            description: "Colorado roads, buffered",
            source: "roads",
            filter: Some(("STATE", "CO")),
            buffer: Some((Distance::Road, CapStyle::Round)),
            dissolve: false,
            output: "roads_buffered",
            copy: Some("roads_buffered"),
        };

        let outcome = task.run(&store).unwrap();
        assert_eq!(outcome.report.input, 2);
        assert_eq!(outcome.report.clean.missing, 1);
        assert_eq!(outcome.report.output, 1);

        let interim = dir.path().join("data/interim/roads_buffered.geojson");
        let display = dir.path().join("data/processed/roads_buffered.geojson");
        let copy = dir.path().join("outputs/roads_buffered/roads_buffered.geojson");
        assert_eq!(outcome.export.interim, interim);
        assert_eq!(outcome.export.display, Some(display.clone()));
        assert_eq!(outcome.output, Some(copy.clone()));
        assert!(interim.exists() && display.exists() && copy.exists());

        let buffered = store.read_interim("roads_buffered").unwrap();
        assert_eq!(buffered.len(), 1);
        assert_eq!(
            buffered.features[0].get_property("NAME").and_then(|v| v.as_str()),
            Some("FR 100")
        );
        assert_eq!(buffered.features[0].geometry_type(), Some("MultiPolygon"));

        let shown = legalmap_core::io::read_layer(&display, None).unwrap();
        assert_eq!(shown.crs, Some(legalmap_core::CRS::wgs84()));
    }

    #[test]
    fn test_clean_task_writes_no_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = project(dir.path());
        let task = Task {
            name: "roads-clean",
            description: "Roads, cleaned",
            source: "roads",
            filter: None,
            buffer: None,
            dissolve: false,
            output: "roads_clean",
            copy: None,
        };

        let outcome = task.run(&store).unwrap();
        assert_eq!(outcome.report.output, 2);
        assert_eq!(outcome.export.display, None);
        assert_eq!(outcome.output, None);
        assert!(!dir.path().join("outputs").exists());
    }

    #[test]
    fn test_buffer_params_follow_config() {
        let cfg = config();
        let roads = find("mvum-roads").unwrap().params(&cfg);
        let buffer = roads.buffer.unwrap();
        assert!((buffer.distance - 91.44).abs() < 1e-9);
        assert_eq!(buffer.cap_style, CapStyle::Round);
        assert_eq!(roads.target_crs, Some(cfg.buffer_crs.clone()));

        let water = find("water-areas").unwrap().params(&cfg);
        assert!((water.buffer.unwrap().distance - 60.96).abs() < 1e-9);

        let state = find("state-boundary").unwrap().params(&cfg);
        assert!(state.dissolve);

        assert!(find("mvum-clean").unwrap().params(&cfg).buffer.is_none());
        assert!(find("nope").is_none());
    }
}

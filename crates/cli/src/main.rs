//! legalmap CLI - prepare layers for the recreation legality map

mod tasks;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use legalmap_algorithms::legality::{merge_legality_layers, tag_legality, LegalityTag, DATE_FORMAT};
use legalmap_algorithms::pipeline::{prepare_layer, PrepareParams};
use legalmap_algorithms::vector::{BufferParams, CapStyle};
use legalmap_core::config::{PipelineConfig, DEFAULT_BUFFER_EPSG};
use legalmap_core::io::{list_layers, read_layer, write_layer, LayerStore, VectorDriver};
use legalmap_core::vector::FeatureCollection;
use legalmap_core::CRS;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "legalmap")]
#[command(author, version, about = "Prepare GIS layers for the recreation legality map", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root (directory holding legalmap.toml); discovered by default
    #[arg(long, global = true, env = "LEGALMAP_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run built-in preparation tasks
    Run {
        /// Task names (see `legalmap tasks`)
        tasks: Vec<String>,
        /// Run every task in table order
        #[arg(long, conflicts_with = "tasks")]
        all: bool,
    },
    /// List built-in tasks
    Tasks,
    /// List registered raw, interim and display layers
    Layers,
    /// Show layers, CRS, columns and the first rows of a dataset
    Inspect {
        /// Dataset path
        path: PathBuf,
        /// Layer inside a multi-layer dataset
        #[arg(short, long)]
        layer: Option<String>,
        /// Number of rows to print
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,
    },
    /// Buffer any vector file
    Buffer {
        /// Input dataset
        input: PathBuf,
        /// Output file (format from extension)
        output: PathBuf,
        /// Buffer distance in feet
        #[arg(short, long)]
        distance_ft: f64,
        /// End cap style: round, flat, square
        #[arg(short, long, default_value = "round")]
        cap: String,
        /// Working CRS for buffering (defaults to the configured buffer CRS)
        #[arg(long)]
        crs: Option<String>,
        /// Layer inside a multi-layer dataset
        #[arg(short, long)]
        layer: Option<String>,
        /// Merge all buffers into one feature
        #[arg(long)]
        dissolve: bool,
    },
    /// Legality schema operations
    Legality {
        #[command(subcommand)]
        command: LegalityCommands,
    },
}

#[derive(Subcommand)]
enum LegalityCommands {
    /// Tag an interim layer with legality metadata
    Tag {
        /// Interim layer name
        interim: String,
        /// illegal, maybe legal or legal
        #[arg(long)]
        legality: String,
        /// Why the area has this status
        #[arg(long)]
        reasoning: String,
        /// Owning jurisdiction (USFS, BLM, ...)
        #[arg(long)]
        owner: String,
        /// Override the last_updated date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Interim name for the tagged layer
        #[arg(short, long)]
        output: String,
    },
    /// Merge tagged interim layers into one
    Merge {
        /// Interim layer names
        #[arg(required = true)]
        names: Vec<String>,
        /// Interim name for the merged layer
        #[arg(short, long, default_value = "legality_mask")]
        output: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {}", e))
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(root: Option<&Path>) -> Result<PipelineConfig> {
    match root {
        Some(root) => PipelineConfig::load(root)
            .with_context(|| format!("Failed to load configuration from {}", root.display())),
        None => PipelineConfig::discover().context("Failed to locate project configuration"),
    }
}

fn load_store(root: Option<&Path>) -> Result<LayerStore> {
    let config = load_config(root)?;
    info!("Project root: {}", config.root.display());
    LayerStore::new(config).context("Invalid output driver")
}

/// Working CRS: explicit value, else the project's, else the default
fn working_crs(explicit: Option<&str>, root: Option<&Path>) -> Result<CRS> {
    if let Some(text) = explicit {
        return text
            .parse()
            .with_context(|| format!("Invalid CRS: {}", text));
    }
    match load_config(root) {
        Ok(config) => Ok(config.buffer_crs),
        Err(e) => {
            warn!("{:#}; using EPSG:{}", e, DEFAULT_BUFFER_EPSG);
            Ok(CRS::from_epsg(DEFAULT_BUFFER_EPSG))
        }
    }
}

fn read_input(path: &Path, layer: Option<&str>) -> Result<FeatureCollection> {
    let pb = spinner("Reading layer...");
    let fc = read_layer(path, layer)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} features", fc.len());
    Ok(fc)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_export(name: &str, export: &legalmap_core::io::ExportPaths) {
    println!("{} saved to: {}", name, export.interim.display());
    if let Some(display) = &export.display {
        println!("  Display copy: {}", display.display());
    }
}

fn parse_cap(cap: &str) -> Result<CapStyle> {
    cap.parse::<CapStyle>()
        .with_context(|| format!("Unknown cap style: {}", cap))
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run_tasks(root: Option<&Path>, names: &[String], all: bool) -> Result<()> {
    let selected: Vec<&tasks::Task> = if all {
        tasks::TASKS.iter().collect()
    } else {
        if names.is_empty() {
            bail!("No tasks given; pass task names or --all (see `legalmap tasks`)");
        }
        names
            .iter()
            .map(|name| {
                tasks::find(name).with_context(|| {
                    format!("Unknown task: {} (see `legalmap tasks`)", name)
                })
            })
            .collect::<Result<_>>()?
    };

    let store = load_store(root)?;
    for task in selected {
        println!("Running {}: {}", task.name, task.description);
        let pb = spinner(task.name);
        let start = Instant::now();
        let outcome = task.run(&store);
        pb.finish_and_clear();
        let outcome = outcome?;
        let elapsed = start.elapsed();

        println!(
            "  {} -> {} features ({} dropped while cleaning)",
            outcome.report.input,
            outcome.report.output,
            outcome.report.clean.dropped()
        );
        print_export(task.output, &outcome.export);
        if let Some(path) = &outcome.output {
            println!("  Output copy: {}", path.display());
        }
        println!("  Processing time: {:.2?}", elapsed);
    }
    Ok(())
}

fn list_tasks() {
    println!("{:<22} {:<20} {:<26} description", "task", "source", "output");
    for task in tasks::TASKS {
        println!(
            "{:<22} {:<20} {:<26} {}",
            task.name, task.source, task.output, task.description
        );
    }
}

fn list_registry(root: Option<&Path>) -> Result<()> {
    let store = load_store(root)?;
    let registry = store.registry();

    println!("Raw layers:");
    for name in registry.raw_names() {
        match registry.raw_source(name) {
            Ok(src) => match &src.layer {
                Some(layer) => println!("  {:<22} {} [{}]", name, src.path.display(), layer),
                None => println!("  {:<22} {}", name, src.path.display()),
            },
            Err(e) => println!("  {:<22} ({})", name, e),
        }
    }

    println!("\nInterim layers ({}):", store.driver());
    for name in registry.interim_names() {
        let path = registry.interim_path(name, store.driver())?;
        let marker = if registry.is_display(name) { " *" } else { "" };
        println!("  {:<26} {}{}", name, path.display(), marker);
    }
    println!("\n* also exported to {}", registry.processed_dir().display());
    Ok(())
}

fn inspect(root: Option<&Path>, path: &Path, layer: Option<&str>, rows: usize) -> Result<()> {
    println!("File: {}", path.display());
    match list_layers(path) {
        Ok(layers) => println!("Available layers: {}", layers.join(", ")),
        Err(e) => warn!("Could not list layers: {}", e),
    }

    let fc = read_input(path, layer)?;
    match &fc.crs {
        Some(crs) => println!("CRS: {}", crs),
        None => println!("CRS: none"),
    }
    println!("Features: {}", fc.len());
    println!("Columns: {}", fc.columns().join(", "));

    let fc = match &fc.crs {
        Some(_) => {
            let target = working_crs(None, root)?;
            match fc.clone().to_crs(&target) {
                Ok(projected) => {
                    println!("Rows below reprojected to {}", target);
                    projected
                }
                Err(e) => {
                    warn!("Not reprojecting: {}", e);
                    fc
                }
            }
        }
        None => fc,
    };

    for (i, feature) in fc.iter().take(rows).enumerate() {
        let attrs: Vec<String> = feature
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!(
            "  [{}] {:<16} {}",
            i,
            feature.geometry_type().unwrap_or("None"),
            attrs.join(", ")
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn buffer_file(
    root: Option<&Path>,
    input: &Path,
    output: &Path,
    distance_ft: f64,
    cap: &str,
    crs: Option<&str>,
    layer: Option<&str>,
    dissolve: bool,
) -> Result<()> {
    let cap = parse_cap(cap)?;
    let crs = working_crs(crs, root)?;
    let driver = VectorDriver::from_path(output).context("Unsupported output format")?;

    let fc = read_input(input, layer)?;
    let start = Instant::now();
    let params = PrepareParams::in_crs(crs)
        .with_buffer(BufferParams::from_feet(distance_ft, cap))
        .dissolved(dissolve);
    let (buffered, report) = prepare_layer(fc, &params).context("Failed to buffer layer")?;
    let elapsed = start.elapsed();
    info!(
        "{} -> {} features ({} dropped while cleaning)",
        report.input,
        report.output,
        report.clean.dropped()
    );

    let pb = spinner("Writing output...");
    write_layer(&buffered, output, driver).context("Failed to write output")?;
    pb.finish_and_clear();
    done("Buffer", output, elapsed);
    Ok(())
}

fn legality(root: Option<&Path>, command: LegalityCommands) -> Result<()> {
    let store = load_store(root)?;
    match command {
        LegalityCommands::Tag {
            interim,
            legality,
            reasoning,
            owner,
            date,
            output,
        } => {
            let mut tag = LegalityTag::new(
                legality.parse().context("Invalid legality")?,
                reasoning,
                owner,
            );
            if let Some(date) = date {
                let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                    .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", date))?;
                tag = tag.updated_on(date);
            }

            let fc = store
                .read_interim(&interim)
                .with_context(|| format!("Failed to read interim layer {}", interim))?;
            let tagged = tag_legality(&fc, &tag);
            let export = store
                .export_interim(&tagged, &output)
                .with_context(|| format!("Failed to export {}", output))?;
            print_export(&output, &export);
        }
        LegalityCommands::Merge { names, output } => {
            let layers = names
                .iter()
                .map(|name| {
                    store
                        .read_interim(name)
                        .with_context(|| format!("Failed to read interim layer {}", name))
                })
                .collect::<Result<Vec<_>>>()?;
            let merged = merge_legality_layers(layers).context("Failed to merge layers")?;
            info!("Merged {} layers into {} features", names.len(), merged.len());
            let export = store
                .export_interim(&merged, &output)
                .with_context(|| format!("Failed to export {}", output))?;
            print_export(&output, &export);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let root = cli.root.as_deref();

    match cli.command {
        Commands::Run { tasks, all } => run_tasks(root, &tasks, all)?,
        Commands::Tasks => list_tasks(),
        Commands::Layers => list_registry(root)?,
        Commands::Inspect { path, layer, rows } => inspect(root, &path, layer.as_deref(), rows)?,
        Commands::Buffer {
            input,
            output,
            distance_ft,
            cap,
            crs,
            layer,
            dissolve,
        } => buffer_file(
            root,
            &input,
            &output,
            distance_ft,
            &cap,
            crs.as_deref(),
            layer.as_deref(),
            dissolve,
        )?,
        Commands::Legality { command } => legality(root, command)?,
    }

    Ok(())
}

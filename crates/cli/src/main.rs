//! lakeparam CLI - lake and wetland profiles for a hydrology model grid cell

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use lakeparam_algorithms::pipeline::{PipelineConfig, PipelineRun};
use lakeparam_algorithms::profile::OutputSchema;
use lakeparam_core::io::{read_ascii_grid, write_ascii_grid, GridHeader};
use lakeparam_core::Error;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lakeparam")]
#[command(author, version, about = "Lake and wetland elevation profiles from a DEM", long_about = None)]
struct Cli {
    /// Input DEM (Arc/Info ASCII grid)
    dem: PathBuf,

    /// Grid cell number, echoed in the profile header
    grid_id: String,

    /// Output schema: SEA or LAKE
    schema: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Pipeline parameters as JSON; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write the filled DEM, flow and wetness index grids to
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")
}

fn spinner(msg: &str, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn dump_grids(run: &PipelineRun, header: &GridHeader, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let id = run.grid_id();
    let grids = [
        ("filled", run.filled()),
        ("flow", run.flow()),
        ("twi", run.wetness().map(|w| &w.wetness_index)),
    ];
    for (name, raster) in grids {
        let Some(raster) = raster else { continue };
        let path = dir.join(format!("{id}_{name}.asc"));
        write_ascii_grid(raster, header, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("{} saved to: {}", name, path.display());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

/// Compute one profile and write it to `out`.
///
/// An unrecognized schema and a grid without enough valid cells are logged
/// and end the run successfully with nothing written.
fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    // Checked before anything is read
    let schema: OutputSchema = match cli.schema.parse() {
        Ok(schema) => schema,
        Err(e) => {
            error!("{e}; use SEA or LAKE");
            return Ok(());
        }
    };
    let config = load_config(cli.config.as_deref())?;

    let start = Instant::now();
    let pb = spinner("Reading grid...", cli.verbose)?;
    let grid = read_ascii_grid(&cli.dem)
        .with_context(|| format!("Failed to read {}", cli.dem.display()))?;
    info!("Input: {} x {}", grid.header.ncols, grid.header.nrows);
    let stats = grid.raster.statistics();
    let geometry = grid.raster.geometry();
    debug!(
        valid_cells = stats.valid_count,
        nodata_cells = stats.nodata_count,
        min = ?stats.min,
        max = ?stats.max,
        dx = geometry.dx,
        dy = geometry.dy,
        "elevation grid"
    );

    let mut run = match PipelineRun::new(cli.grid_id.as_str(), grid.raster, config) {
        Ok(run) => run,
        Err(e @ Error::NoValidData { .. }) => {
            pb.finish_and_clear();
            warn!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to prepare the pipeline"),
    };

    pb.set_message("Computing profile...");
    let profile = run.execute(schema).context("Profile computation failed")?;
    pb.finish_and_clear();

    if let Some(report) = run.fill_report() {
        debug!(
            raised_cells = report.raised_cells,
            total_raises = report.total_raises,
            hit_cap = report.hit_cap,
            "fill report"
        );
    }

    if let Some(dir) = &cli.dump_dir {
        dump_grids(&run, &grid.header, dir)?;
    }

    write!(out, "{profile}")?;
    out.flush()?;

    debug!("Processing time: {:.2?}", start.elapsed());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    run(&cli, &mut std::io::stdout().lock())
}

//! Tileflow CLI - command-line interface
//!
//! This binary provides a command-line interface to the tileflow library.
//!
//! # Architecture
//!
//! - `Cli` / `Commands`: argument parsing (clap)
//! - `CliRunner`: common setup (config loading, logging)
//! - `CliError`: centralized error handling
//!
//! # Configuration
//!
//! Settings are loaded from `~/.tileflow/config.ini` on startup; `--config`
//! overrides the location.

mod error;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use error::CliError;
use runner::CliRunner;
use tileflow::broker::MemoryBroker;
use tileflow::clock::SystemClock;
use tileflow::control::RecordingControlPlane;
use tileflow::inventory::{classify_root, load_inventory};
use tileflow::model::Project;
use tileflow::service::TileflowService;
use tileflow::sink::MemoryMetricsSink;
use tileflow::store::MemoryStorage;

#[derive(Parser)]
#[command(name = "tileflow")]
#[command(version = tileflow::VERSION)]
#[command(about = "Scheduling core for tiled-microscopy image processing", long_about = None)]
struct Cli {
    /// Config file location (default: ~/.tileflow/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug-level logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration file at ~/.tileflow/config.ini
    Init,

    /// Classify and parse one project root, printing a summary
    Scan {
        /// Project root directory (remote-style; path mapping applies)
        root: String,
    },

    /// Run ingest loops for the given project roots (local mode)
    Run {
        /// Project root directories; one ingestor is started per root
        #[arg(long = "root", required = true)]
        roots: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => run_init(),
        Commands::Scan { root } => run_scan(&cli.config, cli.debug, &root),
        Commands::Run { roots } => run_service(&cli.config, cli.debug, roots),
    };

    if let Err(error) = result {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

fn run_init() -> Result<(), CliError> {
    let path = tileflow::config::ensure_exists()?;
    println!("config ready at {}", path.display());
    Ok(())
}

fn run_scan(config: &Option<PathBuf>, debug: bool, root: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), debug)?;
    let path_map = runner.settings().path_map();

    let local_root = PathBuf::from(path_map.map(root));
    let classification = classify_root(&local_root);
    println!("root:  {}", local_root.display());
    println!("state: {}", classification.state);

    if let Some(source) = classification.source {
        let document = load_inventory(&source).map_err(|e| CliError::Scan(e.to_string()))?;
        if let Some(extent) = document.extents() {
            println!(
                "extent: x [{}, {}]  y [{}, {}]  z [{}, {}]",
                extent.min_x, extent.max_x, extent.min_y, extent.max_y, extent.min_z, extent.max_z
            );
        }
        let tiles = document.into_tiles();
        let complete = tiles
            .iter()
            .filter(|t| t.this_stage_status == tileflow::model::StageStatus::Complete)
            .count();
        println!("tiles: {} ({} complete)", tiles.len(), complete);
    }
    Ok(())
}

fn run_service(config: &Option<PathBuf>, debug: bool, roots: Vec<String>) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), debug)?;
    runner.log_startup("run");

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    runtime.block_on(async move {
        // Local mode: in-memory collaborators stand in for the deployment's
        // database, control plane, metrics store, and broker.
        let mut service = TileflowService::new(
            runner.settings().clone(),
            Arc::new(MemoryStorage::new()),
            Arc::new(RecordingControlPlane::new()),
            Arc::new(MemoryMetricsSink::new()),
            Arc::new(MemoryBroker::new()),
            Arc::new(SystemClock),
        );

        for (index, root) in roots.iter().enumerate() {
            let id = format!("local-{}", index);
            let name = PathBuf::from(root)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| root.clone());
            service.add_project(Project::new(id.as_str(), name, root.as_str()));
        }
        info!(projects = service.project_count(), "local ingest running; ctrl-c to stop");

        let _ = tokio::signal::ctrl_c().await;
        service.shutdown().await;
        Ok(())
    })
}

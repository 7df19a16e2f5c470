mod app;
mod input;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use shoal::{config, Config, Density, Repulsion};
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shoal", version, about = "Fish drifting across your terminal")]
struct Cli {
    /// Config file (JSON). Defaults to the per-user config location.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Make fish shy away from the mouse pointer
    #[arg(long)]
    repel: bool,

    /// low, normal, high, or a maximum fish count
    #[arg(short, long)]
    density: Option<Density>,

    /// Fish opacity, 0.0 to 1.0
    #[arg(long)]
    opacity: Option<f32>,

    /// Frame rate cap
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Where to write the log (the terminal itself is busy drawing fish)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = config::project_paths();

    let log_path = cli
        .log_file
        .clone()
        .or_else(|| paths.as_ref().map(|p| p.log_path.clone()));
    if let Some(path) = &log_path {
        init_logging(path, cli.verbose)?;
    }

    let config_path = cli
        .config
        .clone()
        .or_else(|| paths.as_ref().map(|p| p.config_path.clone()));
    let mut cfg = match config_path {
        Some(path) => config::load_config(&path).unwrap_or_else(|e| {
            warn!("{e}; using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    if cli.repel && cfg.repulsion.is_none() {
        cfg.repulsion = Some(Repulsion::default());
    }
    if let Some(o) = cli.opacity {
        cfg.opacity = o;
    }

    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ 0xA11CE_u64
    });

    app::run(app::Options {
        config: cfg.normalized(),
        seed,
        density: cli.density,
        fps: cli.fps,
    })
}

fn init_logging(path: &Path, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

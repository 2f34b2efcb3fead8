use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ptm_subset::{run_subset, SubsetConfig};

/// Build a small, consistent test dataset from a full phospho/protein DEA run.
#[derive(Parser, Debug)]
#[command(name = "ptm-subset", version, about)]
struct Cli {
    /// JSON configuration describing the source and output trees
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the target number of complete-coverage phosphosites
    #[arg(long)]
    n_phospho: Option<usize>,

    /// Override the output directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to Info.",
                cli.log_level
            );
            log::LevelFilter::Info
        });
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut cfg = SubsetConfig::from_json(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if let Some(n) = cli.n_phospho {
        cfg.n_phospho = n;
    }
    if let Some(out) = cli.out_dir {
        cfg.out_dir = out;
    }
    info!(
        "seed={} n_phospho={} contrasts={:?}",
        cfg.seed, cfg.n_phospho, cfg.keep_contrasts
    );

    let report = run_subset(&cfg).context("subsetting run failed")?;
    info!(
        "Kept {} sites and {} proteins ({} files written)",
        report.sites.sites.len(),
        report.proteins.proteins.len(),
        report.files.len()
    );
    Ok(())
}

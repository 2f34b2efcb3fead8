use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ptm_subset::synthetic::{write_source_tree, SyntheticParams};
use ptm_subset::SubsetConfig;

/// Write a synthetic source tree laid out as described by a subset config.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", about)]
struct Args {
    /// Config whose `src_dir` and dataset layouts decide where files go
    #[arg(short, long)]
    config: PathBuf,

    #[arg(long, default_value_t = 7)]
    seed: u64,

    #[arg(long, default_value_t = 2000)]
    sites: usize,

    #[arg(long, default_value_t = 400)]
    proteins: usize,

    /// Contrasts present in the generated data (defaults to the kept ones
    /// plus one extra contrast that the subset will drop)
    #[arg(long, value_delimiter = ',')]
    contrasts: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = SubsetConfig::from_json(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let contrasts = if args.contrasts.is_empty() {
        let mut c = cfg.keep_contrasts.clone();
        c.push("Dropped_vs_Ref".to_string());
        c
    } else {
        args.contrasts
    };
    let params = SyntheticParams {
        seed: args.seed,
        n_sites: args.sites,
        n_proteins: args.proteins,
        contrasts,
        ..SyntheticParams::default()
    };

    write_source_tree(&cfg, &params).context("writing synthetic source tree")?;
    println!(
        "Wrote {} sites / {} proteins to {}",
        params.n_sites,
        params.n_proteins,
        cfg.src_dir.display()
    );
    Ok(())
}

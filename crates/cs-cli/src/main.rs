//! CutScan CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cs_core::{Coordinate, LocalStorage};
use cs_hist::SparseHist;
use cs_sweep::engine::{ArtifactSink, CellCallback, CellOutcome, SweepEngine};
use cs_sweep::result::ResultTensor;
use cs_sweep::{OutputLayout, SweepConfig, WriteOptions};

#[derive(Parser)]
#[command(name = "cutscan")]
#[command(about = "CutScan - cut-sweep engine for sparse binned analyses")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a sweep configuration
    Validate {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run the full cut sweep with the built-in integral callback
    Sweep {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Input histogram files (JSON); repeat for several inputs
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,
    },

    /// Merge every per-cell output file into one aggregate file
    Merge {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Re-shard a combined tensor into per-cell files
    Distribute {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Combined tensor file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Projection axis indices, comma separated (e.g. 1,2)
        #[arg(long, value_delimiter = ',', required = true)]
        axes: Vec<usize>,

        /// Project each slice onto the orthogonal axes
        #[arg(long)]
        use_projection: bool,

        /// Worker chunks for the parallel walk (1 = sequential)
        #[arg(long, default_value = "1")]
        threads: usize,
    },

    /// Change the rebin grouping of one cut axis
    SetBinning {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Cut axis to re-bin
        #[arg(long)]
        axis: String,

        /// Base bins per grouped bin
        #[arg(long)]
        rebin: u32,

        /// Base-bin anchor of the first group
        #[arg(long, default_value = "1")]
        rebin_start: u32,

        /// Write the updated configuration back to the file
        #[arg(long)]
        write: bool,
    },
}

/// Built-in cell callback: reports the integral of the first restricted
/// input as the `Integral` parameter and keeps the scalar as an artifact.
struct IntegralCallback {
    opts: WriteOptions,
}

#[derive(serde::Serialize)]
struct IntegralArtifact {
    value: f64,
    error: f64,
}

impl CellCallback for IntegralCallback {
    fn process_cell(
        &mut self,
        coord: &Coordinate,
        inputs: &[SparseHist],
        result: &mut ResultTensor,
        artifacts: &mut ArtifactSink,
    ) -> CellOutcome {
        let (value, error) = inputs[0].integral();
        if value == 0.0 {
            return CellOutcome::SkippedLowData;
        }
        // Rejections are recoverable: the metric is logged and omitted.
        let _ = result.write("Integral", coord, value, error, &self.opts);
        match serde_json::to_vec_pretty(&IntegralArtifact { value, error }) {
            Ok(bytes) => artifacts.push("integral.json", bytes),
            Err(_) => return CellOutcome::Fatal,
        }
        CellOutcome::Accepted
    }
}

fn load_config(path: &PathBuf) -> Result<SweepConfig> {
    SweepConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Validate { config } => {
            let cfg = load_config(&config)?;
            let layout = OutputLayout::from_config(&cfg);
            println!("config ok: {} cuts ({} enabled), {} result axes, {} parameters",
                cfg.cuts.len(),
                cfg.enabled_cuts().count(),
                cfg.result.axes.len(),
                cfg.result.parameters.labels.len());
            println!("output base: {}", layout.base_path().display());
        }

        Commands::Sweep { config, input } => {
            let cfg = load_config(&config)?;
            let mut inputs = Vec::new();
            for path in &input {
                let hist = cs_hist::io::read_hist(path)
                    .with_context(|| format!("reading input {}", path.display()))?;
                inputs.push(hist);
            }
            let storage = LocalStorage;
            let mut engine = SweepEngine::new(&cfg, &storage);
            let mut callback = IntegralCallback { opts: cfg.result.write };
            let report = engine.run(&mut inputs, &mut callback)?;
            println!(
                "sweep done: {} cells visited, {} accepted, {} skipped, {} writes rejected, {} files",
                report.cells_visited,
                report.cells_accepted,
                report.cells_skipped,
                report.writes_rejected,
                report.files_written
            );
        }

        Commands::Merge { config } => {
            let cfg = load_config(&config)?;
            let layout = OutputLayout::from_config(&cfg);
            let merged = cs_sweep::merge(&LocalStorage, &layout)?;
            println!("merged into {}", merged.display());
        }

        Commands::Distribute { config, input, axes, use_projection, threads } => {
            let cfg = load_config(&config)?;
            let layout = OutputLayout::from_config(&cfg);
            let combined = cs_hist::io::read_hist(&input)
                .with_context(|| format!("reading combined tensor {}", input.display()))?;
            let report = cs_sweep::distribute(
                &combined,
                &axes,
                use_projection,
                &layout,
                &LocalStorage,
                threads,
            )?;
            println!(
                "distributed {} cells, manifest at {}",
                report.cells_written,
                report.manifest_path.display()
            );
        }

        Commands::SetBinning { config, axis, rebin, rebin_start, write } => {
            let mut cfg = load_config(&config)?;
            cfg.set_binning(&axis, rebin, rebin_start)?;
            if write {
                let bytes = serde_json::to_vec_pretty(&cfg)?;
                std::fs::write(&config, bytes)
                    .with_context(|| format!("writing config {}", config.display()))?;
                println!("updated {}", config.display());
            } else {
                println!("binning ok: {axis} rebin={rebin} rebin_start={rebin_start} (dry run, pass --write to persist)");
            }
        }
    }

    Ok(())
}

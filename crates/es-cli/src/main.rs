//! EpiStat CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod dist;
mod priors;
mod pse;

#[derive(Parser)]
#[command(name = "epistat")]
#[command(about = "EpiStat - stochastic parameters and PSE for epileptogenic networks")]
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
    /// Describe a distribution: parameters, constraint, support and moments
    Describe {
        /// Distribution name (aliases such as `norm`, `expon`, `t` are accepted)
        #[arg(long)]
        dist: String,

        /// Native parameter `name=value` (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, f64)>,

        /// Match this mean (with `--std`) instead of native parameters
        #[arg(long, conflicts_with = "mode", requires = "std")]
        mean: Option<f64>,

        /// Match this mode (with `--std`) instead of native parameters
        #[arg(long, requires = "std")]
        mode: Option<f64>,

        /// Target standard deviation for moment matching
        #[arg(long)]
        std: Option<f64>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw seeded, optionally truncated samples
    Sample {
        /// Distribution name
        #[arg(long)]
        dist: String,

        /// Native parameter `name=value` (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, f64)>,

        /// Samples per output
        #[arg(short = 'n', long, default_value = "100")]
        n_samples: usize,

        /// Base seed (output `j` uses `seed + j`)
        #[arg(long)]
        seed: Option<u64>,

        /// Lower truncation limit
        #[arg(long)]
        low: Option<f64>,

        /// Upper truncation limit
        #[arg(long)]
        high: Option<f64>,

        /// Number of independent outputs (vector parameter)
        #[arg(long, default_value = "1")]
        outputs: usize,

        /// Preferred backend (native | statistical)
        #[arg(long, default_value = "native")]
        backend: es_prob::SamplingBackend,

        /// Fail instead of falling back to the other backend
        #[arg(long)]
        strict: bool,

        /// Include per-output summary statistics
        #[arg(long)]
        stats: bool,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a PSE parameter set from a hypothesis file
    PseParams {
        /// Hypothesis with connectivity (JSON or YAML)
        #[arg(long)]
        hypothesis: PathBuf,

        /// Run configuration (JSON or YAML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override `n_samples` from the configuration
        #[arg(short = 'n', long)]
        n_samples: Option<usize>,

        /// Override `seed` from the configuration
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Emit the model-inversion priors
    Priors {
        /// Number of brain regions
        #[arg(long)]
        n_regions: usize,

        /// Prior overrides keyed by prior name (JSON or YAML)
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Structural connectivity (list of rows, JSON or YAML) setting the EC modes
        #[arg(long)]
        connectivity: Option<PathBuf>,

        /// Statistical model name
        #[arg(long, default_value = "vep")]
        name: String,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Describe { dist, params, mean, mode, std, output } => {
            dist::cmd_describe(&dist, &params, mean, mode, std, output.as_ref())
        }
        Commands::Sample {
            dist,
            params,
            n_samples,
            seed,
            low,
            high,
            outputs,
            backend,
            strict,
            stats,
            output,
        } => dist::cmd_sample(
            &dist,
            &params,
            dist::SampleArgs { n_samples, seed, low, high, outputs, backend, strict, stats },
            output.as_ref(),
        ),
        Commands::PseParams { hypothesis, config, n_samples, seed, output } => {
            pse::cmd_pse_params(&hypothesis, config.as_ref(), n_samples, seed, output.as_ref())
        }
        Commands::Priors { n_regions, overrides, connectivity, name, output } => {
            priors::cmd_priors(
                n_regions,
                overrides.as_ref(),
                connectivity.as_ref(),
                &name,
                output.as_ref(),
            )
        }
        Commands::Version => {
            println!("epistat {}", es_core::VERSION);
            Ok(())
        }
    }
}

fn parse_key_value(s: &str) -> std::result::Result<(String, f64), String> {
    let (key, value) =
        s.split_once('=').ok_or_else(|| format!("expected name=value, got `{}`", s))?;
    let value: f64 =
        value.trim().parse().map_err(|e| format!("invalid value for `{}`: {}", key.trim(), e))?;
    Ok((key.trim().to_string(), value))
}

pub(crate) fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

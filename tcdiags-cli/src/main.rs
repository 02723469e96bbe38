//! TC diagnostics runner
//!
//! Loads a YAML run configuration, builds a synthetic analysis around the
//! configured TC events, runs every configured metric, and prints the
//! summary tables. Output records can be dumped as JSON.

mod scene;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scene::{build_analysis, VortexParams};
use tcdiags_core::{run_metrics, DiagsError, TcDiagsConfig, TcEvent};

/// Run used when no configuration file is given
const DEFAULT_CONFIG: &str = "
tc_events:
  - id: 09L
    lat: 15.0
    lon: 280.0
potential_intensity: {}
multi_scale_intensity: {}
steering_flow: {}
heat_potential: {}
";

#[derive(Parser, Debug)]
#[command(name = "tcdiags")]
#[command(about = "Tropical cyclone diagnostics on a synthetic analysis", long_about = None)]
struct Cli {
    /// YAML run configuration (defaults to every metric for one storm)
    config: Option<PathBuf>,

    /// Grid spacing of the synthetic analysis in degrees
    #[arg(short, long, default_value_t = 1.0)]
    resolution: f64,

    /// Peak wind of the synthetic storms (m/s)
    #[arg(long, default_value_t = 50.0)]
    vmax: f64,

    /// Radius of maximum wind of the synthetic storms (km)
    #[arg(long, default_value_t = 150.0)]
    rmw_km: f64,

    /// Write the metric outputs to this file as JSON
    #[arg(short, long)]
    json: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot write JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot create {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Diags(#[from] DiagsError),
}

fn load_config(path: Option<&Path>) -> Result<TcDiagsConfig, CliError> {
    let text = match path {
        Some(path) => fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?,
        None => DEFAULT_CONFIG.to_string(),
    };
    Ok(serde_yaml::from_str(&text)?)
}

fn run(cli: &Cli) -> Result<bool, CliError> {
    let config = load_config(cli.config.as_deref())?;
    if config.tc_events.is_empty() {
        warn!("No TC events configured; per-storm metrics will be empty.");
    }
    for TcEvent { id, lat, lon } in &config.tc_events {
        info!("TC {id} at {lat:.2}N {lon:.2}E");
    }

    info!("Building a {:.2} degree synthetic analysis.", cli.resolution);
    let analysis = build_analysis(
        cli.resolution,
        &config.tc_events,
        VortexParams {
            vmax: cli.vmax,
            rmw: cli.rmw_km * 1000.0,
        },
    )?;

    let report = run_metrics(&config, &analysis);
    for output in &report.outputs {
        for table in output.tables() {
            println!("{table}");
        }
    }
    for failure in &report.failures {
        println!("{failure}");
    }

    if let Some(path) = &cli.json {
        let file = fs::File::create(path).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(file, &report.outputs)?;
        info!("Wrote {} metric outputs to {}", report.outputs.len(), path.display());
    }

    info!(
        "{} metrics succeeded, {} failed.",
        report.outputs.len(),
        report.failures.len()
    );
    Ok(report.is_complete())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_runs_every_metric() {
        let config = load_config(None).unwrap();
        assert_eq!(config.tc_events.len(), 1);
        assert!(config.potential_intensity.is_some());
        assert!(config.multi_scale_intensity.is_some());
        assert!(config.steering_flow.is_some());
        assert!(config.heat_potential.is_some());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Some(Path::new("/nonexistent/tcdiags.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }

    #[test]
    fn test_synthetic_run_completes() {
        let config = load_config(None).unwrap();
        let analysis = build_analysis(
            5.0,
            &config.tc_events,
            VortexParams {
                vmax: 40.0,
                rmw: 300_000.0,
            },
        )
        .unwrap();
        assert_eq!(analysis.grid.shape(), [37, 72]);
        let report = run_metrics(&config, &analysis);
        assert!(report.is_complete(), "{:?}", report.failures);
        assert_eq!(report.outputs.len(), 4);
    }
}

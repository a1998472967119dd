use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bevy_ecs::prelude::World;
use clap::{Parser, Subcommand};
use ed_core::error::{ConfigError, ExportError};
use ed_core::profiling::EventMetrics;
use ed_core::runner::{initialize_simulation, run_until_empty, simulation_schedule};
use ed_core::scenario::{build_scenario, EdConfig};
use ed_core::telemetry::{EventLog, RunSummary};
use ed_core::telemetry_export::{collect_patients, write_run_outputs};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ed-sim",
    about = "Emergency department patient flow simulation",
    long_about = "Runs the emergency department discrete-event simulation for a number of\n\
                  simulated days and writes per-patient, event and hourly CSV tables."
)]
struct Cli {
    /// Log at info level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and export the results
    Run {
        /// JSON scenario file; missing fields take the default scenario
        #[arg(long, env = "ED_SIM_CONFIG")]
        config: Option<PathBuf>,
        /// Simulated days (overrides the scenario end time)
        #[arg(long)]
        days: Option<f64>,
        /// RNG seed (overrides the scenario seed)
        #[arg(long)]
        seed: Option<u64>,
        /// Output directory for the CSV tables
        #[arg(long, default_value = "ed_output")]
        out: PathBuf,
    },
    /// Print the default scenario as JSON
    DefaultConfig,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid scenario: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// ── helpers ────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "info" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EdConfig, CliError> {
    let Some(path) = path else {
        return Ok(EdConfig::default());
    };
    let file = File::open(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn run(
    config: Option<&Path>,
    days: Option<f64>,
    seed: Option<u64>,
    out: &Path,
) -> Result<(), CliError> {
    let mut config = load_config(config)?;
    if let Some(days) = days {
        config = config.with_days(days);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let mut world = World::new();
    build_scenario(&mut world, &config)?;
    world.insert_resource(EventMetrics::default());
    initialize_simulation(&mut world);

    let mut schedule = simulation_schedule();
    let steps = run_until_empty(&mut world, &mut schedule, usize::MAX);
    tracing::info!(steps, "simulation finished");
    world.resource::<EventMetrics>().log_summary();

    let patients = collect_patients(&mut world);
    let written = write_run_outputs(out, &patients, world.resource::<EventLog>())?;
    for path in &written {
        tracing::info!(path = %path.display(), "wrote");
    }

    let summary = RunSummary::from_patients(&patients);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            days,
            seed,
            out,
        } => run(config.as_deref(), days, seed, &out),
        Commands::DefaultConfig => serde_json::to_string_pretty(&EdConfig::default())
            .map(|json| println!("{json}"))
            .map_err(CliError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::parse_from(["ed-sim", "run", "--days", "2", "--seed", "9", "--out", "x"]);
        match cli.command {
            Commands::Run {
                days, seed, out, ..
            } => {
                assert_eq!(days, Some(2.0));
                assert_eq!(seed, Some(9));
                assert_eq!(out, PathBuf::from("x"));
            }
            Commands::DefaultConfig => panic!("expected run"),
        }
    }

    #[test]
    fn short_run_writes_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out");
        run(None, Some(0.25), Some(1), &out).expect("run succeeds");
        assert!(out.join("patients.csv").exists());
        assert!(out.join("events.csv").exists());
        assert!(out.join("summary_hourly.csv").exists());
        assert!(out.join("doctor_patient_traces.csv").exists());
    }

    #[test]
    fn invalid_scenario_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "doctors": [] }"#).expect("write config");
        let err = run(Some(&path), Some(0.1), None, &dir.path().join("out"))
            .expect_err("no doctors");
        assert!(matches!(err, CliError::Config(ConfigError::MissingDoctorCoverage(_))));
    }

    #[test]
    fn unreadable_config_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/ed.json"))).expect_err("missing file");
        assert!(matches!(err, CliError::Read { .. }));
    }
}

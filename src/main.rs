//! metadata-scripts - run the scripts an operator placed in instance metadata
//!
//! Invoked once per lifecycle phase, e.g. `metadata-scripts startup`.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use metadata_scripts::{Config, Phase, run_phase};

#[derive(Parser)]
#[command(name = "metadata-scripts")]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Lifecycle phase whose scripts should run
    #[arg(value_enum)]
    phase: Phase,
}

fn usage() -> String {
    let options: Vec<String> = Phase::ALL.iter().map(ToString::to_string).collect();
    format!("No valid arguments specified. Options: [{}]", options.join(" "))
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(_) => {
            println!("{}", usage());
            return ExitCode::FAILURE;
        }
    };

    init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Starting {} scripts (version {}).",
        cli.phase,
        env!("CARGO_PKG_VERSION")
    );

    match run_phase(&config, cli.phase).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", e);
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

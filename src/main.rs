use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use fire_projection::api::{self, ProjectArgs, SimulateArgs};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "fire",
    version,
    about = "Monte Carlo time-to-FIRE estimator and portfolio projector"
)]
struct Cli {
    /// Log filter (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "FIRE_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, env = "FIRE_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Estimate the probability and timing of reaching a target amount
    Simulate(SimulateArgs),
    /// Project percentile bands for a normalized portfolio
    Project(ProjectArgs),
    /// Replay recorded annual returns of weighted holdings
    History {
        #[arg(long, value_name = "FILE")]
        holdings: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Serve { port } => api::run_http_server(port)
            .await
            .context("server error")?,
        Command::Simulate(args) => {
            let response = tokio::task::spawn_blocking(move || api::run_simulate_command(&args))
                .await?
                .map_err(|e| anyhow!(e))?;
            tracing::info!(
                success_rate = response.result.success_rate,
                trials = response.result.trial_count,
                seed = response.seed,
                "simulation complete"
            );
            print_json(&response)?;
        }
        Command::Project(args) => {
            let response = tokio::task::spawn_blocking(move || api::run_project_command(&args))
                .await?
                .map_err(|e| anyhow!(e))?;
            print_json(&response)?;
        }
        Command::History { holdings } => {
            let response = api::run_history_command(&holdings).map_err(|e| anyhow!(e))?;
            print_json(&response)?;
        }
    }

    Ok(())
}

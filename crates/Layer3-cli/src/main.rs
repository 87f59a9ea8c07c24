//! Beacon CLI - main entry point

use beacon_cli::{load_config, replay, Scenario};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Beacon - accessibility event pipeline tools
#[derive(Parser, Debug)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario through the pipeline and print a summary
    Replay {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Pipeline configuration file, merged over the user and project files
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log level used when RUST_LOG is not set
        #[arg(long, default_value = "warn")]
        log_level: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load, validate and print the merged pipeline configuration
    CheckConfig {
        /// Pipeline configuration file, merged over the user and project files
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Replay {
            scenario,
            config,
            log_level,
            json,
        } => {
            init_logging(&log_level);
            let config = load_config(&working_dir(), config.as_deref())?;
            let scenario = Scenario::load(&scenario)?;

            let report = replay(scenario, config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }
        Command::CheckConfig { config } => {
            init_logging("warn");
            let config = load_config(&working_dir(), config.as_deref())?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "queuewatch", version, about = "Clinic reception queue monitor and wait predictor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the reception page and record the queue number until an error occurs
    Watch,
    /// Check the reception page once without recording anything
    Probe {
        /// Print the observation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Predict when a reception number will be called
    Predict {
        #[command(flatten)]
        args: commands::predict::PredictArgs,
    },
    /// Show the average throughput curve over all recorded days
    Curve {
        /// Directory with recorded samples (defaults to the configured one)
        #[arg(long)]
        samples_dir: Option<PathBuf>,
        /// Print the curve as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the throughput series of a single recorded day
    Day {
        /// Day to show (YYYY-MM-DD)
        date: String,
        /// Directory with recorded samples (defaults to the configured one)
        #[arg(long)]
        samples_dir: Option<PathBuf>,
        /// Print the series as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Watch => commands::watch::run().await,
        Commands::Probe { json } => commands::watch::probe(json).await,
        Commands::Predict { args } => commands::predict::run(args),
        Commands::Curve { samples_dir, json } => commands::predict::curve(samples_dir, json),
        Commands::Day {
            date,
            samples_dir,
            json,
        } => commands::predict::day(&date, samples_dir, json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

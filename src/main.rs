//! FloatChat command-line entry point

use clap::{Parser, Subcommand};
use floatchat::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// FloatChat: ask questions about ARGO float profiles in plain English
#[derive(Parser, Debug)]
#[command(name = "floatchat")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single question
    Ask {
        /// The question, e.g. "temperature above 15 near latitude 40"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show dashboard totals for the whole table
    Stats,
    /// Interactive question loop (default)
    Chat,
    /// Create the profile table and insert sample profiles
    Seed {
        /// Database file (defaults to storage.database_path)
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs);

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    match args.command {
        Some(Command::Ask { question }) => cli::run_ask(&config, &question.join(" "), args.json).await,
        Some(Command::Stats) => cli::run_stats(&config, args.json).await,
        Some(Command::Seed { path }) => cli::run_seed(&config, path, args.json).await,
        Some(Command::Chat) | None => cli::run_chat(&config, args.json).await,
    }
}

fn init_logging(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

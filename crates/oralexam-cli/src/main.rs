//! oralexam CLI: score recorded TEF Canada oral expression attempts.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "oralexam",
    version,
    about = "Oral expression exam scorer and CLB mapper"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// How `score` prints its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Score attempt files
    Score {
        /// Path to a .json attempt file or a directory of them
        #[arg(long)]
        attempt: PathBuf,

        /// Skip the qualitative assessor and use neutral scores
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Directory to write one JSON report per attempt
        #[arg(long)]
        output: Option<PathBuf>,

        /// Max attempts scored concurrently (defaults to the config value)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate attempt files
    Validate {
        /// Path to a .json attempt file or a directory of them
        #[arg(long)]
        attempt: PathBuf,
    },

    /// Replay an attempt through a full exam session
    Simulate {
        /// Path to a .json attempt file
        #[arg(long)]
        attempt: PathBuf,

        /// Skip the qualitative assessor and use neutral scores
        #[arg(long)]
        offline: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example attempt
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["oralexam=info", "oralexam_core=info", "oralexam_providers=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            attempt,
            offline,
            format,
            output,
            parallelism,
            config,
        } => {
            commands::score::execute(attempt, offline, format, output, parallelism, config).await
        }
        Commands::Validate { attempt } => commands::validate::execute(attempt),
        Commands::Simulate {
            attempt,
            offline,
            config,
        } => commands::simulate::execute(attempt, offline, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

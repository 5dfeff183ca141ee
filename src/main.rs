//! depgraph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod manifest;

#[derive(Parser)]
#[command(name = "depgraph")]
#[command(
    about = "Project and package dependency analysis for multi-project solutions",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Lifetime of cached analysis results
    #[arg(long, global = true, default_value = "300")]
    cache_ttl_secs: u64,

    /// Analysis worker threads (defaults to twice the available cores)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Give up on an analysis after this many seconds
    #[arg(long, global = true, default_value = "120")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a whole solution
    Analyze {
        /// Dependency manifest (JSON)
        manifest: PathBuf,

        /// Solution to analyze (defaults to the only one in the manifest)
        #[arg(short, long)]
        solution: Option<String>,
    },
    /// Analyze a single project
    Project {
        /// Dependency manifest (JSON)
        manifest: PathBuf,

        /// Project path as declared in the manifest
        project: String,
    },
    /// List circular dependencies of a solution
    Cycles {
        /// Dependency manifest (JSON)
        manifest: PathBuf,

        #[arg(short, long)]
        solution: Option<String>,
    },
    /// List packages resolved to more than one version
    Conflicts {
        /// Dependency manifest (JSON)
        manifest: PathBuf,

        #[arg(short, long)]
        solution: Option<String>,
    },
    /// Print the build order of a solution, dependencies first
    Order {
        /// Dependency manifest (JSON)
        manifest: PathBuf,

        #[arg(short, long)]
        solution: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("depgraph={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("depgraph v{}", env!("CARGO_PKG_VERSION"));

    let options = commands::Options {
        json: cli.json,
        cache_ttl_secs: cli.cache_ttl_secs,
        workers: cli.workers,
        timeout_secs: cli.timeout_secs,
    };

    match cli.command {
        Commands::Analyze { manifest, solution } => {
            commands::analyze(&options, manifest, solution).await
        }
        Commands::Project { manifest, project } => {
            commands::project(&options, manifest, project).await
        }
        Commands::Cycles { manifest, solution } => {
            commands::cycles(&options, manifest, solution).await
        }
        Commands::Conflicts { manifest, solution } => {
            commands::conflicts(&options, manifest, solution).await
        }
        Commands::Order { manifest, solution } => {
            commands::order(&options, manifest, solution).await
        }
    }
}

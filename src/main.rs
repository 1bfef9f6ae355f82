use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use docpack::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - only show logs with --verbose
    let filter = if cli.verbose {
        EnvFilter::new("docpack=debug")
    } else {
        EnvFilter::new("docpack=warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Plan(args) => cli::plan::execute(args).await,
        Commands::Schema(args) => cli::schema::execute(args),
    }
}

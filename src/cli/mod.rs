pub mod plan;
pub mod run;
pub mod schema;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docpack")]
#[command(
    author,
    version,
    about = "Parallel compliance document-pack orchestrator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan, generate, validate and consolidate a document pack
    Run(RunArgs),

    /// Show the document plan for a brief without generating anything
    Plan(PlanArgs),

    /// Print JSON Schema for the config or brief format
    Schema(SchemaArgs),
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Path to the project brief (YAML)
    #[arg(short, long)]
    pub brief: PathBuf,

    /// Path to config file (defaults apply when missing)
    #[arg(short, long, default_value = "docpack.yaml")]
    pub config: PathBuf,

    /// Override max parallel generations
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override the project deadline in seconds
    #[arg(long)]
    pub timeout_sec: Option<u64>,

    /// Override output directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Exit 1 unless the project completed (CI mode)
    #[arg(long)]
    pub fail_on_incomplete: bool,

    /// Print the consolidated result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct PlanArgs {
    /// Path to the project brief (YAML)
    #[arg(short, long)]
    pub brief: PathBuf,

    /// Path to config file (defaults apply when missing)
    #[arg(short, long, default_value = "docpack.yaml")]
    pub config: PathBuf,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct SchemaArgs {
    /// Which document to describe
    #[arg(value_enum, default_value_t = SchemaTarget::Config)]
    pub target: SchemaTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaTarget {
    Config,
    Brief,
}

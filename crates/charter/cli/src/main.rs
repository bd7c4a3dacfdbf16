//! Charter CLI
//!
//! Runs the one-time protocol deployment against a freshly seeded local
//! environment and prints the resulting deployment record.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{deploy, params};

#[derive(Parser)]
#[command(name = "charter")]
#[command(about = "Charter - one-time governance protocol deployment", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (text, json)
    #[arg(short, long, env = "CHARTER_OUTPUT", default_value = "text")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bootstrap and print the deployment record
    Deploy(deploy::DeployArgs),

    /// Print a parameters file for the local environment
    Params(params::ParamsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Deploy(args) => deploy::execute(args, cli.output),
        Commands::Params(args) => params::execute(args),
    }
}

//! Patchwire CLI - inspect, check and render patch graphs offline.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchwire")]
#[command(author, version, about = "Patchwire graph CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List unit types and their ports and properties
    Catalog(commands::catalog::CatalogArgs),

    /// Build a saved graph and report every diagnostic
    Check(commands::check::CheckArgs),

    /// Render a saved graph to a WAV file
    Render(commands::render::RenderArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog(args) => commands::catalog::run(&args),
        Commands::Check(args) => commands::check::run(&args),
        Commands::Render(args) => commands::render::run(&args),
    }
}

//! Graph validation command.

use std::path::PathBuf;

use clap::Args;
use patchwire_core::{Diagnostic, Severity};

use super::common;

#[derive(Args)]
pub struct CheckArgs {
    /// Graph document (JSON)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Merge extra unit definitions from a JSON file
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Print diagnostics as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: &CheckArgs) -> anyhow::Result<()> {
    let mut sync =
        common::open_graph(&args.graph, args.config.as_deref(), args.catalog.as_deref())?;
    common::go_live(&mut sync)?;

    let diagnostics = sync.drain_diagnostics();
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else {
        let doc = sync.document();
        println!("Graph: {}", args.graph.display());
        println!("  Nodes:            {}", doc.node_count());
        println!("  Edges:            {}", doc.edge_count());
        println!("  Live units:       {}", sync.live_unit_count());
        println!("  Live connections: {}", sync.live_connection_count());
        println!("  Play state:       {:?}", sync.play_state());
        print_diagnostics(&diagnostics);
    }

    if errors > 0 {
        anyhow::bail!("{errors} error(s) in {}", args.graph.display());
    }
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    println!();
    if diagnostics.is_empty() {
        println!("No diagnostics.");
        return;
    }
    println!("Diagnostics ({}):", diagnostics.len());
    for diagnostic in diagnostics {
        println!("  {diagnostic}");
    }
}

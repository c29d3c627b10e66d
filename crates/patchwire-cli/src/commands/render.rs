//! Offline rendering command.

use std::path::PathBuf;

use clap::Args;

use super::common;

#[derive(Args)]
pub struct RenderArgs {
    /// Graph document (JSON)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Output WAV file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Duration in seconds
    #[arg(short, long, default_value = "2.0")]
    seconds: f64,

    /// Engine configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Merge extra unit definitions from a JSON file
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: &RenderArgs) -> anyhow::Result<()> {
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        anyhow::bail!("Duration must be a positive number of seconds");
    }
    if ![16, 24, 32].contains(&args.bit_depth) {
        anyhow::bail!("Unsupported bit depth: {}", args.bit_depth);
    }

    let mut sync =
        common::open_graph(&args.graph, args.config.as_deref(), args.catalog.as_deref())?;
    common::go_live(&mut sync)?;

    let sample_rate = sync.config().sample_rate;
    let frames = (args.seconds * f64::from(sample_rate)).round() as usize;
    println!(
        "Rendering {} ({frames} frames at {sample_rate} Hz)...",
        args.graph.display()
    );

    let samples = sync.render(frames)?;
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    let level = sync.output_level();
    let play_state = sync.play_state();

    let diagnostics = sync.drain_diagnostics();
    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }

    common::write_wav(&args.output, &samples, sample_rate, args.bit_depth)?;

    println!("Wrote {}", args.output.display());
    println!("  Duration:   {:.2}s", frames as f64 / f64::from(sample_rate));
    println!("  Peak:       {peak:.4}");
    println!("  Level:      {level:.4}");
    println!("  Play state: {play_state:?}");
    if !diagnostics.is_empty() {
        println!("  Diagnostics: {}", diagnostics.len());
    }
    Ok(())
}

//! Shared helpers for loading catalogs, configurations and graphs.

use std::path::Path;

use anyhow::Context;
use patchwire_core::{Catalog, EngineConfig, GraphSynchronizer};

/// Built-in catalog, optionally extended from a JSON file.
pub fn load_catalog(extra: Option<&Path>) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::new();
    if let Some(path) = extra {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let merged = catalog.merge_json(&json)?;
        tracing::debug!("cli_catalog: merged {merged} types from {}", path.display());
    }
    Ok(catalog)
}

/// Engine configuration from a TOML file, or the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Loads a graph document into a stopped synchronizer.
pub fn open_graph(
    graph: &Path,
    config: Option<&Path>,
    catalog: Option<&Path>,
) -> anyhow::Result<GraphSynchronizer> {
    let mut sync = GraphSynchronizer::with_catalog(load_catalog(catalog)?, load_config(config)?);
    sync.load(graph)
        .with_context(|| format!("failed to load graph {}", graph.display()))?;
    Ok(sync)
}

/// Starts the graph, acts as the user gesture for a suspended context and
/// decodes every queued buffer file.
pub fn go_live(sync: &mut GraphSynchronizer) -> anyhow::Result<()> {
    sync.start();
    sync.resume()?;
    sync.poll_loads();
    Ok(())
}

/// Writes mono samples, as 32-bit float or 16/24-bit PCM.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, bits: u16) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bits,
        sample_format: if bits == 32 {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;

    if bits == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits - 1)) as f32;
        for &sample in samples {
            writer.write_sample((sample * max_val).clamp(-max_val, max_val - 1.0) as i32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

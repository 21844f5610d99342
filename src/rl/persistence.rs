//! Model persistence for saving and loading trained agents
//!
//! Weights go through Burn's record system; training progress is written next
//! to them as JSON. The model is saved in two files:
//! - `<path>.mpk` - Network weights (named MessagePack record)
//! - `<path>.meta.json` - Metadata as JSON

use super::{DqnAgent, DqnConfig, QNetwork, QNetworkConfig};
use anyhow::{Context, Result};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata saved with the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Agent configuration used during training
    pub config: DqnConfig,

    /// Completed episodes at save time
    pub episode_count: usize,

    /// Best episode score at save time
    pub best_score: u32,

    /// Trailing mean score at save time
    pub mean_score: f32,

    /// Version identifier for compatibility checking
    pub version: String,
}

impl ModelMetadata {
    /// Create new metadata
    pub fn new(config: DqnConfig, episode_count: usize, best_score: u32, mean_score: f32) -> Self {
        Self {
            config,
            episode_count,
            best_score,
            mean_score,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension("meta.json")
}

/// Whether a saved model exists at `path`
pub fn model_exists(path: &Path) -> bool {
    metadata_path(path).is_file()
}

/// Save an agent's weights and training progress
///
/// Creates parent directories if they don't exist. Saving again overwrites
/// both files.
pub fn save_model<B: AutodiffBackend>(agent: &DqnAgent<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let record = agent.network().clone().into_record();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(record, path.to_path_buf())
        .context("Failed to save network weights")?;

    let stats = agent.stats();
    let metadata = ModelMetadata::new(
        agent.config().clone(),
        agent.episode_count(),
        stats.best_score(),
        stats.mean_score(),
    );

    let meta_path = metadata_path(path);
    let meta_json =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;
    std::fs::write(&meta_path, meta_json)
        .with_context(|| format!("Failed to write metadata to {:?}", meta_path))?;

    Ok(())
}

/// Load a saved network and its metadata
///
/// The network is rebuilt with the hidden size recorded in the metadata.
pub fn load_network<B: AutodiffBackend>(
    path: &Path,
    device: &B::Device,
) -> Result<(QNetwork<B>, ModelMetadata)> {
    let meta_path = metadata_path(path);
    let meta_json = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata from {:?}", meta_path))?;
    let metadata: ModelMetadata =
        serde_json::from_str(&meta_json).context("Failed to deserialize metadata")?;

    let network = QNetworkConfig::new(metadata.config.hidden_size).init::<B>(device);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Failed to load network weights from {:?}", path))?;

    Ok((network.load_record(record), metadata))
}

//! Model loader for latent decoder checkpoints.
//!
//! Resolves a model identifier to `<model_dir>/<model_id>.json`, parses and
//! validates the checkpoint, and builds the decoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::error::{DaemonError, ErrorCode, Result};

use super::backend::{ModelSource, SharedModel};
use super::checkpoint::Checkpoint;
use super::latent::LatentDecoderModel;

/// File extension of checkpoint files.
pub const CHECKPOINT_EXTENSION: &str = "json";

/// Returns the checkpoint path for a model identifier.
pub fn checkpoint_path(model_dir: &Path, model_id: &str) -> PathBuf {
    model_dir.join(format!("{}.{}", model_id, CHECKPOINT_EXTENSION))
}

/// Checks if checkpoints for all `model_ids` exist in the directory.
///
/// Returns Ok(()) if all files exist, or an error listing missing models.
pub fn check_models(model_dir: &Path, model_ids: &[&str]) -> Result<()> {
    let missing: Vec<&str> = model_ids
        .iter()
        .copied()
        .filter(|id| !checkpoint_path(model_dir, id).exists())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DaemonError::new(
            ErrorCode::ModelNotFound,
            format!(
                "Missing model checkpoints in {}: {}",
                model_dir.display(),
                missing.join(", ")
            ),
        ))
    }
}

/// Reads and parses a checkpoint file without building the model.
pub fn read_checkpoint(model_dir: &Path, model_id: &str) -> Result<Checkpoint> {
    let path = checkpoint_path(model_dir, model_id);
    if !path.exists() {
        return Err(DaemonError::model_not_found(model_id, path.display()));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        DaemonError::with_source(
            ErrorCode::ModelLoadFailed,
            format!("AI model '{}' could not be read from {}", model_id, path.display()),
            e,
        )
    })?;

    let checkpoint: Checkpoint = serde_json::from_str(&content).map_err(|e| {
        DaemonError::with_source(
            ErrorCode::ModelLoadFailed,
            format!("AI model '{}' has an unreadable checkpoint", model_id),
            e,
        )
    })?;

    if checkpoint.model_id != model_id {
        return Err(DaemonError::model_load_failed(
            model_id,
            format!("checkpoint declares model id '{}'", checkpoint.model_id),
        ));
    }

    Ok(checkpoint)
}

/// Loads latent decoder models from checkpoint files in a directory.
#[derive(Debug, Clone)]
pub struct FileModelSource {
    model_dir: PathBuf,
}

impl FileModelSource {
    /// Creates a source reading from `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Returns the directory checkpoints are read from.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl ModelSource for FileModelSource {
    fn load(&self, model_id: &str) -> Result<SharedModel> {
        info!(
            "Loading model '{}' from {}...",
            model_id,
            self.model_dir.display()
        );
        let checkpoint = read_checkpoint(&self.model_dir, model_id)?;
        let model = LatentDecoderModel::from_checkpoint(checkpoint)?;
        info!(
            "Loaded model '{}' ({:?}, latent dim {})",
            model_id,
            model.kind(),
            model.latent_dim()
        );
        Ok(Arc::new(model))
    }
}

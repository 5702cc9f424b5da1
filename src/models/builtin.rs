//! Built-in checkpoints for the registered model families.
//!
//! The weights are generated deterministically: hand-shaped biases give each
//! model its musical character (scale tones on downbeats for melodies, long
//! holds for pads, a backbeat for drums, a broken kick for grooves) and
//! seeded Gaussian weights let the latent vector vary the result. [`ensure_models`] writes any missing
//! checkpoints into a model directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use rand::prelude::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::error::{DaemonError, ErrorCode, Result};
use crate::types::{
    registered_model_ids, CINEMATIC_MODEL_ID, DRUMS_MODEL_ID, GROOVE_MODEL_ID, MELODY_MODEL_ID,
    PAD_MODEL_ID, RIFF_MODEL_ID,
};

use super::backend::{ModelSource, SharedModel};
use super::checkpoint::{Checkpoint, DecoderKind, FORMAT_VERSION, MELODY_HOLD, MELODY_REST};
use super::latent::LatentDecoderModel;
use super::loader::checkpoint_path;

/// Weights version written into built-in checkpoints.
pub const BUILTIN_VERSION: &str = "1";

const LATENT_DIM: usize = 16;
const STEPS: usize = 32;
const STEPS_PER_QUARTER: u32 = 4;

/// A natural minor, A3..A5.
const MELODY_VOCAB: &[i32] = &[57, 59, 60, 62, 64, 65, 67, 69, 71, 72, 74, 76, 77, 79, 81];

/// A minor pentatonic, A3..A5.
const RIFF_VOCAB: &[i32] = &[57, 60, 62, 64, 67, 69, 72, 74, 76, 79, 81];

/// A natural minor, E3..E5.
const CINEMATIC_VOCAB: &[i32] = &[52, 53, 55, 57, 59, 60, 62, 64, 65, 67, 69, 71, 72, 74, 76];

/// A natural minor, A2..A4.
const PAD_VOCAB: &[i32] = &[45, 47, 48, 50, 52, 53, 55, 57, 59, 60, 62, 64, 65, 67, 69];

/// Kick, snare, closed hat, open hat, clap, acoustic kick, electric snare, pedal hat.
const DRUM_VOCAB: &[i32] = &[36, 38, 42, 46, 39, 35, 40, 44];

/// Returns the built-in checkpoint for a registered model.
pub fn builtin_checkpoint(model_id: &str) -> Option<Checkpoint> {
    match model_id {
        MELODY_MODEL_ID => Some(melody_checkpoint(model_id, MELODY_VOCAB, 0x6d65_6c6f, false)),
        RIFF_MODEL_ID => Some(melody_checkpoint(model_id, RIFF_VOCAB, 0x7269_6666, false)),
        CINEMATIC_MODEL_ID => Some(melody_checkpoint(model_id, CINEMATIC_VOCAB, 0x6369_6e65, false)),
        PAD_MODEL_ID => Some(melody_checkpoint(model_id, PAD_VOCAB, 0x7061_6400, true)),
        DRUMS_MODEL_ID => Some(drums_checkpoint(model_id, drum_bias)),
        GROOVE_MODEL_ID => Some(drums_checkpoint(model_id, groove_bias)),
        _ => None,
    }
}

/// Writes built-in checkpoints for every registered model that is missing.
///
/// Returns the paths written; existing files are left untouched.
pub fn ensure_models(model_dir: &Path) -> Result<Vec<PathBuf>> {
    if !model_dir.exists() {
        fs::create_dir_all(model_dir).map_err(|e| {
            DaemonError::with_source(
                ErrorCode::ModelLoadFailed,
                format!("Failed to create model directory {}", model_dir.display()),
                e,
            )
        })?;
    }

    let mut written = Vec::new();
    for model_id in registered_model_ids() {
        let path = checkpoint_path(model_dir, model_id);
        if path.exists() {
            continue;
        }

        let checkpoint = builtin_checkpoint(model_id).ok_or_else(|| {
            DaemonError::model_load_failed(model_id, "no built-in checkpoint available")
        })?;
        let json = serde_json::to_string(&checkpoint).map_err(|e| {
            DaemonError::with_source(
                ErrorCode::ModelLoadFailed,
                format!("Failed to serialize checkpoint for '{}'", model_id),
                e,
            )
        })?;
        fs::write(&path, json).map_err(|e| {
            DaemonError::with_source(
                ErrorCode::ModelLoadFailed,
                format!("Failed to write {}", path.display()),
                e,
            )
        })?;

        info!("Installed built-in checkpoint {}", path.display());
        written.push(path);
    }

    if written.is_empty() {
        info!("All model checkpoints present in {}", model_dir.display());
    }
    Ok(written)
}

/// Serves built-in checkpoints straight from memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinModelSource;

impl ModelSource for BuiltinModelSource {
    fn load(&self, model_id: &str) -> Result<SharedModel> {
        let checkpoint = builtin_checkpoint(model_id)
            .ok_or_else(|| DaemonError::model_not_found(model_id, "built-in models"))?;
        Ok(Arc::new(LatentDecoderModel::from_checkpoint(checkpoint)?))
    }
}

fn random_weights(rows: usize, seed: u64, scale: f32) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..rows * LATENT_DIM)
        .map(|_| {
            let v: f32 = StandardNormal.sample(&mut rng);
            v * scale
        })
        .collect()
}

fn melody_checkpoint(model_id: &str, vocab: &[i32], seed: u64, sustained: bool) -> Checkpoint {
    let classes = vocab.len() + 2;
    let center = vocab.len() as f32 / 2.0;
    let mut bias = Vec::with_capacity(STEPS * classes);

    for step in 0..STEPS {
        let on_beat = step % STEPS_PER_QUARTER as usize == 0;
        let on_bar = step % 16 == 0;
        for class in 0..classes {
            let b = match class {
                MELODY_REST => {
                    if sustained {
                        -2.0
                    } else if on_beat {
                        -1.0
                    } else {
                        0.2
                    }
                }
                MELODY_HOLD => {
                    if sustained {
                        if step % 8 == 0 {
                            -1.5
                        } else {
                            2.5
                        }
                    } else if on_beat {
                        -0.8
                    } else {
                        0.6
                    }
                }
                _ => {
                    let idx = (class - 2) as f32;
                    let pitch_class = vocab[class - 2].rem_euclid(12);
                    // Favor the middle of the range and the A minor triad.
                    let mut b = 0.4 - 0.06 * (idx - center) * (idx - center);
                    if matches!(pitch_class, 9 | 0 | 4) {
                        b += 0.5;
                    }
                    if on_beat {
                        b += 0.6;
                    }
                    if on_bar && pitch_class == 9 {
                        b += 0.8;
                    }
                    if sustained && step % 8 == 0 {
                        b += 1.5;
                    }
                    b
                }
            };
            bias.push(b);
        }
    }

    Checkpoint {
        format_version: FORMAT_VERSION,
        model_id: model_id.to_string(),
        version: BUILTIN_VERSION.to_string(),
        kind: DecoderKind::Melody,
        latent_dim: LATENT_DIM,
        steps: STEPS,
        steps_per_quarter: STEPS_PER_QUARTER,
        vocab: vocab.to_vec(),
        base_velocity: if sustained { 62 } else { 84 },
        accent: if sustained { 4 } else { 12 },
        weights: random_weights(STEPS * classes, seed, 0.35),
        bias,
    }
}

fn drum_bias(pitch: i32, step: usize) -> f32 {
    match pitch {
        36 if step % 4 == 0 => 3.0,
        36 if step % 8 == 6 => -0.5,
        35 if step % 8 == 0 => -0.5,
        38 if step % 8 == 4 => 3.0,
        40 if step % 8 == 4 => 0.0,
        40 if step % 16 == 14 => -0.5,
        42 if step % 2 == 0 => 2.0,
        42 => -0.8,
        44 if step % 4 == 2 => -0.5,
        46 if step % 8 == 6 => 1.8,
        39 if step % 8 == 4 => 1.8,
        _ => -3.5,
    }
}

/// Kick on 1, the "and" of 2 and 3 of each bar; everything else as `drum_bias`.
fn groove_bias(pitch: i32, step: usize) -> f32 {
    match pitch {
        36 if matches!(step % 16, 0 | 6 | 10) => 3.0,
        36 => -3.5,
        _ => drum_bias(pitch, step),
    }
}

fn drums_checkpoint(model_id: &str, bias_fn: fn(i32, usize) -> f32) -> Checkpoint {
    let classes = DRUM_VOCAB.len();
    let bias = (0..STEPS)
        .flat_map(|step| DRUM_VOCAB.iter().map(move |&pitch| bias_fn(pitch, step)))
        .collect();

    Checkpoint {
        format_version: FORMAT_VERSION,
        model_id: model_id.to_string(),
        version: BUILTIN_VERSION.to_string(),
        kind: DecoderKind::Drums,
        latent_dim: LATENT_DIM,
        steps: STEPS,
        steps_per_quarter: STEPS_PER_QUARTER,
        vocab: DRUM_VOCAB.to_vec(),
        base_velocity: 92,
        accent: 14,
        weights: random_weights(STEPS * classes, 0x6472_756d, 0.3),
        bias,
    }
}

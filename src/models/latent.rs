//! Latent decoder model.
//!
//! Samples a latent vector `z ~ N(0, I)` from a seeded ChaCha RNG, projects it
//! through the decoder weights into per-step logits, and samples each step
//! into note events. All randomness flows from the request seed, so decoding
//! is reproducible.

use ndarray::{s, Array1, Array2, ArrayView1};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::error::{DaemonError, Result};
use crate::types::{DecodingParams, RawNote, RawSequence};

use super::backend::GenerativeModel;
use super::checkpoint::{Checkpoint, DecoderKind, MELODY_CONTROL_CLASSES, MELODY_HOLD, MELODY_REST};

/// Tempo assumed when the caller does not pass `qpm`.
pub const DEFAULT_QPM: f64 = 120.0;

/// Velocity swing applied from sampling confidence (±half of this).
const CONFIDENCE_VELOCITY_SPAN: f64 = 40.0;

/// A decoder loaded from a [`Checkpoint`].
#[derive(Debug)]
pub struct LatentDecoderModel {
    model_id: String,
    version: String,
    kind: DecoderKind,
    steps: usize,
    steps_per_quarter: u32,
    vocab: Vec<i32>,
    base_velocity: i32,
    accent: i32,
    /// `(steps * classes) x latent_dim`
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LatentDecoderModel {
    /// Builds a model from checkpoint data, rejecting inconsistent weights.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self> {
        if let Some(reason) = checkpoint.validate() {
            return Err(DaemonError::model_load_failed(&checkpoint.model_id, reason));
        }

        let rows = checkpoint.rows();
        let Checkpoint {
            model_id,
            version,
            kind,
            latent_dim,
            steps,
            steps_per_quarter,
            vocab,
            base_velocity,
            accent,
            weights,
            bias,
            ..
        } = checkpoint;

        let weights = Array2::from_shape_vec((rows, latent_dim), weights).map_err(|e| {
            DaemonError::model_load_failed(&model_id, format!("bad weight shape: {}", e))
        })?;

        Ok(Self {
            model_id,
            version,
            kind,
            steps,
            steps_per_quarter,
            vocab,
            base_velocity,
            accent,
            weights,
            bias: Array1::from(bias),
        })
    }

    /// Returns the decoder kind.
    pub fn kind(&self) -> DecoderKind {
        self.kind
    }

    /// Latent dimensionality.
    pub fn latent_dim(&self) -> usize {
        self.weights.ncols()
    }

    fn classes(&self) -> usize {
        self.weights.nrows() / self.steps
    }

    fn sample_latent(&self, rng: &mut ChaCha8Rng) -> Array1<f32> {
        Array1::from_iter((0..self.latent_dim()).map(|_| {
            let v: f32 = StandardNormal.sample(&mut *rng);
            v
        }))
    }

    /// Logits for one step; patterns longer than the weights cycle through them.
    fn step_logits<'a>(&self, logits: &'a Array1<f32>, step: usize) -> ArrayView1<'a, f32> {
        let classes = self.classes();
        let start = (step % self.steps) * classes;
        logits.slice(s![start..start + classes])
    }

    fn velocity(&self, step: usize, steps_per_quarter: usize, confidence: f64) -> i32 {
        let accent = if step % steps_per_quarter == 0 {
            self.accent
        } else {
            0
        };
        let swing = ((confidence - 0.5) * CONFIDENCE_VELOCITY_SPAN).round() as i32;
        self.base_velocity + accent + swing
    }

    fn decode_melody(
        &self,
        logits: &Array1<f32>,
        rng: &mut ChaCha8Rng,
        grid: &Grid,
    ) -> Result<Vec<RawNote>> {
        let mut notes = Vec::new();
        let mut current: Option<RawNote> = None;

        for step in 0..grid.length_steps {
            let probs = softmax_top_k(self.step_logits(logits, step), grid.temperature, grid.top_k);
            let distribution = WeightedIndex::new(probs.iter().map(|(_, p)| *p)).map_err(|e| {
                DaemonError::generation_failed(format!(
                    "step {} has no valid distribution: {}",
                    step, e
                ))
            })?;
            let (class, prob) = probs[distribution.sample(rng)];
            let onset = step as f64 * grid.step_seconds;

            match class {
                MELODY_REST => {
                    if let Some(note) = current.take() {
                        notes.push(note);
                    }
                }
                MELODY_HOLD => {
                    if let Some(note) = current.as_mut() {
                        note.end_time = onset + grid.step_seconds;
                    }
                }
                pitch_class => {
                    if let Some(note) = current.take() {
                        notes.push(note);
                    }
                    current = Some(RawNote {
                        pitch: self.vocab[pitch_class - MELODY_CONTROL_CLASSES],
                        velocity: self.velocity(step, grid.steps_per_quarter, prob),
                        start_time: onset,
                        end_time: onset + grid.step_seconds,
                    });
                }
            }
        }

        if let Some(note) = current {
            notes.push(note);
        }
        Ok(notes)
    }

    fn decode_drums(&self, logits: &Array1<f32>, rng: &mut ChaCha8Rng, grid: &Grid) -> Vec<RawNote> {
        let mut notes = Vec::new();

        for step in 0..grid.length_steps {
            let onset = step as f64 * grid.step_seconds;
            // Every voice draws each step so RNG consumption is independent of outcomes.
            for (voice, &logit) in self.step_logits(logits, step).iter().enumerate() {
                let prob = sigmoid(logit as f64 / grid.temperature);
                let draw: f64 = rng.gen();
                if draw < prob {
                    notes.push(RawNote {
                        pitch: self.vocab[voice],
                        velocity: self.velocity(step, grid.steps_per_quarter, prob),
                        start_time: onset,
                        end_time: onset + grid.step_seconds,
                    });
                }
            }
        }

        notes
    }
}

/// Resolved decode settings for one call.
struct Grid {
    temperature: f64,
    top_k: usize,
    qpm: f64,
    steps_per_quarter: usize,
    length_steps: usize,
    step_seconds: f64,
}

impl GenerativeModel for LatentDecoderModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn sample_and_decode(&self, params: &DecodingParams, seed: u64) -> Result<RawSequence> {
        let temperature = params.temperature();
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(DaemonError::generation_failed(format!(
                "temperature must be positive, got {}",
                temperature
            )));
        }
        let qpm = params.qpm().unwrap_or(DEFAULT_QPM);
        if !(qpm.is_finite() && qpm > 0.0) {
            return Err(DaemonError::generation_failed(format!(
                "qpm must be positive, got {}",
                qpm
            )));
        }
        let steps_per_quarter = params
            .steps_per_quarter()
            .unwrap_or(self.steps_per_quarter) as usize;
        let grid = Grid {
            temperature,
            top_k: params.top_k(),
            qpm,
            steps_per_quarter,
            length_steps: params.length_steps().map(|l| l as usize).unwrap_or(self.steps),
            step_seconds: 60.0 / qpm / steps_per_quarter as f64,
        };

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let z = self.sample_latent(&mut rng);
        let logits = self.weights.dot(&z) + &self.bias;

        let notes = match self.kind {
            DecoderKind::Melody => self.decode_melody(&logits, &mut rng, &grid)?,
            DecoderKind::Drums => self.decode_drums(&logits, &mut rng, &grid),
        };

        Ok(RawSequence {
            notes,
            tempo_bpm: grid.qpm,
            total_time: grid.length_steps as f64 * grid.step_seconds,
        })
    }
}

/// Temperature-scaled softmax over the top `k` logits (`k == 0` keeps all).
///
/// Returns `(class, probability)` pairs ordered from most to least likely;
/// ties keep class order so the result is deterministic.
fn softmax_top_k(logits: ArrayView1<f32>, temperature: f64, k: usize) -> Vec<(usize, f64)> {
    let mut scaled: Vec<(usize, f64)> = logits
        .iter()
        .enumerate()
        .map(|(i, &l)| (i, l as f64 / temperature))
        .collect();
    scaled.sort_by(|a, b| b.1.total_cmp(&a.1));
    if k > 0 {
        scaled.truncate(k);
    }

    let max = scaled.first().map(|(_, v)| *v).unwrap_or(0.0);
    let mut sum = 0.0;
    for entry in scaled.iter_mut() {
        entry.1 = (entry.1 - max).exp();
        sum += entry.1;
    }
    for entry in scaled.iter_mut() {
        entry.1 /= sum;
    }
    scaled
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checkpoint::FORMAT_VERSION;
    use ndarray::arr1;

    fn drums_checkpoint(bias: f32) -> Checkpoint {
        Checkpoint {
            format_version: FORMAT_VERSION,
            model_id: "test_drums".to_string(),
            version: "1".to_string(),
            kind: DecoderKind::Drums,
            latent_dim: 2,
            steps: 4,
            steps_per_quarter: 4,
            vocab: vec![36],
            base_velocity: 100,
            accent: 10,
            weights: vec![0.0; 4 * 2],
            bias: vec![bias; 4],
        }
    }

    fn melody_checkpoint() -> Checkpoint {
        // classes: rest, hold, 60, 64; step 0 forces 60, step 1 hold, step 2 rest, step 3 forces 64
        let bias = vec![
            -50.0, -50.0, 50.0, -50.0, //
            -50.0, 50.0, -50.0, -50.0, //
            50.0, -50.0, -50.0, -50.0, //
            -50.0, -50.0, -50.0, 50.0,
        ];
        Checkpoint {
            format_version: FORMAT_VERSION,
            model_id: "test_melody".to_string(),
            version: "1".to_string(),
            kind: DecoderKind::Melody,
            latent_dim: 3,
            steps: 4,
            steps_per_quarter: 4,
            vocab: vec![60, 64],
            base_velocity: 80,
            accent: 0,
            weights: vec![0.01; 16 * 3],
            bias,
        }
    }

    #[test]
    fn rejects_bad_checkpoint() {
        let mut ckpt = drums_checkpoint(0.0);
        ckpt.bias.pop();
        let err = LatentDecoderModel::from_checkpoint(ckpt).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ModelLoadFailed);
    }

    #[test]
    fn forced_melody_decodes_exactly() {
        let model = LatentDecoderModel::from_checkpoint(melody_checkpoint()).unwrap();
        let params = DecodingParams::new().with("qpm", 120.0);
        let seq = model.sample_and_decode(&params, 1).unwrap();

        assert_eq!(seq.notes.len(), 2);
        assert_eq!(seq.notes[0].pitch, 60);
        assert_eq!(seq.notes[0].start_time, 0.0);
        assert_eq!(seq.notes[0].end_time, 0.25);
        assert_eq!(seq.notes[1].pitch, 64);
        assert_eq!(seq.notes[1].start_time, 0.375);
        assert_eq!(seq.total_time, 0.5);
    }

    #[test]
    fn drums_always_and_never() {
        let always = LatentDecoderModel::from_checkpoint(drums_checkpoint(50.0)).unwrap();
        let seq = always.sample_and_decode(&DecodingParams::new(), 9).unwrap();
        assert_eq!(seq.notes.len(), 4);
        assert!(seq.notes.iter().all(|n| n.pitch == 36));
        // Accent on the downbeat
        assert!(seq.notes[0].velocity > seq.notes[1].velocity);

        let never = LatentDecoderModel::from_checkpoint(drums_checkpoint(-50.0)).unwrap();
        let seq = never.sample_and_decode(&DecodingParams::new(), 9).unwrap();
        assert!(seq.notes.is_empty());
    }

    #[test]
    fn longer_patterns_cycle_weights() {
        let model = LatentDecoderModel::from_checkpoint(drums_checkpoint(50.0)).unwrap();
        let params = DecodingParams::new().with("length_steps", 12.0);
        let seq = model.sample_and_decode(&params, 3).unwrap();
        assert_eq!(seq.notes.len(), 12);
        assert_eq!(seq.total_time, 12.0 * 0.125);
    }

    #[test]
    fn same_seed_same_output() {
        let mut ckpt = drums_checkpoint(0.0);
        ckpt.weights = vec![0.7, -0.4, 0.2, 0.9, -1.1, 0.3, 0.5, -0.6];
        let model = LatentDecoderModel::from_checkpoint(ckpt).unwrap();
        let params = DecodingParams::new().with("length_steps", 64.0);
        let a = model.sample_and_decode(&params, 42).unwrap();
        let b = model.sample_and_decode(&params, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let model = LatentDecoderModel::from_checkpoint(drums_checkpoint(0.0)).unwrap();
        let params = DecodingParams::new().with("temperature", 0.0);
        let err = model.sample_and_decode(&params, 1).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::GenerationFailed);
    }

    #[test]
    fn softmax_top_k_sums_to_one() {
        let logits = arr1(&[1.0f32, 3.0, 2.0, 0.5]);
        let probs = softmax_top_k(logits.view(), 1.0, 2);
        assert_eq!(probs.len(), 2);
        assert_eq!(probs[0].0, 1);
        assert_eq!(probs[1].0, 2);
        let total: f64 = probs.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn softmax_temperature_sharpens() {
        let logits = arr1(&[1.0f32, 2.0]);
        let warm = softmax_top_k(logits.view(), 2.0, 0);
        let cold = softmax_top_k(logits.view(), 0.5, 0);
        assert!(cold[0].1 > warm[0].1);
    }
}

//! On-disk checkpoint format for latent decoder models.
//!
//! A checkpoint is a single JSON document holding the decoder weight matrix
//! (one row per step/class pair, one column per latent dimension), the bias,
//! and the vocabulary mapping classes to MIDI pitches.

use serde::{Deserialize, Serialize};

/// Checkpoint format understood by this build.
pub const FORMAT_VERSION: u32 = 1;

/// How a decoder step is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    /// One categorical choice per step over {rest, hold, pitch...}.
    Melody,
    /// One independent on/off choice per drum voice per step.
    Drums,
}

/// Number of non-pitch classes at the start of a melody step.
pub const MELODY_CONTROL_CLASSES: usize = 2;

/// Melody class index for "no note".
pub const MELODY_REST: usize = 0;

/// Melody class index for "continue the previous note".
pub const MELODY_HOLD: usize = 1;

/// Serialized latent decoder weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub model_id: String,
    /// Weights version, bumped whenever the weights change.
    pub version: String,
    pub kind: DecoderKind,
    pub latent_dim: usize,
    /// Steps covered by the weights; longer patterns cycle through them.
    pub steps: usize,
    pub steps_per_quarter: u32,
    /// MIDI pitch for each pitch class (melody) or drum voice (drums).
    pub vocab: Vec<i32>,
    /// Velocity before accent and confidence adjustment.
    pub base_velocity: i32,
    /// Extra velocity on quarter-note steps.
    pub accent: i32,
    /// Row-major `(steps * classes) x latent_dim` weight matrix.
    pub weights: Vec<f32>,
    /// One bias per `(step, class)` row.
    pub bias: Vec<f32>,
}

impl Checkpoint {
    /// Number of classes decoded per step.
    pub fn classes(&self) -> usize {
        match self.kind {
            DecoderKind::Melody => self.vocab.len() + MELODY_CONTROL_CLASSES,
            DecoderKind::Drums => self.vocab.len(),
        }
    }

    /// Number of rows in the weight matrix.
    pub fn rows(&self) -> usize {
        self.steps * self.classes()
    }

    /// Checks that the checkpoint is internally consistent.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.format_version != FORMAT_VERSION {
            return Some(format!(
                "unsupported checkpoint format {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.latent_dim == 0 {
            return Some("latent_dim must be > 0".to_string());
        }
        if self.steps == 0 {
            return Some("steps must be > 0".to_string());
        }
        if self.steps_per_quarter == 0 {
            return Some("steps_per_quarter must be > 0".to_string());
        }
        if self.vocab.is_empty() {
            return Some("vocab must not be empty".to_string());
        }
        let expected_weights = self.rows() * self.latent_dim;
        if self.weights.len() != expected_weights {
            return Some(format!(
                "weights has {} entries, expected {} ({} rows x {} latent)",
                self.weights.len(),
                expected_weights,
                self.rows(),
                self.latent_dim
            ));
        }
        if self.bias.len() != self.rows() {
            return Some(format!(
                "bias has {} entries, expected {}",
                self.bias.len(),
                self.rows()
            ));
        }
        if self.weights.iter().chain(self.bias.iter()).any(|w| !w.is_finite()) {
            return Some("weights contain non-finite values".to_string());
        }
        None
    }
}

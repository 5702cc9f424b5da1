//! Pattern generation pipeline.
//!
//! Resolves the seed and tempo for a request, drives the model's
//! sample-and-decode step with the profile's decoding parameters, and shapes
//! the raw output into a [`NoteSequence`].

use log::info;

use crate::error::{DaemonError, Result};
use crate::models::{version_label, GenerativeModel, SharedModel};
use crate::types::{
    compute_pattern_id, DecodingParams, Genre, Instrument, InstrumentProfile, NoteSequence,
};

use super::postprocess::shape;

/// Slowest tempo accepted for a pattern.
pub const MIN_TEMPO_BPM: f64 = 40.0;

/// Fastest tempo accepted for a pattern.
pub const MAX_TEMPO_BPM: f64 = 240.0;

/// Per-request generation options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationRequest {
    /// Genre that selected the model; recorded in the pattern id and filename.
    pub genre: Genre,
    /// Seed used verbatim when present; drawn at random otherwise.
    pub seed: Option<u64>,
    /// Overrides the profile tempo.
    pub tempo_bpm: Option<f64>,
}

impl GenerationRequest {
    /// Creates a pop request using a random seed and the profile tempo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the genre.
    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = genre;
        self
    }

    /// Sets an explicit seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets a tempo override.
    pub fn with_tempo(mut self, tempo_bpm: f64) -> Self {
        self.tempo_bpm = Some(tempo_bpm);
        self
    }

    /// Validates the request parameters.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        match self.tempo_bpm {
            Some(bpm) if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&bpm) => Some(format!(
                "bpm must be between {} and {}, got {}",
                MIN_TEMPO_BPM, MAX_TEMPO_BPM, bpm
            )),
            _ => None,
        }
    }
}

/// A generated pattern and the inputs that reproduce it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPattern {
    pub genre: Genre,
    pub instrument: Instrument,
    pub sequence: NoteSequence,
    /// Seed actually used.
    pub seed: u64,
    pub tempo_bpm: f64,
    /// `model_id@version` of the model that produced the pattern.
    pub model_version: String,
    /// Fingerprint of genre, instrument, seed, tempo and model version.
    pub pattern_id: String,
}

impl GeneratedPattern {
    /// Download filename: `{genre}_{instrument}_{bpm}bpm.mid`.
    pub fn filename(&self) -> String {
        format!("{}_{}_{}bpm.mid", self.genre, self.instrument, self.tempo_bpm)
    }
}

/// Generates a pattern for `profile` with an already loaded model.
///
/// Runs inference on the calling thread. The same model, profile and explicit
/// seed always produce the same pattern.
pub fn generate(
    model: &dyn GenerativeModel,
    profile: &InstrumentProfile,
    request: &GenerationRequest,
) -> Result<GeneratedPattern> {
    if let Some(reason) = request.validate() {
        return Err(DaemonError::invalid_params(reason));
    }

    let seed = request.seed.unwrap_or_else(rand::random);
    let tempo_bpm = request.tempo_bpm.unwrap_or(profile.tempo_bpm);
    let params = DecodingParams::from_pairs(profile.decoding_params)
        .with("qpm", tempo_bpm)
        .with("steps_per_quarter", profile.steps_per_quarter as f64)
        .with("length_steps", profile.default_length_steps as f64);

    let raw = model.sample_and_decode(&params, seed)?;
    let sequence = shape(&raw, profile, tempo_bpm)?;

    let model_version = version_label(model);
    let pattern_id = compute_pattern_id(
        request.genre,
        profile.instrument,
        seed,
        tempo_bpm,
        &model_version,
    );
    info!(
        "Generated {} '{}' pattern {} ({} notes, seed {}, {} BPM, {})",
        request.genre,
        profile.name(),
        pattern_id,
        sequence.len(),
        seed,
        tempo_bpm,
        model_version
    );

    Ok(GeneratedPattern {
        genre: request.genre,
        instrument: profile.instrument,
        sequence,
        seed,
        tempo_bpm,
        model_version,
        pattern_id,
    })
}

/// Runs [`generate`] on the blocking thread pool.
///
/// Keeps the async runtime free while the model decodes. A panic inside the
/// model is reported as a generation failure.
pub async fn generate_offloaded(
    model: SharedModel,
    profile: &'static InstrumentProfile,
    request: GenerationRequest,
) -> Result<GeneratedPattern> {
    tokio::task::spawn_blocking(move || generate(model.as_ref(), profile, &request))
        .await
        .map_err(|e| DaemonError::generation_failed(format!("inference task failed: {}", e)))?
}

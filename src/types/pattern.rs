//! Pattern identifiers.
//!
//! A pattern id is a deterministic fingerprint of everything that determines
//! a generated pattern, so identical requests can be recognized in logs and
//! by clients.

use sha2::{Digest, Sha256};

use super::{Genre, Instrument};

/// Computes a deterministic pattern ID from generation parameters.
///
/// The pattern ID is the first 16 hex characters of the SHA256 hash of:
/// `{genre}:{instrument}:{seed}:{tempo_bpm}:{model_version}`
pub fn compute_pattern_id(
    genre: Genre,
    instrument: Instrument,
    seed: u64,
    tempo_bpm: f64,
    model_version: &str,
) -> String {
    let input = format!(
        "{}:{}:{}:{}:{}",
        genre, instrument, seed, tempo_bpm, model_version
    );
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

//! Request and response types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};
use crate::generation::GenerationRequest;
use crate::types::{resolve, Genre, InstrumentProfile, ModelFamily, DEFAULT_GENRE, DEFAULT_INSTRUMENT};

/// MIME type of generated patterns.
pub const MIDI_CONTENT_TYPE: &str = "audio/midi";

/// Header carrying the seed a pattern was generated with.
pub const SEED_HEADER: &str = "x-pattern-seed";

/// Header carrying the pattern fingerprint.
pub const PATTERN_ID_HEADER: &str = "x-pattern-id";

/// Query string of `GET /generate-midi`.
///
/// Fields are kept as raw strings so malformed values produce a JSON error
/// body instead of the extractor's plain-text rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateQuery {
    pub instrument: Option<String>,
    pub genre: Option<String>,
    pub seed: Option<String>,
    pub bpm: Option<String>,
}

impl GenerateQuery {
    /// Query for `instrument` with no other parameters.
    pub fn for_instrument(instrument: &str) -> Self {
        Self {
            instrument: Some(instrument.to_string()),
            ..Self::default()
        }
    }

    /// Resolves the instrument profile and generation options.
    ///
    /// The instrument is checked first so an unknown name is reported even
    /// when other parameters are also malformed. Whether the genre has a
    /// model for the instrument is checked when the model is selected.
    pub fn parse(&self) -> Result<(&'static InstrumentProfile, GenerationRequest)> {
        let profile = match self.instrument.as_deref() {
            Some(name) => resolve(name)?,
            None => DEFAULT_INSTRUMENT.profile(),
        };
        let genre = match self.genre.as_deref() {
            Some(name) => name.parse::<Genre>()?,
            None => DEFAULT_GENRE,
        };

        let mut request = GenerationRequest::new().with_genre(genre);
        if let Some(ref raw) = self.seed {
            let seed = raw.trim().parse::<u64>().map_err(|_| {
                DaemonError::invalid_params(format!("seed must be an unsigned integer, got '{}'", raw))
            })?;
            request = request.with_seed(seed);
        }
        if let Some(ref raw) = self.bpm {
            let bpm = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| DaemonError::invalid_params(format!("bpm must be a number, got '{}'", raw)))?;
            request = request.with_tempo(bpm);
        }
        if let Some(reason) = request.validate() {
            return Err(DaemonError::invalid_params(reason));
        }

        Ok((profile, request))
    }
}

/// JSON error body. `detail` is shown to users verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

impl From<&DaemonError> for ErrorResponse {
    fn from(err: &DaemonError) -> Self {
        Self {
            detail: err.client_detail(),
            code: err.code.as_str().to_string(),
        }
    }
}

/// Response of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub version: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub loaded_models: Vec<String>,
}

/// Model a genre uses for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreModel {
    pub genre: String,
    pub model_id: String,
}

/// One entry of `GET /instruments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentInfo {
    pub name: String,
    pub family: String,
    /// Genres that support this instrument, with the model each uses.
    pub models: Vec<GenreModel>,
    pub midi_program: u8,
    pub channel: u8,
    pub tempo_bpm: f64,
    pub length_steps: u32,
}

impl From<&InstrumentProfile> for InstrumentInfo {
    fn from(profile: &InstrumentProfile) -> Self {
        Self {
            name: profile.name().to_string(),
            family: profile.family().as_str().to_string(),
            models: Genre::ALL
                .iter()
                .filter_map(|genre| {
                    genre.model_id(profile.family()).map(|model_id| GenreModel {
                        genre: genre.as_str().to_string(),
                        model_id: model_id.to_string(),
                    })
                })
                .collect(),
            midi_program: profile.midi_program,
            channel: profile.channel,
            tempo_bpm: profile.tempo_bpm,
            length_steps: profile.default_length_steps,
        }
    }
}

/// One entry of the genre list in `GET /instruments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreInfo {
    pub name: String,
    /// Model families the genre has a model for.
    pub families: Vec<String>,
}

impl From<Genre> for GenreInfo {
    fn from(genre: Genre) -> Self {
        Self {
            name: genre.as_str().to_string(),
            families: ModelFamily::ALL
                .iter()
                .filter(|family| genre.model_id(**family).is_some())
                .map(|family| family.as_str().to_string())
                .collect(),
        }
    }
}

/// Response of `GET /instruments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentsResponse {
    pub instruments: Vec<InstrumentInfo>,
    pub genres: Vec<GenreInfo>,
    pub default_genre: String,
}

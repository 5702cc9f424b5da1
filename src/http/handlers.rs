//! HTTP request handlers.
//!
//! `GET /generate-midi` resolves the instrument, selects the genre's model,
//! fetches it from the cache, generates on the blocking pool and encodes the
//! full MIDI file before responding.

use axum::extract::{Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, info, warn};

use crate::error::{DaemonError, ErrorKind, Result};
use crate::generation::generate_offloaded;
use crate::midi::encode;
use crate::types::{Genre, Instrument, DEFAULT_GENRE};

use super::server::AppState;
use super::types::{
    ErrorResponse, GenerateQuery, GenreInfo, HealthResponse, InstrumentInfo, InstrumentsResponse,
    StatusResponse, MIDI_CONTENT_TYPE, PATTERN_ID_HEADER, SEED_HEADER,
};

/// Error half of handler results.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// A fully encoded pattern ready to send.
#[derive(Debug, Clone)]
pub struct MidiResponse {
    pub filename: String,
    pub seed: u64,
    pub pattern_id: String,
    pub bytes: Vec<u8>,
}

impl IntoResponse for MidiResponse {
    fn into_response(self) -> Response {
        let headers = [
            (header::CONTENT_TYPE, MIDI_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", self.filename),
            ),
            (HeaderName::from_static(SEED_HEADER), self.seed.to_string()),
            (HeaderName::from_static(PATTERN_ID_HEADER), self.pattern_id),
        ];
        (StatusCode::OK, headers, self.bytes).into_response()
    }
}

/// Runs one generation request end to end.
pub async fn handle(state: &AppState, query: &GenerateQuery) -> Result<MidiResponse> {
    let (profile, request) = query.parse()?;
    info!(
        "Request: instrument={}, genre={}, seed={:?}, bpm={:?}",
        profile.name(),
        request.genre,
        request.seed,
        request.tempo_bpm
    );

    let model_id = request.genre.model_for(profile)?;
    let model = state.cache.get_or_load(model_id).await?;
    let pattern = generate_offloaded(model, profile, request).await?;
    let midi = encode(&pattern.sequence, profile).map_err(|e| {
        error!(
            "Encoding pattern {} failed (instrument={}, seed={}, {} notes, model {}): {}",
            pattern.pattern_id,
            profile.name(),
            pattern.seed,
            pattern.sequence.len(),
            pattern.model_version,
            e
        );
        e
    })?;

    let filename = pattern.filename();
    info!(
        "Serving {} ({} bytes, pattern {})",
        filename,
        midi.len(),
        pattern.pattern_id
    );
    Ok(MidiResponse {
        filename,
        seed: pattern.seed,
        pattern_id: pattern.pattern_id,
        bytes: midi.into_bytes(),
    })
}

/// Maps a daemon error to a status and JSON body, logging it.
pub fn error_response(err: &DaemonError) -> ApiError {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match err.kind() {
        ErrorKind::UnknownInstrument | ErrorKind::InvalidRequest => {
            warn!("Rejected request ({}): {}", status.as_u16(), err.message)
        }
        _ => match std::error::Error::source(err) {
            Some(cause) => error!("Request failed ({}): {} (cause: {})", status.as_u16(), err, cause),
            None => error!("Request failed ({}): {}", status.as_u16(), err),
        },
    }
    (status, Json(ErrorResponse::from(err)))
}

/// `GET /generate-midi`
pub async fn generate_midi_handler(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
) -> std::result::Result<MidiResponse, ApiError> {
    handle(&state, &query).await.map_err(|e| error_response(&e))
}

/// `GET /`
pub async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "MIDI generator daemon is running.".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        loaded_models: state.cache.loaded_ids(),
    })
}

/// `GET /instruments`
pub async fn instruments_handler() -> Json<InstrumentsResponse> {
    Json(InstrumentsResponse {
        instruments: Instrument::ALL
            .iter()
            .map(|i| InstrumentInfo::from(i.profile()))
            .collect(),
        genres: Genre::ALL.iter().copied().map(GenreInfo::from).collect(),
        default_genre: DEFAULT_GENRE.as_str().to_string(),
    })
}

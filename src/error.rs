//! Error types for the midigen daemon.
//!
//! Defines all error codes and types used throughout the daemon for
//! consistent error handling and reporting.

use std::fmt;
use std::sync::Arc;

use crate::types::Instrument;

/// Error codes returned by the daemon in error responses.
///
/// These codes are serialized into the JSON error body and allow clients
/// and operators to tell failure classes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Requested instrument is not in the registry.
    /// Trigger: `instrument` query value outside the fixed set.
    UnknownInstrument,

    /// A request parameter other than the instrument is malformed.
    /// Trigger: unparseable seed, tempo outside 40-240 BPM.
    InvalidParams,

    /// Model checkpoint not found at expected path.
    /// Trigger: `<model_id>.json` missing from the model directory.
    ModelNotFound,

    /// Failed to load a model checkpoint into memory.
    /// Trigger: Corrupt file, wrong format version, shape mismatch.
    ModelLoadFailed,

    /// The model produced an empty or malformed note sequence.
    /// Trigger: Zero notes, non-finite timings, inverted notes.
    GenerationFailed,

    /// Serializing a note sequence to MIDI violated an internal invariant.
    /// Trigger: Negative delta time or out-of-range event data.
    EncodingFailed,
}

/// Coarse failure class used for response mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller sent an instrument name we do not serve.
    UnknownInstrument,
    /// Caller sent a malformed parameter.
    InvalidRequest,
    /// Model artifact missing or incompatible.
    ModelLoad,
    /// Model output rejected.
    Generation,
    /// MIDI serialization invariant broken.
    Encoding,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnknownInstrument => "UNKNOWN_INSTRUMENT",
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelLoadFailed => "MODEL_LOAD_FAILED",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::EncodingFailed => "ENCODING_FAILED",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UnknownInstrument => "Instrument is not in the registry",
            ErrorCode::InvalidParams => "Request parameter is invalid",
            ErrorCode::ModelNotFound => "Model checkpoint not found at expected path",
            ErrorCode::ModelLoadFailed => "Failed to load model checkpoint",
            ErrorCode::GenerationFailed => "Model produced an unusable note sequence",
            ErrorCode::EncodingFailed => "Failed to serialize the pattern as MIDI",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::UnknownInstrument => {
                "Use one of: lead, pluck, keys, pad, drums, kick, snare, closed_hat, open_hat, clap"
            }
            ErrorCode::InvalidParams => {
                "Pass seed as an unsigned integer and bpm between 40 and 240"
            }
            ErrorCode::ModelNotFound => {
                "Run the daemon with --install-models to write the built-in checkpoints, \
                 or point MIDIGEN_MODEL_PATH at a directory containing them"
            }
            ErrorCode::ModelLoadFailed => {
                "Delete the checkpoint file and reinstall it with --install-models"
            }
            ErrorCode::GenerationFailed => "Retry the request with a different seed",
            ErrorCode::EncodingFailed => {
                "This indicates a bug in pattern post-processing; please report it with the seed"
            }
        }
    }

    /// Returns the failure class this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::UnknownInstrument => ErrorKind::UnknownInstrument,
            ErrorCode::InvalidParams => ErrorKind::InvalidRequest,
            ErrorCode::ModelNotFound | ErrorCode::ModelLoadFailed => ErrorKind::ModelLoad,
            ErrorCode::GenerationFailed => ErrorKind::Generation,
            ErrorCode::EncodingFailed => ErrorKind::Encoding,
        }
    }

    /// Returns the HTTP status code used when this error reaches a client.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::UnknownInstrument | ErrorKind::InvalidRequest => 400,
            ErrorKind::ModelLoad | ErrorKind::Generation | ErrorKind::Encoding => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for daemon operations.
///
/// Cloneable so a single model-load failure can be handed to every request
/// that was waiting on that load.
#[derive(Debug, Clone)]
pub struct DaemonError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl DaemonError {
    /// Creates a new DaemonError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new DaemonError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Creates an UNKNOWN_INSTRUMENT error.
    pub fn unknown_instrument(name: &str) -> Self {
        let accepted: Vec<&str> = Instrument::ALL.iter().map(|i| i.as_str()).collect();
        Self::new(
            ErrorCode::UnknownInstrument,
            format!(
                "Invalid instrument: '{}' (expected one of: {})",
                name,
                accepted.join(", ")
            ),
        )
    }

    /// Creates an INVALID_PARAMS error.
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, reason)
    }

    /// Creates a MODEL_NOT_FOUND error.
    pub fn model_not_found(model_id: &str, path: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ModelNotFound,
            format!("AI model '{}' not found at: {}", model_id, path),
        )
    }

    /// Creates a MODEL_LOAD_FAILED error.
    pub fn model_load_failed(model_id: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelLoadFailed,
            format!("AI model '{}' could not be loaded: {}", model_id, reason.into()),
        )
    }

    /// Creates a GENERATION_FAILED error.
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    /// Creates an ENCODING_FAILED error.
    pub fn encoding_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EncodingFailed,
            format!("MIDI encoding failed: {}", reason.into()),
        )
    }

    /// Returns the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Message safe to show to a client: the message without the cause chain.
    pub fn client_detail(&self) -> String {
        self.message.clone()
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using DaemonError.
pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_as_str() {
        assert_eq!(ErrorCode::UnknownInstrument.as_str(), "UNKNOWN_INSTRUMENT");
        assert_eq!(ErrorCode::InvalidParams.as_str(), "INVALID_PARAMS");
        assert_eq!(ErrorCode::ModelNotFound.as_str(), "MODEL_NOT_FOUND");
        assert_eq!(ErrorCode::ModelLoadFailed.as_str(), "MODEL_LOAD_FAILED");
        assert_eq!(ErrorCode::GenerationFailed.as_str(), "GENERATION_FAILED");
        assert_eq!(ErrorCode::EncodingFailed.as_str(), "ENCODING_FAILED");
    }

    #[test]
    fn error_code_recovery_hints_not_empty() {
        for code in [
            ErrorCode::UnknownInstrument,
            ErrorCode::InvalidParams,
            ErrorCode::ModelNotFound,
            ErrorCode::ModelLoadFailed,
            ErrorCode::GenerationFailed,
            ErrorCode::EncodingFailed,
        ] {
            assert!(!code.recovery_hint().is_empty());
            assert!(!code.description().is_empty());
        }
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorCode::UnknownInstrument.http_status(), 400);
        assert_eq!(ErrorCode::InvalidParams.http_status(), 400);
        assert_eq!(ErrorCode::ModelNotFound.http_status(), 500);
        assert_eq!(ErrorCode::ModelLoadFailed.http_status(), 500);
        assert_eq!(ErrorCode::GenerationFailed.http_status(), 500);
        assert_eq!(ErrorCode::EncodingFailed.http_status(), 500);
    }

    #[test]
    fn model_errors_share_kind() {
        assert_eq!(ErrorCode::ModelNotFound.kind(), ErrorKind::ModelLoad);
        assert_eq!(ErrorCode::ModelLoadFailed.kind(), ErrorKind::ModelLoad);
    }

    #[test]
    fn unknown_instrument_lists_accepted_names() {
        let err = DaemonError::unknown_instrument("trumpet");
        assert!(err.message.contains("trumpet"));
        assert!(err.message.contains("closed_hat"));
        assert_eq!(err.code.http_status(), 400);
    }

    #[test]
    fn daemon_error_display() {
        let err = DaemonError::model_not_found("pad_v1", "/models/pad_v1.json");
        assert!(err.to_string().contains("MODEL_NOT_FOUND"));
        assert!(err.to_string().contains("pad_v1"));
        assert!(err.to_string().contains("Recovery:"));
    }

    #[test]
    fn client_detail_omits_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = DaemonError::with_source(ErrorCode::ModelLoadFailed, "bad checkpoint", io);
        assert_eq!(err.client_detail(), "bad checkpoint");
        assert!(std::error::Error::source(&err).is_some());
        let cloned = err.clone();
        assert_eq!(cloned.code, ErrorCode::ModelLoadFailed);
    }
}

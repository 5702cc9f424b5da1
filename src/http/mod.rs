//! HTTP API.
//!
//! Endpoints:
//! - `GET /` - Service banner
//! - `GET /health` - Health check with loaded model ids
//! - `GET /instruments` - Instrument and genre registry
//! - `GET /generate-midi?instrument=&genre=&seed=&bpm=` - Generate one MIDI pattern
//!
//! Failures return `{"detail": ..., "code": ...}` with 400 for client errors
//! and 500 for model, generation and encoding errors. Browser origins on the
//! configured allow-list get CORS headers.

pub mod handlers;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use handlers::{error_response, handle, MidiResponse};
pub use server::{cors_layer, create_router, run_server, serve, AppState};
pub use types::{ErrorResponse, GenerateQuery, MIDI_CONTENT_TYPE};

//! midigen-daemon: MIDI pattern generation service.
//!
//! Given an instrument role and a genre, the daemon loads the genre's model
//! for that role's family, samples and decodes a short pattern, and serves it
//! as a Standard MIDI File over HTTP.
//!
//! # Modules
//!
//! - [`types`]: Instrument and genre registries, note data (Instrument, Genre, NoteSequence)
//! - [`models`]: Generative models and checkpoint loading
//! - [`cache`]: Single-build-per-key model cache
//! - [`generation`]: Sample, decode and post-process patterns
//! - [`midi`]: Standard MIDI File encoding
//! - [`http`]: axum router and handlers
//! - [`config`]: Runtime configuration (DaemonConfig)
//! - [`error`]: Error types and codes (DaemonError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use midigen_daemon::{
//!     generation::{generate, GenerationRequest},
//!     midi::encode,
//!     models::{BuiltinModelSource, ModelSource},
//!     types::{resolve, Genre},
//! };
//!
//! let profile = resolve("kick")?;
//! let model = BuiltinModelSource.load(Genre::Hiphop.model_for(profile)?)?;
//! let request = GenerationRequest::new().with_genre(Genre::Hiphop).with_seed(42);
//! let pattern = generate(model.as_ref(), profile, &request)?;
//! let midi = encode(&pattern.sequence, profile)?;
//! std::fs::write(pattern.filename(), midi.as_bytes())?;
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod http;
pub mod midi;
pub mod models;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use cache::ModelCache;
pub use config::DaemonConfig;
pub use error::{DaemonError, ErrorCode, ErrorKind, Result};
pub use generation::{generate, GeneratedPattern, GenerationRequest};
pub use midi::{encode, MidiFile};
pub use types::{resolve, Genre, Instrument, InstrumentProfile, Note, NoteSequence};

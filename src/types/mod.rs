//! Core types for the midigen daemon.
//!
//! This module re-exports all the core data types used throughout the daemon:
//! - [`Instrument`] / [`InstrumentProfile`]: the fixed instrument registry
//! - [`Genre`]: genre-to-model selection per model family
//! - [`NoteSequence`]: post-processed notes ready for MIDI encoding
//! - [`DecodingParams`]: per-decode model parameters

mod genre;
mod instrument;
mod note;
mod params;
mod pattern;

// Re-export all types at the module level
pub use genre::{registered_model_ids, Genre, DEFAULT_GENRE};
pub use instrument::{
    resolve, Instrument, InstrumentProfile, ModelFamily, CINEMATIC_MODEL_ID, DEFAULT_INSTRUMENT,
    DRUMS_MODEL_ID, GROOVE_MODEL_ID, MELODY_MODEL_ID, PAD_MODEL_ID, PERCUSSION_CHANNEL,
    RIFF_MODEL_ID,
};
pub use note::{Note, NoteSequence, RawNote, RawSequence};
pub use params::{DecodingParams, DEFAULT_TEMPERATURE};
pub use pattern::compute_pattern_id;

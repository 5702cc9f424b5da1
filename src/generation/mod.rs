//! Pattern generation module.
//!
//! Drives a loaded model through sample-and-decode and shapes the output
//! into a note sequence ready for MIDI encoding.

pub mod pipeline;
pub mod postprocess;

// Re-export commonly used items
pub use pipeline::{
    generate, generate_offloaded, GeneratedPattern, GenerationRequest, MAX_TEMPO_BPM,
    MIN_TEMPO_BPM,
};
pub use postprocess::{shape, validate_raw};

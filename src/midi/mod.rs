//! MIDI output.
//!
//! Serializes note sequences into Standard MIDI Files.

pub mod encoder;

pub use encoder::{encode, seconds_to_ticks, MidiFile, TICKS_PER_QUARTER};

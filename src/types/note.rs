//! Symbolic note sequences.
//!
//! [`RawSequence`] is what a model emits: wide integer fields and timings that
//! may fall outside musical bounds. [`NoteSequence`] is the post-processed
//! form handed to the MIDI encoder and always satisfies MIDI ranges.

use serde::Serialize;

/// A single decoded note before post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawNote {
    pub pitch: i32,
    pub velocity: i32,
    /// Onset in seconds.
    pub start_time: f64,
    /// Release in seconds.
    pub end_time: f64,
}

/// Model output for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSequence {
    pub notes: Vec<RawNote>,
    /// Tempo the timings were rendered at.
    pub tempo_bpm: f64,
    pub total_time: f64,
}

/// A note with MIDI-valid pitch and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Note {
    /// MIDI key, 0-127.
    pub pitch: u8,
    /// MIDI velocity, 1-127.
    pub velocity: u8,
    pub start_time: f64,
    pub end_time: f64,
}

impl Note {
    /// Length of the note in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Ordered, post-processed note events plus tempo and total duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSequence {
    pub notes: Vec<Note>,
    pub tempo_bpm: f64,
    pub total_time: f64,
}

impl NoteSequence {
    /// Returns the number of notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Returns true if there are no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Checks the sequence invariants.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Some(format!("tempo must be positive, got {}", self.tempo_bpm));
        }

        let mut last_start = 0.0;
        for (i, note) in self.notes.iter().enumerate() {
            if note.pitch > 127 {
                return Some(format!("note {}: pitch {} out of range", i, note.pitch));
            }
            if !(1..=127).contains(&note.velocity) {
                return Some(format!("note {}: velocity {} out of range", i, note.velocity));
            }
            if !(note.start_time.is_finite() && note.start_time >= 0.0) {
                return Some(format!("note {}: invalid onset {}", i, note.start_time));
            }
            if !(note.end_time > note.start_time) {
                return Some(format!(
                    "note {}: end {} not after start {}",
                    i, note.end_time, note.start_time
                ));
            }
            if note.start_time < last_start {
                return Some(format!("note {}: onsets out of order", i));
            }
            last_start = note.start_time;
        }

        None
    }
}

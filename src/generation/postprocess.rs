//! Post-processing of raw model output.
//!
//! Raw sequences are validated first and rejected rather than repaired when
//! malformed. Valid sequences are then shaped onto the profile's step grid:
//! drum-piece filtering, onset quantization, pad sustain, boundary clipping,
//! range clamping, ordering, and same-pitch overlap trimming. All arithmetic
//! after quantization is on integer steps, so the result is deterministic.

use log::debug;

use crate::error::{DaemonError, Result};
use crate::types::{InstrumentProfile, Note, NoteSequence, RawSequence};

/// A note placed on the step grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridNote {
    pitch: u8,
    velocity: u8,
    onset: u32,
    end: u32,
}

/// Rejects raw output that cannot be turned into a pattern.
pub fn validate_raw(raw: &RawSequence) -> Result<()> {
    if raw.notes.is_empty() {
        return Err(DaemonError::generation_failed("model returned zero notes"));
    }

    for (i, note) in raw.notes.iter().enumerate() {
        if !note.start_time.is_finite() || !note.end_time.is_finite() {
            return Err(DaemonError::generation_failed(format!(
                "note {} has non-finite timing",
                i
            )));
        }
        if note.start_time < 0.0 {
            return Err(DaemonError::generation_failed(format!(
                "note {} starts before zero ({})",
                i, note.start_time
            )));
        }
        if note.end_time <= note.start_time {
            return Err(DaemonError::generation_failed(format!(
                "note {} ends at {} before it starts at {}",
                i, note.end_time, note.start_time
            )));
        }
    }

    Ok(())
}

/// Shapes a validated raw sequence into a playable pattern at `tempo_bpm`.
pub fn shape(raw: &RawSequence, profile: &InstrumentProfile, tempo_bpm: f64) -> Result<NoteSequence> {
    validate_raw(raw)?;

    // Raw times are in seconds at the tempo the model decoded at.
    let source_tempo = if raw.tempo_bpm.is_finite() && raw.tempo_bpm > 0.0 {
        raw.tempo_bpm
    } else {
        tempo_bpm
    };
    let steps_per_second = source_tempo / 60.0 * profile.steps_per_quarter as f64;
    let length = profile.default_length_steps;
    let sustain_steps = profile
        .sustain_beats
        .map(|beats| (beats * profile.steps_per_quarter as f64).round() as u32);

    let mut notes: Vec<GridNote> = Vec::with_capacity(raw.notes.len());
    let mut filtered = 0usize;
    let mut clipped = 0usize;

    for raw_note in &raw.notes {
        if let Some(allowed) = profile.allowed_pitches {
            let keep = u8::try_from(raw_note.pitch)
                .map(|p| allowed.contains(&p))
                .unwrap_or(false);
            if !keep {
                filtered += 1;
                continue;
            }
        }

        let onset = quantize(raw_note.start_time * steps_per_second);
        if onset >= length {
            clipped += 1;
            continue;
        }

        let mut end = quantize(raw_note.end_time * steps_per_second).max(onset.saturating_add(1));
        if let Some(sustain) = sustain_steps {
            end = end.max(onset.saturating_add(sustain));
        }
        end = end.min(length);

        notes.push(GridNote {
            pitch: clamp_to(raw_note.pitch, profile.pitch_range, 0),
            velocity: clamp_to(raw_note.velocity, profile.velocity_range, 1),
            onset,
            end,
        });
    }

    // Stable: equal (onset, pitch) keys keep model order.
    notes.sort_by_key(|n| (n.onset, n.pitch));
    let before_trim = notes.len();
    let notes = trim_overlaps(notes);

    debug!(
        "Shaped {} raw notes for '{}': {} filtered, {} past boundary, {} duplicates, {} kept",
        raw.notes.len(),
        profile.name(),
        filtered,
        clipped,
        before_trim - notes.len(),
        notes.len()
    );

    if notes.is_empty() {
        return Err(DaemonError::generation_failed(format!(
            "no notes survived post-processing for '{}'",
            profile.name()
        )));
    }

    let step_seconds = profile.step_seconds(tempo_bpm);
    let sequence = NoteSequence {
        notes: notes
            .into_iter()
            .map(|n| Note {
                pitch: n.pitch,
                velocity: n.velocity,
                start_time: n.onset as f64 * step_seconds,
                end_time: n.end as f64 * step_seconds,
            })
            .collect(),
        tempo_bpm,
        total_time: profile.length_seconds(tempo_bpm),
    };

    if let Some(reason) = sequence.validate() {
        return Err(DaemonError::generation_failed(reason));
    }
    Ok(sequence)
}

fn quantize(steps: f64) -> u32 {
    // Validated times are finite and non-negative; the cast saturates.
    steps.round() as u32
}

/// Clamps into `range` and then into `floor..=127`.
fn clamp_to(value: i32, range: (u8, u8), floor: u8) -> u8 {
    let (lo, hi) = range;
    let clamped = value.clamp(lo as i32, hi as i32).clamp(floor as i32, 127);
    clamped as u8
}

/// Ends each note no later than the next onset of the same pitch.
///
/// Expects notes sorted by onset. A note sharing onset and pitch with an
/// earlier one is dropped.
fn trim_overlaps(notes: Vec<GridNote>) -> Vec<GridNote> {
    let mut last_by_pitch: [Option<usize>; 128] = [None; 128];
    let mut kept: Vec<GridNote> = Vec::with_capacity(notes.len());

    for note in notes {
        let slot = &mut last_by_pitch[note.pitch as usize];
        if let Some(prev_idx) = *slot {
            let prev = &mut kept[prev_idx];
            if prev.onset == note.onset {
                continue;
            }
            if prev.end > note.onset {
                prev.end = note.onset;
            }
        }
        *slot = Some(kept.len());
        kept.push(note);
    }

    kept
}

//! Standard MIDI File encoding of note sequences.
//!
//! Produces a format 0 file with a single track: track name, tempo, program
//! change, the note events in time order, and end-of-track at the pattern
//! boundary. Uses the `midly` crate for chunk and VLQ serialization.

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use crate::error::{DaemonError, ErrorCode, Result};
use crate::types::{InstrumentProfile, NoteSequence};

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// An encoded Standard MIDI File.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile {
    bytes: Vec<u8>,
}

impl MidiFile {
    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the file, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Note event at an absolute tick.
#[derive(Debug, Clone, Copy)]
struct TimedEvent {
    tick: u64,
    /// Note-offs sort before note-ons at the same tick.
    is_on: bool,
    key: u7,
    vel: u7,
}

/// Converts seconds to ticks at `tempo_bpm`.
pub fn seconds_to_ticks(seconds: f64, tempo_bpm: f64) -> f64 {
    (seconds * TICKS_PER_QUARTER as f64 * tempo_bpm / 60.0).round()
}

/// Encodes `sequence` as a Standard MIDI File voiced by `profile`.
///
/// Tempo comes from the sequence, which carries any per-request override;
/// program and channel come from the profile.
pub fn encode(sequence: &NoteSequence, profile: &InstrumentProfile) -> Result<MidiFile> {
    if sequence.is_empty() {
        return Err(DaemonError::encoding_failed("note sequence is empty"));
    }

    let tempo_bpm = sequence.tempo_bpm;
    if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
        return Err(DaemonError::encoding_failed(format!(
            "tempo must be positive, got {}",
            tempo_bpm
        )));
    }
    let micros_per_quarter = (60_000_000.0 / tempo_bpm).round();
    // The cast saturates, so anything past u32 also fails the 24-bit check.
    let tempo = u24::try_from(micros_per_quarter as u32).ok_or_else(|| {
        DaemonError::encoding_failed(format!("tempo {} BPM out of range", tempo_bpm))
    })?;

    let channel = u4::try_from(profile.channel).ok_or_else(|| {
        DaemonError::encoding_failed(format!("channel {} exceeds 15", profile.channel))
    })?;
    let program = data_byte(profile.midi_program, "program")?;

    let mut events = Vec::with_capacity(sequence.len() * 2);
    for (i, note) in sequence.notes.iter().enumerate() {
        let key = data_byte(note.pitch, "pitch")?;
        let vel = data_byte(note.velocity, "velocity")?;
        let start = absolute_tick(note.start_time, tempo_bpm, i)?;
        let min_end = start.checked_add(1).ok_or_else(|| {
            DaemonError::encoding_failed(format!("note {} starts past the last tick", i))
        })?;
        let end = absolute_tick(note.end_time, tempo_bpm, i)?.max(min_end);

        events.push(TimedEvent {
            tick: start,
            is_on: true,
            key,
            vel,
        });
        events.push(TimedEvent {
            tick: end,
            is_on: false,
            key,
            vel: u7::new(0),
        });
    }
    events.sort_by_key(|e| (e.tick, e.is_on));

    let mut track: Track<'static> = Vec::with_capacity(events.len() + 4);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(profile.name().as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo)),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange { program },
        },
    });

    let mut last_tick = 0u64;
    for event in &events {
        let delta = delta_ticks(last_tick, event.tick)?;
        let message = if event.is_on {
            MidiMessage::NoteOn {
                key: event.key,
                vel: event.vel,
            }
        } else {
            MidiMessage::NoteOff {
                key: event.key,
                vel: event.vel,
            }
        };
        track.push(TrackEvent {
            delta,
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = event.tick;
    }

    // End of track at the pattern boundary so loops keep their length.
    let boundary = seconds_to_ticks(sequence.total_time, tempo_bpm);
    let end_tick = if boundary.is_finite() && boundary > last_tick as f64 {
        boundary as u64
    } else {
        last_tick
    };
    track.push(TrackEvent {
        delta: delta_ticks(last_tick, end_tick)?,
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    smf.tracks.push(track);

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).map_err(|e| {
        DaemonError::with_source(
            ErrorCode::EncodingFailed,
            "MIDI encoding failed: could not serialize track",
            e,
        )
    })?;

    Ok(MidiFile { bytes })
}

fn data_byte(value: u8, what: &str) -> Result<u7> {
    u7::try_from(value)
        .ok_or_else(|| DaemonError::encoding_failed(format!("{} {} exceeds 127", what, value)))
}

fn absolute_tick(seconds: f64, tempo_bpm: f64, index: usize) -> Result<u64> {
    let tick = seconds_to_ticks(seconds, tempo_bpm);
    if !tick.is_finite() || tick < 0.0 {
        return Err(DaemonError::encoding_failed(format!(
            "note {} has invalid time {}",
            index, seconds
        )));
    }
    Ok(tick as u64)
}

fn delta_ticks(from: u64, to: u64) -> Result<u28> {
    let delta = to.checked_sub(from).ok_or_else(|| {
        DaemonError::encoding_failed(format!("negative delta time ({} -> {})", from, to))
    })?;
    u32::try_from(delta)
        .ok()
        .and_then(u28::try_from)
        .ok_or_else(|| DaemonError::encoding_failed(format!("delta time {} exceeds 28 bits", delta)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{generate, GenerationRequest};
    use crate::models::{BuiltinModelSource, ModelSource};
    use crate::types::{resolve, Instrument, Note, DRUMS_MODEL_ID, PERCUSSION_CHANNEL};

    /// Absolute-tick view of the parsed track: (tick, is_on, channel, key, vel).
    fn parse_notes(file: &MidiFile) -> Vec<(u64, bool, u8, u8, u8)> {
        let smf = Smf::parse(file.as_bytes()).unwrap();
        let mut tick = 0u64;
        let mut notes = Vec::new();
        for event in &smf.tracks[0] {
            tick += event.delta.as_int() as u64;
            if let TrackEventKind::Midi { channel, message } = event.kind {
                match message {
                    MidiMessage::NoteOn { key, vel } => {
                        notes.push((tick, true, channel.as_int(), key.as_int(), vel.as_int()))
                    }
                    MidiMessage::NoteOff { key, vel } => {
                        notes.push((tick, false, channel.as_int(), key.as_int(), vel.as_int()))
                    }
                    _ => {}
                }
            }
        }
        notes
    }

    fn note(pitch: u8, velocity: u8, start: f64, end: f64) -> Note {
        Note {
            pitch,
            velocity,
            start_time: start,
            end_time: end,
        }
    }

    fn kick_sequence() -> NoteSequence {
        NoteSequence {
            notes: (0..4)
                .map(|beat| note(36, 100, beat as f64 * 0.5, beat as f64 * 0.5 + 0.125))
                .collect(),
            tempo_bpm: 120.0,
            total_time: 4.0,
        }
    }

    #[test]
    fn kick_pattern_layout() {
        let file = encode(&kick_sequence(), Instrument::Kick.profile()).unwrap();
        let smf = Smf::parse(file.as_bytes()).unwrap();

        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::new(TICKS_PER_QUARTER)));
        assert_eq!(smf.tracks.len(), 1);

        let notes = parse_notes(&file);
        let ons: Vec<u64> = notes.iter().filter(|n| n.1).map(|n| n.0).collect();
        let offs: Vec<u64> = notes.iter().filter(|n| !n.1).map(|n| n.0).collect();
        assert_eq!(ons, vec![0, 480, 960, 1440]);
        assert_eq!(offs, vec![120, 600, 1080, 1560]);
        assert!(notes.iter().all(|n| n.2 == 9 && n.3 == 36));
    }

    #[test]
    fn generated_kick_pattern_is_valid_midi() {
        let profile = resolve("kick").unwrap();
        let model = BuiltinModelSource.load(DRUMS_MODEL_ID).unwrap();
        let pattern = generate(model.as_ref(), profile, &GenerationRequest::new().with_seed(42)).unwrap();
        let file = encode(&pattern.sequence, profile).unwrap();

        let smf = Smf::parse(file.as_bytes()).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.tracks.len(), 1);

        let notes = parse_notes(&file);
        let ons = notes.iter().filter(|n| n.1).count();
        let offs = notes.iter().filter(|n| !n.1).count();
        assert!(ons > 0);
        assert_eq!(ons, offs);
        assert_eq!(ons, pattern.sequence.len());
        assert!(notes.iter().all(|n| n.2 == PERCUSSION_CHANNEL));
        assert!(notes.iter().all(|n| n.3 == 35 || n.3 == 36));
    }

    #[test]
    fn kick_pattern_on_quarter_ticks_at_60_bpm() {
        let mut seq = kick_sequence();
        seq.tempo_bpm = 60.0;
        seq.notes = (0..4)
            .map(|beat| note(36, 100, beat as f64, beat as f64 + 0.25))
            .collect();
        let notes = parse_notes(&encode(&seq, Instrument::Kick.profile()).unwrap());
        let ons: Vec<u64> = notes.iter().filter(|n| n.1).map(|n| n.0).collect();
        assert_eq!(ons, vec![0, 480, 960, 1440]);
        assert_eq!(notes.len(), 8);
    }

    #[test]
    fn header_events_present() {
        let file = encode(&kick_sequence(), Instrument::Lead.profile()).unwrap();
        let smf = Smf::parse(file.as_bytes()).unwrap();
        let track = &smf.tracks[0];

        assert_eq!(
            track[0].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(b"lead"))
        );
        assert_eq!(
            track[1].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))
        );
        assert_eq!(
            track[2].kind,
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::ProgramChange { program: u7::new(81) },
            }
        );
        let last = track.last().unwrap();
        assert_eq!(last.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack));
        let total: u64 = track.iter().map(|e| e.delta.as_int() as u64).sum();
        assert_eq!(total, 3840);
    }

    #[test]
    fn round_trip_preserves_notes() {
        let seq = NoteSequence {
            notes: vec![
                note(60, 90, 0.0, 0.3),
                note(64, 70, 0.25, 0.5),
                note(67, 110, 1.0, 1.9),
            ],
            tempo_bpm: 100.0,
            total_time: 2.4,
        };
        let notes = parse_notes(&encode(&seq, Instrument::Keys.profile()).unwrap());
        let ticks_per_second = TICKS_PER_QUARTER as f64 * seq.tempo_bpm / 60.0;

        for original in &seq.notes {
            let on = notes
                .iter()
                .find(|n| n.1 && n.3 == original.pitch)
                .unwrap();
            let off = notes
                .iter()
                .find(|n| !n.1 && n.3 == original.pitch)
                .unwrap();
            assert_eq!(on.4, original.velocity);
            assert!((on.0 as f64 / ticks_per_second - original.start_time).abs() <= 1.0 / ticks_per_second);
            assert!((off.0 as f64 / ticks_per_second - original.end_time).abs() <= 1.0 / ticks_per_second);
        }
    }

    #[test]
    fn note_off_precedes_note_on_at_same_tick() {
        let seq = NoteSequence {
            notes: vec![note(60, 80, 0.0, 0.5), note(60, 80, 0.5, 1.0)],
            tempo_bpm: 120.0,
            total_time: 1.0,
        };
        let notes = parse_notes(&encode(&seq, Instrument::Lead.profile()).unwrap());
        let at_480: Vec<bool> = notes.iter().filter(|n| n.0 == 480).map(|n| n.1).collect();
        assert_eq!(at_480, vec![false, true]);
    }

    #[test]
    fn sub_tick_note_gets_minimum_length() {
        let seq = NoteSequence {
            notes: vec![note(60, 80, 0.0, 0.0001)],
            tempo_bpm: 120.0,
            total_time: 1.0,
        };
        let notes = parse_notes(&encode(&seq, Instrument::Lead.profile()).unwrap());
        assert_eq!(notes[0].0, 0);
        assert_eq!(notes[1].0, 1);
    }

    #[test]
    fn same_input_same_bytes() {
        let a = encode(&kick_sequence(), Instrument::Kick.profile()).unwrap();
        let b = encode(&kick_sequence(), Instrument::Kick.profile()).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a.as_bytes()[..4], b"MThd");
    }

    #[test]
    fn invalid_inputs_are_encoding_errors() {
        let mut bad_pitch = kick_sequence();
        bad_pitch.notes[0].pitch = 200;
        let mut bad_tempo = kick_sequence();
        bad_tempo.tempo_bpm = 0.0;
        let mut negative = kick_sequence();
        negative.notes[0].start_time = -1.0;
        let empty = NoteSequence {
            notes: vec![],
            tempo_bpm: 120.0,
            total_time: 1.0,
        };

        for seq in [bad_pitch, bad_tempo, negative, empty] {
            let err = encode(&seq, Instrument::Kick.profile()).unwrap_err();
            assert_eq!(err.code, ErrorCode::EncodingFailed);
        }

        let mut bad_channel = *Instrument::Kick.profile();
        bad_channel.channel = 16;
        let err = encode(&kick_sequence(), &bad_channel).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }

    #[test]
    fn far_future_note_is_encoding_error() {
        let seq = NoteSequence {
            notes: vec![note(60, 80, 1.0e17, 1.0e17 + 1.0)],
            tempo_bpm: 120.0,
            total_time: 1.0,
        };
        let err = encode(&seq, Instrument::Lead.profile()).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }

    #[test]
    fn huge_gap_overflows_delta() {
        let seq = NoteSequence {
            notes: vec![note(60, 80, 0.0, 1.0e9)],
            tempo_bpm: 120.0,
            total_time: 1.0,
        };
        let err = encode(&seq, Instrument::Lead.profile()).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }
}

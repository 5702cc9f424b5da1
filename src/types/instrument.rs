//! Instrument registry.
//!
//! The set of instrument roles the daemon serves is closed and fixed at
//! compile time. Each [`Instrument`] is bound to a static
//! [`InstrumentProfile`] describing which model family renders it and how
//! the result is voiced in MIDI. The genre picks the model within a family.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{DaemonError, Result};

/// Melody model for pop.
pub const MELODY_MODEL_ID: &str = "melody_v1";

/// Syncopated pentatonic melody model for hiphop and dance.
pub const RIFF_MODEL_ID: &str = "riff_v1";

/// Slow, wide-range melody model for cinematic.
pub const CINEMATIC_MODEL_ID: &str = "cinematic_v1";

/// Pad model, shared by every genre.
pub const PAD_MODEL_ID: &str = "pad_v1";

/// Backbeat drum model for pop.
pub const DRUMS_MODEL_ID: &str = "drums_v1";

/// Broken-kick drum model for hiphop and dance.
pub const GROOVE_MODEL_ID: &str = "groove_v1";

/// Instrument used when a request omits one.
pub const DEFAULT_INSTRUMENT: Instrument = Instrument::Lead;

/// General MIDI percussion channel (channel 10, zero-based).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Kind of model an instrument is rendered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Monophonic melodic lines (lead, pluck, keys).
    Melody,
    /// Sustained chordal beds.
    Pad,
    /// Multi-voice drum patterns.
    Drums,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [ModelFamily::Melody, ModelFamily::Pad, ModelFamily::Drums];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Melody => "melody",
            ModelFamily::Pad => "pad",
            ModelFamily::Drums => "drums",
        }
    }
}

/// Instrument roles accepted by `GET /generate-midi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Lead,
    Pluck,
    Keys,
    Pad,
    Drums,
    Kick,
    Snare,
    ClosedHat,
    OpenHat,
    Clap,
}

impl Instrument {
    /// Every instrument, in the order advertised to clients.
    pub const ALL: [Instrument; 10] = [
        Instrument::Lead,
        Instrument::Pluck,
        Instrument::Keys,
        Instrument::Pad,
        Instrument::Drums,
        Instrument::Kick,
        Instrument::Snare,
        Instrument::ClosedHat,
        Instrument::OpenHat,
        Instrument::Clap,
    ];

    /// Returns the wire name of the instrument.
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Lead => "lead",
            Instrument::Pluck => "pluck",
            Instrument::Keys => "keys",
            Instrument::Pad => "pad",
            Instrument::Drums => "drums",
            Instrument::Kick => "kick",
            Instrument::Snare => "snare",
            Instrument::ClosedHat => "closed_hat",
            Instrument::OpenHat => "open_hat",
            Instrument::Clap => "clap",
        }
    }

    /// Returns true for the drum kit and single drum pieces.
    pub fn is_percussion(&self) -> bool {
        matches!(
            self,
            Instrument::Drums
                | Instrument::Kick
                | Instrument::Snare
                | Instrument::ClosedHat
                | Instrument::OpenHat
                | Instrument::Clap
        )
    }

    /// Returns the model family that renders this instrument.
    pub fn family(&self) -> ModelFamily {
        match self {
            Instrument::Pad => ModelFamily::Pad,
            _ if self.is_percussion() => ModelFamily::Drums,
            _ => ModelFamily::Melody,
        }
    }

    /// Returns the static profile bound to this instrument.
    pub fn profile(&self) -> &'static InstrumentProfile {
        // PROFILES is laid out in declaration order.
        &PROFILES[*self as usize]
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = DaemonError;

    /// Exact, case-sensitive match against the wire names.
    fn from_str(s: &str) -> Result<Self> {
        Instrument::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| DaemonError::unknown_instrument(s))
    }
}

/// Looks up the profile for an instrument name.
///
/// Fails with `UNKNOWN_INSTRUMENT` for anything outside the fixed set.
pub fn resolve(name: &str) -> Result<&'static InstrumentProfile> {
    name.parse::<Instrument>().map(|i| i.profile())
}

/// Static configuration controlling how an instrument role is rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentProfile {
    pub instrument: Instrument,
    /// Decoding parameters handed to the model (temperature, top_k, ...).
    pub decoding_params: &'static [(&'static str, f64)],
    /// General MIDI program number (0-127).
    pub midi_program: u8,
    /// MIDI channel (0-15).
    pub channel: u8,
    /// Pattern length in grid steps.
    pub default_length_steps: u32,
    /// Grid resolution; 4 means sixteenth notes.
    pub steps_per_quarter: u32,
    pub tempo_bpm: f64,
    /// Inclusive pitch bounds notes are clamped into.
    pub pitch_range: (u8, u8),
    /// Inclusive velocity bounds notes are clamped into.
    pub velocity_range: (u8, u8),
    /// Drum pieces keep only these pitches.
    pub allowed_pitches: Option<&'static [u8]>,
    /// Pads stretch every note to this many beats.
    pub sustain_beats: Option<f64>,
}

impl InstrumentProfile {
    /// Returns the wire name of the profile's instrument.
    pub fn name(&self) -> &'static str {
        self.instrument.as_str()
    }

    /// Returns the model family that renders this profile.
    pub fn family(&self) -> ModelFamily {
        self.instrument.family()
    }

    /// Duration of one grid step in seconds at the given tempo.
    pub fn step_seconds(&self, tempo_bpm: f64) -> f64 {
        60.0 / tempo_bpm / self.steps_per_quarter as f64
    }

    /// Total pattern length in seconds at the given tempo.
    pub fn length_seconds(&self, tempo_bpm: f64) -> f64 {
        self.step_seconds(tempo_bpm) * self.default_length_steps as f64
    }
}

const fn melodic(
    instrument: Instrument,
    decoding_params: &'static [(&'static str, f64)],
    midi_program: u8,
    channel: u8,
    pitch_range: (u8, u8),
    velocity_range: (u8, u8),
) -> InstrumentProfile {
    InstrumentProfile {
        instrument,
        decoding_params,
        midi_program,
        channel,
        default_length_steps: 32,
        steps_per_quarter: 4,
        tempo_bpm: 120.0,
        pitch_range,
        velocity_range,
        allowed_pitches: None,
        sustain_beats: None,
    }
}

const fn percussion(
    instrument: Instrument,
    decoding_params: &'static [(&'static str, f64)],
    allowed_pitches: Option<&'static [u8]>,
    velocity_range: (u8, u8),
) -> InstrumentProfile {
    InstrumentProfile {
        instrument,
        decoding_params,
        midi_program: 0,
        channel: PERCUSSION_CHANNEL,
        default_length_steps: 32,
        steps_per_quarter: 4,
        tempo_bpm: 120.0,
        pitch_range: (35, 81),
        velocity_range,
        allowed_pitches,
        sustain_beats: None,
    }
}

static PROFILES: [InstrumentProfile; 10] = [
    melodic(
        Instrument::Lead,
        &[("temperature", 0.9), ("top_k", 8.0)],
        81,
        0,
        (60, 96),
        (70, 110),
    ),
    melodic(
        Instrument::Pluck,
        &[("temperature", 1.0), ("top_k", 10.0)],
        45,
        1,
        (55, 88),
        (60, 100),
    ),
    melodic(
        Instrument::Keys,
        &[("temperature", 0.8), ("top_k", 6.0)],
        4,
        2,
        (48, 84),
        (50, 95),
    ),
    InstrumentProfile {
        sustain_beats: Some(2.0),
        ..melodic(
            Instrument::Pad,
            &[("temperature", 0.7), ("top_k", 5.0)],
            89,
            3,
            (48, 79),
            (40, 80),
        )
    },
    percussion(Instrument::Drums, &[("temperature", 0.9)], None, (60, 120)),
    percussion(Instrument::Kick, &[("temperature", 0.8)], Some(&[35, 36]), (90, 127)),
    percussion(Instrument::Snare, &[("temperature", 0.8)], Some(&[38, 40]), (80, 120)),
    percussion(Instrument::ClosedHat, &[("temperature", 1.0)], Some(&[42, 44]), (50, 100)),
    percussion(Instrument::OpenHat, &[("temperature", 1.1)], Some(&[46]), (60, 105)),
    percussion(Instrument::Clap, &[("temperature", 1.0)], Some(&[39]), (80, 120)),
];

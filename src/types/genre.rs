//! Genre registry.
//!
//! A genre picks which trained model renders each model family. Not every
//! genre has a model for every family; `cinematic` has no drums.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{DaemonError, Result};

use super::instrument::{
    InstrumentProfile, ModelFamily, CINEMATIC_MODEL_ID, DRUMS_MODEL_ID, GROOVE_MODEL_ID,
    MELODY_MODEL_ID, PAD_MODEL_ID, RIFF_MODEL_ID,
};

/// Genres accepted by `GET /generate-midi`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    #[default]
    Pop,
    Hiphop,
    Dance,
    Cinematic,
}

/// Genre used when a request omits one.
pub const DEFAULT_GENRE: Genre = Genre::Pop;

/// Model per family for one genre.
struct GenreModels {
    melody: &'static str,
    pad: &'static str,
    drums: Option<&'static str>,
}

impl Genre {
    /// Every genre, in the order advertised to clients.
    pub const ALL: [Genre; 4] = [Genre::Pop, Genre::Hiphop, Genre::Dance, Genre::Cinematic];

    /// Returns the wire name of the genre.
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Pop => "pop",
            Genre::Hiphop => "hiphop",
            Genre::Dance => "dance",
            Genre::Cinematic => "cinematic",
        }
    }

    fn models(&self) -> GenreModels {
        match self {
            Genre::Pop => GenreModels {
                melody: MELODY_MODEL_ID,
                pad: PAD_MODEL_ID,
                drums: Some(DRUMS_MODEL_ID),
            },
            Genre::Hiphop | Genre::Dance => GenreModels {
                melody: RIFF_MODEL_ID,
                pad: PAD_MODEL_ID,
                drums: Some(GROOVE_MODEL_ID),
            },
            Genre::Cinematic => GenreModels {
                melody: CINEMATIC_MODEL_ID,
                pad: PAD_MODEL_ID,
                drums: None,
            },
        }
    }

    /// Returns the model rendering `family` in this genre, if there is one.
    pub fn model_id(&self, family: ModelFamily) -> Option<&'static str> {
        let models = self.models();
        match family {
            ModelFamily::Melody => Some(models.melody),
            ModelFamily::Pad => Some(models.pad),
            ModelFamily::Drums => models.drums,
        }
    }

    /// Returns the model that renders `profile` in this genre.
    ///
    /// Fails with `INVALID_PARAMS` when the genre has no model for the
    /// profile's family.
    pub fn model_for(&self, profile: &InstrumentProfile) -> Result<&'static str> {
        self.model_id(profile.family()).ok_or_else(|| {
            DaemonError::invalid_params(format!(
                "The genre '{}' does not support the instrument type '{}'",
                self,
                profile.name()
            ))
        })
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Genre {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self> {
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Genre::ALL.iter().map(|g| g.as_str()).collect();
                DaemonError::invalid_params(format!(
                    "Invalid genre: '{}' (expected one of {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Returns every distinct model identifier any genre can select.
pub fn registered_model_ids() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = Vec::new();
    for genre in Genre::ALL {
        for family in ModelFamily::ALL {
            if let Some(id) = genre.model_id(family) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

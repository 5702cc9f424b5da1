//! Backend abstraction for generative pattern models.
//!
//! A [`GenerativeModel`] turns decoding parameters and a seed into a raw note
//! sequence. A [`ModelSource`] is the boundary into model artifact storage:
//! it constructs models by identifier and may be slow or fail.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{DecodingParams, RawSequence};

/// A loaded, read-only generative model.
///
/// Implementations must be deterministic in `(params, seed)`: the same inputs
/// always yield the same raw sequence. Models are shared across concurrent
/// requests, so decoding takes `&self`.
pub trait GenerativeModel: Send + Sync {
    /// Identifier the model was loaded under.
    fn model_id(&self) -> &str;

    /// Version string of the loaded weights.
    fn version(&self) -> &str;

    /// Samples a latent vector with `seed` and decodes it into notes.
    ///
    /// The result is raw model output; pitches, velocities and timings may
    /// fall outside musical bounds and are cleaned up by the caller.
    fn sample_and_decode(&self, params: &DecodingParams, seed: u64) -> Result<RawSequence>;
}

/// A model shared between the cache and in-flight requests.
pub type SharedModel = Arc<dyn GenerativeModel>;

/// Constructs models from backing storage.
///
/// `load` is blocking and potentially expensive; callers run it off the
/// async executor.
pub trait ModelSource: Send + Sync {
    /// Builds the model registered under `model_id`.
    ///
    /// Fails with `MODEL_NOT_FOUND` when no artifact exists and
    /// `MODEL_LOAD_FAILED` when the artifact is unusable.
    fn load(&self, model_id: &str) -> Result<SharedModel>;
}

impl<T: ModelSource + ?Sized> ModelSource for Arc<T> {
    fn load(&self, model_id: &str) -> Result<SharedModel> {
        (**self).load(model_id)
    }
}

/// Version label combining model id and weights version, e.g. `drums_v1@1`.
pub fn version_label(model: &dyn GenerativeModel) -> String {
    format!("{}@{}", model.model_id(), model.version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawNote;

    struct Fixed;

    impl GenerativeModel for Fixed {
        fn model_id(&self) -> &str {
            "fixed"
        }

        fn version(&self) -> &str {
            "3"
        }

        fn sample_and_decode(&self, _params: &DecodingParams, seed: u64) -> Result<RawSequence> {
            Ok(RawSequence {
                notes: vec![RawNote {
                    pitch: seed as i32,
                    velocity: 100,
                    start_time: 0.0,
                    end_time: 0.5,
                }],
                tempo_bpm: 120.0,
                total_time: 0.5,
            })
        }
    }

    struct FixedSource;

    impl ModelSource for FixedSource {
        fn load(&self, _model_id: &str) -> Result<SharedModel> {
            Ok(Arc::new(Fixed))
        }
    }

    #[test]
    fn version_label_format() {
        assert_eq!(version_label(&Fixed), "fixed@3");
    }

    #[test]
    fn arc_source_delegates() {
        let source: Arc<FixedSource> = Arc::new(FixedSource);
        let model = source.load("anything").unwrap();
        let seq = model.sample_and_decode(&DecodingParams::new(), 60).unwrap();
        assert_eq!(seq.notes[0].pitch, 60);
    }
}

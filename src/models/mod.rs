//! Generative pattern models.
//!
//! - [`GenerativeModel`](backend::GenerativeModel): sample-and-decode capability
//! - [`ModelSource`](backend::ModelSource): construction from artifact storage
//! - [`LatentDecoderModel`](latent::LatentDecoderModel): the bundled latent decoder
//! - [`Checkpoint`](checkpoint::Checkpoint): on-disk weight format
//! - [`ensure_models`](builtin::ensure_models): installs built-in checkpoints

pub mod backend;
pub mod builtin;
pub mod checkpoint;
pub mod latent;
pub mod loader;

// Re-export commonly used types
pub use backend::{version_label, GenerativeModel, ModelSource, SharedModel};
pub use builtin::{builtin_checkpoint, ensure_models, BuiltinModelSource, BUILTIN_VERSION};
pub use checkpoint::{Checkpoint, DecoderKind, FORMAT_VERSION};
pub use latent::LatentDecoderModel;
pub use loader::{check_models, checkpoint_path, read_checkpoint, FileModelSource};

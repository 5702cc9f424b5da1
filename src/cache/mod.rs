//! Cache module for loaded models.
//!
//! Provides a single-build-per-key cache so each model family is constructed
//! at most once per process.

pub mod models;

// Re-export commonly used types
pub use models::ModelCache;

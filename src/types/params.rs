//! Decoding parameters passed to generative models.

use std::collections::BTreeMap;

use serde::Serialize;

/// Temperature used when a profile does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// String-keyed numeric parameters controlling a single decode.
///
/// Built per request from the instrument profile's static pairs plus the
/// request-time tempo and grid, so models see one flat mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodingParams(BTreeMap<String, f64>);

impl DecodingParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates parameters from static key/value pairs.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    /// Sets a parameter, replacing any previous value.
    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Returns a raw parameter value.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Sampling temperature; values must be positive.
    pub fn temperature(&self) -> f64 {
        self.get("temperature").unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Top-k restriction for categorical sampling; 0 disables it.
    pub fn top_k(&self) -> usize {
        self.get("top_k").map(|k| k.max(0.0) as usize).unwrap_or(0)
    }

    /// Tempo in quarter notes per minute used to convert steps to seconds.
    pub fn qpm(&self) -> Option<f64> {
        self.get("qpm")
    }

    /// Grid steps per quarter note.
    pub fn steps_per_quarter(&self) -> Option<u32> {
        self.get("steps_per_quarter").map(|v| v.max(1.0) as u32)
    }

    /// Requested pattern length in steps.
    pub fn length_steps(&self) -> Option<u32> {
        self.get("length_steps").map(|v| v.max(0.0) as u32)
    }

    /// Iterates parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

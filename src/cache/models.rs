//! Model cache with single construction per model id.
//!
//! The first request for a model id starts a load; concurrent requests for the
//! same id wait on that load and receive the same instance or the same error.
//! Successful loads are kept for the life of the process. Failed loads are not
//! kept, so a later request retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, info};
use tokio::sync::watch;

use crate::error::{DaemonError, Result};
use crate::models::{ModelSource, SharedModel};

/// Outcome broadcast to everyone waiting on one load attempt.
type LoadOutcome = Result<SharedModel>;

enum Slot {
    /// A load is in flight; receivers see `Some` once it finishes.
    Loading(watch::Receiver<Option<LoadOutcome>>),
    Ready(SharedModel),
}

type SlotTable = Arc<Mutex<HashMap<String, Slot>>>;

/// Lazily loads and retains models keyed by model id.
pub struct ModelCache {
    source: Arc<dyn ModelSource>,
    slots: SlotTable,
}

impl ModelCache {
    /// Creates an empty cache backed by `source`.
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self {
            source,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the model for `model_id`, loading it on first use.
    ///
    /// At most one load runs per model id at a time. The load runs in a
    /// detached task, so cancelling this future does not strand other
    /// waiters.
    pub async fn get_or_load(&self, model_id: &str) -> Result<SharedModel> {
        let mut receiver = {
            let mut slots = lock(&self.slots);
            match slots.get(model_id) {
                Some(Slot::Ready(model)) => return Ok(Arc::clone(model)),
                Some(Slot::Loading(receiver)) => receiver.clone(),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    slots.insert(model_id.to_string(), Slot::Loading(receiver.clone()));
                    self.spawn_load(model_id.to_string(), sender);
                    receiver
                }
            }
        };

        let outcome = receiver
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|_| DaemonError::model_load_failed(model_id, "loader exited without a result"))?;

        match &*outcome {
            Some(result) => result.clone(),
            None => Err(DaemonError::model_load_failed(model_id, "loader reported no result")),
        }
    }

    fn spawn_load(&self, model_id: String, sender: watch::Sender<Option<LoadOutcome>>) {
        let source = Arc::clone(&self.source);
        let slots = Arc::clone(&self.slots);

        tokio::spawn(async move {
            info!("Model '{}' not cached, loading", model_id);
            let id = model_id.clone();
            let outcome = match tokio::task::spawn_blocking(move || source.load(&id)).await {
                Ok(result) => result,
                Err(e) => Err(DaemonError::model_load_failed(
                    &model_id,
                    format!("loader task failed: {}", e),
                )),
            };

            // Table first, then waiters.
            {
                let mut slots = lock(&slots);
                match &outcome {
                    Ok(model) => {
                        slots.insert(model_id.clone(), Slot::Ready(Arc::clone(model)));
                    }
                    Err(_) => {
                        slots.remove(&model_id);
                    }
                }
            }

            match &outcome {
                Ok(_) => info!("Model '{}' ready", model_id),
                Err(e) => error!("Model '{}' failed to load: {}", model_id, e),
            }
            let _ = sender.send(Some(outcome));
        });
    }

    /// Loads each model id, returning the per-id result.
    pub async fn preload(&self, model_ids: &[&str]) -> Vec<(String, Result<()>)> {
        let mut results = Vec::with_capacity(model_ids.len());
        for model_id in model_ids {
            let result = self.get_or_load(model_id).await.map(|_| ());
            results.push((model_id.to_string(), result));
        }
        results
    }

    /// Returns true if `model_id` has finished loading.
    pub fn is_loaded(&self, model_id: &str) -> bool {
        matches!(lock(&self.slots).get(model_id), Some(Slot::Ready(_)))
    }

    /// Returns the ids of all loaded models, sorted.
    pub fn loaded_ids(&self) -> Vec<String> {
        let slots = lock(&self.slots);
        let mut ids: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

fn lock(slots: &SlotTable) -> MutexGuard<'_, HashMap<String, Slot>> {
    // Slots are only ever replaced whole, so a poisoned table is still consistent.
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

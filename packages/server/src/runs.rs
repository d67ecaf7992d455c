//! In-process registry for asynchronous discovery runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use resource_pool::discovery::DiscoveryProgress;
use uuid::Uuid;

/// Tracks progress of spawned discovery tasks so callers can poll and
/// cancel them. State lives in-process; a restart forgets past runs.
#[derive(Clone, Default)]
pub struct DiscoveryRuns {
    inner: Arc<RwLock<HashMap<Uuid, RunState>>>,
}

struct RunState {
    progress: DiscoveryProgress,
    cancel: Arc<AtomicBool>,
}

impl DiscoveryRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run; returns its id and the cancellation flag to hand
    /// to the driver.
    pub fn create(&self) -> (Uuid, Arc<AtomicBool>) {
        let id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));
        self.inner.write().unwrap().insert(
            id,
            RunState {
                progress: DiscoveryProgress::default(),
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }

    pub fn update(&self, id: Uuid, progress: DiscoveryProgress) {
        if let Some(state) = self.inner.write().unwrap().get_mut(&id) {
            state.progress = progress;
        }
    }

    pub fn get(&self, id: Uuid) -> Option<DiscoveryProgress> {
        self.inner
            .read()
            .unwrap()
            .get(&id)
            .map(|state| state.progress.clone())
    }

    /// Request cancellation; the driver stops at its next chunk checkpoint.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.inner.read().unwrap().get(&id) {
            Some(state) => {
                state.cancel.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

pub mod detector;
pub mod registry;

use std::sync::{PoisonError, RwLock};

use crate::models::WorkerCapabilities;

/// The capability set this node currently advertises. Readers get a clone of
/// the whole map; writers replace it wholesale, so a reader never observes a
/// partially updated set.
#[derive(Debug, Default)]
pub struct CapabilitySnapshot {
    inner: RwLock<WorkerCapabilities>,
}

impl CapabilitySnapshot {
    pub fn new(capabilities: WorkerCapabilities) -> Self {
        Self {
            inner: RwLock::new(capabilities),
        }
    }

    pub fn get(&self) -> WorkerCapabilities {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, capabilities: WorkerCapabilities) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = capabilities;
    }
}

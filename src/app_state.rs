use std::sync::Arc;

use crate::jobserver::JobServer;
use crate::services::envelope::JobEnvelope;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub envelope: Arc<JobEnvelope>,
    pub jobs: Arc<JobServer>,
}

impl AppState {
    pub fn new(envelope: JobEnvelope, jobs: Arc<JobServer>) -> Self {
        Self {
            envelope: Arc::new(envelope),
            jobs,
        }
    }
}

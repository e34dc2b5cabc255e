use std::sync::Arc;

use crate::backend::RecruitingBackend;
use crate::candidates::board::BoardRegistry;
use crate::candidates::reconcile::ReconcileOptions;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Recruiting backend. Default: HttpBackend; tests use the in-memory fake.
    pub backend: Arc<dyn RecruitingBackend>,
    /// Candidate boards per job, created on first view.
    pub boards: Arc<BoardRegistry>,
    pub config: Config,
}

impl AppState {
    pub fn new(backend: Arc<dyn RecruitingBackend>, config: Config) -> Self {
        Self {
            backend,
            boards: Arc::new(BoardRegistry::new()),
            config,
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions::from(&self.config)
    }
}

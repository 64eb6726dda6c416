use std::sync::Arc;

use crate::db::CacheStore;
use crate::jobs::JobQueue;
use crate::services::ranking::RankingEngine;

/// Shared application state
///
/// Everything in here is created once at process start and passed by
/// reference; there is no ambient global state. The pipeline orchestrator is
/// owned by the job queue's workers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RankingEngine>,
    pub jobs: Arc<JobQueue>,
    pub cache: Arc<dyn CacheStore>,
}

impl AppState {
    pub fn new(engine: Arc<RankingEngine>, jobs: Arc<JobQueue>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            engine,
            jobs,
            cache,
        }
    }
}

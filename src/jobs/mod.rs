use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::models::{JobStatus, PipelineOutcome, RecommendationType, TaskStatus};
use crate::services::orchestrator::PipelineOrchestrator;

/// One queued pipeline invocation
#[derive(Debug, Clone)]
struct Job {
    id: Uuid,
    user_id: String,
    recommendation_type: RecommendationType,
    force_refresh: bool,
}

/// Tracks job lifecycles: PENDING → RUNNING → SUCCESS | FAILURE.
///
/// Terminal states are immutable; an update against a terminal record is
/// ignored. Unknown ids surface a PENDING-like default rather than an error.
#[derive(Clone, Default)]
pub struct JobStore {
    records: Arc<RwLock<HashMap<Uuid, TaskStatus>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_pending(&self, id: Uuid) {
        let mut records = self.records.write().await;
        records.insert(id, TaskStatus::pending(id));
    }

    async fn mark_running(&self, id: Uuid) {
        self.transition(id, JobStatus::Running, None, None).await;
    }

    async fn mark_success(&self, id: Uuid, outcome: PipelineOutcome) {
        self.transition(id, JobStatus::Success, Some(outcome), None)
            .await;
    }

    async fn mark_failure(&self, id: Uuid, error: String) {
        self.transition(id, JobStatus::Failure, None, Some(error))
            .await;
    }

    async fn transition(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<PipelineOutcome>,
        error: Option<String>,
    ) {
        let mut records = self.records.write().await;
        let record = records.entry(id).or_insert_with(|| TaskStatus::pending(id));
        if record.status.is_terminal() {
            tracing::warn!(job_id = %id, current = ?record.status, attempted = ?status, "Ignoring transition on terminal job");
            return;
        }
        record.status = status;
        record.result = result;
        record.error = error;
        record.updated_at = Utc::now();
    }

    /// The current view of a job. An id this store has never seen yields a
    /// fresh PENDING record stamped with the lookup time.
    pub async fn status(&self, id: Uuid) -> TaskStatus {
        let records = self.records.read().await;
        records
            .get(&id)
            .cloned()
            .unwrap_or_else(|| TaskStatus::pending(id))
    }
}

/// Worker-pool task queue: one job is one pipeline invocation.
///
/// Jobs run in parallel across workers; the four stages within a job stay
/// strictly sequential. No ordering is guaranteed across jobs for the same
/// user.
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    store: JobStore,
}

impl JobQueue {
    /// Starts `worker_count` workers draining the queue
    pub fn start(orchestrator: Arc<PipelineOrchestrator>, worker_count: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let store = JobStore::new();

        for worker in 0..worker_count.max(1) {
            let rx = Arc::clone(&rx);
            let store = store.clone();
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                tracing::debug!(worker = worker, "Pipeline worker started");
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else {
                        tracing::debug!(worker = worker, "Pipeline worker stopping");
                        break;
                    };
                    run_job(&orchestrator, &store, job).await;
                }
            });
        }

        Self { tx, store }
    }

    /// Enqueues one pipeline invocation and returns its job handle
    pub async fn enqueue(
        &self,
        user_id: String,
        recommendation_type: RecommendationType,
        force_refresh: bool,
    ) -> Uuid {
        let job = Job {
            id: Uuid::new_v4(),
            user_id,
            recommendation_type,
            force_refresh,
        };
        let id = job.id;
        self.store.insert_pending(id).await;

        if self.tx.send(job).is_err() {
            // all workers gone; the job can never run
            self.store
                .mark_failure(id, "Job queue is not accepting work".to_string())
                .await;
        }

        id
    }

    pub async fn status(&self, id: Uuid) -> TaskStatus {
        self.store.status(id).await
    }
}

async fn run_job(orchestrator: &PipelineOrchestrator, store: &JobStore, job: Job) {
    tracing::info!(
        job_id = %job.id,
        user_id = %job.user_id,
        recommendation_type = %job.recommendation_type,
        "Job started"
    );
    store.mark_running(job.id).await;

    match orchestrator
        .generate(&job.user_id, job.recommendation_type, job.force_refresh)
        .await
    {
        Ok(outcome) => {
            tracing::info!(job_id = %job.id, source = ?outcome.source, "Job succeeded");
            store.mark_success(job.id, outcome).await;
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "Job failed");
            store.mark_failure(job.id, e.to_string()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRecommendationSet, ResultSource};

    #[tokio::test]
    async fn test_unknown_job_id_reports_pending() {
        let store = JobStore::new();
        let status = store.status(Uuid::new_v4()).await;
        assert_eq!(status.status, JobStatus::Pending);
        assert!(status.result.is_none());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let store = JobStore::new();
        let id = Uuid::new_v4();

        store.insert_pending(id).await;
        assert_eq!(store.status(id).await.status, JobStatus::Pending);

        store.mark_running(id).await;
        assert_eq!(store.status(id).await.status, JobStatus::Running);

        let outcome = PipelineOutcome {
            user_id: "u1".to_string(),
            recommendation_type: RecommendationType::Music,
            source: ResultSource::Generated,
            recommendations: RawRecommendationSet::new(Default::default()),
        };
        store.mark_success(id, outcome).await;

        let status = store.status(id).await;
        assert_eq!(status.status, JobStatus::Success);
        assert!(status.result.is_some());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_terminal_state_is_immutable() {
        let store = JobStore::new();
        let id = Uuid::new_v4();

        store.insert_pending(id).await;
        store.mark_failure(id, "Failed to call LLM: No recommendations generated".to_string())
            .await;

        let failed = store.status(id).await;
        assert_eq!(failed.status, JobStatus::Failure);

        // neither a re-run nor a late success may overwrite the terminal state
        store.mark_running(id).await;
        let outcome = PipelineOutcome {
            user_id: "u1".to_string(),
            recommendation_type: RecommendationType::Music,
            source: ResultSource::Generated,
            recommendations: RawRecommendationSet::new(Default::default()),
        };
        store.mark_success(id, outcome).await;

        let status = store.status(id).await;
        assert_eq!(status.status, JobStatus::Failure);
        assert_eq!(
            status.error.as_deref(),
            Some("Failed to call LLM: No recommendations generated")
        );
        assert_eq!(status.updated_at, failed.updated_at);
    }

    #[tokio::test]
    async fn test_failure_keeps_error_only() {
        let store = JobStore::new();
        let id = Uuid::new_v4();

        store.insert_pending(id).await;
        store.mark_running(id).await;
        store.mark_failure(id, "Failed to fetch user data: timeout".to_string())
            .await;

        let status = store.status(id).await;
        assert!(status.result.is_none());
        assert!(status
            .error
            .as_deref()
            .unwrap()
            .contains("Failed to fetch user data"));
    }
}

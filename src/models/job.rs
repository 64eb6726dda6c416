use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RawRecommendationSet, RecommendationType};

/// Lifecycle of a queued pipeline invocation.
///
/// `Success` and `Failure` are terminal; a record in a terminal state is
/// never mutated again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

/// Whether the pipeline result was served from cache or freshly generated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Generated,
}

/// Result of one full pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineOutcome {
    pub user_id: String,
    pub recommendation_type: RecommendationType,
    pub source: ResultSource,
    pub recommendations: RawRecommendationSet,
}

/// Point-in-time view of a tracked job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub id: Uuid,
    pub status: JobStatus,
    /// Populated only on `Success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineOutcome>,
    /// Populated only on `Failure`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    /// A fresh PENDING record for a newly enqueued (or unknown) job id
    pub fn pending(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

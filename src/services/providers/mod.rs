/// Upstream collaborator abstractions
///
/// The pipeline consumes four external services: three user-context data
/// providers (profile, location, interactions) and the LLM prefetch service.
/// Each sits behind a trait so the orchestrator can be exercised without
/// the network.
use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    InteractionData, LocationData, RawRecommendationSet, RecommendationType, UserProfile,
};

pub mod interaction;
pub mod llm;
pub mod location;
pub mod profile;

pub use interaction::InteractionService;
pub use llm::LlmService;
pub use location::LocationService;
pub use profile::ProfileService;

/// User Profile Service collaborator
///
/// `Ok(None)` means the service answered but has no profile for the user;
/// transport failures surface as errors and are absorbed by the fetch stage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;
}

/// Location Information Engine collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn fetch_location(&self, user_id: &str) -> AppResult<Option<LocationData>>;
}

/// Customer Interaction Service collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionProvider: Send + Sync {
    async fn fetch_interactions(&self, user_id: &str) -> AppResult<Option<InteractionData>>;
}

/// LLM prefetch service collaborator
///
/// Returns whatever the model produced, grouped by category. An empty set is
/// a valid return here; the orchestrator decides that it is a stage failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        recommendation_type: RecommendationType,
        max_results: usize,
    ) -> AppResult<RawRecommendationSet>;
}

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::{get_json, put_json, CacheKey, CacheStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    PipelineOutcome, PromptRecord, RawRecommendationSet, RecommendationType, ResultSource,
    UserDataBundle,
};
use crate::services::providers::{
    InteractionProvider, LlmProvider, LocationProvider, ProfileProvider,
};
use crate::services::prompt::PromptBuilder;
use crate::services::retry::{run_retryable, RetryPolicy};

const STAGE_FETCH: &str = "fetch user data";
const STAGE_BUILD: &str = "build prompt";
const STAGE_CALL: &str = "call LLM";
const STAGE_CACHE: &str = "cache results";

/// TTLs, timeouts and sizing for one orchestrator instance
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub fetch_timeout: Duration,
    pub llm_timeout: Duration,
    pub recommendation_ttl: u64,
    pub prompt_ttl: u64,
    pub user_data_ttl: u64,
    pub max_results: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            llm_timeout: Duration::from_secs(config.llm_timeout_secs),
            recommendation_ttl: config.recommendation_ttl_secs,
            prompt_ttl: config.prompt_ttl_secs,
            user_data_ttl: config.user_data_ttl_secs,
            max_results: config.max_results,
        }
    }
}

/// Runs the four-stage recommendation pipeline for one (user, type).
///
/// Stages execute strictly in order: fetch user data, build prompt, call
/// LLM, cache results. Each stage is retried locally on transient errors; a
/// stage failure aborts the pipeline with a stage-qualified error and later
/// stages never run. There is no cross-invocation lock: two concurrent
/// forced refreshes for the same key may both generate and both write, and
/// the last writer wins.
pub struct PipelineOrchestrator {
    profile: Arc<dyn ProfileProvider>,
    location: Arc<dyn LocationProvider>,
    interaction: Arc<dyn InteractionProvider>,
    llm: Arc<dyn LlmProvider>,
    cache: Arc<dyn CacheStore>,
    prompt_builder: PromptBuilder,
    retry: RetryPolicy,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profile: Arc<dyn ProfileProvider>,
        location: Arc<dyn LocationProvider>,
        interaction: Arc<dyn InteractionProvider>,
        llm: Arc<dyn LlmProvider>,
        cache: Arc<dyn CacheStore>,
        retry: RetryPolicy,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            profile,
            location,
            interaction,
            llm,
            cache,
            prompt_builder: PromptBuilder::new(),
            retry,
            settings,
        }
    }

    /// Produces a recommendation set for (user, type), serving from cache
    /// when present unless a refresh is forced.
    pub async fn generate(
        &self,
        user_id: &str,
        recommendation_type: RecommendationType,
        force_refresh: bool,
    ) -> AppResult<PipelineOutcome> {
        tracing::info!(
            user_id = %user_id,
            recommendation_type = %recommendation_type,
            force_refresh = force_refresh,
            "Starting recommendation generation"
        );

        let cache_key = CacheKey::Recommendations(user_id.to_string(), recommendation_type);

        if !force_refresh {
            match get_json::<RawRecommendationSet>(self.cache.as_ref(), &cache_key).await {
                Ok(Some(cached)) => {
                    tracing::info!(user_id = %user_id, recommendation_type = %recommendation_type, "Returning cached recommendations");
                    return Ok(PipelineOutcome {
                        user_id: user_id.to_string(),
                        recommendation_type,
                        source: ResultSource::Cache,
                        recommendations: cached,
                    });
                }
                Ok(None) => {}
                // a broken cache degrades to a miss, it never blocks generation
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Cache lookup failed, generating fresh");
                }
            }
        }

        // Stage 1: fetch user data
        let bundle = self
            .fetch_user_data(user_id)
            .await
            .map_err(|e| stage_error(STAGE_FETCH, e))?;

        // Stage 2: build prompt
        let prompt = self
            .build_prompt(user_id, &bundle, recommendation_type)
            .await
            .map_err(|e| stage_error(STAGE_BUILD, e))?;

        // Stage 3: call LLM
        let recommendations = self
            .call_llm(&prompt, recommendation_type)
            .await
            .map_err(|e| stage_error(STAGE_CALL, e))?;

        // Stage 4: cache results. A write failure is soft: the generated
        // set is still returned, only the warning is recorded.
        if let Err(e) = self.cache_results(&cache_key, &recommendations).await {
            tracing::warn!(
                user_id = %user_id,
                recommendation_type = %recommendation_type,
                error = %e,
                "Failed to cache results, returning uncached recommendations"
            );
        }

        tracing::info!(
            user_id = %user_id,
            recommendation_type = %recommendation_type,
            count = recommendations.total_count(),
            "Recommendation generation completed"
        );

        Ok(PipelineOutcome {
            user_id: user_id.to_string(),
            recommendation_type,
            source: ResultSource::Generated,
            recommendations,
        })
    }

    /// Stage 1: calls the three data collaborators independently.
    ///
    /// A collaborator failure is absorbed after retries and recorded as an
    /// absent sub-bundle; only unexpected errors fail the stage. The bundle
    /// is cached best-effort as a side effect.
    async fn fetch_user_data(&self, user_id: &str) -> AppResult<UserDataBundle> {
        let (profile, location, interaction) = tokio::join!(
            self.fetch_collaborator("profile", || self.profile.fetch_profile(user_id)),
            self.fetch_collaborator("location", || self.location.fetch_location(user_id)),
            self.fetch_collaborator("interaction", || self.interaction.fetch_interactions(user_id)),
        );

        let bundle = UserDataBundle::new(profile, location, interaction);

        match serde_json::to_string(&bundle) {
            Ok(json) => self.cache.set_in_background(
                &CacheKey::UserData(user_id.to_string()),
                json,
                self.settings.user_data_ttl,
            ),
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Could not serialize user data bundle for caching"),
        }

        tracing::info!(
            user_id = %user_id,
            has_profile = bundle.profile.is_some(),
            has_location = bundle.location.is_some(),
            has_interaction = bundle.interaction.is_some(),
            "User data fetch completed"
        );

        Ok(bundle)
    }

    /// Runs one collaborator fetch under the stage retry policy and timeout,
    /// absorbing any final failure into `None`.
    async fn fetch_collaborator<T, F, Fut>(&self, collaborator: &str, op: F) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<Option<T>>>,
    {
        let timeout = self.settings.fetch_timeout;
        let result = run_retryable(&self.retry, STAGE_FETCH, || {
            let fut = op();
            async move {
                tokio::time::timeout(timeout, fut)
                    .await
                    .map_err(|_| AppError::Timeout(STAGE_FETCH.to_string()))?
            }
        })
        .await;

        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    collaborator = collaborator,
                    error = %e,
                    "Collaborator fetch failed, continuing without its data"
                );
                None
            }
        }
    }

    /// Stage 2: builds the prompt from whatever bundle parts are present
    /// and caches it best-effort for the ranking engine.
    async fn build_prompt(
        &self,
        user_id: &str,
        bundle: &UserDataBundle,
        recommendation_type: RecommendationType,
    ) -> AppResult<String> {
        if bundle.is_empty() {
            tracing::warn!(user_id = %user_id, "No user data available, building fallback prompt");
        }

        let prompt =
            self.prompt_builder
                .build(bundle, recommendation_type, self.settings.max_results);

        let record = PromptRecord::new(prompt.clone(), recommendation_type);
        match serde_json::to_string(&record) {
            Ok(json) => self.cache.set_in_background(
                &CacheKey::Prompt(user_id.to_string(), recommendation_type),
                json,
                self.settings.prompt_ttl,
            ),
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Could not serialize prompt record for caching"),
        }

        Ok(prompt)
    }

    /// Stage 3: invokes the LLM. An empty result is a hard stage failure,
    /// retried under the same policy as transport errors but surfaced with
    /// its own message.
    async fn call_llm(
        &self,
        prompt: &str,
        recommendation_type: RecommendationType,
    ) -> AppResult<RawRecommendationSet> {
        let timeout = self.settings.llm_timeout;
        run_retryable(&self.retry, STAGE_CALL, || {
            let fut = self
                .llm
                .generate(prompt, recommendation_type, self.settings.max_results);
            async move {
                let set = tokio::time::timeout(timeout, fut)
                    .await
                    .map_err(|_| AppError::Timeout(STAGE_CALL.to_string()))??;
                if set.is_empty() {
                    return Err(AppError::EmptyResult);
                }
                Ok(set)
            }
        })
        .await
    }

    /// Stage 4: persists the generated set under the recommendation key
    async fn cache_results(
        &self,
        key: &CacheKey,
        recommendations: &RawRecommendationSet,
    ) -> AppResult<()> {
        run_retryable(&self.retry, STAGE_CACHE, || {
            put_json(
                self.cache.as_ref(),
                key,
                recommendations,
                self.settings.recommendation_ttl,
            )
        })
        .await
    }
}

fn stage_error(stage: &'static str, e: AppError) -> AppError {
    AppError::Stage {
        stage,
        detail: e.to_string(),
    }
}

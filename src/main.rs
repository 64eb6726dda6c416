use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use portal_engine::api::{create_router, AppState};
use portal_engine::config::Config;
use portal_engine::db::{create_redis_client, CacheStore, RedisCache};
use portal_engine::jobs::JobQueue;
use portal_engine::services::orchestrator::{PipelineOrchestrator, PipelineSettings};
use portal_engine::services::providers::{
    InteractionService, LlmService, LocationService, ProfileService,
};
use portal_engine::services::ranking::RankingEngine;
use portal_engine::services::retry::RetryPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (redis_cache, _cache_writer) = RedisCache::new(redis_client);
    let cache: Arc<dyn CacheStore> = Arc::new(redis_cache);

    let http_client = reqwest::Client::new();
    let profile = Arc::new(ProfileService::new(
        http_client.clone(),
        config.profile_service_url.clone(),
    ));
    let location = Arc::new(LocationService::new(
        http_client.clone(),
        config.location_service_url.clone(),
    ));
    let interaction = Arc::new(InteractionService::new(
        http_client.clone(),
        config.interaction_service_url.clone(),
    ));
    let llm = Arc::new(LlmService::new(
        http_client,
        config.llm_service_url.clone(),
    ));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        profile,
        location,
        interaction,
        llm,
        Arc::clone(&cache),
        RetryPolicy::from_config(&config),
        PipelineSettings::from_config(&config),
    ));

    let engine = Arc::new(RankingEngine::new(Arc::clone(&cache)));
    let jobs = Arc::new(JobQueue::start(
        Arc::clone(&orchestrator),
        config.worker_count,
    ));

    let state = AppState::new(engine, jobs, cache);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Portal engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}

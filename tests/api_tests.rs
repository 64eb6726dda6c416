use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::json;

use portal_engine::api::{create_router, AppState};
use portal_engine::db::{CacheKey, CacheStore};
use portal_engine::error::{AppError, AppResult};
use portal_engine::jobs::JobQueue;
use portal_engine::models::{
    InteractionData, LocationData, RawRecommendationSet, RecommendationItem, RecommendationType,
    UserProfile,
};
use portal_engine::services::orchestrator::{PipelineOrchestrator, PipelineSettings};
use portal_engine::services::providers::{
    InteractionProvider, LlmProvider, LocationProvider, ProfileProvider,
};
use portal_engine::services::ranking::RankingEngine;
use portal_engine::services::retry::RetryPolicy;

/// In-memory CacheStore so the suite runs without Redis
#[derive(Default)]
struct MemoryCache {
    entries: std::sync::RwLock<HashMap<String, String>>,
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        Ok(self.entries.read().unwrap().get(&key.to_string()).cloned())
    }

    async fn set(&self, key: &CacheKey, value: String, _ttl: u64) -> AppResult<()> {
        self.entries.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn set_in_background(&self, key: &CacheKey, value: String, _ttl: u64) {
        self.entries.write().unwrap().insert(key.to_string(), value);
    }

    async fn delete(&self, key: &CacheKey) -> AppResult<()> {
        self.entries.write().unwrap().remove(&key.to_string());
        Ok(())
    }
}

struct StubProfileProvider;

#[async_trait]
impl ProfileProvider for StubProfileProvider {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(Some(UserProfile {
            user_id: user_id.to_string(),
            name: "Maria".to_string(),
            email: None,
            interests: vec!["architecture".to_string(), "festivals".to_string()],
            age: Some(31),
            location: None,
            preferences: Default::default(),
        }))
    }
}

struct StubLocationProvider;

#[async_trait]
impl LocationProvider for StubLocationProvider {
    async fn fetch_location(&self, user_id: &str) -> AppResult<Option<LocationData>> {
        Ok(Some(LocationData {
            user_id: user_id.to_string(),
            current_location: Some("Barcelona".to_string()),
            home_location: None,
            work_location: None,
            travel_history: vec![],
        }))
    }
}

struct FailingInteractionProvider;

#[async_trait]
impl InteractionProvider for FailingInteractionProvider {
    async fn fetch_interactions(&self, _user_id: &str) -> AppResult<Option<InteractionData>> {
        Err(AppError::ExternalApi(
            "interaction service unavailable".to_string(),
        ))
    }
}

/// Returns a small set keyed by the requested type, or nothing at all
struct StubLlmProvider {
    empty: bool,
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    async fn generate(
        &self,
        _prompt: &str,
        recommendation_type: RecommendationType,
        _max_results: usize,
    ) -> AppResult<RawRecommendationSet> {
        if self.empty {
            return Ok(RawRecommendationSet::new(HashMap::new()));
        }

        let items: Vec<RecommendationItem> = serde_json::from_value(json!([
            {"title": "Barcelona Nights", "genre": "festival", "description": "Live music by the beach"},
            {"title": "Barcelona Nights", "genre": "festival", "description": "Duplicate listing"},
            {"title": "Gothic Quarter Walk", "genre": "architecture", "description": "Old town architecture tour"}
        ]))
        .unwrap();

        let mut recommendations = HashMap::new();
        recommendations.insert(recommendation_type.as_str().to_string(), items);
        Ok(RawRecommendationSet::new(recommendations))
    }
}

fn create_test_server(llm: StubLlmProvider) -> TestServer {
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());

    let retry = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::ZERO,
        backoff_multiplier: 2.0,
        max_delay: Duration::ZERO,
        jitter: |delay| delay,
    };
    let settings = PipelineSettings {
        fetch_timeout: Duration::from_secs(2),
        llm_timeout: Duration::from_secs(2),
        recommendation_ttl: 86400,
        prompt_ttl: 7200,
        user_data_ttl: 1800,
        max_results: 10,
    };

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(StubProfileProvider),
        Arc::new(StubLocationProvider),
        Arc::new(FailingInteractionProvider),
        Arc::new(llm),
        Arc::clone(&cache),
        retry,
        settings,
    ));

    let engine = Arc::new(RankingEngine::new(Arc::clone(&cache)));
    let jobs = Arc::new(JobQueue::start(Arc::clone(&orchestrator), 2));

    let state = AppState::new(engine, jobs, cache);
    TestServer::new(create_router(state)).unwrap()
}

async fn wait_for_terminal(server: &TestServer, task_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = server
            .get(&format!("/api/v1/recommendations/status/{}", task_id))
            .await;
        response.assert_status_ok();
        let status: serde_json::Value = response.json();
        if status["status"] == "SUCCESS" || status["status"] == "FAILURE" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state", task_id);
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(StubLlmProvider { empty: false });
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_recommendation_types() {
    let server = create_test_server(StubLlmProvider { empty: false });
    let response = server.get("/api/v1/recommendations/types").await;
    response.assert_status_ok();
    let types: Vec<String> = response.json();
    assert_eq!(types, vec!["music", "movie", "place", "event"]);
}

#[tokio::test]
async fn test_refresh_then_rank_flow() {
    let server = create_test_server(StubLlmProvider { empty: false });

    // Enqueue one job per type
    let response = server
        .post("/api/v1/recommendations/refresh/u1")
        .json(&json!({"force": true}))
        .await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);
    let refresh: serde_json::Value = response.json();
    let tasks = refresh["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 4);

    // All jobs finish with results attached
    for task in tasks {
        let status = wait_for_terminal(&server, task["task_id"].as_str().unwrap()).await;
        assert_eq!(status["status"], "SUCCESS");
        assert!(status["result"]["recommendations"]["recommendations"].is_object());
        assert!(status["error"].is_null());
    }

    // Ranking now serves the generated data, deduplicated per category
    let response = server.get("/api/v1/recommendations/ranked/u1").await;
    response.assert_status_ok();
    let ranked: serde_json::Value = response.json();
    assert_eq!(ranked["data_source"], "cache");
    assert!(ranked["metadata"]["total_results"].as_u64().unwrap() > 0);

    let music = ranked["ranked_recommendations"]["music"].as_array().unwrap();
    let titles: Vec<&str> = music
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    let unique: std::collections::HashSet<&str> = titles.iter().copied().collect();
    assert_eq!(titles.len(), unique.len(), "duplicate titles survived dedup");
}

#[tokio::test]
async fn test_get_cached_recommendations() {
    let server = create_test_server(StubLlmProvider { empty: false });

    // nothing cached yet
    let response = server.get("/api/v1/recommendations/music?user_id=u1").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let response = server
        .post("/api/v1/recommendations/refresh/u1")
        .json(&json!({"force": true}))
        .await;
    let refresh: serde_json::Value = response.json();
    for task in refresh["tasks"].as_array().unwrap() {
        wait_for_terminal(&server, task["task_id"].as_str().unwrap()).await;
    }

    let response = server.get("/api/v1/recommendations/music?user_id=u1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["recommendation_type"], "music");
    assert!(body["total_count"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_ranked_falls_back_to_dummy_data() {
    let server = create_test_server(StubLlmProvider { empty: false });

    let response = server.get("/api/v1/recommendations/ranked/nobody").await;
    response.assert_status_ok();
    let ranked: serde_json::Value = response.json();

    assert_eq!(ranked["data_source"], "dummy_data");
    assert!(ranked["metadata"]["total_results"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_ranked_respects_filters() {
    let server = create_test_server(StubLlmProvider { empty: false });

    let response = server
        .get("/api/v1/recommendations/ranked/nobody?category=place&limit=2")
        .await;
    response.assert_status_ok();
    let ranked: serde_json::Value = response.json();

    let recommendations = ranked["ranked_recommendations"].as_object().unwrap();
    assert_eq!(recommendations.keys().collect::<Vec<_>>(), vec!["place"]);
    assert!(recommendations["place"].as_array().unwrap().len() <= 2);
}

#[tokio::test]
async fn test_ranked_rejects_unknown_category() {
    let server = create_test_server(StubLlmProvider { empty: false });

    let response = server
        .get("/api/v1/recommendations/ranked/u1?category=podcast")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_llm_result_fails_job() {
    let server = create_test_server(StubLlmProvider { empty: true });

    let response = server
        .post("/api/v1/recommendations/refresh/u1")
        .json(&json!({"force": true}))
        .await;
    let refresh: serde_json::Value = response.json();
    let task_id = refresh["tasks"][0]["task_id"].as_str().unwrap();

    let status = wait_for_terminal(&server, task_id).await;
    assert_eq!(status["status"], "FAILURE");
    let error = status["error"].as_str().unwrap();
    assert!(error.contains("No recommendations generated"), "{}", error);
    assert!(status["result"].is_null());
}

#[tokio::test]
async fn test_unknown_job_id_is_pending() {
    let server = create_test_server(StubLlmProvider { empty: false });

    let response = server
        .get(&format!(
            "/api/v1/recommendations/status/{}",
            uuid::Uuid::new_v4()
        ))
        .await;
    response.assert_status_ok();
    let status: serde_json::Value = response.json();
    assert_eq!(status["status"], "PENDING");
}

#[tokio::test]
async fn test_delete_cached_recommendations() {
    let server = create_test_server(StubLlmProvider { empty: false });

    let response = server
        .delete("/api/v1/recommendations/music?user_id=u1")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
}

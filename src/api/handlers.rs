use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{get_json, CacheKey};
use crate::error::{AppError, AppResult};
use crate::models::{
    RankedResult, RankingFilters, RawRecommendationSet, RecommendationType, TaskStatus,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Force regeneration even when a cached set exists
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct EnqueuedTask {
    pub recommendation_type: RecommendationType,
    pub task_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub user_id: String,
    pub force_refresh: bool,
    pub tasks: Vec<EnqueuedTask>,
}

#[derive(Debug, Deserialize)]
pub struct RankedQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub min_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Enqueues one pipeline job per known recommendation type
pub async fn refresh_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    request: Option<Json<RefreshRequest>>,
) -> (StatusCode, Json<RefreshResponse>) {
    let Json(request) = request.unwrap_or_default();

    tracing::info!(user_id = %user_id, force = request.force, "Refreshing recommendations");

    let mut tasks = Vec::with_capacity(RecommendationType::ALL.len());
    for recommendation_type in RecommendationType::ALL {
        let task_id = state
            .jobs
            .enqueue(user_id.clone(), recommendation_type, request.force)
            .await;
        tasks.push(EnqueuedTask {
            recommendation_type,
            task_id,
        });
    }

    (
        StatusCode::ACCEPTED,
        Json(RefreshResponse {
            user_id,
            force_refresh: request.force,
            tasks,
        }),
    )
}

/// Reports the status of a background job
pub async fn task_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Json<TaskStatus> {
    Json(state.jobs.status(job_id).await)
}

/// Returns the ranked, deduplicated, filtered recommendations for a user
pub async fn ranked_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RankedQuery>,
) -> AppResult<Json<RankedResult>> {
    let category = match &query.category {
        Some(raw) => Some(parse_type(raw)?),
        None => None,
    };

    let defaults = RankingFilters::default();
    let filters = RankingFilters {
        category,
        limit: query.limit.unwrap_or(defaults.limit),
        min_score: query.min_score.unwrap_or(defaults.min_score),
    };

    let result = state.engine.rank(&user_id, filters).await;
    Ok(Json(result))
}

/// Lists the supported recommendation types
pub async fn recommendation_types() -> Json<Vec<&'static str>> {
    Json(
        RecommendationType::ALL
            .iter()
            .map(RecommendationType::as_str)
            .collect(),
    )
}

/// Returns the cached recommendation set for a (user, type)
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(recommendation_type): Path<String>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Value>> {
    let recommendation_type = parse_type(&recommendation_type)?;

    let key = CacheKey::Recommendations(query.user_id.clone(), recommendation_type);
    let cached: Option<RawRecommendationSet> = get_json(state.cache.as_ref(), &key).await?;

    let Some(recommendations) = cached else {
        return Err(AppError::NotFound(
            "No recommendations found for the specified type".to_string(),
        ));
    };

    Ok(Json(json!({
        "user_id": query.user_id,
        "recommendation_type": recommendation_type,
        "total_count": recommendations.total_count(),
        "recommendations": recommendations,
    })))
}

/// Drops the cached recommendation set for a (user, type)
pub async fn delete_recommendations(
    State(state): State<AppState>,
    Path(recommendation_type): Path<String>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Value>> {
    let recommendation_type = parse_type(&recommendation_type)?;

    let key = CacheKey::Recommendations(query.user_id.clone(), recommendation_type);
    state.cache.delete(&key).await?;

    tracing::info!(user_id = %query.user_id, recommendation_type = %recommendation_type, "Deleted cached recommendations");

    Ok(Json(json!({
        "success": true,
        "user_id": query.user_id,
        "recommendation_type": recommendation_type,
    })))
}

fn parse_type(raw: &str) -> AppResult<RecommendationType> {
    RecommendationType::parse(raw)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown recommendation type: {}", raw)))
}

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recommendations/refresh/:user_id",
            post(handlers::refresh_recommendations),
        )
        .route(
            "/recommendations/status/:job_id",
            get(handlers::task_status),
        )
        .route(
            "/recommendations/ranked/:user_id",
            get(handlers::ranked_recommendations),
        )
        .route("/recommendations/types", get(handlers::recommendation_types))
        .route(
            "/recommendations/:recommendation_type",
            get(handlers::get_recommendations).delete(handlers::delete_recommendations),
        )
}

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(handlers::get_stats))
        .route("/snapshot/reload", post(handlers::reload_snapshot))
        // Computed recommendations
        .route(
            "/users/:user_id/recommendations",
            get(handlers::get_recommendations)
                .post(handlers::add_recommendation)
                .delete(handlers::clear_recommendations),
        )
        .route(
            "/users/:user_id/recommendations/evaluate",
            post(handlers::evaluate_recommendations),
        )
        .route("/videos/:video_id/similar", get(handlers::get_similar_videos))
        // Stored recommendation records
        .route("/recommendations/popular", get(handlers::get_popular))
        .route("/recommendations/count", get(handlers::get_record_count))
        .route(
            "/videos/:video_id/recommendations",
            get(handlers::get_video_recommendations),
        )
        .route(
            "/users/:user_id/recommendations/generate",
            post(handlers::generate_recommendations),
        )
        .route(
            "/users/:user_id/recommendations/history",
            get(handlers::get_history),
        )
        .route("/users/:user_id/recommendations/top", get(handlers::get_top))
        .route(
            "/users/:user_id/recommendations/recent",
            get(handlers::get_recent),
        )
        .route(
            "/users/:user_id/recommendations/average",
            get(handlers::get_average_score),
        )
        .route(
            "/users/:user_id/recommendations/:video_id",
            put(handlers::update_recommendation).delete(handlers::delete_recommendation),
        )
}

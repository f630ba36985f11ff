use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    engine::EngineStats,
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{EntityId, RecommendationRecord, ScoredVideo, Strategy, UserId, VideoId},
    services::ReloadSummary,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub count: Option<usize>,
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SimilarQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub videos: Vec<VideoId>,
}

#[derive(Debug, Deserialize)]
pub struct AddRecommendationRequest {
    pub video_id: VideoId,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub user_id: UserId,
    pub strategy: Strategy,
    pub snapshot: Uuid,
    pub recommendations: Vec<ScoredVideo>,
}

#[derive(Debug, Serialize)]
pub struct SimilarVideosResponse {
    pub video_id: VideoId,
    pub snapshot: Uuid,
    pub similar: Vec<ScoredVideo>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub user_id: UserId,
    pub hit_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub snapshot: Uuid,
    #[serde(flatten)]
    pub stats: EngineStats,
}

#[derive(Debug, Serialize)]
pub struct AverageScoreResponse {
    pub user_id: UserId,
    pub average_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub user_id: UserId,
    pub removed: u64,
}

fn parse_id(raw: &str, what: &str) -> AppResult<EntityId> {
    EntityId::parse(raw).ok_or_else(|| AppError::InvalidInput(format!("{} id must not be blank", what)))
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let (snapshot, stats) = state.service.stats().await;
    Json(StatsResponse { snapshot, stats })
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let user_id = parse_id(&user_id, "user")?;
    let count = state.service.resolve_count(query.count)?;
    let strategy = query.strategy.unwrap_or_default();

    tracing::debug!(
        request_id = %request_id,
        user_id = %user_id,
        count,
        strategy = %strategy,
        "Recommendation request"
    );

    let ranked = state
        .service
        .for_user(user_id.clone(), count, strategy)
        .await?;

    Ok(Json(RecommendationsResponse {
        user_id,
        strategy,
        snapshot: ranked.snapshot,
        recommendations: ranked.recommendations,
    }))
}

pub async fn get_similar_videos(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<SimilarVideosResponse>> {
    let video_id = parse_id(&video_id, "video")?;
    let count = state.service.resolve_count(query.count)?;

    let ranked = state.service.similar_videos(video_id.clone(), count).await?;

    Ok(Json(SimilarVideosResponse {
        video_id,
        snapshot: ranked.snapshot,
        similar: ranked.recommendations,
    }))
}

pub async fn evaluate_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<EvaluateRequest>,
) -> AppResult<Json<EvaluateResponse>> {
    let user_id = parse_id(&user_id, "user")?;
    let hit_rate = state
        .service
        .evaluate(user_id.clone(), request.videos)
        .await?;

    Ok(Json(EvaluateResponse { user_id, hit_rate }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<RecommendationRecord>>> {
    let user_id = parse_id(&user_id, "user")?;
    Ok(Json(state.service.history(&user_id).await?))
}

pub async fn get_top(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<RecommendationRecord>>> {
    let user_id = parse_id(&user_id, "user")?;
    let limit = state.service.resolve_count(query.limit)?;
    Ok(Json(state.service.top(&user_id, limit).await?))
}

pub async fn get_recent(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<RecommendationRecord>>> {
    let user_id = parse_id(&user_id, "user")?;
    let limit = state.service.resolve_count(query.limit)?;
    Ok(Json(state.service.recent(&user_id, limit).await?))
}

pub async fn get_average_score(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<AverageScoreResponse>> {
    let user_id = parse_id(&user_id, "user")?;
    let average_score = state.service.average_score(&user_id).await?;
    Ok(Json(AverageScoreResponse {
        user_id,
        average_score,
    }))
}

pub async fn get_video_recommendations(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> AppResult<Json<Vec<RecommendationRecord>>> {
    let video_id = parse_id(&video_id, "video")?;
    Ok(Json(state.service.for_video(&video_id).await?))
}

pub async fn get_popular(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<RecommendationRecord>>> {
    let limit = state.service.resolve_count(query.limit)?;
    Ok(Json(state.service.popular(limit).await?))
}

pub async fn get_record_count(State(state): State<AppState>) -> AppResult<Json<CountResponse>> {
    let count = state.service.record_count().await?;
    Ok(Json(CountResponse { count }))
}

pub async fn add_recommendation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AddRecommendationRequest>,
) -> AppResult<(StatusCode, Json<RecommendationRecord>)> {
    let user_id = parse_id(&user_id, "user")?;
    if request.video_id.is_blank() {
        return Err(AppError::InvalidInput("video id must not be blank".to_string()));
    }

    let record = state
        .service
        .add(user_id, request.video_id, request.score)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn generate_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<(StatusCode, Json<Vec<RecommendationRecord>>)> {
    let user_id = parse_id(&user_id, "user")?;
    let count = state.service.resolve_count(query.count)?;

    let records = state
        .service
        .generate_and_store(user_id, count, query.strategy.unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, Json(records)))
}

pub async fn update_recommendation(
    State(state): State<AppState>,
    Path((user_id, video_id)): Path<(String, String)>,
    Json(request): Json<UpdateScoreRequest>,
) -> AppResult<Json<RecommendationRecord>> {
    let user_id = parse_id(&user_id, "user")?;
    let video_id = parse_id(&video_id, "video")?;

    let record = state
        .service
        .update_score(&user_id, &video_id, request.score)
        .await?;

    Ok(Json(record))
}

pub async fn delete_recommendation(
    State(state): State<AppState>,
    Path((user_id, video_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let user_id = parse_id(&user_id, "user")?;
    let video_id = parse_id(&video_id, "video")?;

    state.service.delete(&user_id, &video_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ClearResponse>> {
    let user_id = parse_id(&user_id, "user")?;
    let removed = state.service.clear(&user_id).await?;
    Ok(Json(ClearResponse { user_id, removed }))
}

pub async fn reload_snapshot(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<ReloadSummary>> {
    tracing::info!(request_id = %request_id, "Snapshot reload requested");
    Ok(Json(state.service.reload().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_normalizes() {
        assert_eq!(parse_id(" 101 ", "user").unwrap(), EntityId::Int(101));
        assert_eq!(
            parse_id("tt0133093", "video").unwrap(),
            EntityId::Str("tt0133093".to_string())
        );
        assert!(matches!(parse_id("  ", "user"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_evaluate_request_accepts_mixed_ids() {
        let request: EvaluateRequest =
            serde_json::from_value(json!({ "videos": [101, "102", "tt0133093"] })).unwrap();
        assert_eq!(
            request.videos,
            vec![
                EntityId::Int(101),
                EntityId::Int(102),
                EntityId::Str("tt0133093".to_string())
            ]
        );
    }

    #[test]
    fn test_add_request_score_defaults_to_zero() {
        let request: AddRecommendationRequest =
            serde_json::from_value(json!({ "video_id": 103 })).unwrap();
        assert_eq!(request.video_id, EntityId::Int(103));
        assert_eq!(request.score, 0.0);
    }

    #[test]
    fn test_stats_response_is_flat() {
        let response = StatsResponse {
            snapshot: Uuid::nil(),
            stats: EngineStats {
                users: 3,
                videos: 4,
                interactions: 5,
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["users"], 3);
        assert_eq!(value["interactions"], 5);
    }
}

use crate::{
    error::AppResult,
    models::{RecommendationRecord, UserId, VideoId},
};

/// Storage for recommendation records
///
/// The engine never reads from here; records are what the service chose to
/// keep after generating a list, plus whatever clients add directly.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationRepository: Send + Sync {
    async fn insert(&self, record: &RecommendationRecord) -> AppResult<()>;

    /// Inserts all records or none
    async fn insert_many(&self, records: &[RecommendationRecord]) -> AppResult<()>;

    /// Most recent record for a user/video pair
    async fn find(
        &self,
        user_id: &UserId,
        video_id: &VideoId,
    ) -> AppResult<Option<RecommendationRecord>>;

    /// All records for a user, newest first
    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<RecommendationRecord>>;

    /// Highest scored records for a user
    async fn top_for_user(&self, user_id: &UserId, limit: usize)
        -> AppResult<Vec<RecommendationRecord>>;

    /// Most recent records for a user, newest first
    async fn recent_for_user(&self, user_id: &UserId, limit: usize)
        -> AppResult<Vec<RecommendationRecord>>;

    /// Mean score over a user's records; `None` when there are none
    async fn average_score_for_user(&self, user_id: &UserId) -> AppResult<Option<f64>>;

    /// Every record pointing at a video, newest first
    async fn list_for_video(&self, video_id: &VideoId) -> AppResult<Vec<RecommendationRecord>>;

    /// Highest scored records across all users
    async fn popular(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>>;

    /// Total number of stored records
    async fn count(&self) -> AppResult<u64>;

    /// Returns whether any record was updated
    async fn update_score(&self, user_id: &UserId, video_id: &VideoId, score: f64)
        -> AppResult<bool>;

    /// Returns whether any record was deleted
    async fn delete(&self, user_id: &UserId, video_id: &VideoId) -> AppResult<bool>;

    /// Returns the number of records removed
    async fn clear_for_user(&self, user_id: &UserId) -> AppResult<u64>;
}

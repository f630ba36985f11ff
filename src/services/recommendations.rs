use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey, RecommendationRepository},
    engine::{EngineHandle, EngineStats, RecommendationEngine},
    error::{AppError, AppResult},
    models::{RecommendationRecord, ScoredVideo, Strategy, UserId, VideoId},
};

/// Where a fresh snapshot is read from on reload
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub interactions: PathBuf,
    pub videos: PathBuf,
}

impl DatasetPaths {
    pub fn new(interactions: impl Into<PathBuf>, videos: impl Into<PathBuf>) -> Self {
        Self {
            interactions: interactions.into(),
            videos: videos.into(),
        }
    }
}

/// A ranked list together with the snapshot that produced it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedVideos {
    pub snapshot: Uuid,
    pub recommendations: Vec<ScoredVideo>,
}

/// Outcome of a snapshot reload
#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub previous_snapshot: Uuid,
    pub snapshot: Uuid,
    pub stats: EngineStats,
}

/// Orchestrates the engine, the cache and the record store
///
/// Engine calls run on the blocking pool: the first call against a snapshot
/// builds a similarity matrix, which is CPU-bound.
pub struct RecommendationService {
    engine: EngineHandle,
    repository: Arc<dyn RecommendationRepository>,
    cache: Option<Cache>,
    cache_ttl: u64,
    source: Option<DatasetPaths>,
    default_count: usize,
    max_count: usize,
    warm_on_load: bool,
}

impl RecommendationService {
    pub fn new(engine: EngineHandle, repository: Arc<dyn RecommendationRepository>) -> Self {
        Self {
            engine,
            repository,
            cache: None,
            cache_ttl: 3600,
            source: None,
            default_count: 5,
            max_count: 100,
            warm_on_load: false,
        }
    }

    pub fn with_cache(mut self, cache: Cache, ttl: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub fn with_source(mut self, source: DatasetPaths) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_counts(mut self, default_count: usize, max_count: usize) -> Self {
        self.default_count = default_count;
        self.max_count = max_count;
        self
    }

    pub fn with_warm_on_load(mut self, warm_on_load: bool) -> Self {
        self.warm_on_load = warm_on_load;
        self
    }

    /// Resolves a requested list length against the configured bounds
    pub fn resolve_count(&self, requested: Option<usize>) -> AppResult<usize> {
        let count = requested.unwrap_or(self.default_count);
        if count > self.max_count {
            return Err(AppError::InvalidInput(format!(
                "count must be at most {}",
                self.max_count
            )));
        }
        Ok(count)
    }

    pub async fn stats(&self) -> (Uuid, EngineStats) {
        let engine = self.engine.current().await;
        (engine.version(), engine.stats())
    }

    /// Personalized recommendations for a user
    pub async fn for_user(
        &self,
        user_id: UserId,
        count: usize,
        strategy: Strategy,
    ) -> AppResult<RankedVideos> {
        let engine = self.engine.current().await;
        let snapshot = engine.version();
        let key = CacheKey::UserRecommendations {
            snapshot,
            strategy,
            user_id: user_id.clone(),
            count,
        };

        let recommendations: Vec<ScoredVideo> =
            cached!(self.cache.as_ref(), key, self.cache_ttl, async {
                let start = Instant::now();
                let user = user_id.clone();
                let recs = run_blocking(engine, move |engine| match strategy {
                    Strategy::Collaborative => engine.collaborative_scored(&user, count),
                    Strategy::Hybrid => engine.hybrid_scored(&user, count),
                })
                .await?;

                tracing::info!(
                    user_id = %user_id,
                    strategy = %strategy,
                    requested = count,
                    returned = recs.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Recommendations computed"
                );
                Ok::<_, AppError>(recs)
            })?;

        Ok(RankedVideos {
            snapshot,
            recommendations,
        })
    }

    /// Videos with the most similar content to `video_id`
    pub async fn similar_videos(&self, video_id: VideoId, count: usize) -> AppResult<RankedVideos> {
        let engine = self.engine.current().await;
        let snapshot = engine.version();
        let key = CacheKey::SimilarVideos {
            snapshot,
            video_id: video_id.clone(),
            count,
        };

        let recommendations: Vec<ScoredVideo> =
            cached!(self.cache.as_ref(), key, self.cache_ttl, async {
                let video = video_id.clone();
                let recs =
                    run_blocking(engine, move |engine| engine.content_scored(&video, count))
                        .await?;

                tracing::info!(
                    video_id = %video_id,
                    requested = count,
                    returned = recs.len(),
                    "Similar videos computed"
                );
                Ok::<_, AppError>(recs)
            })?;

        Ok(RankedVideos {
            snapshot,
            recommendations,
        })
    }

    /// Hit rate of a list against the user's watch history
    pub async fn evaluate(&self, user_id: UserId, videos: Vec<VideoId>) -> AppResult<f64> {
        let engine = self.engine.current().await;
        let score = engine.evaluate_recommendations(&user_id, &videos)?;

        tracing::info!(
            user_id = %user_id,
            recommendations = videos.len(),
            hit_rate = score,
            "Recommendations evaluated"
        );

        Ok(score)
    }

    /// Computes a list and stores every entry as a recommendation record
    pub async fn generate_and_store(
        &self,
        user_id: UserId,
        count: usize,
        strategy: Strategy,
    ) -> AppResult<Vec<RecommendationRecord>> {
        let ranked = self.for_user(user_id.clone(), count, strategy).await?;
        let records: Vec<RecommendationRecord> = ranked
            .recommendations
            .into_iter()
            .map(|rec| RecommendationRecord::new(user_id.clone(), rec.video_id, rec.score))
            .collect();

        self.repository.insert_many(&records).await?;

        tracing::info!(
            user_id = %user_id,
            stored = records.len(),
            "Generated recommendations stored"
        );

        Ok(records)
    }

    pub async fn history(&self, user_id: &UserId) -> AppResult<Vec<RecommendationRecord>> {
        let history = self.repository.list_for_user(user_id).await?;
        if history.is_empty() {
            tracing::info!(user_id = %user_id, "No recommendation history found");
        }
        Ok(history)
    }

    pub async fn top(&self, user_id: &UserId, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
        self.repository.top_for_user(user_id, limit).await
    }

    pub async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> AppResult<Vec<RecommendationRecord>> {
        self.repository.recent_for_user(user_id, limit).await
    }

    /// Mean stored score for a user, `None` without records
    pub async fn average_score(&self, user_id: &UserId) -> AppResult<Option<f64>> {
        self.repository.average_score_for_user(user_id).await
    }

    pub async fn for_video(&self, video_id: &VideoId) -> AppResult<Vec<RecommendationRecord>> {
        self.repository.list_for_video(video_id).await
    }

    /// Highest scored stored records across all users
    pub async fn popular(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
        let popular = self.repository.popular(limit).await?;
        if popular.is_empty() {
            tracing::info!("No popular recommendations found");
        } else {
            tracing::info!(found = popular.len(), "Popular recommendations fetched");
        }
        Ok(popular)
    }

    pub async fn record_count(&self) -> AppResult<u64> {
        self.repository.count().await
    }

    pub async fn add(
        &self,
        user_id: UserId,
        video_id: VideoId,
        score: f64,
    ) -> AppResult<RecommendationRecord> {
        if !score.is_finite() {
            return Err(AppError::InvalidInput("score must be a finite number".to_string()));
        }

        let record = RecommendationRecord::new(user_id, video_id, score);
        self.repository.insert(&record).await?;

        tracing::info!(
            user_id = %record.user_id,
            video_id = %record.video_id,
            "Recommendation added"
        );

        Ok(record)
    }

    pub async fn update_score(
        &self,
        user_id: &UserId,
        video_id: &VideoId,
        score: f64,
    ) -> AppResult<RecommendationRecord> {
        if !score.is_finite() {
            return Err(AppError::InvalidInput("score must be a finite number".to_string()));
        }

        if !self.repository.update_score(user_id, video_id, score).await? {
            tracing::warn!(user_id = %user_id, video_id = %video_id, "No recommendation to update");
            return Err(not_found(user_id, video_id));
        }

        self.repository
            .find(user_id, video_id)
            .await?
            .ok_or_else(|| not_found(user_id, video_id))
    }

    pub async fn delete(&self, user_id: &UserId, video_id: &VideoId) -> AppResult<()> {
        if !self.repository.delete(user_id, video_id).await? {
            return Err(not_found(user_id, video_id));
        }

        tracing::info!(user_id = %user_id, video_id = %video_id, "Recommendation deleted");
        Ok(())
    }

    /// Removes every stored record for a user, returning how many went
    pub async fn clear(&self, user_id: &UserId) -> AppResult<u64> {
        let removed = self.repository.clear_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, removed, "Recommendations cleared");
        Ok(removed)
    }

    /// Rebuilds the snapshot from the configured CSV files and swaps it in
    ///
    /// A failed load leaves the current snapshot serving.
    pub async fn reload(&self) -> AppResult<ReloadSummary> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| AppError::InvalidInput("no dataset source configured".to_string()))?;
        let warm = self.warm_on_load;

        let engine = tokio::task::spawn_blocking(move || {
            let engine = RecommendationEngine::from_csv_paths(&source.interactions, &source.videos)?;
            if warm {
                engine.warm();
            }
            Ok::<_, AppError>(engine)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        let snapshot = engine.version();
        let stats = engine.stats();
        let previous = self.engine.swap(engine).await;

        Ok(ReloadSummary {
            previous_snapshot: previous.version(),
            snapshot,
            stats,
        })
    }
}

async fn run_blocking<T, F>(engine: Arc<RecommendationEngine>, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&RecommendationEngine) -> Result<T, crate::engine::EngineError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

fn not_found(user_id: &UserId, video_id: &VideoId) -> AppError {
    AppError::NotFound(format!(
        "No recommendation of video {} for user {}",
        video_id, user_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::MockRecommendationRepository;
    use crate::db::InMemoryRecommendationRepository;
    use crate::engine::EngineError;
    use crate::models::{EntityId, InteractionRecord, VideoFeatureRecord};
    use mockall::predicate::eq;

    fn create_test_engine() -> RecommendationEngine {
        RecommendationEngine::load(
            vec![
                InteractionRecord::new(1, 101, 5.0),
                InteractionRecord::new(1, 102, 4.0),
                InteractionRecord::new(2, 102, 4.0),
                InteractionRecord::new(2, 103, 5.0),
                InteractionRecord::new(3, 104, 3.0),
            ],
            vec![
                VideoFeatureRecord::new(101, Some("comedy"), Some("Ava"), Some("Sam")),
                VideoFeatureRecord::new(102, Some("comedy"), Some("Ben"), Some("Lee")),
                VideoFeatureRecord::new(103, Some("drama"), Some("Cal"), Some("Kim")),
                VideoFeatureRecord::new(104, Some("horror"), Some("Dee"), Some("Ola")),
            ],
        )
        .unwrap()
    }

    fn create_test_service(repository: Arc<dyn RecommendationRepository>) -> RecommendationService {
        RecommendationService::new(EngineHandle::new(create_test_engine()), repository)
    }

    fn video_ids(ranked: &RankedVideos) -> Vec<EntityId> {
        ranked
            .recommendations
            .iter()
            .map(|r| r.video_id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_for_user_collaborative() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        let ranked = service
            .for_user(EntityId::Int(1), 5, Strategy::Collaborative)
            .await
            .unwrap();

        assert_eq!(video_ids(&ranked), vec![EntityId::Int(103), EntityId::Int(104)]);
    }

    #[tokio::test]
    async fn test_for_user_unknown_user() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        let result = service
            .for_user(EntityId::Int(42), 5, Strategy::Hybrid)
            .await;

        assert!(matches!(
            result,
            Err(AppError::Engine(EngineError::UnknownUser(_)))
        ));
    }

    #[tokio::test]
    async fn test_similar_videos() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        let ranked = service.similar_videos(EntityId::Int(101), 1).await.unwrap();
        assert_eq!(video_ids(&ranked), vec![EntityId::Int(102)]);
    }

    #[tokio::test]
    async fn test_resolve_count() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()))
            .with_counts(3, 10);
        assert_eq!(service.resolve_count(None).unwrap(), 3);
        assert_eq!(service.resolve_count(Some(0)).unwrap(), 0);
        assert!(matches!(
            service.resolve_count(Some(11)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_and_store_inserts_records() {
        let mut repository = MockRecommendationRepository::new();
        repository
            .expect_insert_many()
            .withf(|records: &[RecommendationRecord]| {
                records.len() == 2
                    && records.iter().all(|r| r.user_id == EntityId::Int(1))
                    && records[0].video_id == EntityId::Int(103)
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = create_test_service(Arc::new(repository));
        let stored = service
            .generate_and_store(EntityId::Int(1), 5, Strategy::Collaborative)
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_update_score_missing_record() {
        let mut repository = MockRecommendationRepository::new();
        repository
            .expect_update_score()
            .with(eq(EntityId::Int(1)), eq(EntityId::Int(999)), eq(0.5))
            .times(1)
            .returning(|_, _, _| Ok(false));

        let service = create_test_service(Arc::new(repository));
        let result = service
            .update_score(&EntityId::Int(1), &EntityId::Int(999), 0.5)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_rejects_non_finite_score() {
        let mut repository = MockRecommendationRepository::new();
        repository.expect_insert().never();

        let service = create_test_service(Arc::new(repository));
        let result = service
            .add(EntityId::Int(1), EntityId::Int(103), f64::INFINITY)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_record_lifecycle() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        let user = EntityId::Int(1);
        let video = EntityId::Int(103);

        service.add(user.clone(), video.clone(), 0.2).await.unwrap();
        let updated = service.update_score(&user, &video, 0.9).await.unwrap();
        assert_eq!(updated.score, 0.9);

        assert_eq!(service.top(&user, 5).await.unwrap().len(), 1);
        service.delete(&user, &video).await.unwrap();
        assert!(service.history(&user).await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&user, &video).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_cache_does_not_fail_requests() {
        let client = crate::db::create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client).await;
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()))
            .with_cache(cache, 60);

        let ranked = service
            .for_user(EntityId::Int(1), 5, Strategy::Collaborative)
            .await
            .unwrap();
        assert_eq!(video_ids(&ranked), vec![EntityId::Int(103), EntityId::Int(104)]);

        let similar = service.similar_videos(EntityId::Int(101), 1).await.unwrap();
        assert_eq!(video_ids(&similar), vec![EntityId::Int(102)]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_popular_delegates_limit() {
        let mut repository = MockRecommendationRepository::new();
        repository
            .expect_popular()
            .with(eq(3usize))
            .times(1)
            .returning(|_| {
                Ok(vec![RecommendationRecord::new(
                    EntityId::Int(2),
                    EntityId::Int(101),
                    0.9,
                )])
            });

        let service = create_test_service(Arc::new(repository));
        let popular = service.popular(3).await.unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].score, 0.9);
    }

    #[tokio::test]
    async fn test_record_summaries() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        let user = EntityId::Int(1);

        assert_eq!(service.average_score(&user).await.unwrap(), None);
        service.add(user.clone(), EntityId::Int(103), 0.2).await.unwrap();
        service.add(user.clone(), EntityId::Int(104), 0.6).await.unwrap();
        service.add(EntityId::Int(2), EntityId::Int(103), 0.4).await.unwrap();

        let average = service.average_score(&user).await.unwrap().unwrap();
        assert!((average - 0.4).abs() < 1e-9);
        assert_eq!(service.recent(&user, 1).await.unwrap()[0].video_id, EntityId::Int(104));
        assert_eq!(service.for_video(&EntityId::Int(103)).await.unwrap().len(), 2);
        assert_eq!(service.record_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reload_without_source() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        assert!(matches!(
            service.reload().await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_snapshot() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()))
            .with_source(DatasetPaths::new("/nonexistent/users.csv", "/nonexistent/videos.csv"));
        let (before, _) = service.stats().await;

        let result = service.reload().await;
        assert!(matches!(
            result,
            Err(AppError::Engine(EngineError::DataFormat(_)))
        ));

        let (after, _) = service.stats().await;
        assert_eq!(before, after);
    }

    #[test]
    fn test_evaluate_blocking() {
        let service = create_test_service(Arc::new(InMemoryRecommendationRepository::new()));
        let score = tokio_test::block_on(
            service.evaluate(EntityId::Int(1), vec![EntityId::Int(101), EntityId::Int(103)]),
        )
        .unwrap();
        assert_eq!(score, 0.5);
    }
}

use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{RecommendationRecord, UserId, VideoId},
};

use super::RecommendationRepository;

/// Process-local record store, used when no database is configured
#[derive(Default)]
pub struct InMemoryRecommendationRepository {
    records: RwLock<Vec<RecommendationRecord>>,
}

impl InMemoryRecommendationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(record: &RecommendationRecord, user_id: &UserId, video_id: &VideoId) -> bool {
    &record.user_id == user_id && &record.video_id == video_id
}

#[async_trait::async_trait]
impl RecommendationRepository for InMemoryRecommendationRepository {
    async fn insert(&self, record: &RecommendationRecord) -> AppResult<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn insert_many(&self, records: &[RecommendationRecord]) -> AppResult<()> {
        self.records.write().await.extend_from_slice(records);
        Ok(())
    }

    async fn find(
        &self,
        user_id: &UserId,
        video_id: &VideoId,
    ) -> AppResult<Option<RecommendationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| matches(r, user_id, video_id))
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<RecommendationRecord>> {
        let records = self.records.read().await;
        // Reversed insertion order is newest first
        Ok(records
            .iter()
            .rev()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn top_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> AppResult<Vec<RecommendationRecord>> {
        let mut records = self.list_for_user(user_id).await?;
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        records.truncate(limit);
        Ok(records)
    }

    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> AppResult<Vec<RecommendationRecord>> {
        let mut records = self.list_for_user(user_id).await?;
        records.truncate(limit);
        Ok(records)
    }

    async fn average_score_for_user(&self, user_id: &UserId) -> AppResult<Option<f64>> {
        let records = self.records.read().await;
        let (sum, n) = records
            .iter()
            .filter(|r| &r.user_id == user_id)
            .fold((0.0, 0usize), |(sum, n), r| (sum + r.score, n + 1));
        Ok((n > 0).then(|| sum / n as f64))
    }

    async fn list_for_video(&self, video_id: &VideoId) -> AppResult<Vec<RecommendationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| &r.video_id == video_id)
            .cloned()
            .collect())
    }

    async fn popular(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
        let mut records: Vec<_> = self.records.read().await.iter().rev().cloned().collect();
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        records.truncate(limit);
        Ok(records)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn update_score(
        &self,
        user_id: &UserId,
        video_id: &VideoId,
        score: f64,
    ) -> AppResult<bool> {
        let mut records = self.records.write().await;
        let mut updated = false;
        for record in records.iter_mut().filter(|r| matches(r, user_id, video_id)) {
            record.score = score;
            updated = true;
        }
        Ok(updated)
    }

    async fn delete(&self, user_id: &UserId, video_id: &VideoId) -> AppResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !matches(r, user_id, video_id));
        Ok(records.len() < before)
    }

    async fn clear_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| &r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;

    fn record(user: i64, video: i64, score: f64) -> RecommendationRecord {
        RecommendationRecord::new(EntityId::Int(user), EntityId::Int(video), score)
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let repository = InMemoryRecommendationRepository::new();
        repository.insert(&record(1, 101, 0.1)).await.unwrap();
        repository.insert(&record(1, 102, 0.2)).await.unwrap();
        repository.insert(&record(2, 103, 0.3)).await.unwrap();

        let listed = repository.list_for_user(&EntityId::Int(1)).await.unwrap();
        let videos: Vec<_> = listed.iter().map(|r| r.video_id.clone()).collect();
        assert_eq!(videos, vec![EntityId::Int(102), EntityId::Int(101)]);
    }

    #[tokio::test]
    async fn test_top_for_user_orders_by_score() {
        let repository = InMemoryRecommendationRepository::new();
        repository
            .insert_many(&[record(1, 101, 0.2), record(1, 102, 0.9), record(1, 103, 0.5)])
            .await
            .unwrap();

        let top = repository.top_for_user(&EntityId::Int(1), 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].video_id, EntityId::Int(102));
        assert_eq!(top[1].video_id, EntityId::Int(103));
    }

    #[tokio::test]
    async fn test_update_and_find() {
        let repository = InMemoryRecommendationRepository::new();
        repository.insert(&record(1, 101, 0.2)).await.unwrap();

        let user = EntityId::Int(1);
        let video = EntityId::Int(101);
        assert!(repository.update_score(&user, &video, 0.8).await.unwrap());
        assert!(!repository
            .update_score(&user, &EntityId::Int(999), 0.8)
            .await
            .unwrap());

        let found = repository.find(&user, &video).await.unwrap().unwrap();
        assert_eq!(found.score, 0.8);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let repository = InMemoryRecommendationRepository::new();
        repository
            .insert_many(&[record(1, 101, 0.2), record(1, 102, 0.3), record(2, 101, 0.4)])
            .await
            .unwrap();

        assert!(repository
            .delete(&EntityId::Int(1), &EntityId::Int(101))
            .await
            .unwrap());
        assert!(!repository
            .delete(&EntityId::Int(1), &EntityId::Int(101))
            .await
            .unwrap());
        assert_eq!(repository.clear_for_user(&EntityId::Int(1)).await.unwrap(), 1);
        assert_eq!(
            repository.list_for_user(&EntityId::Int(2)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_recent_and_average() {
        let repository = InMemoryRecommendationRepository::new();
        repository
            .insert_many(&[record(1, 101, 0.2), record(1, 102, 0.4), record(1, 103, 0.9)])
            .await
            .unwrap();

        let recent = repository.recent_for_user(&EntityId::Int(1), 2).await.unwrap();
        let videos: Vec<_> = recent.iter().map(|r| r.video_id.clone()).collect();
        assert_eq!(videos, vec![EntityId::Int(103), EntityId::Int(102)]);

        let average = repository
            .average_score_for_user(&EntityId::Int(1))
            .await
            .unwrap()
            .unwrap();
        assert!((average - 0.5).abs() < 1e-9);
        assert_eq!(
            repository.average_score_for_user(&EntityId::Int(2)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_video_popular_and_count() {
        let repository = InMemoryRecommendationRepository::new();
        repository
            .insert_many(&[record(1, 101, 0.2), record(2, 101, 0.7), record(3, 102, 0.5)])
            .await
            .unwrap();

        let for_video = repository.list_for_video(&EntityId::Int(101)).await.unwrap();
        let users: Vec<_> = for_video.iter().map(|r| r.user_id.clone()).collect();
        assert_eq!(users, vec![EntityId::Int(2), EntityId::Int(1)]);

        let popular = repository.popular(2).await.unwrap();
        let scores: Vec<f64> = popular.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.7, 0.5]);

        assert_eq!(repository.count().await.unwrap(), 3);
    }
}

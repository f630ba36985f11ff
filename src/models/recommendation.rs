use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{UserId, VideoId};

/// A recommended video with the similarity that surfaced it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredVideo {
    pub video_id: VideoId,
    pub score: f64,
}

/// A persisted recommendation for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub video_id: VideoId,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

impl RecommendationRecord {
    /// Creates a new record stamped with the current time
    pub fn new(user_id: UserId, video_id: VideoId, score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            video_id,
            score,
            created_at: Utc::now(),
        }
    }
}

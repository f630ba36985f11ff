//! Recommendation engine
//!
//! Holds one immutable snapshot of interaction and video feature data and
//! derives two cosine similarity matrices from it on first use:
//!
//! - user×user, over the pivoted rating matrix (collaborative filtering)
//! - video×video, over one-hot encoded genre/director/cast (content filtering)
//!
//! Rows of both matrices are addressed through explicit id→index maps, so ids
//! need not be contiguous integers. A snapshot never changes after loading;
//! absorbing new data means building a new engine and swapping it in through
//! [`EngineHandle`].

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InteractionRecord, ScoredVideo, UserId, VideoFeatureRecord, VideoId};

pub mod dataset;
pub mod evaluate;
pub mod generator;
pub mod handle;
pub mod similarity;

pub use dataset::Dataset;
pub use handle::EngineHandle;
pub use similarity::SimilarityMatrix;

/// Error types for the recommendation engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed input data: {0}")]
    DataFormat(String),
    #[error("User {0} not found")]
    UnknownUser(UserId),
    #[error("Video {0} not found")]
    UnknownVideo(VideoId),
}

/// Size of a loaded snapshot
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EngineStats {
    pub users: usize,
    pub videos: usize,
    pub interactions: usize,
}

/// Recommendation engine over one dataset snapshot
pub struct RecommendationEngine {
    version: Uuid,
    dataset: Dataset,
    user_similarity: OnceCell<SimilarityMatrix>,
    video_similarity: OnceCell<SimilarityMatrix>,
}

impl RecommendationEngine {
    /// Creates an engine from an already-built dataset
    pub fn new(dataset: Dataset) -> Self {
        Self {
            version: Uuid::new_v4(),
            dataset,
            user_similarity: OnceCell::new(),
            video_similarity: OnceCell::new(),
        }
    }

    /// Builds an engine from interaction and video feature records
    pub fn load(
        interactions: Vec<InteractionRecord>,
        videos: Vec<VideoFeatureRecord>,
    ) -> Result<Self, EngineError> {
        Ok(Self::new(Dataset::new(interactions, videos)?))
    }

    /// Builds an engine from CSV sources
    pub fn from_readers<I: Read, F: Read>(interactions: I, features: F) -> Result<Self, EngineError> {
        Ok(Self::new(Dataset::from_readers(interactions, features)?))
    }

    /// Builds an engine from CSV files on disk
    pub fn from_csv_paths(
        interactions_path: impl AsRef<Path>,
        features_path: impl AsRef<Path>,
    ) -> Result<Self, EngineError> {
        Ok(Self::new(Dataset::from_paths(interactions_path, features_path)?))
    }

    /// Identifies this snapshot; a reload always gets a new version
    pub fn version(&self) -> Uuid {
        self.version
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            users: self.dataset.preferences().len(),
            videos: self.dataset.videos().len(),
            interactions: self.dataset.interactions().len(),
        }
    }

    /// User×user similarity, built on first call
    ///
    /// Concurrent first callers block until the single build finishes.
    pub fn user_similarity(&self) -> &SimilarityMatrix {
        self.user_similarity
            .get_or_init(|| similarity::build_user_similarity(&self.dataset))
    }

    /// Video×video similarity, built on first call
    pub fn video_similarity(&self) -> &SimilarityMatrix {
        self.video_similarity
            .get_or_init(|| similarity::build_video_similarity(&self.dataset))
    }

    /// Builds both similarity matrices up front
    pub fn warm(&self) {
        self.user_similarity();
        self.video_similarity();
        tracing::info!(snapshot = %self.version, "Similarity matrices ready");
    }

    /// Videos watched by similar users that `user_id` has not seen
    pub fn recommend_for_user(
        &self,
        user_id: &UserId,
        count: usize,
    ) -> Result<Vec<VideoId>, EngineError> {
        Ok(into_ids(self.collaborative_scored(user_id, count)?))
    }

    /// Videos most similar in content to `video_id`, excluding it
    pub fn recommend_based_on_content(
        &self,
        video_id: &VideoId,
        count: usize,
    ) -> Result<Vec<VideoId>, EngineError> {
        Ok(into_ids(self.content_scored(video_id, count)?))
    }

    /// Collaborative candidates replaced by their closest content neighbors
    pub fn hybrid_recommendation(
        &self,
        user_id: &UserId,
        count: usize,
    ) -> Result<Vec<VideoId>, EngineError> {
        Ok(into_ids(self.hybrid_scored(user_id, count)?))
    }

    /// Hit rate of `recommended` against the user's watch history
    pub fn evaluate_recommendations(
        &self,
        user_id: &UserId,
        recommended: &[VideoId],
    ) -> Result<f64, EngineError> {
        let watched = self
            .dataset
            .watched(user_id)
            .ok_or_else(|| EngineError::UnknownUser(user_id.clone()))?;
        Ok(evaluate::hit_rate(watched, recommended))
    }

    pub fn collaborative_scored(
        &self,
        user_id: &UserId,
        count: usize,
    ) -> Result<Vec<ScoredVideo>, EngineError> {
        self.require_user(user_id)?;
        generator::collaborative(&self.dataset, self.user_similarity(), user_id, count)
    }

    pub fn content_scored(
        &self,
        video_id: &VideoId,
        count: usize,
    ) -> Result<Vec<ScoredVideo>, EngineError> {
        if !self.dataset.contains_video(video_id) {
            return Err(EngineError::UnknownVideo(video_id.clone()));
        }
        generator::content_based(self.video_similarity(), video_id, count)
    }

    pub fn hybrid_scored(
        &self,
        user_id: &UserId,
        count: usize,
    ) -> Result<Vec<ScoredVideo>, EngineError> {
        self.require_user(user_id)?;
        generator::hybrid(
            &self.dataset,
            self.user_similarity(),
            self.video_similarity(),
            user_id,
            count,
        )
    }

    // Checked before any matrix build so a bad id never pays for one
    fn require_user(&self, user_id: &UserId) -> Result<(), EngineError> {
        if self.dataset.preferences().contains_user(user_id) {
            Ok(())
        } else {
            Err(EngineError::UnknownUser(user_id.clone()))
        }
    }
}

fn into_ids(recommendations: Vec<ScoredVideo>) -> Vec<VideoId> {
    recommendations.into_iter().map(|r| r.video_id).collect()
}

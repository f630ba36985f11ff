use std::collections::HashSet;

use crate::models::{ScoredVideo, UserId, VideoId};

use super::dataset::Dataset;
use super::similarity::SimilarityMatrix;
use super::EngineError;

/// Unwatched videos reachable through a user's nearest neighbors
struct Candidates<'a> {
    watched: HashSet<&'a VideoId>,
    /// Neighbor watch histories, most similar first, with that neighbor's similarity
    neighbors: Vec<(&'a [VideoId], f64)>,
}

impl<'a> Candidates<'a> {
    fn discover(
        dataset: &'a Dataset,
        users: &SimilarityMatrix,
        user_id: &UserId,
    ) -> Result<Self, EngineError> {
        let history = dataset
            .watched(user_id)
            .ok_or_else(|| EngineError::UnknownUser(user_id.clone()))?;
        let row = users
            .index_of(user_id)
            .ok_or_else(|| EngineError::UnknownUser(user_id.clone()))?;

        let neighbors = users
            .ranked_neighbors(row)
            .into_iter()
            .filter_map(|other| {
                dataset
                    .watched(users.id_at(other))
                    .map(|videos| (videos, users.score(row, other)))
            })
            .collect();

        Ok(Self {
            watched: history.iter().collect(),
            neighbors,
        })
    }

    /// Unwatched videos in discovery order; a video may repeat across neighbors
    fn iter(&self) -> impl Iterator<Item = (&'a VideoId, f64)> + '_ {
        self.neighbors.iter().flat_map(move |(videos, score)| {
            videos
                .iter()
                .filter(move |video| !self.watched.contains(video))
                .map(move |video| (video, *score))
        })
    }

    fn is_watched(&self, video_id: &VideoId) -> bool {
        self.watched.contains(video_id)
    }
}

/// User-based collaborative filtering
///
/// Walks the most similar users first and collects their videos the
/// requester has not watched, up to `count`.
pub fn collaborative(
    dataset: &Dataset,
    users: &SimilarityMatrix,
    user_id: &UserId,
    count: usize,
) -> Result<Vec<ScoredVideo>, EngineError> {
    let candidates = Candidates::discover(dataset, users, user_id)?;

    let mut collected: HashSet<&VideoId> = HashSet::new();
    let mut recommendations = Vec::with_capacity(count);
    for (video_id, score) in candidates.iter() {
        if recommendations.len() >= count {
            break;
        }
        if collected.insert(video_id) {
            recommendations.push(ScoredVideo {
                video_id: video_id.clone(),
                score,
            });
        }
    }

    Ok(recommendations)
}

/// Content-based filtering: the `count` videos most similar to a seed video
///
/// The seed itself is never returned.
pub fn content_based(
    videos: &SimilarityMatrix,
    video_id: &VideoId,
    count: usize,
) -> Result<Vec<ScoredVideo>, EngineError> {
    let row = videos
        .index_of(video_id)
        .ok_or_else(|| EngineError::UnknownVideo(video_id.clone()))?;

    Ok(videos
        .ranked_neighbors(row)
        .into_iter()
        .take(count)
        .map(|other| ScoredVideo {
            video_id: videos.id_at(other).clone(),
            score: videos.score(row, other),
        })
        .collect())
}

/// Collaborative discovery with content substitution
///
/// Each distinct candidate is replaced by its single nearest content
/// neighbor. Neighbors the requester watched or that were already
/// collected are skipped.
pub fn hybrid(
    dataset: &Dataset,
    users: &SimilarityMatrix,
    videos: &SimilarityMatrix,
    user_id: &UserId,
    count: usize,
) -> Result<Vec<ScoredVideo>, EngineError> {
    let candidates = Candidates::discover(dataset, users, user_id)?;

    let mut tried: HashSet<&VideoId> = HashSet::new();
    let mut collected: HashSet<VideoId> = HashSet::new();
    let mut recommendations = Vec::with_capacity(count);
    for (candidate, _) in candidates.iter() {
        if recommendations.len() >= count {
            break;
        }
        if !tried.insert(candidate) {
            continue;
        }

        let Some(neighbor) = content_based(videos, candidate, 1)?.into_iter().next() else {
            continue;
        };
        if candidates.is_watched(&neighbor.video_id) || collected.contains(&neighbor.video_id) {
            continue;
        }

        collected.insert(neighbor.video_id.clone());
        recommendations.push(neighbor);
    }

    recommendations.truncate(count);
    Ok(recommendations)
}

use serde::{Deserialize, Serialize};

use super::{UserId, VideoId};

/// A single user/video interaction with its rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub video_id: VideoId,
    pub rating: f64,
}

impl InteractionRecord {
    pub fn new(user_id: impl Into<UserId>, video_id: impl Into<VideoId>, rating: f64) -> Self {
        Self {
            user_id: user_id.into(),
            video_id: video_id.into(),
            rating,
        }
    }
}

/// Categorical content attributes of a video
///
/// Attributes are optional; an absent value contributes no feature column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoFeatureRecord {
    pub video_id: VideoId,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
}

impl VideoFeatureRecord {
    pub fn new(
        video_id: impl Into<VideoId>,
        genre: Option<&str>,
        director: Option<&str>,
        cast: Option<&str>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            genre: genre.map(str::to_string),
            director: director.map(str::to_string),
            cast: cast.map(str::to_string),
        }
    }

    /// Categorical `(field, value)` pairs, skipping blank values
    pub fn categorical_values(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("genre", self.genre.as_deref()),
            ("director", self.director.as_deref()),
            ("cast", self.cast.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
    }
}

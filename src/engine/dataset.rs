use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::models::{
    EntityId, InteractionRecord, UserId, UserPreferences, VideoFeatureRecord, VideoId,
};

use super::EngineError;

const INTERACTION_COLUMNS: [&str; 3] = ["user_id", "video_id", "rating"];
const FEATURE_COLUMNS: [&str; 4] = ["video_id", "genre", "director", "cast"];

/// Interaction row as it appears in the source CSV
#[derive(Debug, Deserialize)]
struct InteractionRow {
    user_id: Option<String>,
    video_id: Option<String>,
    rating: Option<String>,
}

/// Video feature row as it appears in the source CSV
#[derive(Debug, Deserialize)]
struct FeatureRow {
    video_id: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    cast: Option<String>,
}

/// Immutable snapshot of interaction and video feature tables
#[derive(Debug, Clone)]
pub struct Dataset {
    interactions: Vec<InteractionRecord>,
    videos: Vec<VideoFeatureRecord>,
    video_index: HashMap<VideoId, usize>,
    preferences: UserPreferences,
}

impl Dataset {
    /// Builds a snapshot from already-typed records
    ///
    /// Rejects blank ids, non-finite ratings and duplicate video feature records.
    pub fn new(
        interactions: Vec<InteractionRecord>,
        videos: Vec<VideoFeatureRecord>,
    ) -> Result<Self, EngineError> {
        let mut preferences = UserPreferences::new();

        for (row, record) in interactions.iter().enumerate() {
            if record.user_id.is_blank() || record.video_id.is_blank() {
                return Err(EngineError::DataFormat(format!(
                    "interaction {} has a blank id",
                    row
                )));
            }
            if !record.rating.is_finite() {
                return Err(EngineError::DataFormat(format!(
                    "interaction {} has a non-finite rating",
                    row
                )));
            }
            preferences.add_watched(record.user_id.clone(), record.video_id.clone());
        }

        let mut video_index = HashMap::with_capacity(videos.len());
        for (row, video) in videos.iter().enumerate() {
            if video.video_id.is_blank() {
                return Err(EngineError::DataFormat(format!(
                    "video feature record {} has a blank id",
                    row
                )));
            }
            if video_index.insert(video.video_id.clone(), row).is_some() {
                return Err(EngineError::DataFormat(format!(
                    "duplicate feature record for video {}",
                    video.video_id
                )));
            }
        }

        tracing::info!(
            interactions = interactions.len(),
            users = preferences.len(),
            videos = videos.len(),
            "Dataset loaded"
        );

        Ok(Self {
            interactions,
            videos,
            video_index,
            preferences,
        })
    }

    /// Parses both tables from CSV readers
    pub fn from_readers<I: Read, F: Read>(interactions: I, features: F) -> Result<Self, EngineError> {
        let interactions = parse_interactions(interactions)?;
        let videos = parse_features(features)?;
        Self::new(interactions, videos)
    }

    /// Parses both tables from CSV files on disk
    pub fn from_paths(
        interactions_path: impl AsRef<Path>,
        features_path: impl AsRef<Path>,
    ) -> Result<Self, EngineError> {
        let interactions_path = interactions_path.as_ref();
        let features_path = features_path.as_ref();

        tracing::info!(
            interactions = %interactions_path.display(),
            features = %features_path.display(),
            "Loading dataset from CSV"
        );

        let interactions = std::fs::File::open(interactions_path).map_err(|e| {
            EngineError::DataFormat(format!(
                "cannot read {}: {}",
                interactions_path.display(),
                e
            ))
        })?;
        let features = std::fs::File::open(features_path).map_err(|e| {
            EngineError::DataFormat(format!("cannot read {}: {}", features_path.display(), e))
        })?;

        Self::from_readers(interactions, features)
    }

    pub fn interactions(&self) -> &[InteractionRecord] {
        &self.interactions
    }

    /// Video feature records in load order
    pub fn videos(&self) -> &[VideoFeatureRecord] {
        &self.videos
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn contains_video(&self, video_id: &VideoId) -> bool {
        self.video_index.contains_key(video_id)
    }

    pub fn watched(&self, user_id: &UserId) -> Option<&[VideoId]> {
        self.preferences.watched(user_id)
    }
}

fn parse_interactions<R: Read>(source: R) -> Result<Vec<InteractionRecord>, EngineError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    require_columns(&mut reader, &INTERACTION_COLUMNS, "interactions")?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<InteractionRow>().enumerate() {
        let raw = result.map_err(|e| {
            EngineError::DataFormat(format!("interaction row {}: {}", row + 1, e))
        })?;

        let user_id = required_id(raw.user_id.as_deref(), "user_id", row)?;
        let video_id = required_id(raw.video_id.as_deref(), "video_id", row)?;
        let rating = raw
            .rating
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                EngineError::DataFormat(format!("interaction row {}: missing rating", row + 1))
            })?
            .parse::<f64>()
            .map_err(|e| {
                EngineError::DataFormat(format!("interaction row {}: bad rating: {}", row + 1, e))
            })?;

        records.push(InteractionRecord {
            user_id,
            video_id,
            rating,
        });
    }

    Ok(records)
}

fn parse_features<R: Read>(source: R) -> Result<Vec<VideoFeatureRecord>, EngineError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    require_columns(&mut reader, &FEATURE_COLUMNS, "video features")?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<FeatureRow>().enumerate() {
        let raw = result.map_err(|e| {
            EngineError::DataFormat(format!("video feature row {}: {}", row + 1, e))
        })?;

        records.push(VideoFeatureRecord {
            video_id: required_id(raw.video_id.as_deref(), "video_id", row)?,
            genre: raw.genre,
            director: raw.director,
            cast: raw.cast,
        });
    }

    Ok(records)
}

fn require_columns<R: Read>(
    reader: &mut csv::Reader<R>,
    columns: &[&str],
    table: &str,
) -> Result<(), EngineError> {
    let headers = reader
        .headers()
        .map_err(|e| EngineError::DataFormat(format!("{} header: {}", table, e)))?;

    for column in columns {
        if !headers.iter().any(|h| h == *column) {
            return Err(EngineError::DataFormat(format!(
                "{} table is missing column '{}'",
                table, column
            )));
        }
    }

    Ok(())
}

fn required_id(raw: Option<&str>, field: &str, row: usize) -> Result<EntityId, EngineError> {
    raw.and_then(EntityId::parse).ok_or_else(|| {
        EngineError::DataFormat(format!("row {}: missing {}", row + 1, field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERACTIONS_CSV: &str = "\
user_id,video_id,rating
1,101,5
1,102,4
2,102,3
2,103,5
3,104,2
";

    const FEATURES_CSV: &str = "\
video_id,genre,director,cast
101,comedy,Ava,Sam
102,comedy,Ben,Lee
103,drama,Cal,Kim
104,horror,,
";

    #[test]
    fn test_from_readers() {
        let dataset = Dataset::from_readers(INTERACTIONS_CSV.as_bytes(), FEATURES_CSV.as_bytes())
            .unwrap();

        assert_eq!(dataset.interactions().len(), 5);
        assert_eq!(dataset.videos().len(), 4);
        assert_eq!(
            dataset.preferences().users(),
            &[EntityId::Int(1), EntityId::Int(2), EntityId::Int(3)]
        );
        assert_eq!(
            dataset.watched(&EntityId::Int(2)).unwrap(),
            &[EntityId::Int(102), EntityId::Int(103)]
        );
        assert!(dataset.contains_video(&EntityId::Int(104)));
    }

    #[test]
    fn test_empty_feature_cells_are_absent() {
        let dataset = Dataset::from_readers(INTERACTIONS_CSV.as_bytes(), FEATURES_CSV.as_bytes())
            .unwrap();
        let horror = &dataset.videos()[3];
        assert_eq!(horror.genre.as_deref(), Some("horror"));
        assert_eq!(horror.categorical_values().count(), 1);
    }

    #[test]
    fn test_missing_column_is_data_format_error() {
        let interactions = "user_id,video_id\n1,101\n";
        let result = Dataset::from_readers(interactions.as_bytes(), FEATURES_CSV.as_bytes());
        assert!(matches!(result, Err(EngineError::DataFormat(msg)) if msg.contains("rating")));
    }

    #[test]
    fn test_missing_feature_column() {
        let features = "video_id,genre,director\n101,comedy,Ava\n";
        let result = Dataset::from_readers(INTERACTIONS_CSV.as_bytes(), features.as_bytes());
        assert!(matches!(result, Err(EngineError::DataFormat(msg)) if msg.contains("cast")));
    }

    #[test]
    fn test_blank_user_id_rejected() {
        let interactions = "user_id,video_id,rating\n,101,5\n";
        let result = Dataset::from_readers(interactions.as_bytes(), FEATURES_CSV.as_bytes());
        assert!(matches!(result, Err(EngineError::DataFormat(msg)) if msg.contains("user_id")));
    }

    #[test]
    fn test_bad_rating_rejected() {
        let interactions = "user_id,video_id,rating\n1,101,great\n";
        let result = Dataset::from_readers(interactions.as_bytes(), FEATURES_CSV.as_bytes());
        assert!(matches!(result, Err(EngineError::DataFormat(_))));
    }

    #[test]
    fn test_non_finite_rating_rejected() {
        let result = Dataset::new(
            vec![InteractionRecord::new(1, 101, f64::NAN)],
            Vec::new(),
        );
        assert!(matches!(result, Err(EngineError::DataFormat(_))));
    }

    #[test]
    fn test_duplicate_video_rejected() {
        let result = Dataset::new(
            Vec::new(),
            vec![
                VideoFeatureRecord::new(101, Some("comedy"), None, None),
                VideoFeatureRecord::new(101, Some("drama"), None, None),
            ],
        );
        assert!(matches!(result, Err(EngineError::DataFormat(msg)) if msg.contains("101")));
    }

    #[test]
    fn test_missing_file() {
        let result = Dataset::from_paths("/nonexistent/users.csv", "/nonexistent/videos.csv");
        assert!(matches!(result, Err(EngineError::DataFormat(_))));
    }

    #[test]
    fn test_string_ids_kept_opaque() {
        let interactions = "user_id,video_id,rating\nalice,v-1,1.5\n";
        let features = "video_id,genre,director,cast\nv-1,comedy,Ava,Sam\n";
        let dataset = Dataset::from_readers(interactions.as_bytes(), features.as_bytes()).unwrap();
        assert_eq!(
            dataset.watched(&EntityId::from("alice")).unwrap(),
            &[EntityId::from("v-1")]
        );
    }

    #[test]
    fn test_csv_ids_only_normalized_when_canonical() {
        let interactions = "user_id,video_id,rating\n007,101,1\n7,0101,1\n";
        let features = "video_id,genre,director,cast\n101,comedy,,\n0101,drama,,\n";
        let dataset = Dataset::from_readers(interactions.as_bytes(), features.as_bytes()).unwrap();

        assert_eq!(dataset.preferences().len(), 2);
        assert_eq!(
            dataset.watched(&EntityId::from("007")).unwrap(),
            &[EntityId::Int(101)]
        );
        assert_eq!(
            dataset.watched(&EntityId::Int(7)).unwrap(),
            &[EntityId::Str("0101".to_string())]
        );
        assert_eq!(dataset.videos().len(), 2);
    }
}

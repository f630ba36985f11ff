use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;

pub mod interaction;
pub mod recommendation;
pub mod user_preferences;

pub use interaction::{InteractionRecord, VideoFeatureRecord};
pub use recommendation::{RecommendationRecord, ScoredVideo};
pub use user_preferences::UserPreferences;

/// Opaque identifier for a user or a video
///
/// Collaborators hand us either integer or string ids. Textual ids in the
/// canonical decimal form of an integer are normalized to `Int`, so `"101"`
/// read from a CSV cell or a URL path is the same id as a JSON `101`. Any
/// other text stays a string: `"007"` and `"+7"` are not user `7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

pub type UserId = EntityId;
pub type VideoId = EntityId;

impl EntityId {
    /// Parses a raw textual id, returning `None` for blank input
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(match trimmed.parse::<i64>() {
            Ok(n) if n.to_string() == trimmed => EntityId::Int(n),
            _ => EntityId::Str(trimmed.to_string()),
        })
    }

    /// Whether the id carries no usable value (an empty string id)
    pub fn is_blank(&self) -> bool {
        matches!(self, EntityId::Str(s) if s.trim().is_empty())
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Str(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        EntityId::parse(raw).unwrap_or_else(|| EntityId::Str(raw.to_string()))
    }
}

impl From<String> for EntityId {
    fn from(raw: String) -> Self {
        EntityId::from(raw.as_str())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntityId::Int(id) => serializer.serialize_i64(*id),
            EntityId::Str(id) => serializer.serialize_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => EntityId::Int(id),
            RawId::Str(id) => EntityId::from(id),
        })
    }
}

/// Strategy used to build a personalized recommendation list
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Videos watched by similar users
    #[default]
    Collaborative,
    /// Collaborative discovery with each candidate swapped for its nearest content neighbor
    Hybrid,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Collaborative => write!(f, "collaborative"),
            Strategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

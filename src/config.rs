use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// CSV of user interactions (`user_id,video_id,rating`)
    #[serde(default = "default_interactions_path")]
    pub interactions_path: String,

    /// CSV of video features (`video_id,genre,director,cast`)
    #[serde(default = "default_videos_path")]
    pub videos_path: String,

    /// PostgreSQL URL for recommendation records; in-process store when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis URL for the recommendation cache; caching is off when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Cache entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// List length used when a request does not specify one
    #[serde(default = "default_recommendation_count")]
    pub default_recommendation_count: usize,

    /// Largest list length a request may ask for
    #[serde(default = "default_max_recommendation_count")]
    pub max_recommendation_count: usize,

    /// Build both similarity matrices at startup and after each reload
    #[serde(default)]
    pub warm_on_load: bool,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_interactions_path() -> String {
    "data/user_data.csv".to_string()
}

fn default_videos_path() -> String {
    "data/video_data.csv".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_recommendation_count() -> usize {
    5
}

fn default_max_recommendation_count() -> usize {
    100
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every request fail
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_recommendation_count > self.max_recommendation_count {
            anyhow::bail!(
                "DEFAULT_RECOMMENDATION_COUNT ({}) exceeds MAX_RECOMMENDATION_COUNT ({})",
                self.default_recommendation_count,
                self.max_recommendation_count
            );
        }
        Ok(())
    }
}

pub mod memory;
pub mod postgres;
pub mod redis;
pub mod repository;

pub use memory::InMemoryRecommendationRepository;
pub use postgres::{create_pool, PgRecommendationRepository};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use repository::RecommendationRepository;

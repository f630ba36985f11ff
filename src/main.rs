use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelrank::{
    api::{create_router, AppState},
    config::Config,
    db::{
        create_pool, create_redis_client, Cache, InMemoryRecommendationRepository,
        PgRecommendationRepository, RecommendationRepository,
    },
    engine::{EngineHandle, RecommendationEngine},
    services::{DatasetPaths, RecommendationService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let engine = RecommendationEngine::from_csv_paths(&config.interactions_path, &config.videos_path)?;
    let stats = engine.stats();
    tracing::info!(
        snapshot = %engine.version(),
        users = stats.users,
        videos = stats.videos,
        interactions = stats.interactions,
        "Dataset loaded"
    );
    if config.warm_on_load {
        engine.warm();
    }

    let repository: Arc<dyn RecommendationRepository> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Connected to PostgreSQL");
            Arc::new(PgRecommendationRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, recommendation records are kept in memory");
            Arc::new(InMemoryRecommendationRepository::new())
        }
    };

    let mut service = RecommendationService::new(EngineHandle::new(engine), repository)
        .with_source(DatasetPaths::new(&config.interactions_path, &config.videos_path))
        .with_counts(
            config.default_recommendation_count,
            config.max_recommendation_count,
        )
        .with_warm_on_load(config.warm_on_load);

    let cache_handle = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?).await;
            service = service.with_cache(cache, config.cache_ttl_secs);
            tracing::info!(ttl_secs = config.cache_ttl_secs, "Redis cache enabled");
            Some(handle)
        }
        None => None,
    };

    let app = create_router(AppState::new(service));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

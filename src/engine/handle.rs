use std::sync::Arc;

use tokio::sync::RwLock;

use super::RecommendationEngine;

/// Shared handle to the current engine snapshot
///
/// Readers clone the inner `Arc` and drop the lock right away, so a
/// long-running recommendation never blocks a reload and a reload never
/// mutates a snapshot someone is reading.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<RwLock<Arc<RecommendationEngine>>>,
}

impl EngineHandle {
    pub fn new(engine: RecommendationEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(engine))),
        }
    }

    /// The snapshot serving requests right now
    pub async fn current(&self) -> Arc<RecommendationEngine> {
        Arc::clone(&*self.inner.read().await)
    }

    /// Replaces the snapshot, returning the one it displaced
    pub async fn swap(&self, engine: RecommendationEngine) -> Arc<RecommendationEngine> {
        let engine = Arc::new(engine);
        let mut current = self.inner.write().await;
        let previous = std::mem::replace(&mut *current, engine);

        tracing::info!(
            previous = %previous.version(),
            current = %current.version(),
            "Engine snapshot swapped"
        );

        previous
    }
}

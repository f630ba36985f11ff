/// Reads a value through an optional cache.
///
/// With `Some(cache)`, a hit is returned as is; on a miss the block is
/// awaited, its value queued for a background write and returned. A failed
/// cache read is logged and treated as a miss. With `None` the block is
/// simply awaited.
///
/// # Arguments
/// * `$cache`: `Option<&Cache>`.
/// * `$key`: the `CacheKey` to read and fill.
/// * `$ttl`: lifetime of a filled entry in seconds.
/// * `$block`: future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let recs: Vec<ScoredVideo> = cached!(self.cache.as_ref(), key, ttl, async move {
///     compute_recommendations().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = &$key;
        match $cache {
            Some(cache) => match cache.get_from_cache(key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %key, "Cache hit");
                    Ok(hit)
                }
                miss => {
                    if let Err(e) = miss {
                        tracing::warn!(error = %e, key = %key, "Cache read failed");
                    }
                    match $block.await {
                        Ok(value) => {
                            cache.set_in_background(key, &value, $ttl);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            },
            None => $block.await,
        }
    }};
}

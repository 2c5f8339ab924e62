/// Read-through caching around a fallible async computation.
///
/// Looks the key up in the cache and returns the hit. On a miss it awaits the
/// block, propagates its error with `?` (so failures are never cached), writes
/// the value back with the given TTL and returns it.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::cache::Cache)
/// * `$key`: the [`CacheKey`](crate::db::cache::CacheKey) to read and populate
/// * `$ttl`: a `std::time::Duration`
/// * `$block`: a future resolving to `AppResult<T>`
///
/// # Example
/// ```rust,ignore
/// let detail = cached!(self.cache, key, self.ttls.detail, self.build_detail(kind, id));
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Some(hit) => Ok(hit),
            None => {
                let value = $block.await?;
                $cache.set_in_cache(&$key, &value, $ttl).await;
                Ok(value)
            }
        }
    }};
}

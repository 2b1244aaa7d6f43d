/// Memoizes a metadata lookup in Redis when a cache is configured.
///
/// Reads through the optional cache first. On a miss the block runs and its
/// value, including `None` lookups, is written back in the background. A
/// failed cache read is logged and treated as a miss.
///
/// # Arguments
/// * `$cache`: An `Option<&Cache>`; `None` runs the block directly.
/// * `$key`: The [`CacheKey`](crate::db::CacheKey) for the value.
/// * `$ttl`: Time-to-live for the stored value in seconds.
/// * `$block`: Future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let poster: Option<String> = cached!(self.cache.as_ref(), CacheKey::Poster(title.to_string()), TTL, async move {
///     lookup_poster(title).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(Some(cached)) => Ok(cached),
                outcome => {
                    if let Err(e) = outcome {
                        tracing::warn!(error = %e, key = %key, "Cache read failed, fetching directly");
                    }
                    let value = $block.await?;
                    cache.set_in_background(&key, &value, $ttl);
                    Ok(value)
                }
            },
            None => $block.await,
        }
    }};
}

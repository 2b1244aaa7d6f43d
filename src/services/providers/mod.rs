/// Movie metadata provider abstraction
///
/// Posters, trailers and display details come from a third-party service
/// keyed by movie title. The recommendation core only consumes this trait;
/// lookups may fail or be retried independently of it.
use crate::{
    error::AppResult,
    models::{MovieDetails, TrendingMovie},
};

pub mod offline;
pub mod tmdb;

pub use offline::OfflineProvider;
pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
///
/// Every lookup distinguishes "not found" (`Ok(None)`) from a provider
/// failure (`Err`). Callers in the recommendation path treat both the same.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Poster image URL for the best title match
    async fn find_poster(&self, title: &str) -> AppResult<Option<String>>;

    /// Trailer URL for the best title match
    async fn find_trailer(&self, title: &str) -> AppResult<Option<String>>;

    /// Display details (ratings, credits, watch providers) for the best title match
    async fn find_details(&self, title: &str) -> AppResult<Option<MovieDetails>>;

    /// This week's trending movies, most popular first
    async fn find_trending(&self) -> AppResult<Vec<TrendingMovie>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Collapses a provider failure into "not found", logging it
pub fn or_absent<T>(result: AppResult<Option<T>>, lookup: &'static str, title: &str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, lookup, title = %title, "Metadata lookup failed, treating as not found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_or_absent_passes_values_through() {
        assert_eq!(or_absent(Ok(Some(3)), "poster", "Avatar"), Some(3));
        assert_eq!(or_absent::<u8>(Ok(None), "poster", "Avatar"), None);
    }

    #[test]
    fn test_or_absent_swallows_errors() {
        let failed: AppResult<Option<String>> = Err(AppError::ExternalApi("timeout".to_string()));
        assert_eq!(or_absent(failed, "trailer", "Avatar"), None);
    }
}

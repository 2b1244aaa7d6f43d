use crate::{
    error::AppResult,
    models::{MovieDetails, TrendingMovie},
    services::providers::MetadataProvider,
};

/// Provider used when no metadata service is configured; resolves nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait::async_trait]
impl MetadataProvider for OfflineProvider {
    async fn find_poster(&self, _title: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn find_trailer(&self, _title: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn find_details(&self, _title: &str) -> AppResult<Option<MovieDetails>> {
        Ok(None)
    }

    async fn find_trending(&self) -> AppResult<Vec<TrendingMovie>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_provider_finds_nothing() {
        let provider = OfflineProvider;
        assert_eq!(provider.find_poster("Avatar").await.unwrap(), None);
        assert_eq!(provider.find_trailer("Avatar").await.unwrap(), None);
        assert_eq!(provider.find_details("Avatar").await.unwrap(), None);
        assert!(provider.find_trending().await.unwrap().is_empty());
        assert_eq!(provider.name(), "offline");
    }
}

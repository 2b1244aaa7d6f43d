/// TMDB API provider
///
/// Resolves posters, trailers and display details by title. Every lookup
/// starts from `/search/movie` and uses the first result.
///
/// API Flow:
/// 1. Search: /search/movie?query={title} → TMDB id + poster path
/// 2. Trailer: /movie/{id}/videos → first YouTube trailer
/// 3. Details: /movie/{id}?append_to_response=credits → details,
///    plus /movie/{id}/watch/providers for the configured region
///
/// The weekly trending list comes from /trending/movie/week and is not cached.
use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CastMember, MovieDetails, TmdbMovieDetails, TmdbSearchResponse, TmdbSearchResult,
        TmdbVideosResponse, TmdbWatchProvidersResponse, TrendingMovie,
    },
    services::providers::MetadataProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const POSTER_CACHE_TTL: u64 = 604800; // 1 week
const TRAILER_CACHE_TTL: u64 = 604800; // 1 week
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day

const MAX_CAST: usize = 5;
const MAX_TRENDING: usize = 5;

/// Retry schedule for transient TMDB failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `backoff * 2^(n-1)`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    fn is_retryable(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT
        )
    }
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    watch_region: String,
    retry: RetryPolicy,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(api_key: String, config: &Config, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: config.tmdb_api_url.trim_end_matches('/').to_string(),
            image_url: config.tmdb_image_url.trim_end_matches('/').to_string(),
            watch_region: config.watch_region.clone(),
            retry: RetryPolicy::default(),
            cache,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GETs a TMDB endpoint, retrying transient failures
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);
        let mut attempt = 0;

        loop {
            let result = self
                .http_client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(query)
                .send()
                .await;

            let retryable = match &result {
                Ok(response) => RetryPolicy::is_retryable(response.status()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if retryable && attempt < self.retry.max_retries {
                attempt += 1;
                let delay = self.retry.delay(attempt);
                tracing::debug!(path = %path, attempt, delay_ms = delay.as_millis() as u64, "Retrying TMDB request");
                tokio::time::sleep(delay).await;
                continue;
            }

            let response = result?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ExternalApi(format!(
                    "TMDB API returned status {}: {}",
                    status, body
                )));
            }

            return Ok(response.json().await?);
        }
    }

    /// First search hit for a title
    async fn search_first(&self, title: &str) -> AppResult<Option<TmdbSearchResult>> {
        let search: TmdbSearchResponse = self.get_json("/search/movie", &[("query", title)]).await?;
        Ok(search.results.into_iter().next())
    }

    fn image(&self, path: &str) -> String {
        format!("{}/{}", self.image_url, path.trim_start_matches('/'))
    }

    async fn watch_providers(&self, tmdb_id: u64) -> AppResult<Vec<String>> {
        let response: TmdbWatchProvidersResponse = self
            .get_json(&format!("/movie/{}/watch/providers", tmdb_id), &[])
            .await?;

        Ok(response
            .results
            .get(&self.watch_region)
            .map(|region| region.flatrate.iter().map(|p| p.provider_name.clone()).collect())
            .unwrap_or_default())
    }

    fn to_details(&self, data: TmdbMovieDetails, watch_providers: Vec<String>) -> MovieDetails {
        let credits = data.credits.unwrap_or_default();

        let directors: Vec<String> = credits
            .crew
            .into_iter()
            .filter(|c| c.job.as_deref() == Some("Director"))
            .map(|c| c.name)
            .collect();

        let cast = credits
            .cast
            .into_iter()
            .take(MAX_CAST)
            .map(|actor| CastMember {
                profile: actor.profile_path.as_deref().map(|p| self.image(p)),
                name: actor.name,
                character: actor.character,
            })
            .collect();

        MovieDetails {
            rating: data.vote_average,
            vote_count: data.vote_count,
            release_date: data.release_date,
            runtime: data.runtime,
            tagline: data.tagline,
            overview: data.overview,
            director: (!directors.is_empty()).then(|| directors.join(", ")),
            cast,
            genres: data.genres.into_iter().map(|g| g.name).collect(),
            budget: data.budget.filter(|b| *b > 0),
            revenue: data.revenue.filter(|r| *r > 0),
            available_languages: data.spoken_languages.into_iter().map(|l| l.english_name).collect(),
            watch_providers,
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn find_poster(&self, title: &str) -> AppResult<Option<String>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::Poster(title.to_string()),
            POSTER_CACHE_TTL,
            async move {
                let poster = self
                    .search_first(title)
                    .await?
                    .and_then(|hit| hit.poster_path)
                    .filter(|path| !path.is_empty())
                    .map(|path| self.image(&path));

                tracing::debug!(title = %title, found = poster.is_some(), provider = "tmdb", "Poster lookup completed");
                Ok::<_, AppError>(poster)
            }
        )
    }

    async fn find_trailer(&self, title: &str) -> AppResult<Option<String>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::Trailer(title.to_string()),
            TRAILER_CACHE_TTL,
            async move {
                let Some(hit) = self.search_first(title).await? else {
                    return Ok(None);
                };

                let videos: TmdbVideosResponse =
                    self.get_json(&format!("/movie/{}/videos", hit.id), &[]).await?;

                let trailer = videos
                    .results
                    .into_iter()
                    .find(|v| v.video_type.as_deref() == Some("Trailer") && v.site.as_deref() == Some("YouTube"))
                    .map(|v| format!("https://youtu.be/{}", v.key));

                tracing::debug!(title = %title, found = trailer.is_some(), provider = "tmdb", "Trailer lookup completed");
                Ok::<_, AppError>(trailer)
            }
        )
    }

    async fn find_details(&self, title: &str) -> AppResult<Option<MovieDetails>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::Details(title.to_string()),
            DETAILS_CACHE_TTL,
            async move {
                let Some(hit) = self.search_first(title).await? else {
                    return Ok(None);
                };

                let data: TmdbMovieDetails = self
                    .get_json(&format!("/movie/{}", hit.id), &[("append_to_response", "credits")])
                    .await?;

                // Missing watch providers should not hide the rest of the details.
                let providers = self.watch_providers(hit.id).await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, tmdb_id = hit.id, "Watch provider lookup failed");
                    Vec::new()
                });

                tracing::info!(title = %title, tmdb_id = hit.id, provider = "tmdb", "Details fetched");
                Ok::<_, AppError>(Some(self.to_details(data, providers)))
            }
        )
    }

    async fn find_trending(&self) -> AppResult<Vec<TrendingMovie>> {
        let response: TmdbSearchResponse = self.get_json("/trending/movie/week", &[]).await?;

        let trending: Vec<TrendingMovie> = response
            .results
            .into_iter()
            .take(MAX_TRENDING)
            .filter_map(|hit| {
                let title = hit.title?;
                let poster = hit
                    .poster_path
                    .filter(|path| !path.is_empty())
                    .map(|path| self.image(&path));
                Some(TrendingMovie { title, poster })
            })
            .collect();

        tracing::debug!(count = trending.len(), provider = "tmdb", "Trending lookup completed");
        Ok(trending)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

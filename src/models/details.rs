use serde::{Deserialize, Serialize};

/// Display metadata for a movie, resolved by a metadata provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub rating: Option<f64>,
    pub vote_count: Option<u64>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    /// Comma-joined director names
    pub director: Option<String>,
    /// Top-billed cast, at most five
    pub cast: Vec<CastMember>,
    pub genres: Vec<String>,
    /// `None` when the source reports zero
    pub budget: Option<u64>,
    /// `None` when the source reports zero
    pub revenue: Option<u64>,
    pub available_languages: Vec<String>,
    pub watch_providers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile: Option<String>,
}

/// One entry of the provider's weekly trending list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingMovie {
    pub title: String,
    pub poster: Option<String>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Response from `/search/movie` and `/trending/movie/week`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResult {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Response from `/movie/{id}/videos`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideosResponse {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideo {
    pub key: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(rename = "type", default)]
    pub video_type: Option<String>,
}

/// Response from `/movie/{id}?append_to_response=credits,videos`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbNamed>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub spoken_languages: Vec<TmdbSpokenLanguage>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbNamed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSpokenLanguage {
    pub english_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastEntry>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCastEntry {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewEntry {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

/// Response from `/movie/{id}/watch/providers`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbWatchProvidersResponse {
    #[serde(default)]
    pub results: std::collections::HashMap<String, TmdbRegionProviders>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbRegionProviders {
    #[serde(default)]
    pub flatrate: Vec<TmdbProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbProvider {
    pub provider_name: String,
}

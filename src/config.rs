use serde::Deserialize;
use std::path::PathBuf;

use crate::services::reconcile::CreditsRewrite;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Raw movies table (TMDB 5000 movies export)
    #[serde(default = "default_movies_csv")]
    pub movies_csv: PathBuf,

    /// Raw credits table (TMDB 5000 credits export)
    #[serde(default = "default_credits_csv")]
    pub credits_csv: PathBuf,

    /// Directory holding the persisted movie table and similarity matrix
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Vocabulary cap for the TF-IDF vectorizer
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// How credits follow a reassigned duplicate id
    #[serde(default)]
    pub credits_rewrite: CreditsRewrite,

    /// TMDB API key; without it no metadata provider is wired in
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// TMDB image base URL used to build poster links
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Region used for watch-provider listings
    #[serde(default = "default_watch_region")]
    pub watch_region: String,

    /// Redis connection URL for metadata lookups; caching is off when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_movies_csv() -> PathBuf {
    PathBuf::from("Dataset/tmdb_5000_movies.csv")
}

fn default_credits_csv() -> PathBuf {
    PathBuf::from("Dataset/tmdb_5000_credits.csv")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("model_files")
}

fn default_max_features() -> usize {
    5000
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_watch_region() -> String {
    "IN".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of key/value pairs
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

use serde::{Deserialize, Serialize};

pub mod details;

pub use details::{
    CastMember, MovieDetails, TmdbMovieDetails, TmdbSearchResponse, TmdbSearchResult,
    TmdbVideosResponse, TmdbWatchProvidersResponse, TrendingMovie,
};

// ============================================================================
// Raw input rows
// ============================================================================

/// One row of the raw movies table, before identifier reconciliation.
///
/// Every column is optional text; the identifier stays unparsed until the
/// reconciler coerces it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawMovieRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
}

/// One row of the raw credits table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawCreditsRow {
    #[serde(default)]
    pub movie_id: Option<String>,
    #[serde(default)]
    pub cast: Option<String>,
    #[serde(default)]
    pub crew: Option<String>,
}

// ============================================================================
// Reconciled rows
// ============================================================================

/// A movie row whose identifier has been coerced to an integer
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub genres: Option<String>,
    pub keywords: Option<String>,
    pub original_language: Option<String>,
}

/// Cast and crew for one movie, keyed by reconciled identifier
#[derive(Debug, Clone, PartialEq)]
pub struct CreditsRecord {
    pub movie_id: i64,
    pub cast: Option<String>,
    pub crew: Option<String>,
}

// ============================================================================
// Persisted movie table
// ============================================================================

/// A movie in the persisted table.
///
/// `genres`, `keywords`, `cast` and `crew` keep their structured-list
/// encoding (`[{"id": 28, "name": "Action"}, ...]`). `tags` is the derived
/// text that feeds the vectorizer and is never shown to users.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub genres: String,
    pub keywords: String,
    pub cast: String,
    pub crew: String,
    pub original_language: String,
    pub tags: String,
}

impl MovieRecord {
    /// Decoded genre names, empty when the encoding is malformed
    pub fn genre_names(&self) -> Vec<String> {
        decode_names(&self.genres)
    }

    /// Decoded keyword names
    pub fn keyword_names(&self) -> Vec<String> {
        decode_names(&self.keywords)
    }

    /// Decoded cast member names, in billing order
    pub fn cast_names(&self) -> Vec<String> {
        decode_names(&self.cast)
    }

    /// Display name of the original language
    pub fn language_name(&self) -> &'static str {
        language_name(&self.original_language)
    }
}

#[derive(Deserialize)]
struct NamedEntry {
    name: String,
}

/// Decodes a structured-list string into the `name` of each entry.
///
/// Malformed input yields an empty list rather than an error.
pub fn decode_names(encoded: &str) -> Vec<String> {
    serde_json::from_str::<Vec<NamedEntry>>(encoded)
        .map(|entries| entries.into_iter().map(|e| e.name).collect())
        .unwrap_or_default()
}

/// Maps an ISO 639-1 code to the display names offered for browsing
pub fn language_name(code: &str) -> &'static str {
    match code {
        "en" => "English",
        "hi" => "Hindi",
        "te" => "Telugu",
        "ta" => "Tamil",
        "ml" => "Malayalam",
        "kn" => "Kannada",
        _ => "Other",
    }
}

/// Public view of a movie; never exposes `tags`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub language: String,
}

impl From<&MovieRecord> for MovieSummary {
    fn from(movie: &MovieRecord) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            genres: movie.genre_names(),
            language: movie.language_name().to_string(),
        }
    }
}

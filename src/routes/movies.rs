use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{MovieDetails, MovieSummary, TrendingMovie},
    services::{
        catalog::{self, DEFAULT_BROWSE_LIMIT},
        providers::or_absent,
        title_search::{self, DEFAULT_SEARCH_LIMIT},
    },
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GenreQuery {
    genre: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    genre: Option<String>,
    language: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    title: String,
}

/// A movie with whatever the metadata provider could resolve for it
#[derive(Debug, Serialize)]
pub struct MovieView {
    pub movie: MovieSummary,
    pub poster: Option<String>,
    pub trailer: Option<String>,
    pub details: Option<MovieDetails>,
}

/// Handler for title search endpoint
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let hits = title_search::search_titles(&state.model, &params.q, limit)?;
    Ok(Json(hits.into_iter().map(MovieSummary::from).collect()))
}

pub async fn genres(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(catalog::genres(&state.model))
}

pub async fn languages(
    State(state): State<AppState>,
    Query(params): Query<GenreQuery>,
) -> Json<Vec<&'static str>> {
    Json(catalog::languages(&state.model, params.genre.as_deref()))
}

pub async fn browse(
    State(state): State<AppState>,
    Query(params): Query<BrowseQuery>,
) -> Json<Vec<MovieSummary>> {
    let limit = params.limit.unwrap_or(DEFAULT_BROWSE_LIMIT);
    let movies = catalog::browse(
        &state.model,
        params.genre.as_deref(),
        params.language.as_deref(),
        limit,
    );
    Json(movies.into_iter().map(MovieSummary::from).collect())
}

/// "Surprise me": a random movie with its poster and trailer
pub async fn random(State(state): State<AppState>) -> AppResult<Json<MovieView>> {
    let movie = catalog::random_movie(&state.model)
        .ok_or_else(|| AppError::NotFound("The catalog is empty".to_string()))?;

    let poster = or_absent(state.provider.find_poster(&movie.title).await, "poster", &movie.title);
    let trailer = or_absent(state.provider.find_trailer(&movie.title).await, "trailer", &movie.title);

    Ok(Json(MovieView {
        movie: MovieSummary::from(movie),
        poster,
        trailer,
        details: None,
    }))
}

/// Full detail view for one catalog title
pub async fn details(
    State(state): State<AppState>,
    Query(params): Query<TitleQuery>,
) -> AppResult<Json<MovieView>> {
    let movie = state
        .model
        .movie_by_title(&params.title)
        .ok_or_else(|| AppError::NotFound(format!("Movie '{}' is not in the catalog", params.title)))?;

    let poster = or_absent(state.provider.find_poster(&movie.title).await, "poster", &movie.title);
    let trailer = or_absent(state.provider.find_trailer(&movie.title).await, "trailer", &movie.title);
    let details = or_absent(state.provider.find_details(&movie.title).await, "details", &movie.title);

    Ok(Json(MovieView {
        movie: MovieSummary::from(movie),
        poster,
        trailer,
        details,
    }))
}

/// This week's trending movies; empty when the provider is unavailable
pub async fn trending(State(state): State<AppState>) -> Json<Vec<TrendingMovie>> {
    match state.provider.find_trending().await {
        Ok(movies) => Json(movies),
        Err(e) => {
            tracing::warn!(error = %e, provider = state.provider.name(), "Trending lookup failed");
            Json(Vec::new())
        }
    }
}

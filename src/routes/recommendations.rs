use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::MovieSummary,
    services::recommendations::{self, Recommendation, Recommendations, DEFAULT_K},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    pub movie: MovieSummary,
    pub score: f32,
    pub poster: Option<String>,
    pub trailer: Option<String>,
}

impl From<&Recommendation> for RecommendationItem {
    fn from(rec: &Recommendation) -> Self {
        Self {
            movie: MovieSummary::from(&rec.movie),
            score: rec.score,
            poster: rec.poster.clone(),
            trailer: rec.trailer.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub query: String,
    pub requested: usize,
    /// Set when fewer than `requested` movies could be recommended
    pub partial: bool,
    pub results: Vec<RecommendationItem>,
}

impl From<&Recommendations> for RecommendationResponse {
    fn from(recs: &Recommendations) -> Self {
        Self {
            query: recs.query.clone(),
            requested: recs.requested,
            partial: recs.is_partial(),
            results: recs.items.iter().map(RecommendationItem::from).collect(),
        }
    }
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let k = params.k.unwrap_or(DEFAULT_K);
    let recs =
        recommendations::recommend(&state.model, state.provider.as_ref(), &params.title, k).await?;
    Ok(Json(RecommendationResponse::from(&recs)))
}

use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::MovieRecord,
    services::artifact::RecommenderModel,
};

/// Default number of search hits returned
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Service function for title search
///
/// Case-insensitive substring match over the loaded table. Each title is
/// returned once, in table order, so the hit can be fed straight back into
/// a recommendation query.
pub fn search_titles<'a>(
    model: &'a RecommenderModel,
    query: &str,
    limit: usize,
) -> AppResult<Vec<&'a MovieRecord>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let hits: Vec<&MovieRecord> = model
        .movies()
        .iter()
        .filter(|m| m.title.to_lowercase().contains(&needle))
        .filter(|m| seen.insert(m.title.as_str()))
        .take(limit)
        .collect();

    tracing::debug!(query = %query, results = hits.len(), "Title search completed");

    Ok(hits)
}

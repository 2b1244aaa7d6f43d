use crate::models::MovieRecord;

/// Builds the tag text for one movie: overview, genres and keywords joined
/// by single spaces. Genres and keywords stay in their encoded form.
pub fn tags_for(movie: &MovieRecord) -> String {
    format!("{} {} {}", movie.overview, movie.genres, movie.keywords)
}

/// Returns a copy of the table with `tags` filled in for every movie
pub fn compose_tags(movies: &[MovieRecord]) -> Vec<MovieRecord> {
    let composed: Vec<MovieRecord> = movies
        .iter()
        .map(|movie| MovieRecord {
            tags: tags_for(movie),
            ..movie.clone()
        })
        .collect();

    tracing::info!(movies = composed.len(), "Text features created");
    composed
}

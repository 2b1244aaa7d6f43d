//! Browsing the loaded movie table by genre and language.

use std::collections::{BTreeSet, HashSet};

use rand::seq::SliceRandom;

use crate::{models::MovieRecord, services::artifact::RecommenderModel};

/// Default number of movies returned by [`browse`]
pub const DEFAULT_BROWSE_LIMIT: usize = 5;

/// Distinct genre names across the table, sorted
pub fn genres(model: &RecommenderModel) -> Vec<String> {
    model
        .movies()
        .iter()
        .flat_map(|m| m.genre_names())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn has_genre(movie: &MovieRecord, genre: &str) -> bool {
    movie.genre_names().iter().any(|g| g == genre)
}

/// Distinct display languages, optionally limited to movies in `genre`
pub fn languages(model: &RecommenderModel, genre: Option<&str>) -> Vec<&'static str> {
    model
        .movies()
        .iter()
        .filter(|m| genre.map_or(true, |g| has_genre(m, g)))
        .map(|m| m.language_name())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First `limit` movies matching the genre and language filters.
///
/// Titles are made distinct within the genre before the language filter, so a
/// title whose first occurrence is in another language is not shown.
pub fn browse<'a>(
    model: &'a RecommenderModel,
    genre: Option<&str>,
    language: Option<&str>,
    limit: usize,
) -> Vec<&'a MovieRecord> {
    let mut seen = HashSet::new();
    model
        .movies()
        .iter()
        .filter(|m| genre.map_or(true, |g| has_genre(m, g)))
        .filter(|m| seen.insert(m.title.as_str()))
        .filter(|m| language.map_or(true, |l| m.language_name() == l))
        .take(limit)
        .collect()
}

/// Uniformly random movie, `None` for an empty table
pub fn random_movie(model: &RecommenderModel) -> Option<&MovieRecord> {
    model.movies().choose(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::similarity::SimilarityMatrix;

    const ACTION: &str = r#"[{"id": 28, "name": "Action"}]"#;
    const DRAMA: &str = r#"[{"id": 18, "name": "Drama"}]"#;
    const BOTH: &str = r#"[{"id": 28, "name": "Action"}, {"id": 18, "name": "Drama"}]"#;

    fn movie(id: i64, title: &str, genres: &str, language: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            genres: genres.to_string(),
            original_language: language.to_string(),
            ..Default::default()
        }
    }

    fn model() -> RecommenderModel {
        let movies = vec![
            movie(1, "Die Hard", ACTION, "en"),
            movie(2, "Baahubali", BOTH, "te"),
            movie(3, "Lagaan", DRAMA, "hi"),
            movie(4, "Amelie", DRAMA, "fr"),
            movie(5, "Die Hard", ACTION, "en"),
            movie(6, "Speed", ACTION, "en"),
        ];
        let n = movies.len();
        let mut scores = vec![0.0; n * n];
        for i in 0..n {
            scores[i * n + i] = 1.0;
        }
        RecommenderModel::new(movies, SimilarityMatrix::from_scores(n, scores).unwrap()).unwrap()
    }

    fn titles(movies: Vec<&MovieRecord>) -> Vec<&str> {
        movies.into_iter().map(|m| m.title.as_str()).collect()
    }

    #[test]
    fn test_genres_sorted_and_distinct() {
        assert_eq!(genres(&model()), vec!["Action", "Drama"]);
    }

    #[test]
    fn test_languages_all_and_by_genre() {
        let model = model();
        assert_eq!(languages(&model, None), vec!["English", "Hindi", "Other", "Telugu"]);
        assert_eq!(languages(&model, Some("Action")), vec!["English", "Telugu"]);
        assert!(languages(&model, Some("Western")).is_empty());
    }

    #[test]
    fn test_browse_filters_and_dedups_titles() {
        let model = model();
        let hits = browse(&model, Some("Action"), Some("English"), 5);
        assert_eq!(titles(hits), vec!["Die Hard", "Speed"]);
    }

    #[test]
    fn test_browse_other_language_bucket() {
        let model = model();
        let hits = browse(&model, Some("Drama"), Some("Other"), 5);
        assert_eq!(titles(hits), vec!["Amelie"]);
    }

    #[test]
    fn test_browse_limit_and_no_filters() {
        let model = model();
        let hits = browse(&model, None, None, 3);
        assert_eq!(titles(hits), vec!["Die Hard", "Baahubali", "Lagaan"]);
    }

    #[test]
    fn test_browse_dedups_titles_before_language_filter() {
        let movies = vec![
            movie(1, "Devdas", DRAMA, "hi"),
            movie(2, "Devdas", DRAMA, "en"),
            movie(3, "Fanaa", DRAMA, "en"),
        ];
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let model = RecommenderModel::new(movies, matrix).unwrap();

        let hits = browse(&model, Some("Drama"), Some("English"), 5);
        assert_eq!(titles(hits), vec!["Fanaa"]);
    }

    #[test]
    fn test_random_movie_comes_from_table() {
        let model = model();
        let picked = random_movie(&model).unwrap();
        assert!(model.movie_by_id(picked.id).is_some());
    }
}

//! Identifier reconciliation for the raw movie and credits tables.
//!
//! Identifiers arrive as text of unreliable type. They are coerced to
//! integers, rows that cannot be coerced are dropped, and movie rows that
//! share an identifier are split apart by allocating fresh identifiers above
//! the current maximum.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, CreditsRecord, RawCreditsRow, RawMovieRow},
};

/// How credits rows follow a duplicate movie onto its new identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditsRewrite {
    /// Every credits row still carrying the duplicated identifier is moved
    /// to the newly allocated identifier, one reassignment at a time.
    ///
    /// With three or more occurrences the first reassignment consumes every
    /// matching credits row, so all of them land on the first new identifier
    /// and the canonical movie keeps none. Known misattribution, kept as-is.
    #[default]
    Reference,
    /// The n-th credits row carrying the duplicated identifier belongs to the
    /// n-th movie occurrence. Surplus credits rows stay on the canonical id.
    Positional,
}

/// A movie row that was moved to a freshly allocated identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdReassignment {
    pub title: String,
    pub from: i64,
    pub to: i64,
}

/// What reconciliation dropped and rewrote
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub dropped_movies: usize,
    pub dropped_credits: usize,
    pub reassignments: Vec<IdReassignment>,
}

/// Output tables of the reconciler
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub movies: Vec<CatalogEntry>,
    pub credits: Vec<CreditsRecord>,
    pub report: ReconcileReport,
}

/// Coerces a raw identifier cell to an integer.
///
/// Integer text parses directly; finite decimals are truncated toward zero.
/// Empty, non-numeric and non-finite values yield `None`.
pub fn coerce_id(raw: Option<&str>) -> Option<i64> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(id) = text.parse::<i64>() {
        return Some(id);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < i64::MAX as f64 => Some(value.trunc() as i64),
        _ => None,
    }
}

/// Reconciles the raw tables into integer-keyed tables with unique movie ids.
///
/// Inputs are left untouched. Fails with `DataIntegrity` if duplicates
/// somehow survive.
pub fn reconcile(
    raw_movies: &[RawMovieRow],
    raw_credits: &[RawCreditsRow],
    rewrite: CreditsRewrite,
) -> AppResult<Reconciled> {
    let mut report = ReconcileReport::default();

    let mut movies: Vec<CatalogEntry> = Vec::with_capacity(raw_movies.len());
    for row in raw_movies {
        match coerce_id(row.id.as_deref()) {
            Some(id) => movies.push(CatalogEntry {
                id,
                title: row.title.clone(),
                overview: row.overview.clone(),
                genres: row.genres.clone(),
                keywords: row.keywords.clone(),
                original_language: row.original_language.clone(),
            }),
            None => {
                tracing::warn!(raw_id = ?row.id, title = ?row.title, "Dropping movie row with unusable id");
                report.dropped_movies += 1;
            }
        }
    }

    let mut credits: Vec<CreditsRecord> = Vec::with_capacity(raw_credits.len());
    for row in raw_credits {
        match coerce_id(row.movie_id.as_deref()) {
            Some(movie_id) => credits.push(CreditsRecord {
                movie_id,
                cast: row.cast.clone(),
                crew: row.crew.clone(),
            }),
            None => report.dropped_credits += 1,
        }
    }

    if report.dropped_credits > 0 {
        tracing::warn!(dropped = report.dropped_credits, "Dropped credits rows with unusable id");
    }

    let mut max_id = movies.iter().map(|m| m.id).max().unwrap_or(0);
    tracing::debug!(max_id, "Starting identifier allocation");

    for dup_id in duplicate_ids(&movies) {
        let positions: Vec<usize> = movies
            .iter()
            .enumerate()
            .filter(|(_, m)| m.id == dup_id)
            .map(|(i, _)| i)
            .collect();

        let credit_positions: Vec<usize> = credits
            .iter()
            .enumerate()
            .filter(|(_, c)| c.movie_id == dup_id)
            .map(|(i, _)| i)
            .collect();

        // The first occurrence keeps the original id.
        for (occurrence, &pos) in positions.iter().enumerate().skip(1) {
            max_id += 1;
            let new_id = max_id;
            movies[pos].id = new_id;

            match rewrite {
                CreditsRewrite::Reference => {
                    for credit in credits.iter_mut().filter(|c| c.movie_id == dup_id) {
                        credit.movie_id = new_id;
                    }
                }
                CreditsRewrite::Positional => {
                    if let Some(&cpos) = credit_positions.get(occurrence) {
                        credits[cpos].movie_id = new_id;
                    }
                }
            }

            let title = movies[pos].title.clone().unwrap_or_default();
            tracing::info!(title = %title, from = dup_id, to = new_id, "Reassigned duplicate movie id");
            report.reassignments.push(IdReassignment {
                title,
                from: dup_id,
                to: new_id,
            });
        }
    }

    ensure_unique_ids(movies.iter().map(|m| m.id))?;

    tracing::info!(
        movies = movies.len(),
        credits = credits.len(),
        dropped_movies = report.dropped_movies,
        reassigned = report.reassignments.len(),
        "Identifiers reconciled"
    );

    Ok(Reconciled {
        movies,
        credits,
        report,
    })
}

/// Identifiers occurring on more than one row, in order of first appearance
fn duplicate_ids(movies: &[CatalogEntry]) -> Vec<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for movie in movies {
        *counts.entry(movie.id).or_default() += 1;
    }

    let mut seen = HashSet::new();
    movies
        .iter()
        .map(|m| m.id)
        .filter(|id| counts[id] > 1 && seen.insert(*id))
        .collect()
}

/// Fails with `DataIntegrity` if any identifier repeats
pub fn ensure_unique_ids(ids: impl IntoIterator<Item = i64>) -> AppResult<()> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for id in ids {
        if !seen.insert(id) {
            repeated.push(id);
        }
    }

    if repeated.is_empty() {
        Ok(())
    } else {
        Err(AppError::DataIntegrity(format!(
            "duplicate movie ids remain: {:?}",
            repeated
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: &str, title: &str) -> RawMovieRow {
        RawMovieRow {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn credit(movie_id: &str, cast: &str) -> RawCreditsRow {
        RawCreditsRow {
            movie_id: Some(movie_id.to_string()),
            cast: Some(cast.to_string()),
            crew: None,
        }
    }

    fn id_of(reconciled: &Reconciled, title: &str) -> i64 {
        reconciled
            .movies
            .iter()
            .find(|m| m.title.as_deref() == Some(title))
            .map(|m| m.id)
            .unwrap()
    }

    fn credits_for(reconciled: &Reconciled, cast: &str) -> i64 {
        reconciled
            .credits
            .iter()
            .find(|c| c.cast.as_deref() == Some(cast))
            .map(|c| c.movie_id)
            .unwrap()
    }

    #[test]
    fn test_coerce_id() {
        assert_eq!(coerce_id(Some("19995")), Some(19995));
        assert_eq!(coerce_id(Some(" 42 ")), Some(42));
        assert_eq!(coerce_id(Some("5.0")), Some(5));
        assert_eq!(coerce_id(Some("7.9")), Some(7));
        assert_eq!(coerce_id(Some("")), None);
        assert_eq!(coerce_id(Some("abc")), None);
        assert_eq!(coerce_id(Some("NaN")), None);
        assert_eq!(coerce_id(Some("inf")), None);
        assert_eq!(coerce_id(None), None);
    }

    #[test]
    fn test_drops_uncoercible_rows() {
        let movies = vec![movie("1", "One"), movie("x", "Broken"), movie("2", "Two")];
        let credits = vec![credit("1", "a"), credit("", "b")];

        let result = reconcile(&movies, &credits, CreditsRewrite::Reference).unwrap();

        assert_eq!(result.movies.len(), 2);
        assert_eq!(result.credits.len(), 1);
        assert_eq!(result.report.dropped_movies, 1);
        assert_eq!(result.report.dropped_credits, 1);
    }

    #[test]
    fn test_duplicate_id_gets_max_plus_one() {
        let movies = vec![movie("5", "Alpha"), movie("3", "Gamma"), movie("5", "Beta")];
        let credits = vec![credit("5", "beta-cast"), credit("3", "gamma-cast")];

        let result = reconcile(&movies, &credits, CreditsRewrite::Reference).unwrap();

        assert_eq!(id_of(&result, "Alpha"), 5);
        assert_eq!(id_of(&result, "Beta"), 6);
        assert_eq!(id_of(&result, "Gamma"), 3);
        assert_eq!(credits_for(&result, "beta-cast"), 6);
        assert_eq!(credits_for(&result, "gamma-cast"), 3);
        assert_eq!(
            result.report.reassignments,
            vec![IdReassignment {
                title: "Beta".to_string(),
                from: 5,
                to: 6
            }]
        );
    }

    #[test]
    fn test_allocator_is_monotonic_across_duplicate_groups() {
        let movies = vec![
            movie("10", "A"),
            movie("2", "B"),
            movie("10", "C"),
            movie("2", "D"),
        ];

        let result = reconcile(&movies, &[], CreditsRewrite::Reference).unwrap();

        // 10 is seen first, so its duplicate is reassigned first.
        assert_eq!(id_of(&result, "C"), 11);
        assert_eq!(id_of(&result, "D"), 12);
        assert_eq!(id_of(&result, "A"), 10);
        assert_eq!(id_of(&result, "B"), 2);
    }

    #[test]
    fn test_reference_rewrite_with_three_occurrences() {
        let movies = vec![movie("7", "First"), movie("7", "Second"), movie("7", "Third")];
        let credits = vec![credit("7", "c1"), credit("7", "c2"), credit("7", "c3")];

        let result = reconcile(&movies, &credits, CreditsRewrite::Reference).unwrap();

        assert_eq!(id_of(&result, "First"), 7);
        assert_eq!(id_of(&result, "Second"), 8);
        assert_eq!(id_of(&result, "Third"), 9);
        // Every credits row is swept onto the first new id; nothing is left
        // for the canonical movie or the third occurrence.
        assert_eq!(credits_for(&result, "c1"), 8);
        assert_eq!(credits_for(&result, "c2"), 8);
        assert_eq!(credits_for(&result, "c3"), 8);
    }

    #[test]
    fn test_positional_rewrite_with_three_occurrences() {
        let movies = vec![movie("7", "First"), movie("7", "Second"), movie("7", "Third")];
        let credits = vec![credit("7", "c1"), credit("7", "c2"), credit("7", "c3")];

        let result = reconcile(&movies, &credits, CreditsRewrite::Positional).unwrap();

        assert_eq!(credits_for(&result, "c1"), 7);
        assert_eq!(credits_for(&result, "c2"), 8);
        assert_eq!(credits_for(&result, "c3"), 9);
    }

    #[test]
    fn test_positional_rewrite_with_fewer_credits_than_movies() {
        let movies = vec![movie("7", "First"), movie("7", "Second"), movie("7", "Third")];
        let credits = vec![credit("7", "only")];

        let result = reconcile(&movies, &credits, CreditsRewrite::Positional).unwrap();

        assert_eq!(credits_for(&result, "only"), 7);
        assert_eq!(id_of(&result, "Third"), 9);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let movies = vec![movie("5", "Alpha"), movie("5", "Beta")];
        let credits = vec![credit("5", "x")];
        let movies_before = movies.clone();
        let credits_before = credits.clone();

        reconcile(&movies, &credits, CreditsRewrite::Reference).unwrap();

        assert_eq!(movies, movies_before);
        assert_eq!(credits, credits_before);
    }

    #[test]
    fn test_ids_are_unique_after_reconcile() {
        let movies: Vec<RawMovieRow> = ["1", "1", "2", "1", "2", "3", "3.0"]
            .iter()
            .enumerate()
            .map(|(i, id)| movie(id, &format!("m{}", i)))
            .collect();

        let result = reconcile(&movies, &[], CreditsRewrite::Reference).unwrap();
        assert!(ensure_unique_ids(result.movies.iter().map(|m| m.id)).is_ok());
        assert_eq!(result.movies.len(), 7);
    }

    #[test]
    fn test_ensure_unique_ids_detects_repeat() {
        let err = ensure_unique_ids(vec![1, 2, 1]).unwrap_err();
        assert!(matches!(err, AppError::DataIntegrity(_)));
    }

    #[test]
    fn test_credits_rewrite_deserializes_lowercase() {
        let policy: CreditsRewrite = serde_json::from_str("\"positional\"").unwrap();
        assert_eq!(policy, CreditsRewrite::Positional);
    }
}

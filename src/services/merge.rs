use std::collections::{HashMap, HashSet};

use crate::models::{CatalogEntry, CreditsRecord, MovieRecord};

/// Placeholder for cast/crew when a movie has no credits
const EMPTY_LIST: &str = "[]";

/// Result of joining the catalog with credits
#[derive(Debug, Clone)]
pub struct Merged {
    pub movies: Vec<MovieRecord>,
    /// Movies that found no credits row
    pub without_credits: usize,
    /// Rows removed by the residual duplicate-id pass
    pub residual_duplicates: usize,
}

/// Left-joins the catalog to credits on the reconciled identifier.
///
/// Movies without credits keep `[]` for cast and crew; credits without a
/// movie are dropped. When several credits rows share an id the last one
/// wins, so a reassigned movie picks up its own row after a credits rewrite. Missing scalar fields become empty strings and `tags` is left empty
/// for the tag composer. Table order follows the catalog.
pub fn merge(catalog: &[CatalogEntry], credits: &[CreditsRecord]) -> Merged {
    let mut by_movie: HashMap<i64, &CreditsRecord> = HashMap::with_capacity(credits.len());
    for record in credits {
        by_movie.insert(record.movie_id, record);
    }

    let mut seen = HashSet::with_capacity(catalog.len());
    let mut without_credits = 0;
    let mut residual_duplicates = 0;
    let mut movies = Vec::with_capacity(catalog.len());

    for entry in catalog {
        if !seen.insert(entry.id) {
            residual_duplicates += 1;
            continue;
        }

        let matched = by_movie.get(&entry.id);
        if matched.is_none() {
            without_credits += 1;
        }

        let cast = matched.and_then(|c| c.cast.clone());
        let crew = matched.and_then(|c| c.crew.clone());

        movies.push(MovieRecord {
            id: entry.id,
            title: entry.title.clone().unwrap_or_default(),
            overview: entry.overview.clone().unwrap_or_default(),
            genres: entry.genres.clone().unwrap_or_default(),
            keywords: entry.keywords.clone().unwrap_or_default(),
            cast: cast.unwrap_or_else(|| EMPTY_LIST.to_string()),
            crew: crew.unwrap_or_else(|| EMPTY_LIST.to_string()),
            original_language: entry.original_language.clone().unwrap_or_default(),
            tags: String::new(),
        });
    }

    if residual_duplicates > 0 {
        tracing::warn!(removed = residual_duplicates, "Removed residual duplicate ids after merge");
    }

    tracing::info!(
        movies = movies.len(),
        without_credits,
        "Datasets merged"
    );

    Merged {
        movies,
        without_credits,
        residual_duplicates,
    }
}

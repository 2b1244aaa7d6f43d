use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
};

use crate::{
    error::{AppError, AppResult},
    models::MovieRecord,
    services::{
        artifact::RecommenderModel,
        providers::{or_absent, MetadataProvider},
    },
};

/// Number of results shown when the caller does not ask for a count
pub const DEFAULT_K: usize = 5;

/// A recommended movie with the metadata resolved for it
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub movie: MovieRecord,
    pub score: f32,
    pub poster: Option<String>,
    pub trailer: Option<String>,
}

/// Result of one query; may hold fewer than `requested` items
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub query: String,
    pub requested: usize,
    pub items: Vec<Recommendation>,
}

impl Recommendations {
    /// True when filtering exhausted the candidates before `requested` was reached
    pub fn is_partial(&self) -> bool {
        self.items.len() < self.requested
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    index: usize,
    score: f32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // Max-heap order: higher score first, then lower row index.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lazily ranked neighbors of one query row.
///
/// Yields rows in descending similarity, skipping any row whose title is the
/// query title or a title already accepted. Rows are only heap-ordered as
/// they are pulled, so an early stop never sorts the whole row.
struct Candidates<'a> {
    model: &'a RecommenderModel,
    heap: BinaryHeap<Candidate>,
    seen_titles: HashSet<&'a str>,
}

impl<'a> Candidates<'a> {
    fn for_title(model: &'a RecommenderModel, title: &str) -> AppResult<Self> {
        let index = model
            .index_of_title(title)
            .ok_or_else(|| AppError::NotFound(format!("Movie '{}' is not in the catalog", title)))?;

        let heap = model
            .matrix()
            .row(index)
            .iter()
            .enumerate()
            .map(|(index, &score)| Candidate { index, score })
            .collect();

        let mut seen_titles = HashSet::new();
        seen_titles.insert(model.movies()[index].title.as_str());

        Ok(Self {
            model,
            heap,
            seen_titles,
        })
    }

    fn next(&mut self) -> Option<Candidate> {
        while let Some(candidate) = self.heap.pop() {
            let title = self.model.movies()[candidate.index].title.as_str();
            if !self.seen_titles.contains(title) {
                return Some(candidate);
            }
        }
        None
    }

    fn accept(&mut self, candidate: Candidate) {
        self.seen_titles
            .insert(self.model.movies()[candidate.index].title.as_str());
    }

    fn movie(&self, candidate: Candidate) -> &'a MovieRecord {
        &self.model.movies()[candidate.index]
    }
}

fn ensure_k(k: usize) -> AppResult<()> {
    if k == 0 {
        return Err(AppError::InvalidInput(
            "Number of recommendations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Top-k neighbors by similarity alone, with no metadata lookups.
///
/// Applies the same self-exclusion and title de-duplication as
/// [`recommend`] but accepts every distinct title.
pub fn ranked(model: &RecommenderModel, title: &str, k: usize) -> AppResult<Vec<Recommendation>> {
    ensure_k(k)?;
    let mut candidates = Candidates::for_title(model, title)?;

    let mut items = Vec::with_capacity(k);
    while items.len() < k {
        let Some(candidate) = candidates.next() else {
            break;
        };
        candidates.accept(candidate);
        items.push(Recommendation {
            movie: candidates.movie(candidate).clone(),
            score: candidate.score,
            poster: None,
            trailer: None,
        });
    }

    Ok(items)
}

/// Recommends up to `k` movies similar to `title`.
///
/// Candidates are walked in similarity order and only those the provider
/// can find a poster for are kept; lookups happen one at a time and stop as
/// soon as `k` results are accepted. A provider failure counts as "no
/// poster". Fewer than `k` results is not an error.
pub async fn recommend(
    model: &RecommenderModel,
    provider: &dyn MetadataProvider,
    title: &str,
    k: usize,
) -> AppResult<Recommendations> {
    ensure_k(k)?;
    let mut candidates = Candidates::for_title(model, title)?;

    let mut items = Vec::with_capacity(k);
    let mut inspected = 0usize;
    while items.len() < k {
        let Some(candidate) = candidates.next() else {
            break;
        };
        inspected += 1;

        let movie = candidates.movie(candidate);
        let Some(poster) = or_absent(provider.find_poster(&movie.title).await, "poster", &movie.title)
        else {
            tracing::debug!(title = %movie.title, "Skipping candidate without poster");
            continue;
        };

        let trailer = or_absent(provider.find_trailer(&movie.title).await, "trailer", &movie.title);

        candidates.accept(candidate);
        items.push(Recommendation {
            movie: movie.clone(),
            score: candidate.score,
            poster: Some(poster),
            trailer,
        });
    }

    let result = Recommendations {
        query: title.to_string(),
        requested: k,
        items,
    };

    if result.is_partial() {
        tracing::warn!(
            title = %title,
            requested = k,
            returned = result.items.len(),
            inspected,
            "Fewer recommendations than requested"
        );
    } else {
        tracing::info!(title = %title, returned = result.items.len(), inspected, "Recommendations served");
    }

    Ok(result)
}

//! Offline build: raw tables in, persisted recommendation artifact out.
//!
//! Stages run in a fixed order over owned, immutable intermediate tables:
//! load → reconcile → merge → tags → TF-IDF → similarity → persist. Any
//! integrity failure stops the run before anything is written.

use serde::Serialize;

use crate::{
    config::Config,
    error::AppResult,
    models::{RawCreditsRow, RawMovieRow},
};

use super::{
    artifact::{ArtifactManifest, ArtifactStore, RecommenderModel},
    loader::{load_credits, load_movies},
    merge::merge,
    reconcile::{ensure_unique_ids, reconcile, CreditsRewrite, ReconcileReport},
    similarity::build_similarity,
    tags::compose_tags,
    vectorizer::TfidfVectorizer,
};

/// Summary of one build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub movies: usize,
    pub vocabulary_size: usize,
    pub dropped_movies: usize,
    pub dropped_credits: usize,
    pub reassigned_ids: usize,
    pub without_credits: usize,
    pub residual_duplicates: usize,
}

/// Options for the in-memory build
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub max_features: usize,
    pub credits_rewrite: CreditsRewrite,
}

impl From<&Config> for BuildOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_features: config.max_features,
            credits_rewrite: config.credits_rewrite,
        }
    }
}

/// Builds the model from already-parsed raw tables
pub fn build_from_tables(
    movies: &[RawMovieRow],
    credits: &[RawCreditsRow],
    options: BuildOptions,
) -> AppResult<(RecommenderModel, BuildReport)> {
    let reconciled = reconcile(movies, credits, options.credits_rewrite)?;
    let ReconcileReport {
        dropped_movies,
        dropped_credits,
        reassignments,
    } = reconciled.report;

    let merged = merge(&reconciled.movies, &reconciled.credits);
    let table = compose_tags(&merged.movies);

    // Checked again on the final table, right before it becomes an artifact.
    ensure_unique_ids(table.iter().map(|m| m.id))?;

    let corpus: Vec<&str> = table.iter().map(|m| m.tags.as_str()).collect();
    let (tfidf, vectors) = TfidfVectorizer::new(options.max_features).fit_transform(&corpus);
    let matrix = build_similarity(&vectors);

    let report = BuildReport {
        movies: table.len(),
        vocabulary_size: tfidf.dimension(),
        dropped_movies,
        dropped_credits,
        reassigned_ids: reassignments.len(),
        without_credits: merged.without_credits,
        residual_duplicates: merged.residual_duplicates,
    };

    let model = RecommenderModel::new(table, matrix)?;
    Ok((model, report))
}

/// Runs the full build from the configured CSV files and persists the result
pub fn build(config: &Config) -> AppResult<(RecommenderModel, BuildReport, ArtifactManifest)> {
    tracing::info!(
        movies_csv = %config.movies_csv.display(),
        credits_csv = %config.credits_csv.display(),
        "Starting model build"
    );

    let movies = load_movies(&config.movies_csv)?;
    let credits = load_credits(&config.credits_csv)?;

    let (model, report) = build_from_tables(&movies, &credits, BuildOptions::from(config))?;
    let manifest = ArtifactStore::new(&config.model_dir).save(&model, report.vocabulary_size)?;

    tracing::info!(
        movies = report.movies,
        vocabulary = report.vocabulary_size,
        reassigned_ids = report.reassigned_ids,
        dropped_movies = report.dropped_movies,
        "Model build completed"
    );

    Ok((model, report, manifest))
}

//! Offline retrieval metrics over the similarity matrix.
//!
//! For each sampled row the relevant item is taken to be the row's own
//! highest-scoring non-self neighbor. The ground truth therefore comes from
//! the matrix under test: with a correct ranking hit-rate and MRR are always
//! 1.0 and precision is always `1/k`. These numbers catch broken retrieval
//! order (self not excluded, unstable ties, a misaligned row); they say
//! nothing about recommendation quality.

use std::fmt;

use serde::Serialize;

use crate::error::{AppError, AppResult};

use super::similarity::SimilarityMatrix;

/// Default cutoff used by the CLI
pub const DEFAULT_K: usize = 5;
/// Default number of leading rows evaluated
pub const DEFAULT_SAMPLE_SIZE: usize = 200;

/// Whether `relevant` is among the first `k` ranked ids
pub fn hit_at_k(ranked: &[usize], relevant: usize, k: usize) -> bool {
    ranked.iter().take(k).any(|&id| id == relevant)
}

/// Fraction of the first `k` ranked ids that are relevant (single relevant item)
pub fn precision_at(ranked: &[usize], relevant: usize, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    if hit_at_k(ranked, relevant, k) {
        1.0 / k as f64
    } else {
        0.0
    }
}

/// 1 / (1-indexed rank of `relevant`), or 0.0 when it is absent
pub fn reciprocal_rank(ranked: &[usize], relevant: usize) -> f64 {
    ranked
        .iter()
        .position(|&id| id == relevant)
        .map(|pos| 1.0 / (pos + 1) as f64)
        .unwrap_or(0.0)
}

/// Aggregate metrics for one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub k: usize,
    /// Rows actually evaluated, after clipping to the matrix size
    pub sample_size: usize,
    pub hit_rate: f64,
    pub precision: f64,
    pub mrr: f64,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16}: {:.4}", format!("Hit Rate@{}", self.k), self.hit_rate)?;
        writeln!(f, "{:<16}: {:.4}", format!("Precision@{}", self.k), self.precision)?;
        write!(f, "{:<16}: {:.4}", "MRR", self.mrr)
    }
}

/// Non-self neighbors of row `i`, by descending score then ascending index
fn neighbors(matrix: &SimilarityMatrix, i: usize) -> Vec<usize> {
    matrix
        .ranked_row(i)
        .into_iter()
        .map(|(j, _)| j)
        .filter(|&j| j != i)
        .collect()
}

fn sampled_rows(matrix: &SimilarityMatrix, sample_size: usize) -> AppResult<usize> {
    if matrix.dimension() < 2 {
        return Err(AppError::InvalidInput(
            "Evaluation needs at least two movies".to_string(),
        ));
    }
    if sample_size == 0 {
        return Err(AppError::InvalidInput(
            "Sample size must be at least 1".to_string(),
        ));
    }
    Ok(sample_size.min(matrix.dimension()))
}

fn ensure_k(k: usize) -> AppResult<()> {
    if k == 0 {
        return Err(AppError::InvalidInput("k must be at least 1".to_string()));
    }
    Ok(())
}

/// Mean of `score(ranked neighbors, proxy)` over the first `sample_size` rows
fn mean_over_sample<F>(matrix: &SimilarityMatrix, sample_size: usize, score: F) -> AppResult<f64>
where
    F: Fn(&[usize], usize) -> f64,
{
    let n = sampled_rows(matrix, sample_size)?;
    let total: f64 = (0..n)
        .map(|i| {
            let ranked = neighbors(matrix, i);
            // Non-empty: the matrix has at least two rows.
            let proxy = ranked[0];
            score(&ranked, proxy)
        })
        .sum();
    Ok(total / n as f64)
}

pub fn hit_rate_at_k(matrix: &SimilarityMatrix, k: usize, sample_size: usize) -> AppResult<f64> {
    ensure_k(k)?;
    mean_over_sample(matrix, sample_size, |ranked, proxy| {
        if hit_at_k(ranked, proxy, k) {
            1.0
        } else {
            0.0
        }
    })
}

pub fn precision_at_k(matrix: &SimilarityMatrix, k: usize, sample_size: usize) -> AppResult<f64> {
    ensure_k(k)?;
    mean_over_sample(matrix, sample_size, |ranked, proxy| precision_at(ranked, proxy, k))
}

pub fn mean_reciprocal_rank(matrix: &SimilarityMatrix, sample_size: usize) -> AppResult<f64> {
    mean_over_sample(matrix, sample_size, reciprocal_rank)
}

/// Runs all three metrics over the same sample, ranking each row once
pub fn evaluate(matrix: &SimilarityMatrix, k: usize, sample_size: usize) -> AppResult<EvaluationReport> {
    ensure_k(k)?;
    let n = sampled_rows(matrix, sample_size)?;

    let (mut hits, mut precision, mut reciprocal) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let ranked = neighbors(matrix, i);
        let proxy = ranked[0];
        if hit_at_k(&ranked, proxy, k) {
            hits += 1.0;
        }
        precision += precision_at(&ranked, proxy, k);
        reciprocal += reciprocal_rank(&ranked, proxy);
    }

    let report = EvaluationReport {
        k,
        sample_size: n,
        hit_rate: hits / n as f64,
        precision: precision / n as f64,
        mrr: reciprocal / n as f64,
    };

    tracing::info!(
        k,
        sample_size = report.sample_size,
        hit_rate = report.hit_rate,
        precision = report.precision,
        mrr = report.mrr,
        "Evaluation completed"
    );

    Ok(report)
}

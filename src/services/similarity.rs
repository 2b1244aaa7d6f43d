use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::vectorizer::SparseVector;

/// Dense N×N cosine-similarity matrix, stored row-major.
///
/// Row and column `i` refer to the i-th movie of the table the matrix was
/// built from. Scores lie in [0, 1] and the diagonal is exactly 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixData")]
pub struct SimilarityMatrix {
    dimension: usize,
    scores: Vec<f32>,
}

/// Wire shape of the matrix; validated into [`SimilarityMatrix`] on load
#[derive(Deserialize)]
struct MatrixData {
    dimension: usize,
    scores: Vec<f32>,
}

impl TryFrom<MatrixData> for SimilarityMatrix {
    type Error = AppError;

    fn try_from(data: MatrixData) -> AppResult<Self> {
        Self::from_scores(data.dimension, data.scores)
    }
}

impl SimilarityMatrix {
    /// Wraps row-major scores, rejecting data that is not square
    pub fn from_scores(dimension: usize, scores: Vec<f32>) -> AppResult<Self> {
        if dimension.checked_mul(dimension) != Some(scores.len()) {
            return Err(AppError::DataIntegrity(format!(
                "{} scores cannot form a {}x{} matrix",
                scores.len(),
                dimension,
                dimension
            )));
        }
        Ok(Self { dimension, scores })
    }

    /// Builds a matrix from nested rows (test fixtures, small inputs)
    pub fn from_rows(rows: Vec<Vec<f32>>) -> AppResult<Self> {
        let dimension = rows.len();
        if let Some(bad) = rows.iter().position(|r| r.len() != dimension) {
            return Err(AppError::DataIntegrity(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                dimension
            )));
        }
        Self::from_scores(dimension, rows.into_iter().flatten().collect())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.scores[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.scores[i * self.dimension + j]
    }

    /// Row `i` ranked by descending score, ties by ascending index
    pub fn ranked_row(&self, i: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self.row(i).iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

/// Computes all-pairs cosine similarity for L2-normalized vectors.
///
/// Uses an inverted index so each pair costs only its shared terms. Only
/// the upper triangle is accumulated and mirrored, which makes the result
/// exactly symmetric. Zero vectors score 0.0 against everything else.
/// O(N²) memory.
pub fn build_similarity(vectors: &[SparseVector]) -> SimilarityMatrix {
    let n = vectors.len();
    let dimension_terms = vectors
        .iter()
        .flat_map(|v| v.indices.iter())
        .max()
        .map(|&m| m as usize + 1)
        .unwrap_or(0);

    let mut postings: Vec<Vec<(usize, f32)>> = vec![Vec::new(); dimension_terms];
    for (doc, vector) in vectors.iter().enumerate() {
        for (&term, &weight) in vector.indices.iter().zip(&vector.values) {
            postings[term as usize].push((doc, weight));
        }
    }

    let mut scores = vec![0.0f32; n * n];
    let mut row = vec![0.0f32; n];
    for i in 0..n {
        row.iter_mut().for_each(|s| *s = 0.0);
        let vector = &vectors[i];
        for (&term, &weight) in vector.indices.iter().zip(&vector.values) {
            for &(j, other) in &postings[term as usize] {
                if j > i {
                    row[j] += weight * other;
                }
            }
        }

        scores[i * n + i] = 1.0;
        for j in (i + 1)..n {
            let score = row[j].clamp(0.0, 1.0);
            scores[i * n + j] = score;
            scores[j * n + i] = score;
        }
    }

    tracing::info!(dimension = n, "Similarity matrix computed");

    SimilarityMatrix {
        dimension: n,
        scores,
    }
}

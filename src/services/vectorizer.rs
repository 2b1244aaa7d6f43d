//! TF-IDF vectorization of movie tags.
//!
//! Tokens are lowercase runs of two or more word characters with English
//! stop words removed. The vocabulary keeps the `max_features` terms with
//! the highest corpus-wide counts (ties broken alphabetically) and is
//! indexed alphabetically. Weights use the smoothed inverse document
//! frequency `ln((1 + n) / (1 + df)) + 1` and each vector is L2-normalized.
//! A document with no vocabulary terms becomes the zero vector.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::stop_words::ENGLISH_STOP_WORDS;

/// Default vocabulary cap
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Sparse vector with strictly increasing indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Dot product by merging the two index lists
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Vectorizer configuration
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    stop_words: HashSet<&'static str>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FEATURES)
    }
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Splits text into lowercase tokens, skipping stop words
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() >= 2)
            .map(str::to_lowercase)
            .filter(|token| !self.stop_words.contains(token.as_str()))
            .collect()
    }

    /// Learns vocabulary and IDF weights from the corpus
    pub fn fit<S: AsRef<str>>(&self, corpus: &[S]) -> TfidfModel {
        let mut total_counts: HashMap<String, u64> = HashMap::new();
        let mut doc_freq: HashMap<String, u64> = HashMap::new();

        for doc in corpus {
            let tokens = self.tokenize(doc.as_ref());
            let mut unique = HashSet::new();
            for token in tokens {
                *total_counts.entry(token.clone()).or_default() += 1;
                unique.insert(token);
            }
            for token in unique {
                *doc_freq.entry(token).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, u64)> = total_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let selected: BTreeMap<String, ()> = ranked.into_iter().map(|(t, _)| (t, ())).collect();

        let n = corpus.len() as f64;
        let mut vocabulary = Vec::with_capacity(selected.len());
        let mut idf = Vec::with_capacity(selected.len());
        for term in selected.into_keys() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            idf.push((((1.0 + n) / (1.0 + df)).ln() + 1.0) as f32);
            vocabulary.push(term);
        }

        let index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();

        tracing::info!(
            documents = corpus.len(),
            vocabulary = vocabulary.len(),
            max_features = self.max_features,
            "TF-IDF vocabulary fitted"
        );

        TfidfModel {
            vectorizer: self.clone(),
            vocabulary,
            index,
            idf,
        }
    }

    /// Fits on the corpus and returns one vector per document, in order
    pub fn fit_transform<S: AsRef<str>>(&self, corpus: &[S]) -> (TfidfModel, Vec<SparseVector>) {
        let model = self.fit(corpus);
        let vectors = corpus.iter().map(|doc| model.transform(doc.as_ref())).collect();
        (model, vectors)
    }
}

/// A fitted vocabulary with IDF weights
#[derive(Debug, Clone)]
pub struct TfidfModel {
    vectorizer: TfidfVectorizer,
    vocabulary: Vec<String>,
    index: HashMap<String, u32>,
    idf: Vec<f32>,
}

impl TfidfModel {
    /// Terms in index order
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.index.get(term).map(|&i| self.idf[i as usize])
    }

    /// Converts one document to an L2-normalized TF-IDF vector
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<u32, f32> = BTreeMap::new();
        for token in self.vectorizer.tokenize(text) {
            if let Some(&i) = self.index.get(&token) {
                *counts.entry(i).or_default() += 1.0;
            }
        }

        let mut vector = SparseVector {
            indices: Vec::with_capacity(counts.len()),
            values: Vec::with_capacity(counts.len()),
        };
        for (i, tf) in counts {
            vector.indices.push(i);
            vector.values.push(tf * self.idf[i as usize]);
        }

        let norm = vector.norm();
        if norm > 0.0 {
            for v in &mut vector.values {
                *v /= norm;
            }
        }
        vector
    }
}

//! Ranked retrieval over an index

pub mod engine;
pub mod ranking;
pub mod rerank;

use std::{cmp::Ordering, collections::BinaryHeap};

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::base::{DocId, Score};

pub use engine::{SearchEngine, SearchResult};
pub use ranking::{accumulate, rank};
pub use rerank::{IdentityReranker, Reranker};

#[derive(Clone, Copy, Debug)]
pub struct ScoredDocument {
    pub docid: DocId,
    pub score: Score,
}

impl std::fmt::Display for ScoredDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.docid, self.score)
    }
}

impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Better documents come first: higher score, then lower document ID
impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.docid.cmp(&other.docid))
    }
}

/// Keeps the `top_k` best documents; the heap top is the worst one kept
pub struct TopScoredDocuments {
    heap: BinaryHeap<ScoredDocument>,
    top_k: usize,
}

impl TopScoredDocuments {
    pub fn new(top_k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(top_k),
            top_k,
        }
    }

    /// Add a new candidate, and returns the new lower bound on scores
    pub fn add(&mut self, candidate: DocId, score: Score) -> Score {
        let document = ScoredDocument {
            docid: candidate,
            score,
        };
        if self.heap.len() < self.top_k {
            self.heap.push(document);
        } else if let Some(worst) = self.heap.peek() {
            if document < *worst {
                self.heap.pop();
                self.heap.push(document);
            }
        }

        match self.heap.peek() {
            Some(worst) if self.heap.len() >= self.top_k => worst.score,
            // If the heap is not full, returns -infinity
            _ => Score::NEG_INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Best document first
    pub fn into_sorted_vec(self) -> Vec<ScoredDocument> {
        self.heap.into_sorted_vec()
    }
}

#[derive(Derivative, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[derivative(Default)]
pub struct Bm25Params {
    #[derivative(Default(value = "1.4"))]
    pub k1: f64,

    #[derivative(Default(value = "0.75"))]
    pub b: f64,
}

/// Term weighting schemes
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub enum Scoring {
    /// `(1 + ln tf) * ln(N / df)`
    #[default]
    TfIdf,

    /// BM25 with `ln(N / df)` as IDF:
    /// `(k1 + 1) tf / (k1 (1 - b) + b dl / avgdl + tf) * idf`
    Bm25(Bm25Params),
}

impl Scoring {
    pub fn bm25() -> Self {
        Scoring::Bm25(Bm25Params::default())
    }

    /// Contribution of one posting to a document score
    pub fn weight(&self, tf: u64, idf: Score, doc_length: u64, avg_doc_length: f64) -> Score {
        let tf = tf as f64;
        match self {
            Scoring::TfIdf => (1. + tf.ln()) * idf,
            Scoring::Bm25(Bm25Params { k1, b }) => {
                let relative_length = if avg_doc_length > 0. {
                    doc_length as f64 / avg_doc_length
                } else {
                    1.
                };
                // Only the constant part of the length normalization is
                // scaled by k1
                (k1 + 1.) * tf / (k1 * (1. - b) + b * relative_length + tf) * idf
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::TfIdf => "tfidf",
            Scoring::Bm25(_) => "bm25",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_top_k_keeps_best() {
        let mut top = TopScoredDocuments::new(2);
        assert_eq!(top.add(0, 1.), Score::NEG_INFINITY);
        assert_eq!(top.add(1, 3.), 1.);
        assert_eq!(top.add(2, 2.), 2.);
        top.add(3, 0.5);

        let docs: Vec<DocId> = top.into_sorted_vec().iter().map(|d| d.docid).collect();
        assert_eq!(docs, vec![1, 2]);
    }

    #[test]
    fn test_ties_prefer_lower_ids() {
        let mut top = TopScoredDocuments::new(2);
        for doc in [5, 3, 9, 1] {
            top.add(doc, 1.);
        }
        let docs: Vec<DocId> = top.into_sorted_vec().iter().map(|d| d.docid).collect();
        assert_eq!(docs, vec![1, 3]);
    }

    #[test]
    fn test_zero_k() {
        let mut top = TopScoredDocuments::new(0);
        top.add(0, 10.);
        assert!(top.is_empty());
    }

    #[rstest]
    #[case(1, 1.)]
    #[case(3, 1. + 3f64.ln())]
    fn test_tfidf_weight(#[case] tf: u64, #[case] factor: f64) {
        // Document lengths do not matter
        let weight = Scoring::TfIdf.weight(tf, 2f64.ln(), 10, 5.);
        assert!((weight - factor * 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_default_scoring() {
        assert_eq!(Scoring::default(), Scoring::TfIdf);
    }

    #[test]
    fn test_bm25_defaults() {
        let params = Bm25Params::default();
        assert_eq!(params.k1, 1.4);
        assert_eq!(params.b, 0.75);

        let weight = Scoring::bm25().weight(2, 1., 4, 4.);
        assert!((weight - 2.4 * 2. / (1.4 * 0.25 + 0.75 + 2.)).abs() < 1e-12);

        // Longer documents get lower scores
        let longer = Scoring::bm25().weight(2, 1., 8, 4.);
        assert!(longer < weight);
    }
}

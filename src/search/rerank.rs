//! Optional re-ranking stage applied to the first-stage candidates

use super::ScoredDocument;

pub trait Reranker: Send + Sync {
    /// Reorders (and possibly rescores or drops) the candidates, which come
    /// best first
    fn rerank(&self, query: &str, candidates: Vec<ScoredDocument>) -> Vec<ScoredDocument>;
}

/// Keeps the first-stage order
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rerank(&self, _query: &str, candidates: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
        candidates
    }
}

impl<F> Reranker for F
where
    F: Fn(&str, Vec<ScoredDocument>) -> Vec<ScoredDocument> + Send + Sync,
{
    fn rerank(&self, query: &str, candidates: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
        self(query, candidates)
    }
}

//! Query processing over a built index

use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use super::{rank, Bm25Params, Reranker, ScoredDocument, Scoring};
use crate::{
    base::{load_manifest, Score, TermId, DOCS_DICT, TERMS_DICT},
    error::Result,
    idmap::IdMap,
    index::{IndexReader, PostingsLookup},
    normalize::{Normalizer, TextNormalizer},
    utils::buffer::BufferMode,
};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub score: Score,
    pub document: String,
}

/// Ties together the normalizer, the ID maps and the index.
///
/// Searching only reads shared state, so an engine can serve concurrent
/// queries.
pub struct SearchEngine {
    index: Box<dyn PostingsLookup>,
    term_ids: IdMap,
    doc_ids: IdMap,
    normalizer: Box<dyn Normalizer>,
}

impl SearchEngine {
    pub fn new(
        index: Box<dyn PostingsLookup>,
        term_ids: IdMap,
        doc_ids: IdMap,
        normalizer: Box<dyn Normalizer>,
    ) -> Self {
        Self {
            index,
            term_ids,
            doc_ids,
            normalizer,
        }
    }

    /// Opens the output directory of a build
    pub fn open(folder: &Path, mode: BufferMode) -> Result<Self> {
        let manifest = load_manifest(folder)?;
        let term_ids = IdMap::load(&folder.join(TERMS_DICT))?;
        let doc_ids = IdMap::load(&folder.join(DOCS_DICT))?;
        let index = IndexReader::open(folder, &manifest.index_name, mode)?;
        info!(
            "Search engine ready ({} documents, {} terms)",
            manifest.documents, manifest.terms
        );

        Ok(Self::new(
            Box::new(index),
            term_ids,
            doc_ids,
            Box::new(TextNormalizer::new(&manifest.normalizer)),
        ))
    }

    /// Number of indexed (non empty) documents
    pub fn documents(&self) -> usize {
        self.index.doc_lengths().count()
    }

    /// Query tokens that belong to the vocabulary, in query order
    pub fn query_terms(&self, query: &str) -> Vec<TermId> {
        self.normalizer
            .normalize(query)
            .iter()
            .filter_map(|token| {
                let id = self.term_ids.get(token);
                if id.is_none() {
                    debug!("Unknown query token {}", token);
                }
                id
            })
            .collect()
    }

    /// Scored document IDs, best first
    pub fn rank(&self, query: &str, k: usize, scoring: &Scoring) -> Result<Vec<ScoredDocument>> {
        let terms = self.query_terms(query);
        rank(self.index.as_ref(), &terms, k, scoring)
    }

    pub fn retrieve(&self, query: &str, k: usize, scoring: &Scoring) -> Result<Vec<SearchResult>> {
        let ranked = self.rank(query, k, scoring)?;
        self.resolve(ranked)
    }

    pub fn retrieve_tfidf(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.retrieve(query, k, &Scoring::TfIdf)
    }

    pub fn retrieve_bm25(&self, query: &str, k: usize, k1: f64, b: f64) -> Result<Vec<SearchResult>> {
        self.retrieve(query, k, &Scoring::Bm25(Bm25Params { k1, b }))
    }

    /// Retrieves `k` candidates and lets `reranker` reorder them
    pub fn retrieve_reranked(
        &self,
        query: &str,
        k: usize,
        scoring: &Scoring,
        reranker: &dyn Reranker,
    ) -> Result<Vec<SearchResult>> {
        let candidates = self.rank(query, k, scoring)?;
        self.resolve(reranker.rerank(query, candidates))
    }

    fn resolve(&self, ranked: Vec<ScoredDocument>) -> Result<Vec<SearchResult>> {
        ranked
            .into_iter()
            .map(|d| {
                Ok(SearchResult {
                    score: d.score,
                    document: self.doc_ids.key_of(d.docid)?.to_string(),
                })
            })
            .collect()
    }
}

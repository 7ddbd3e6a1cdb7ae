//! Term-at-a-time ranking
//!
//! Each query term is scored over its whole postings list, and the partial
//! scores are folded into an accumulator sorted by document ID.

use log::debug;

use super::{Scoring, ScoredDocument, TopScoredDocuments};
use crate::{
    base::{DocId, Score, TermId},
    error::{Error, Result},
    index::{PostingsLookup, TermPostings},
};

/// Merges two score lists sorted by document ID, summing the scores of
/// documents found in both
pub fn accumulate(acc: Vec<(DocId, Score)>, contributions: Vec<(DocId, Score)>) -> Vec<(DocId, Score)> {
    if acc.is_empty() {
        return contributions;
    }

    let mut merged = Vec::with_capacity(acc.len() + contributions.len());
    let mut left = acc.into_iter().peekable();
    let mut right = contributions.into_iter().peekable();

    loop {
        match (left.peek(), right.peek()) {
            (Some(&(a, sa)), Some(&(b, sb))) => {
                if a == b {
                    merged.push((a, sa + sb));
                    left.next();
                    right.next();
                } else if a < b {
                    merged.push((a, sa));
                    left.next();
                } else {
                    merged.push((b, sb));
                    right.next();
                }
            }
            (Some(_), None) => {
                merged.extend(left);
                break;
            }
            (None, Some(_)) => {
                merged.extend(right);
                break;
            }
            (None, None) => break,
        }
    }
    merged
}

/// Partial scores of one term, in document order
fn term_scores(
    index: &dyn PostingsLookup,
    postings: &TermPostings,
    scoring: &Scoring,
    documents: f64,
    avg_doc_length: f64,
) -> Result<Vec<(DocId, Score)>> {
    let idf = (documents / postings.df() as f64).ln();
    let doc_lengths = index.doc_lengths();

    postings
        .iter()
        .map(|(doc_id, tf)| {
            let doc_length = match scoring {
                Scoring::TfIdf => 0,
                Scoring::Bm25(_) => doc_lengths.get(doc_id).ok_or_else(|| {
                    Error::MalformedIndex(format!("document {} has no length", doc_id))
                })?,
            };
            Ok((doc_id, scoring.weight(tf, idf, doc_length, avg_doc_length)))
        })
        .collect()
}

/// Ranks documents for a list of query terms (repeated terms count
/// repeatedly), returning at most `top_k` documents, best first.
///
/// Terms that are not in the index are skipped.
pub fn rank(
    index: &dyn PostingsLookup,
    term_ids: &[TermId],
    top_k: usize,
    scoring: &Scoring,
) -> Result<Vec<ScoredDocument>> {
    let mut postings = Vec::with_capacity(term_ids.len());
    for &term_id in term_ids {
        if !index.contains_term(term_id) {
            debug!("Skipping term {} (not indexed)", term_id);
            continue;
        }
        postings.push(index.get_postings_list(term_id)?);
    }
    if postings.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    // Shortest lists first
    postings.sort_by_key(|p| p.df());

    let documents = index.doc_lengths().count() as f64;
    let avg_doc_length = index.doc_lengths().average();

    let mut acc = Vec::new();
    for p in postings.iter() {
        let contributions = term_scores(index, p, scoring, documents, avg_doc_length)?;
        debug!(
            "Term {}: {} postings, {} accumulated documents",
            p.term_id,
            contributions.len(),
            acc.len()
        );
        acc = accumulate(acc, contributions);
    }

    let mut top = TopScoredDocuments::new(top_k);
    for (doc_id, score) in acc {
        top.add(doc_id, score);
    }
    Ok(top.into_sorted_vec())
}

use std::collections::{BTreeMap, HashMap};

use temp_dir::TempDir;

use crate::documents::{TestCollection, TestDocument};
use bsbi_index::{
    builder::{build_on_disk, BuildSummary, BuilderOptions},
    normalize::NormalizerConfig,
};

/// A random collection indexed in a temporary directory
pub struct TestIndex {
    pub dir: TempDir,
    pub data: TestCollection,
    pub summary: BuildSummary,
}

impl TestIndex {
    pub fn new(data: TestCollection, options: &BuilderOptions) -> Self {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let summary = build_on_disk(
            &data.collection,
            dir.path(),
            options,
            &NormalizerConfig::default(),
        )
        .expect("Error while building the index");

        Self { dir, data, summary }
    }
}

/// Term frequencies of each document, by document key
pub fn term_frequencies(documents: &[TestDocument]) -> BTreeMap<String, HashMap<String, u64>> {
    documents
        .iter()
        .map(|d| {
            let mut tfs = HashMap::new();
            for token in d.tokens.iter() {
                *tfs.entry(token.clone()).or_insert(0) += 1;
            }
            (d.key.clone(), tfs)
        })
        .collect()
}

/// Expected postings: for each term, (document key, tf) in indexing order
pub fn expected_postings(documents: &[TestDocument]) -> BTreeMap<String, Vec<(String, u64)>> {
    let tfs = term_frequencies(documents);
    let mut postings = BTreeMap::<String, Vec<(String, u64)>>::new();
    for d in documents {
        let mut terms: Vec<(&String, &u64)> = tfs[&d.key].iter().collect();
        terms.sort();
        for (term, &tf) in terms {
            postings
                .entry(term.clone())
                .or_default()
                .push((d.key.clone(), tf));
        }
    }
    postings
}

/// Scores every document for the query tokens without any index,
/// returning (document key, score) for documents containing a query term,
/// best first (ties by indexing order)
pub fn brute_force_scores(
    documents: &[TestDocument],
    query: &[String],
    bm25: Option<(f64, f64)>,
) -> Vec<(String, f64)> {
    let tfs = term_frequencies(documents);
    let n = documents.len() as f64;
    let avg_length =
        documents.iter().map(|d| d.tokens.len()).sum::<usize>() as f64 / n;

    let mut scored: Vec<(usize, String, f64)> = Vec::new();
    for (ix, d) in documents.iter().enumerate() {
        let doc_tfs = &tfs[&d.key];
        let mut matched = false;
        let mut score = 0.;
        for token in query {
            let Some(&tf) = doc_tfs.get(token) else {
                continue;
            };
            matched = true;
            let df = tfs.values().filter(|m| m.contains_key(token)).count() as f64;
            let idf = (n / df).ln();
            let tf = tf as f64;
            score += match bm25 {
                None => (1. + tf.ln()) * idf,
                Some((k1, b)) => {
                    let dl = d.tokens.len() as f64;
                    (k1 + 1.) * tf / (k1 * (1. - b) + b * (dl / avg_length) + tf) * idf
                }
            };
        }
        if matched {
            scored.push((ix, d.key.clone(), score));
        }
    }

    scored.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(_, key, score)| (key, score)).collect()
}

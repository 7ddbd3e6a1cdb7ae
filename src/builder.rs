//! Blocked sort-based indexing
//!
//! Each block of the collection is parsed into (term, document) pairs,
//! inverted in memory and flushed as an intermediate index. All the
//! intermediate indices are then streamed together through a k-way merge
//! into the final index.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    path::Path,
};

use derivative::Derivative;
use indicatif::ProgressBar;
use log::{debug, info};

use crate::{
    base::{
        save_manifest, DocId, Frequency, IndexManifest, Len, TermId, DOCS_DICT, MAIN_INDEX,
        TERMS_DICT,
    },
    collection::Collection,
    compress::{PostingsCodec, VByteCodec},
    error::{Error, Result},
    idmap::IdMap,
    index::{DiskStorage, DocLengths, IndexStorage, PostingsCursor, PostingsWriter, TermPostings},
    normalize::{Normalizer, NormalizerConfig, TextNormalizer},
};

#[derive(Derivative, Clone)]
#[derivative(Default)]
pub struct BuilderOptions {
    /// Name of the merged index
    #[derivative(Default(value = "MAIN_INDEX.to_string()"))]
    pub index_name: String,

    /// Codec for the document IDs and frequencies (on-disk builds)
    #[derivative(Default(value = "Box::new(VByteCodec {})"))]
    pub codec: Box<dyn PostingsCodec>,

    /// Keep the intermediate (per block) indices once merged
    pub keep_intermediate: bool,

    /// Show a progress bar over blocks
    pub show_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Parse,
    Invert,
    Flush,
    Merge,
    Done,
}

/// One occurrence of a term in a document
pub type TermDocPair = (TermId, DocId);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub terms: usize,
    pub postings: u64,
    pub documents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub blocks: usize,
    pub documents: usize,
    pub terms: usize,
    pub postings: u64,
}

pub struct BsbiIndexer {
    term_ids: IdMap,
    doc_ids: IdMap,
    normalizer: Box<dyn Normalizer>,
    options: BuilderOptions,
    intermediate_indices: Vec<String>,
    phase: BuildPhase,
}

impl BsbiIndexer {
    pub fn new(normalizer: Box<dyn Normalizer>, options: BuilderOptions) -> Self {
        Self {
            term_ids: IdMap::new(),
            doc_ids: IdMap::new(),
            normalizer,
            options,
            intermediate_indices: Vec::new(),
            phase: BuildPhase::Idle,
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn term_ids(&self) -> &IdMap {
        &self.term_ids
    }

    pub fn doc_ids(&self) -> &IdMap {
        &self.doc_ids
    }

    /// Consumes the indexer and returns the (term, document) identifier maps
    pub fn into_id_maps(self) -> (IdMap, IdMap) {
        (self.term_ids, self.doc_ids)
    }

    /// Names of the intermediate indices flushed so far
    pub fn intermediate_indices(&self) -> &[String] {
        &self.intermediate_indices
    }

    fn set_phase(&mut self, phase: BuildPhase) {
        debug!("Build phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Turns the documents of a block into (term ID, document ID) pairs, one
    /// per token occurrence
    pub fn parse_block(
        &mut self,
        collection: &dyn Collection,
        block: &str,
    ) -> Result<Vec<TermDocPair>> {
        let mut pairs = Vec::new();
        for document in collection.documents(block)? {
            let document = document?;
            if self.doc_ids.contains(&document.key) {
                return Err(Error::OrderingViolation(format!(
                    "document {} appears twice in the collection",
                    document.key
                )));
            }
            let doc_id = self.doc_ids.id_of(&document.key);
            for token in self.normalizer.normalize(&document.text) {
                pairs.push((self.term_ids.id_of(&token), doc_id));
            }
        }
        Ok(pairs)
    }

    /// Inverts the pairs of one block (hash aggregation) and writes the
    /// postings in increasing term order. Returns the number of terms.
    pub fn invert_write(pairs: Vec<TermDocPair>, index: &mut dyn PostingsWriter) -> Result<usize> {
        let mut term_dict: HashMap<TermId, HashMap<DocId, Frequency>> = HashMap::new();
        for (term_id, doc_id) in pairs {
            *term_dict
                .entry(term_id)
                .or_default()
                .entry(doc_id)
                .or_insert(0) += 1;
        }

        let mut term_ids: Vec<TermId> = term_dict.keys().copied().collect();
        term_ids.sort_unstable();

        let mut doc_lengths = DocLengths::new();
        for &term_id in term_ids.iter() {
            // Hash order is arbitrary, postings must be sorted by document
            let mut postings: Vec<(DocId, Frequency)> = term_dict
                .remove(&term_id)
                .map(|docs| docs.into_iter().collect())
                .unwrap_or_default();
            postings.sort_unstable_by_key(|&(doc_id, _)| doc_id);

            let (doc_ids, tfs): (Vec<DocId>, Vec<Frequency>) = postings.into_iter().unzip();
            for (&doc_id, &tf) in doc_ids.iter().zip(tfs.iter()) {
                doc_lengths.add(doc_id, tf);
            }
            index.append(term_id, &doc_ids, &tfs)?;
        }
        index.set_doc_lengths(doc_lengths);

        Ok(term_ids.len())
    }

    /// Builds the index of the whole collection into `storage`
    pub fn index(
        &mut self,
        collection: &dyn Collection,
        storage: &dyn IndexStorage,
    ) -> Result<BuildSummary> {
        if self.phase != BuildPhase::Idle {
            return Err(Error::OrderingViolation(format!(
                "indexer already used (phase {:?})",
                self.phase
            )));
        }

        let blocks = collection.blocks()?;
        info!("Indexing {} blocks", blocks.len());
        let progress = if self.options.show_progress {
            ProgressBar::new(blocks.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        for block in blocks.iter() {
            self.set_phase(BuildPhase::Parse);
            let pairs = self.parse_block(collection, block)?;
            let pair_count = pairs.len();

            self.set_phase(BuildPhase::Invert);
            let index_name = format!("intermediate_index_{}", block);
            let mut writer = storage.create(&index_name)?;
            let terms = Self::invert_write(pairs, writer.as_mut())?;

            self.set_phase(BuildPhase::Flush);
            writer.finish()?;
            info!(
                "Block {}: {} occurrences, {} terms -> {}",
                block, pair_count, terms, index_name
            );
            self.intermediate_indices.push(index_name);
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.set_phase(BuildPhase::Merge);
        let merge_summary = {
            let cursors = self
                .intermediate_indices
                .iter()
                .map(|name| storage.cursor(name))
                .collect::<Result<Vec<_>>>()?;
            let mut merged = storage.create(&self.options.index_name)?;
            let summary = merge_indices(cursors, merged.as_mut())?;
            merged.finish()?;
            summary
        };

        if !self.options.keep_intermediate {
            for name in self.intermediate_indices.iter() {
                storage.remove(name)?;
            }
        }

        self.set_phase(BuildPhase::Done);
        info!(
            "Index {} built: {} documents, {} terms, {} postings",
            self.options.index_name,
            self.doc_ids.len(),
            self.term_ids.len(),
            merge_summary.postings
        );

        Ok(BuildSummary {
            blocks: blocks.len(),
            documents: self.doc_ids.len(),
            terms: self.term_ids.len(),
            postings: merge_summary.postings,
        })
    }
}

/// Merges two postings lists of the same term. Document IDs of two blocks
/// are disjoint: a document found in both is an error.
pub fn merge_term_postings(a: TermPostings, b: TermPostings) -> Result<TermPostings> {
    let mut doc_ids = Vec::with_capacity(a.df() + b.df());
    let mut tfs = Vec::with_capacity(a.df() + b.df());

    let (mut i, mut j) = (0, 0);
    while i < a.df() && j < b.df() {
        if a.doc_ids[i] < b.doc_ids[j] {
            doc_ids.push(a.doc_ids[i]);
            tfs.push(a.tfs[i]);
            i += 1;
        } else if b.doc_ids[j] < a.doc_ids[i] {
            doc_ids.push(b.doc_ids[j]);
            tfs.push(b.tfs[j]);
            j += 1;
        } else {
            return Err(Error::OrderingViolation(format!(
                "document {} of term {} found in two blocks",
                a.doc_ids[i], a.term_id
            )));
        }
    }
    doc_ids.extend_from_slice(&a.doc_ids[i..]);
    tfs.extend_from_slice(&a.tfs[i..]);
    doc_ids.extend_from_slice(&b.doc_ids[j..]);
    tfs.extend_from_slice(&b.tfs[j..]);

    Ok(TermPostings::new(a.term_id, doc_ids, tfs))
}

fn write_merged(
    postings: TermPostings,
    merged: &mut dyn PostingsWriter,
    doc_lengths: &mut DocLengths,
    summary: &mut MergeSummary,
) -> Result<()> {
    for (doc_id, tf) in postings.iter() {
        doc_lengths.add(doc_id, tf);
    }
    summary.terms += 1;
    summary.postings += postings.df() as u64;
    merged.append(postings.term_id, &postings.doc_ids, &postings.tfs)
}

/// K-way merge of streams sorted by term: a heap holds the current term of
/// each source, and the postings of equal terms are combined before being
/// written. The document length table of the merged index is computed in
/// the same pass.
pub fn merge_indices(
    mut sources: Vec<PostingsCursor<'_>>,
    merged: &mut dyn PostingsWriter,
) -> Result<MergeSummary> {
    let mut heads: Vec<Option<TermPostings>> = vec![None; sources.len()];
    let mut heap = BinaryHeap::new();

    for (ix, source) in sources.iter_mut().enumerate() {
        if let Some(postings) = source.next() {
            let postings = postings?;
            heap.push(Reverse((postings.term_id, ix)));
            heads[ix] = Some(postings);
        }
    }
    debug!("Merging {} sources", sources.len());

    let mut summary = MergeSummary::default();
    let mut doc_lengths = DocLengths::new();
    let mut current: Option<TermPostings> = None;

    while let Some(Reverse((term_id, ix))) = heap.pop() {
        let Some(postings) = heads[ix].take() else {
            continue;
        };

        // Refill from the same source
        if let Some(next) = sources[ix].next() {
            let next = next?;
            if next.term_id <= term_id {
                return Err(Error::OrderingViolation(format!(
                    "source {}: term {} follows term {}",
                    ix, next.term_id, term_id
                )));
            }
            heap.push(Reverse((next.term_id, ix)));
            heads[ix] = Some(next);
        }

        current = Some(match current.take() {
            Some(acc) if acc.term_id == term_id => merge_term_postings(acc, postings)?,
            Some(acc) => {
                write_merged(acc, merged, &mut doc_lengths, &mut summary)?;
                postings
            }
            None => postings,
        });
    }
    if let Some(acc) = current {
        write_merged(acc, merged, &mut doc_lengths, &mut summary)?;
    }

    summary.documents = doc_lengths.count();
    merged.set_doc_lengths(doc_lengths);
    Ok(summary)
}

/// Builds the index of `collection` in `output`: the merged index, the two
/// identifier maps and the manifest
pub fn build_on_disk(
    collection: &dyn Collection,
    output: &Path,
    options: &BuilderOptions,
    normalizer: &NormalizerConfig,
) -> Result<BuildSummary> {
    let storage = DiskStorage::new(output, options.codec.clone())?;
    info!(
        "Building index {} in {} ({} codec)",
        options.index_name,
        output.display(),
        options.codec.name()
    );

    let mut indexer = BsbiIndexer::new(Box::new(TextNormalizer::new(normalizer)), options.clone());
    let summary = indexer.index(collection, &storage)?;

    let (term_ids, doc_ids) = indexer.into_id_maps();
    term_ids.save(&output.join(TERMS_DICT))?;
    doc_ids.save(&output.join(DOCS_DICT))?;
    save_manifest(
        &IndexManifest {
            index_name: options.index_name.clone(),
            normalizer: normalizer.clone(),
            documents: doc_ids.len() as u64,
            terms: term_ids.len() as u64,
        },
        output,
    )?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{memory::MemoryWriter, MemoryIndex, PostingsLookup};

    fn cursor(postings: Vec<TermPostings>) -> PostingsCursor<'static> {
        Box::new(postings.into_iter().map(Ok))
    }

    #[test]
    fn test_invert_sorts_documents() {
        let mut writer = MemoryWriter::new();
        let terms =
            BsbiIndexer::invert_write(vec![(3, 5), (1, 2), (3, 2), (3, 5)], &mut writer).unwrap();
        assert_eq!(terms, 2);
        writer.finish().unwrap();

        let index = writer.into_index();
        let postings = index.get_postings_list(3).unwrap();
        assert_eq!(postings.doc_ids, vec![2, 5]);
        assert_eq!(postings.tfs, vec![1, 2]);
        assert_eq!(index.doc_lengths().get(2), Some(2));
        assert_eq!(index.doc_lengths().get(5), Some(2));
    }

    #[test]
    fn test_merge_term_postings() {
        let merged = merge_term_postings(
            TermPostings::new(7, vec![1, 4, 9], vec![1, 2, 3]),
            TermPostings::new(7, vec![2, 3, 10], vec![5, 6, 7]),
        )
        .unwrap();
        assert_eq!(merged.doc_ids, vec![1, 2, 3, 4, 9, 10]);
        assert_eq!(merged.tfs, vec![1, 5, 6, 2, 3, 7]);

        let duplicate = merge_term_postings(
            TermPostings::new(7, vec![1, 4], vec![1, 1]),
            TermPostings::new(7, vec![4], vec![2]),
        );
        assert!(matches!(duplicate, Err(Error::OrderingViolation(_))));
    }

    #[test]
    fn test_three_way_merge() {
        let sources = vec![
            cursor(vec![
                TermPostings::new(0, vec![0], vec![2]),
                TermPostings::new(2, vec![1], vec![1]),
            ]),
            cursor(vec![]),
            cursor(vec![
                TermPostings::new(0, vec![4], vec![1]),
                TermPostings::new(1, vec![3, 4], vec![1, 3]),
            ]),
            cursor(vec![TermPostings::new(2, vec![5], vec![4])]),
        ];

        let mut writer = MemoryWriter::new();
        let summary = merge_indices(sources, &mut writer).unwrap();
        writer.finish().unwrap();

        assert_eq!(
            summary,
            MergeSummary {
                terms: 3,
                postings: 6,
                documents: 5
            }
        );

        let expected = MemoryIndex::from_postings(vec![
            TermPostings::new(0, vec![0, 4], vec![2, 1]),
            TermPostings::new(1, vec![3, 4], vec![1, 3]),
            TermPostings::new(2, vec![1, 5], vec![1, 4]),
        ])
        .unwrap();
        let observed = writer.into_index();
        assert_eq!(observed, expected);
        assert_eq!(observed.doc_lengths().get(4), Some(4));
    }

    #[test]
    fn test_unsorted_source() {
        let sources = vec![cursor(vec![
            TermPostings::new(3, vec![0], vec![1]),
            TermPostings::new(1, vec![1], vec![1]),
        ])];
        let mut writer = MemoryWriter::new();
        assert!(matches!(
            merge_indices(sources, &mut writer),
            Err(Error::OrderingViolation(_))
        ));
    }
}

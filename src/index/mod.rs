//! Main data structures used to describe an index
//!
//! An index is a pair of files: `<name>.index` holds, for each term, the
//! encoded (gap) document IDs immediately followed by the encoded term
//! frequencies; `<name>.dict` is the CBOR directory giving the position of
//! each term in the postings file together with the document length table.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    base::{DocId, Frequency, TermId},
    compress::{prefix_sum, PostingsCodec},
    error::{Error, Result},
};

pub mod memory;
pub mod reader;
pub mod writer;

pub use memory::{MemoryIndex, MemoryStorage, MemoryWriter};
pub use reader::{IndexCursor, IndexReader};
pub use writer::IndexWriter;

pub fn postings_path(folder: &Path, name: &str) -> PathBuf {
    folder.join(format!("{}.index", name))
}

pub fn directory_path(folder: &Path, name: &str) -> PathBuf {
    folder.join(format!("{}.dict", name))
}

/// Location of a term's postings within the postings file
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermEntry {
    /// Position of the encoded document IDs
    pub start: u64,

    /// Number of bytes of the encoded document IDs
    pub docids_len: u64,

    /// Number of bytes of the encoded term frequencies (they follow the
    /// document IDs)
    pub tfs_len: u64,

    /// Document frequency
    pub df: u64,
}

impl TermEntry {
    /// End of the term record (exclusive), `None` on overflow
    pub fn end(&self) -> Option<u64> {
        self.start
            .checked_add(self.docids_len)?
            .checked_add(self.tfs_len)
    }
}

impl fmt::Display for TermEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(pos: {}, docids: {}b, tfs: {}b, df: {})",
            self.start, self.docids_len, self.tfs_len, self.df
        )
    }
}

/// Number of tokens of each document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DocLengths {
    lengths: BTreeMap<DocId, u64>,
    total: u64,
}

impl DocLengths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tf` tokens to the length of `doc_id`
    pub fn add(&mut self, doc_id: DocId, tf: Frequency) {
        *self.lengths.entry(doc_id).or_insert(0) += tf;
        self.total += tf;
    }

    pub fn get(&self, doc_id: DocId) -> Option<u64> {
        self.lengths.get(&doc_id).copied()
    }

    /// Number of documents (N)
    pub fn count(&self) -> usize {
        self.lengths.len()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Mean document length, 0 for an empty table
    pub fn average(&self) -> f64 {
        if self.lengths.is_empty() {
            0.
        } else {
            self.total as f64 / self.lengths.len() as f64
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, u64)> + '_ {
        self.lengths.iter().map(|(&d, &l)| (d, l))
    }
}

/// Global information on the index structure (the directory file)
#[derive(Serialize, Deserialize)]
pub struct IndexInformation {
    pub codec: Box<dyn PostingsCodec>,
    pub terms: BTreeMap<TermId, TermEntry>,
    pub doc_lengths: DocLengths,
}

impl IndexInformation {
    pub fn new(codec: Box<dyn PostingsCodec>) -> Self {
        Self {
            codec,
            terms: BTreeMap::new(),
            doc_lengths: DocLengths::new(),
        }
    }
}

/// The postings of one term: document IDs (ascending) and the aligned
/// term frequencies
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermPostings {
    pub term_id: TermId,
    pub doc_ids: Vec<DocId>,
    pub tfs: Vec<Frequency>,
}

impl TermPostings {
    pub fn new(term_id: TermId, doc_ids: Vec<DocId>, tfs: Vec<Frequency>) -> Self {
        Self {
            term_id,
            doc_ids,
            tfs,
        }
    }

    /// Document frequency
    pub fn df(&self) -> usize {
        self.doc_ids.len()
    }

    /// (document ID, frequency) pairs
    pub fn iter(&self) -> impl Iterator<Item = (DocId, Frequency)> + '_ {
        self.doc_ids.iter().copied().zip(self.tfs.iter().copied())
    }
}

/// Forward-only stream of postings in increasing term ID order
pub type PostingsCursor<'a> = Box<dyn Iterator<Item = Result<TermPostings>> + 'a>;

/// Sink receiving postings in increasing term ID order
pub trait PostingsWriter {
    /// Adds the postings of a term; term IDs must be strictly increasing,
    /// document IDs strictly increasing and `tfs` aligned with `doc_ids`
    fn append(&mut self, term_id: TermId, doc_ids: &[DocId], tfs: &[Frequency]) -> Result<()>;

    /// Sets the document length table stored alongside the directory
    fn set_doc_lengths(&mut self, lengths: DocLengths);

    /// Makes the index visible; no append is accepted afterwards
    fn finish(&mut self) -> Result<()>;
}

/// Random access to postings (used at query time)
pub trait PostingsLookup: Send + Sync {
    /// Returns the postings of a term, or `NotFound` if the term is not
    /// indexed
    fn get_postings_list(&self, term_id: TermId) -> Result<TermPostings>;

    fn contains_term(&self, term_id: TermId) -> bool;

    fn doc_lengths(&self) -> &DocLengths;
}

/// Creates, streams and removes named indices
pub trait IndexStorage {
    fn create<'a>(&'a self, name: &str) -> Result<Box<dyn PostingsWriter + 'a>>;

    fn cursor<'a>(&'a self, name: &str) -> Result<PostingsCursor<'a>>;

    fn remove(&self, name: &str) -> Result<()>;
}

/// Enforces the contract of [`PostingsWriter::append`]
#[derive(Default)]
pub(crate) struct AppendGuard {
    last_term: Option<TermId>,
    finished: bool,
}

impl AppendGuard {
    pub(crate) fn check(
        &mut self,
        term_id: TermId,
        doc_ids: &[DocId],
        tfs: &[Frequency],
    ) -> Result<()> {
        if self.finished {
            return Err(Error::OrderingViolation(format!(
                "term {} appended to a finished index",
                term_id
            )));
        }
        if let Some(last) = self.last_term {
            if term_id <= last {
                return Err(Error::OrderingViolation(format!(
                    "term ID {} appended after term ID {}",
                    term_id, last
                )));
            }
        }
        if doc_ids.is_empty() {
            return Err(Error::OrderingViolation(format!(
                "empty postings list for term {}",
                term_id
            )));
        }
        if doc_ids.len() != tfs.len() {
            return Err(Error::OrderingViolation(format!(
                "term {}: {} document IDs but {} frequencies",
                term_id,
                doc_ids.len(),
                tfs.len()
            )));
        }
        if let Some(w) = doc_ids.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::OrderingViolation(format!(
                "term {}: document IDs should be strictly increasing ({} then {})",
                term_id, w[0], w[1]
            )));
        }
        if tfs.contains(&0) {
            return Err(Error::OrderingViolation(format!(
                "term {}: null term frequency",
                term_id
            )));
        }
        self.last_term = Some(term_id);
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::OrderingViolation(
                "index already finished".to_string(),
            ));
        }
        self.finished = true;
        Ok(())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Decodes a term record read from a postings file
pub(crate) fn decode_postings(
    codec: &dyn PostingsCodec,
    term_id: TermId,
    entry: &TermEntry,
    data: &[u8],
) -> Result<TermPostings> {
    let docids_len = entry.docids_len as usize;
    let expected = entry.docids_len.saturating_add(entry.tfs_len);
    if data.len() as u64 != expected {
        return Err(Error::MalformedIndex(format!(
            "term {}: expected {} bytes, got {}",
            term_id,
            expected,
            data.len()
        )));
    }

    let doc_ids = prefix_sum(&codec.decode(&data[..docids_len])?)?;
    let tfs = codec.decode(&data[docids_len..])?;

    if doc_ids.len() as u64 != entry.df || tfs.len() as u64 != entry.df {
        return Err(Error::MalformedIndex(format!(
            "term {}: document frequency is {} but decoded {} document IDs and {} frequencies",
            term_id,
            entry.df,
            doc_ids.len(),
            tfs.len()
        )));
    }

    Ok(TermPostings::new(term_id, doc_ids, tfs))
}

/// Stores indices as file pairs in a folder
pub struct DiskStorage {
    folder: PathBuf,
    codec: Box<dyn PostingsCodec>,
}

impl DiskStorage {
    pub fn new(folder: &Path, codec: Box<dyn PostingsCodec>) -> Result<Self> {
        fs::create_dir_all(folder)?;
        Ok(Self {
            folder: folder.to_path_buf(),
            codec,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl IndexStorage for DiskStorage {
    fn create<'a>(&'a self, name: &str) -> Result<Box<dyn PostingsWriter + 'a>> {
        Ok(Box::new(IndexWriter::create(
            &self.folder,
            name,
            self.codec.clone(),
        )?))
    }

    fn cursor<'a>(&'a self, name: &str) -> Result<PostingsCursor<'a>> {
        Ok(Box::new(IndexCursor::open(&self.folder, name)?))
    }

    fn remove(&self, name: &str) -> Result<()> {
        for path in [
            postings_path(&self.folder, name),
            directory_path(&self.folder, name),
        ] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

//! Reads an index file pair, either by random access (query time) or as a
//! forward-only stream (merge time)

use std::{
    collections::btree_map,
    fs::File,
    io::{BufReader, ErrorKind, Read, Seek, SeekFrom},
    path::Path,
};

use log::{debug, info};

use super::{
    decode_postings, directory_path, postings_path, DocLengths, IndexInformation,
    PostingsLookup, TermEntry, TermPostings,
};
use crate::{
    base::{Len, TermId},
    compress::PostingsCodec,
    error::{Error, Result},
    utils::buffer::{open_buffer, Buffer, BufferMode},
};

/// Loads the directory (`<name>.dict`) of an index
pub fn load_information(folder: &Path, name: &str) -> Result<IndexInformation> {
    let path = directory_path(folder, name);
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "index directory {}",
            path.display()
        )));
    }
    let file = File::options().read(true).open(&path)?;
    Ok(ciborium::de::from_reader(BufReader::new(file))?)
}

/// Random access reader.
///
/// The whole directory and the document length table are loaded when
/// opening; postings are read from the buffer on demand. A reader can be
/// shared between threads.
pub struct IndexReader {
    name: String,
    information: IndexInformation,
    buffer: Box<dyn Buffer>,
}

impl IndexReader {
    pub fn open(folder: &Path, name: &str, mode: BufferMode) -> Result<Self> {
        let information = load_information(folder, name)?;
        let buffer = open_buffer(&postings_path(folder, name), mode)?;

        // Check that the directory and the postings file agree
        for (term_id, entry) in information.terms.iter() {
            let end = entry.end().ok_or_else(|| {
                Error::MalformedIndex(format!("term {}: invalid entry {}", term_id, entry))
            })?;
            if end > buffer.len() {
                return Err(Error::MalformedIndex(format!(
                    "term {}: entry {} ends after the postings file ({} bytes)",
                    term_id,
                    entry,
                    buffer.len()
                )));
            }
            if entry.df == 0 {
                return Err(Error::MalformedIndex(format!(
                    "term {} has no posting",
                    term_id
                )));
            }
        }

        info!(
            "Opened index {} ({} terms, {} documents, {:?} mode)",
            name,
            information.terms.len(),
            information.doc_lengths.count(),
            mode
        );
        Ok(Self {
            name: name.to_string(),
            information,
            buffer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &dyn PostingsCodec {
        self.information.codec.as_ref()
    }

    /// Document frequency of a term
    pub fn df(&self, term_id: TermId) -> Option<u64> {
        self.information.terms.get(&term_id).map(|e| e.df)
    }

    /// Indexed terms in increasing order
    pub fn terms(&self) -> impl Iterator<Item = TermId> + '_ {
        self.information.terms.keys().copied()
    }
}

impl PostingsLookup for IndexReader {
    fn get_postings_list(&self, term_id: TermId) -> Result<TermPostings> {
        let entry = self
            .information
            .terms
            .get(&term_id)
            .ok_or_else(|| Error::NotFound(format!("term {} in index {}", term_id, self.name)))?;

        let end = entry.end().ok_or_else(|| {
            Error::MalformedIndex(format!("term {}: invalid entry {}", term_id, entry))
        })?;
        let data = self.buffer.slice(entry.start, end)?;
        decode_postings(self.codec(), term_id, entry, &data)
    }

    fn contains_term(&self, term_id: TermId) -> bool {
        self.information.terms.contains_key(&term_id)
    }

    fn doc_lengths(&self) -> &DocLengths {
        &self.information.doc_lengths
    }
}

impl Len for IndexReader {
    fn len(&self) -> usize {
        self.information.terms.len()
    }
}

/// Forward-only, single pass iteration over the postings of an index in
/// increasing term order; only one term record is held in memory at a time.
///
/// The iteration stops after the first error.
pub struct IndexCursor {
    name: String,
    file: BufReader<File>,
    entries: btree_map::IntoIter<TermId, TermEntry>,
    codec: Box<dyn PostingsCodec>,
    position: u64,
    /// Size of the postings file
    len: u64,
    failed: bool,
}

impl IndexCursor {
    pub fn open(folder: &Path, name: &str) -> Result<Self> {
        let information = load_information(folder, name)?;
        let file = File::options()
            .read(true)
            .open(postings_path(folder, name))?;
        let len = file.metadata()?.len();

        debug!(
            "Streaming index {} ({} terms)",
            name,
            information.terms.len()
        );
        Ok(Self {
            name: name.to_string(),
            file: BufReader::new(file),
            entries: information.terms.into_iter(),
            codec: information.codec,
            position: 0,
            len,
            failed: false,
        })
    }

    fn read_term(&mut self, term_id: TermId, entry: &TermEntry) -> Result<TermPostings> {
        let end = entry.end().ok_or_else(|| {
            Error::MalformedIndex(format!("term {}: invalid entry {}", term_id, entry))
        })?;
        if end > self.len {
            return Err(Error::MalformedIndex(format!(
                "term {}: entry {} ends after the postings file ({} bytes)",
                term_id, entry, self.len
            )));
        }

        // Records are written contiguously, so seeking is the exception
        if entry.start != self.position {
            self.file.seek(SeekFrom::Start(entry.start))?;
        }

        let mut data = vec![0u8; (end - entry.start) as usize];
        self.file.read_exact(&mut data).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::MalformedIndex(format!(
                    "truncated postings for term {} in index {}",
                    term_id, self.name
                ))
            } else {
                Error::Io(e)
            }
        })?;
        self.position = end;

        decode_postings(self.codec.as_ref(), term_id, entry, &data)
    }
}

impl Iterator for IndexCursor {
    type Item = Result<TermPostings>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (term_id, entry) = self.entries.next()?;
        let result = self.read_term(term_id, &entry);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

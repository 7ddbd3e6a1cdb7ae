//! In-memory index storage, used to run the builder and the ranking
//! without touching the disk

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
};

use super::{
    AppendGuard, DocLengths, IndexStorage, PostingsCursor, PostingsLookup, PostingsWriter,
    TermPostings,
};
use crate::{
    base::{DocId, Frequency, Len, TermId},
    error::{Error, Result},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryIndex {
    postings: BTreeMap<TermId, TermPostings>,
    doc_lengths: DocLengths,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from postings, checking the writer contract
    pub fn from_postings<I>(postings: I) -> Result<Self>
    where
        I: IntoIterator<Item = TermPostings>,
    {
        let mut writer = MemoryWriter::new();
        let mut doc_lengths = DocLengths::new();
        for p in postings {
            for (doc_id, tf) in p.iter() {
                doc_lengths.add(doc_id, tf);
            }
            writer.append(p.term_id, &p.doc_ids, &p.tfs)?;
        }
        writer.set_doc_lengths(doc_lengths);
        writer.finish()?;
        Ok(writer.index)
    }

    /// Postings in increasing term order
    pub fn postings(&self) -> impl Iterator<Item = &TermPostings> {
        self.postings.values()
    }
}

impl PostingsLookup for MemoryIndex {
    fn get_postings_list(&self, term_id: TermId) -> Result<TermPostings> {
        self.postings
            .get(&term_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("term {}", term_id)))
    }

    fn contains_term(&self, term_id: TermId) -> bool {
        self.postings.contains_key(&term_id)
    }

    fn doc_lengths(&self) -> &DocLengths {
        &self.doc_lengths
    }
}

impl Len for MemoryIndex {
    fn len(&self) -> usize {
        self.postings.len()
    }
}

/// Builds a [`MemoryIndex`]
#[derive(Default)]
pub struct MemoryWriter {
    index: MemoryIndex,
    guard: AppendGuard,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_index(self) -> MemoryIndex {
        self.index
    }
}

impl PostingsWriter for MemoryWriter {
    fn append(&mut self, term_id: TermId, doc_ids: &[DocId], tfs: &[Frequency]) -> Result<()> {
        self.guard.check(term_id, doc_ids, tfs)?;
        self.index.postings.insert(
            term_id,
            TermPostings::new(term_id, doc_ids.to_vec(), tfs.to_vec()),
        );
        Ok(())
    }

    fn set_doc_lengths(&mut self, lengths: DocLengths) {
        self.index.doc_lengths = lengths;
    }

    fn finish(&mut self) -> Result<()> {
        self.guard.finish()
    }
}

/// Named in-memory indices
#[derive(Default)]
pub struct MemoryStorage {
    indices: RefCell<HashMap<String, MemoryIndex>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<MemoryIndex> {
        self.indices.borrow().get(name).cloned()
    }

    /// Names of the finished indices
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

struct StorageWriter<'a> {
    storage: &'a MemoryStorage,
    name: String,
    inner: MemoryWriter,
}

impl PostingsWriter for StorageWriter<'_> {
    fn append(&mut self, term_id: TermId, doc_ids: &[DocId], tfs: &[Frequency]) -> Result<()> {
        self.inner.append(term_id, doc_ids, tfs)
    }

    fn set_doc_lengths(&mut self, lengths: DocLengths) {
        self.inner.set_doc_lengths(lengths)
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.finish()?;
        let index = std::mem::take(&mut self.inner.index);
        self.storage
            .indices
            .borrow_mut()
            .insert(self.name.clone(), index);
        Ok(())
    }
}

impl IndexStorage for MemoryStorage {
    fn create<'a>(&'a self, name: &str) -> Result<Box<dyn PostingsWriter + 'a>> {
        Ok(Box::new(StorageWriter {
            storage: self,
            name: name.to_string(),
            inner: MemoryWriter::new(),
        }))
    }

    fn cursor<'a>(&'a self, name: &str) -> Result<PostingsCursor<'a>> {
        let index = self
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("index {}", name)))?;
        Ok(Box::new(index.postings.into_values().map(Ok)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.indices.borrow_mut().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_roundtrip() {
        let storage = MemoryStorage::new();
        {
            let mut writer = storage.create("block").unwrap();
            writer.append(0, &[1, 3], &[2, 1]).unwrap();
            writer.append(4, &[3], &[5]).unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(storage.names(), vec!["block".to_string()]);

        let terms: Vec<TermId> = storage
            .cursor("block")
            .unwrap()
            .map(|p| p.unwrap().term_id)
            .collect();
        assert_eq!(terms, vec![0, 4]);

        storage.remove("block").unwrap();
        assert!(storage.cursor("block").is_err());
    }

    #[test]
    fn test_unfinished_is_invisible() {
        let storage = MemoryStorage::new();
        {
            let mut writer = storage.create("block").unwrap();
            writer.append(0, &[1], &[1]).unwrap();
        }
        assert!(storage.get("block").is_none());
    }

    #[test]
    fn test_from_postings() {
        let index = MemoryIndex::from_postings(vec![
            TermPostings::new(0, vec![0], vec![2]),
            TermPostings::new(1, vec![0, 1], vec![1, 1]),
        ])
        .unwrap();
        assert_eq!(index.doc_lengths().get(0), Some(3));
        assert_eq!(index.doc_lengths().count(), 2);
        assert!(index.contains_term(1));
        assert!(matches!(
            index.get_postings_list(2),
            Err(Error::NotFound(_))
        ));
    }
}

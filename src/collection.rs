//! Document collections split into blocks

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::error;

use crate::error::{Error, Result};

pub struct RawDocument {
    /// Unique key of the document (returned by searches)
    pub key: String,
    pub text: String,
}

/// Iterator over the documents of a block
pub type DocumentIterator<'a> = Box<dyn Iterator<Item = Result<RawDocument>> + 'a>;

pub trait Collection {
    /// Block names, in indexing order
    fn blocks(&self) -> Result<Vec<String>>;

    /// Documents of a block; they are read lazily
    fn documents<'a>(&'a self, block: &str) -> Result<DocumentIterator<'a>>;
}

/// A directory where each sub-directory is a block and each file of a
/// block a document. Documents are keyed by `<block>/<file name>`.
pub struct DirectoryCollection {
    root: PathBuf,
}

impl DirectoryCollection {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotFound(format!(
                "collection directory {}",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn sorted_entries(path: &Path, directories: bool) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() != directories {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("non UTF-8 file name {:?}", name),
                    )))
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Collection for DirectoryCollection {
    fn blocks(&self) -> Result<Vec<String>> {
        Self::sorted_entries(&self.root, true)
    }

    fn documents<'a>(&'a self, block: &str) -> Result<DocumentIterator<'a>> {
        let block_path = self.root.join(block);
        let names = Self::sorted_entries(&block_path, false)?;
        let block = block.to_string();

        Ok(Box::new(names.into_iter().map(move |name| {
            let path = block_path.join(&name);
            let text = fs::read_to_string(&path).map_err(|e| {
                error!("Cannot read document {}: {}", path.display(), e);
                Error::Io(e)
            })?;
            Ok(RawDocument {
                key: format!("{}/{}", block, name),
                text,
            })
        })))
    }
}

/// Collection held in memory, as (block name, documents) pairs
#[derive(Default)]
pub struct MemoryCollection {
    blocks: Vec<(String, Vec<(String, String)>)>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block made of (key, text) documents
    pub fn add_block<K, T>(&mut self, name: &str, documents: Vec<(K, T)>) -> &mut Self
    where
        K: Into<String>,
        T: Into<String>,
    {
        self.blocks.push((
            name.to_string(),
            documents
                .into_iter()
                .map(|(k, t)| (k.into(), t.into()))
                .collect(),
        ));
        self
    }
}

impl Collection for MemoryCollection {
    fn blocks(&self) -> Result<Vec<String>> {
        Ok(self.blocks.iter().map(|(name, _)| name.clone()).collect())
    }

    fn documents<'a>(&'a self, block: &str) -> Result<DocumentIterator<'a>> {
        let (_, documents) = self
            .blocks
            .iter()
            .find(|(name, _)| name == block)
            .ok_or_else(|| Error::NotFound(format!("block {}", block)))?;
        Ok(Box::new(documents.iter().map(|(key, text)| {
            Ok(RawDocument {
                key: key.clone(),
                text: text.clone(),
            })
        })))
    }
}

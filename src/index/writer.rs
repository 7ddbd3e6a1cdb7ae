//! Writes an index file pair

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use super::{
    directory_path, postings_path, AppendGuard, DocLengths, IndexInformation, PostingsWriter,
    TermEntry,
};
use crate::{
    base::{temporary_path, DocId, Frequency, TermId},
    compress::{gaps, PostingsCodec},
    error::{Error, Result},
};

/// Streams postings to `<name>.index` and writes the directory on
/// [`finish`](PostingsWriter::finish).
///
/// Both files are written under a temporary name and renamed into place when
/// finishing, so an existing index with the same name is only replaced by a
/// complete one. Dropping an unfinished writer removes the temporary files.
pub struct IndexWriter {
    name: String,
    postings_path: PathBuf,
    directory_path: PathBuf,
    postings_file: Option<BufWriter<File>>,
    position: u64,
    information: IndexInformation,
    guard: AppendGuard,
}

impl IndexWriter {
    pub fn create(folder: &Path, name: &str, codec: Box<dyn PostingsCodec>) -> Result<Self> {
        let postings_path = postings_path(folder, name);
        let postings_file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temporary_path(&postings_path))?;

        debug!("Creating index {} ({} codec)", name, codec.name());
        Ok(Self {
            name: name.to_string(),
            directory_path: directory_path(folder, name),
            postings_path,
            postings_file: Some(BufWriter::new(postings_file)),
            position: 0,
            information: IndexInformation::new(codec),
            guard: AppendGuard::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of terms written so far
    pub fn term_count(&self) -> usize {
        self.information.terms.len()
    }
}

impl PostingsWriter for IndexWriter {
    fn append(&mut self, term_id: TermId, doc_ids: &[DocId], tfs: &[Frequency]) -> Result<()> {
        self.guard.check(term_id, doc_ids, tfs)?;

        let codec = &self.information.codec;
        let encoded_docids = codec.encode(&gaps(doc_ids)?);
        let encoded_tfs = codec.encode(tfs);

        let entry = TermEntry {
            start: self.position,
            docids_len: encoded_docids.len() as u64,
            tfs_len: encoded_tfs.len() as u64,
            df: doc_ids.len() as u64,
        };

        let file = self.postings_file.as_mut().ok_or_else(|| {
            Error::OrderingViolation(format!("index {} is closed", self.name))
        })?;
        file.write_all(&encoded_docids)?;
        file.write_all(&encoded_tfs)?;
        self.position += entry.docids_len + entry.tfs_len;

        debug!("[{}] term {} -> {}", self.name, term_id, entry);
        self.information.terms.insert(term_id, entry);
        Ok(())
    }

    fn set_doc_lengths(&mut self, lengths: DocLengths) {
        self.information.doc_lengths = lengths;
    }

    fn finish(&mut self) -> Result<()> {
        if self.guard.is_finished() {
            return Err(Error::OrderingViolation(format!(
                "index {} already finished",
                self.name
            )));
        }

        if let Some(mut file) = self.postings_file.take() {
            file.flush()?;
        }

        // Both files are complete before either replaces a previous index
        let directory_tmp = temporary_path(&self.directory_path);
        {
            let mut writer = BufWriter::new(File::create(&directory_tmp)?);
            ciborium::ser::into_writer(&self.information, &mut writer)?;
            writer.flush()?;
        }
        fs::rename(temporary_path(&self.postings_path), &self.postings_path)?;
        fs::rename(&directory_tmp, &self.directory_path)?;
        self.guard.finish()?;

        info!(
            "Index {} written: {} terms, {} documents, {} bytes of postings",
            self.name,
            self.information.terms.len(),
            self.information.doc_lengths.count(),
            self.position
        );
        Ok(())
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.guard.is_finished() {
            // Close the handle before removing the file
            self.postings_file = None;
            for path in [&self.postings_path, &self.directory_path] {
                let tmp_path = temporary_path(path);
                if tmp_path.is_file() {
                    warn!(
                        "Index {} was not finished, discarding {}",
                        self.name,
                        tmp_path.display()
                    );
                    let _ = fs::remove_file(tmp_path);
                }
            }
        }
    }
}

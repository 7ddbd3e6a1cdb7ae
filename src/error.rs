//! Error types shared by the index store, the builder and the search engine

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An identifier, a term or an index file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The directory and the postings file disagree (index must be rebuilt)
    #[error("Malformed index: {0}")]
    MalformedIndex(String),

    /// File open/read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Out of sequence term IDs, unsorted document IDs, or a document
    /// spread over two blocks
    #[error("Ordering violation: {0}")]
    OrderingViolation(String),

    /// CBOR (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl<T: std::fmt::Debug> From<ciborium::ser::Error<T>> for Error {
    fn from(e: ciborium::ser::Error<T>) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl<T: std::fmt::Debug> From<ciborium::de::Error<T>> for Error {
    fn from(e: ciborium::de::Error<T>) -> Self {
        Error::Serialization(e.to_string())
    }
}

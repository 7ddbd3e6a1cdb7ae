//! Blocked sort-based indexing (BSBI) of a document collection into a
//! compressed on-disk inverted index, and ranked retrieval (TF-IDF, BM25)
//! over the resulting index.

pub mod base;
pub mod builder;
pub mod collection;
pub mod compress;
pub mod error;
pub mod idmap;
pub mod index;
pub mod normalize;
pub mod search;
pub mod server;

pub mod utils {
    pub mod buffer;
}

pub use error::{Error, Result};

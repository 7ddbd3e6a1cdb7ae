//! Methods for compressing the posting lists
//!
//! A codec turns a sequence of non-negative integers into bytes and back.
//! Document IDs are gap-encoded before being handed to the codec (see
//! [`gaps`] and [`prefix_sum`]); term frequencies are encoded as is.

use std::fmt;

use crate::{
    base::DocId,
    error::{Error, Result},
};

pub mod standard;
pub mod vbyte;

pub use standard::StandardCodec;
pub use vbyte::VByteCodec;

#[typetag::serde(tag = "type")]
pub trait PostingsCodec: Send + Sync {
    fn encode(&self, values: &[u64]) -> Vec<u8>;

    fn decode(&self, data: &[u8]) -> Result<Vec<u64>>;

    /// Short name used in logs and on the command line
    fn name(&self) -> &'static str;

    fn clone_box(&self) -> Box<dyn PostingsCodec>;
}

impl Clone for Box<dyn PostingsCodec> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn PostingsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostingsCodec({})", self.name())
    }
}

/// Returns the codec registered under `name`
pub fn codec_by_name(name: &str) -> Option<Box<dyn PostingsCodec>> {
    match name {
        "standard" => Some(Box::new(StandardCodec {})),
        "vbyte" => Some(Box::new(VByteCodec {})),
        _ => None,
    }
}

/// Turns a strictly ascending list of document IDs into gaps (the first
/// value is kept as is)
pub fn gaps(doc_ids: &[DocId]) -> Result<Vec<u64>> {
    let mut out = Vec::with_capacity(doc_ids.len());
    let mut previous: Option<DocId> = None;
    for &doc_id in doc_ids {
        match previous {
            None => out.push(doc_id),
            Some(p) if doc_id > p => out.push(doc_id - p),
            Some(p) => {
                return Err(Error::OrderingViolation(format!(
                    "document IDs should be strictly increasing: {} after {}",
                    doc_id, p
                )))
            }
        }
        previous = Some(doc_id);
    }
    Ok(out)
}

/// Inverse of [`gaps`]
pub fn prefix_sum(gaps: &[u64]) -> Result<Vec<DocId>> {
    let mut out = Vec::with_capacity(gaps.len());
    let mut current: DocId = 0;
    for (ix, &gap) in gaps.iter().enumerate() {
        if ix > 0 && gap == 0 {
            return Err(Error::MalformedIndex(
                "null gap in a document ID list".to_string(),
            ));
        }
        current = current
            .checked_add(gap)
            .ok_or_else(|| Error::MalformedIndex("document ID overflow".to_string()))?;
        out.push(current);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaps() {
        assert_eq!(gaps(&[3, 4, 10, 200]).unwrap(), vec![3, 1, 6, 190]);
        assert_eq!(prefix_sum(&[3, 1, 6, 190]).unwrap(), vec![3, 4, 10, 200]);
        assert!(gaps(&[]).unwrap().is_empty());
        assert_eq!(gaps(&[0]).unwrap(), vec![0]);
    }

    #[test]
    fn test_gaps_reject_unsorted() {
        assert!(matches!(gaps(&[3, 3]), Err(Error::OrderingViolation(_))));
        assert!(matches!(gaps(&[5, 2]), Err(Error::OrderingViolation(_))));
    }

    #[test]
    fn test_prefix_sum_overflow() {
        assert!(matches!(
            prefix_sum(&[u64::MAX, 1]),
            Err(Error::MalformedIndex(_))
        ));
    }

    #[test]
    fn test_codec_by_name() {
        assert_eq!(codec_by_name("vbyte").unwrap().name(), "vbyte");
        assert_eq!(codec_by_name("standard").unwrap().name(), "standard");
        assert!(codec_by_name("gamma").is_none());
    }
}

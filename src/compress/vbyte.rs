//! Variable-byte codec
//!
//! Each value is split in 7-bit groups, least significant group first. The
//! high bit of a byte is set when more groups of the same value follow.

use serde::{Deserialize, Serialize};

use super::PostingsCodec;
use crate::error::{Error, Result};

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7F;

#[derive(Serialize, Deserialize, Clone, Copy, Default)]
pub struct VByteCodec {}

/// Appends the variable-byte representation of `value` to `out`
pub fn encode_vbyte(mut value: u64, out: &mut Vec<u8>) {
    while value >= CONTINUATION as u64 {
        out.push((value as u8 & PAYLOAD) | CONTINUATION);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads one value starting at `*pos` and moves `pos` past it
pub fn decode_vbyte(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| Error::MalformedIndex("unexpected end of vbyte".to_string()))?;
        *pos += 1;

        let group = (byte & PAYLOAD) as u64;
        if shift >= 64 || (shift == 63 && group > 1) {
            return Err(Error::MalformedIndex("vbyte value overflow".to_string()));
        }
        value |= group << shift;

        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

#[typetag::serde]
impl PostingsCodec for VByteCodec {
    fn encode(&self, values: &[u64]) -> Vec<u8> {
        let mut out = Vec::with_capacity(values.len());
        for &x in values {
            encode_vbyte(x, &mut out);
        }
        out
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u64>> {
        let mut pos = 0;
        let mut out = Vec::new();
        while pos < data.len() {
            out.push(decode_vbyte(data, &mut pos)?);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "vbyte"
    }

    fn clone_box(&self) -> Box<dyn PostingsCodec> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vbyte_layout() {
        let codec = VByteCodec {};
        assert_eq!(codec.encode(&[0]), vec![0x00]);
        assert_eq!(codec.encode(&[127]), vec![0x7F]);
        // 128 = 0b1_0000000: low group 0 with continuation, then 1
        assert_eq!(codec.encode(&[128]), vec![0x80, 0x01]);
        assert_eq!(codec.encode(&[300]), vec![0xAC, 0x02]);
        assert_eq!(codec.encode(&[u64::MAX]).len(), 10);
    }

    #[test]
    fn test_vbyte_decode() {
        let codec = VByteCodec {};
        let values = vec![0, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX];
        assert_eq!(codec.decode(&codec.encode(&values)).unwrap(), values);
    }

    #[test]
    fn test_vbyte_truncated() {
        let codec = VByteCodec {};
        assert!(matches!(
            codec.decode(&[0x80, 0x80]),
            Err(Error::MalformedIndex(_))
        ));
    }

    #[test]
    fn test_vbyte_overflow() {
        let codec = VByteCodec {};
        let mut data = vec![0xFF; 10];
        data.push(0x01);
        assert!(matches!(codec.decode(&data), Err(Error::MalformedIndex(_))));
    }
}

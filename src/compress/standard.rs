//! Fixed-width codec: every value takes 8 bytes (big endian)

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::PostingsCodec;
use crate::error::{Error, Result};

const WIDTH: usize = std::mem::size_of::<u64>();

#[derive(Serialize, Deserialize, Clone, Copy, Default)]
pub struct StandardCodec {}

#[typetag::serde]
impl PostingsCodec for StandardCodec {
    fn encode(&self, values: &[u64]) -> Vec<u8> {
        let mut out = Vec::with_capacity(values.len() * WIDTH);
        for &x in values {
            // Writing into a vector cannot fail
            let _ = out.write_u64::<BigEndian>(x);
        }
        out
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u64>> {
        if data.len() % WIDTH != 0 {
            return Err(Error::MalformedIndex(format!(
                "fixed-width block of {} bytes is not a multiple of {}",
                data.len(),
                WIDTH
            )));
        }

        let mut view = data;
        let mut out = Vec::with_capacity(data.len() / WIDTH);
        while !view.is_empty() {
            out.push(view.read_u64::<BigEndian>()?);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "standard"
    }

    fn clone_box(&self) -> Box<dyn PostingsCodec> {
        Box::new(*self)
    }
}

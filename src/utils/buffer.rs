use memmap2::{Mmap, MmapOptions};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Random access to the bytes of a postings file
pub trait Buffer: Send + Sync {
    /// Total number of bytes
    fn len(&self) -> u64;

    /// Returns exactly the bytes in `start..end`
    fn slice(&'_ self, start: u64, end: u64) -> Result<Cow<'_, [u8]>>;
}

/// How a reader accesses its postings file
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BufferMode {
    /// Seek and read on each access
    #[default]
    File,
    /// Memory map the file
    Mmap,
    /// Load the whole file in memory
    Memory,
}

pub fn open_buffer(path: &Path, mode: BufferMode) -> Result<Box<dyn Buffer>> {
    Ok(match mode {
        BufferMode::File => Box::new(FileBuffer::new(path)?),
        BufferMode::Mmap => Box::new(MmapBuffer::new(path)?),
        BufferMode::Memory => Box::new(MemoryBuffer::new(path)?),
    })
}

fn check_range(start: u64, end: u64, len: u64) -> Result<()> {
    if start > end || end > len {
        return Err(Error::MalformedIndex(format!(
            "range {}..{} outside of the postings file ({} bytes)",
            start, end, len
        )));
    }
    Ok(())
}

/// Seeks and reads the file; the handle is shared between threads
pub struct FileBuffer {
    file: Mutex<File>,
    len: u64,
}

impl FileBuffer {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::options().read(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl Buffer for FileBuffer {
    fn len(&self) -> u64 {
        self.len
    }

    fn slice(&'_ self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        check_range(start, end, self.len)?;
        let mut data = vec![0u8; (end - start) as usize];
        let mut file = self
            .file
            .lock()
            .map_err(|_| Error::MalformedIndex("postings file lock poisoned".to_string()))?;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut data)?;
        Ok(Cow::Owned(data))
    }
}

/// Stores the data in memory
pub struct MemoryBuffer {
    data: Vec<u8>,
}

impl MemoryBuffer {
    pub fn new(path: &Path) -> Result<Self> {
        let mut file = File::options().read(true).open(path)?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Ok(Self { data })
    }
}

impl Buffer for MemoryBuffer {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn slice(&'_ self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        check_range(start, end, self.len())?;
        Ok(Cow::Borrowed(&self.data[start as usize..end as usize]))
    }
}

/// Uses a memory map
pub struct MmapBuffer {
    // Empty files cannot be mapped
    mmap: Option<Mmap>,
}

impl MmapBuffer {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::options().read(true).open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self { mmap: None });
        }
        // The index files are never modified once written
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self { mmap: Some(mmap) })
    }
}

impl Buffer for MmapBuffer {
    fn len(&self) -> u64 {
        self.mmap.as_ref().map_or(0, |m| m.len() as u64)
    }

    fn slice(&'_ self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        check_range(start, end, self.len())?;
        match &self.mmap {
            Some(mmap) => Ok(Cow::Borrowed(&mmap[start as usize..end as usize])),
            None => Ok(Cow::Borrowed(&[])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use temp_dir::TempDir;

    #[test]
    fn test_buffers_agree() {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let path = dir.path().join("data.bin");
        let bytes: Vec<u8> = (0..=255).collect();
        File::create(&path).unwrap().write_all(&bytes).unwrap();

        for mode in [BufferMode::File, BufferMode::Mmap, BufferMode::Memory] {
            let buffer = open_buffer(&path, mode).unwrap();
            assert_eq!(buffer.len(), 256);
            assert_eq!(&*buffer.slice(10, 14).unwrap(), &[10, 11, 12, 13]);
            assert!(buffer.slice(250, 257).is_err());
        }
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        for mode in [BufferMode::File, BufferMode::Mmap, BufferMode::Memory] {
            let buffer = open_buffer(&path, mode).unwrap();
            assert_eq!(buffer.len(), 0);
            assert!(buffer.slice(0, 0).unwrap().is_empty());
        }
    }
}

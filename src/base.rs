pub type TermId = u64;
pub type DocId = u64;
pub type Frequency = u64;
pub type Score = f64;
pub type BoxResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Marks object that have a length
pub trait Len {
    fn len(&self) -> usize;
}

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    normalize::NormalizerConfig,
};

pub const MANIFEST_CBOR: &str = "index.cbor";
pub const TERMS_DICT: &str = "terms.dict";
pub const DOCS_DICT: &str = "docs.dict";
pub const MAIN_INDEX: &str = "main_index";

/// What a finished build leaves behind, so that a search process
/// can reopen the index and normalize queries the same way
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IndexManifest {
    pub index_name: String,
    pub normalizer: NormalizerConfig,
    pub documents: u64,
    pub terms: u64,
}

pub fn save_manifest(manifest: &IndexManifest, folder: &Path) -> Result<()> {
    write_atomically(&folder.join(MANIFEST_CBOR), |writer| {
        ciborium::ser::into_writer(manifest, writer)?;
        Ok(())
    })
}

pub fn load_manifest(folder: &Path) -> Result<IndexManifest> {
    let path = folder.join(MANIFEST_CBOR);
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "no index manifest in {}",
            folder.display()
        )));
    }
    let file = File::open(path)?;
    Ok(ciborium::de::from_reader(std::io::BufReader::new(file))?)
}

/// Path of the temporary file a writer fills before renaming it to `path`
pub fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes a file through a temporary sibling which replaces `path` only
/// once `fill` succeeded
pub fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp_path = temporary_path(path);
    let outcome: Result<()> = (|| {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        fill(&mut writer)?;
        writer.flush()?;
        Ok(())
    })();

    match outcome {
        Ok(()) => {
            fs::rename(&tmp_path, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

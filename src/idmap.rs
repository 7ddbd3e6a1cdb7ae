//! Bidirectional registry between strings (terms, document keys) and
//! dense integer identifiers

use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    base::{write_atomically, Len},
    error::{Error, Result},
};

/// Identifiers are allocated in first-seen order, starting at 0, and are
/// never reused nor reordered.
///
/// Only the ordered key list is serialized: the key to identifier map is
/// rebuilt on load, which keeps both directions consistent by construction.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IdMap {
    keys: Vec<String>,
    ids: HashMap<String, u64>,
}

impl From<Vec<String>> for IdMap {
    fn from(keys: Vec<String>) -> Self {
        let ids = keys
            .iter()
            .enumerate()
            .map(|(id, key)| (key.clone(), id as u64))
            .collect();
        Self { keys, ids }
    }
}

impl From<IdMap> for Vec<String> {
    fn from(map: IdMap) -> Self {
        map.keys
    }
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier of `key`, allocating the next one if the key
    /// was never seen
    pub fn id_of(&mut self, key: &str) -> u64 {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.keys.len() as u64;
        self.keys.push(key.to_string());
        self.ids.insert(key.to_string(), id);
        id
    }

    /// Looks up an identifier without allocating one
    pub fn get(&self, key: &str) -> Option<u64> {
        self.ids.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ids.contains_key(key)
    }

    pub fn key_of(&self, id: u64) -> Result<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|ix| self.keys.get(ix))
            .map(String::as_str)
            .ok_or_else(|| Error::NotFound(format!("identifier {}", id)))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in identifier order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, |writer| {
            ciborium::ser::into_writer(self, writer)?;
            Ok(())
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "identifier map {}",
                path.display()
            )));
        }
        let file = File::open(path)?;
        Ok(ciborium::de::from_reader(BufReader::new(file))?)
    }
}

impl Len for IdMap {
    fn len(&self) -> usize {
        self.keys.len()
    }
}

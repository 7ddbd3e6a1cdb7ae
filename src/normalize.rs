//! Text normalization: the same function turns documents (at build time)
//! and queries (at search time) into tokens

use std::collections::HashSet;

use derivative::Derivative;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

pub trait Normalizer: Send + Sync {
    /// Deterministic mapping from raw text to an ordered list of tokens
    fn normalize(&self, text: &str) -> Vec<String>;
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StemmerLanguage {
    English,
    French,
    German,
    Spanish,
}

impl From<StemmerLanguage> for Algorithm {
    fn from(language: StemmerLanguage) -> Self {
        match language {
            StemmerLanguage::English => Algorithm::English,
            StemmerLanguage::French => Algorithm::French,
            StemmerLanguage::German => Algorithm::German,
            StemmerLanguage::Spanish => Algorithm::Spanish,
        }
    }
}

#[derive(Derivative, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[derivative(Default)]
pub struct NormalizerConfig {
    #[derivative(Default(value = "true"))]
    pub lowercase: bool,

    /// Stemming algorithm (none by default)
    pub stemmer: Option<StemmerLanguage>,

    /// Tokens removed after lowercasing, before stemming
    pub stopwords: Vec<String>,

    /// Shorter tokens are dropped
    #[derivative(Default(value = "1"))]
    pub min_token_length: usize,
}

/// Splits on Unicode word boundaries, then lowercases, filters and stems
pub struct TextNormalizer {
    config: NormalizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl TextNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        let stopwords = config
            .stopwords
            .iter()
            .map(|s| {
                if config.lowercase {
                    s.to_lowercase()
                } else {
                    s.clone()
                }
            })
            .collect();
        Self {
            config: config.clone(),
            stemmer: config.stemmer.map(|l| Stemmer::create(l.into())),
            stopwords,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl Normalizer for TextNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| {
                if self.config.lowercase {
                    word.to_lowercase()
                } else {
                    word.to_string()
                }
            })
            .filter(|token| {
                token.chars().count() >= self.config.min_token_length
                    && !self.stopwords.contains(token)
            })
            .map(|token| match &self.stemmer {
                Some(stemmer) => stemmer.stem(&token).into_owned(),
                None => token,
            })
            .collect()
    }
}

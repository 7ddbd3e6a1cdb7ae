use rand::{rngs::StdRng, RngCore, SeedableRng};
use rand_distr::{Distribution, Poisson, Zipf};

use bsbi_index::collection::MemoryCollection;

pub struct TestDocument {
    pub key: String,
    pub tokens: Vec<String>,
}

impl TestDocument {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Term `ix` of the vocabulary (already normalized)
pub fn term(ix: u64) -> String {
    format!("t{}", ix)
}

/// Draws `1 + Poisson(lambda_words)` tokens, with a Zipf distribution over
/// the vocabulary so that frequent terms repeat within documents
pub fn create_document(
    key: String,
    lambda_words: f32,
    vocabulary_size: u64,
    rng: &mut dyn RngCore,
) -> TestDocument {
    let poi = Poisson::new(lambda_words).unwrap();
    let zipf = Zipf::new(vocabulary_size, 1.1f32).unwrap();
    let num_words = 1 + poi.sample(rng) as usize;

    let tokens = (0..num_words)
        .map(|_| term(zipf.sample(rng) as u64 - 1))
        .collect();

    TestDocument { key, tokens }
}

pub struct TestCollection {
    pub collection: MemoryCollection,

    /// Documents in indexing order
    pub documents: Vec<TestDocument>,
    pub blocks: usize,
}

impl TestCollection {
    pub fn new(
        blocks: usize,
        documents_per_block: usize,
        vocabulary_size: u64,
        lambda_words: f32,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let mut collection = MemoryCollection::new();
        let mut documents = Vec::new();
        for block in 0..blocks {
            let block_name = format!("{:03}", block);
            let block_documents: Vec<TestDocument> = (0..documents_per_block)
                .map(|ix| {
                    create_document(
                        format!("{}/doc-{}", block_name, ix),
                        lambda_words,
                        vocabulary_size,
                        &mut rng,
                    )
                })
                .collect();

            collection.add_block(
                &block_name,
                block_documents.iter().map(|d| (d.key.clone(), d.text())).collect(),
            );
            documents.extend(block_documents);
        }

        Self {
            collection,
            documents,
            blocks,
        }
    }

    /// The same documents in a single block
    pub fn single_block(&self) -> MemoryCollection {
        let mut collection = MemoryCollection::new();
        collection.add_block(
            "all",
            self.documents.iter().map(|d| (d.key.clone(), d.text())).collect(),
        );
        collection
    }
}

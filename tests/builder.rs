use std::fs;

use bsbi_index::{
    base::{load_manifest, Len, DOCS_DICT, MAIN_INDEX, TERMS_DICT},
    builder::{build_on_disk, BsbiIndexer, BuildPhase, BuilderOptions},
    collection::{Collection, DirectoryCollection, MemoryCollection},
    compress::codec_by_name,
    error::Error,
    idmap::IdMap,
    index::{IndexReader, IndexStorage, MemoryIndex, MemoryStorage, PostingsLookup},
    normalize::{NormalizerConfig, TextNormalizer},
    utils::buffer::BufferMode,
};
use helpers::{
    documents::TestCollection,
    index::{expected_postings, TestIndex},
};
use log::info;
use rstest::rstest;
use temp_dir::TempDir;

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build_in_memory(collection: &dyn Collection, options: BuilderOptions) -> (BsbiIndexer, MemoryStorage) {
    let storage = MemoryStorage::new();
    let mut indexer = BsbiIndexer::new(Box::new(TextNormalizer::default()), options);
    indexer
        .index(collection, &storage)
        .expect("Error while building the index");
    (indexer, storage)
}

/// Checks an index against postings computed from the raw documents
fn check_postings(
    index: &dyn PostingsLookup,
    term_ids: &IdMap,
    doc_ids: &IdMap,
    data: &TestCollection,
) {
    let expected = expected_postings(&data.documents);
    assert_eq!(term_ids.len(), expected.len());

    for (term, postings) in expected.iter() {
        let term_id = term_ids.get(term).expect("term should be indexed");
        let observed = index.get_postings_list(term_id).unwrap();
        let observed: Vec<(String, u64)> = observed
            .iter()
            .map(|(doc_id, tf)| (doc_ids.key_of(doc_id).unwrap().to_string(), tf))
            .collect();
        assert_eq!(&observed, postings, "Postings differ for term {}", term);
    }
}

#[rstest]
fn test_blocks_do_not_change_the_index(#[values(1, 2, 7)] blocks: usize, #[values(1., 30.)] lambda: f32) {
    init_logger();
    let data = TestCollection::new(blocks, 15, 200, lambda, Some(blocks as u64));

    let (indexer, storage) = build_in_memory(&data.collection, BuilderOptions::default());
    assert_eq!(indexer.phase(), BuildPhase::Done);
    let index = storage.get(MAIN_INDEX).unwrap();
    check_postings(&index, indexer.term_ids(), indexer.doc_ids(), &data);

    let (_, single_storage) = build_in_memory(&data.single_block(), BuilderOptions::default());
    let single: MemoryIndex = single_storage.get(MAIN_INDEX).unwrap();
    assert_eq!(index, single);

    let total: usize = data.documents.iter().map(|d| d.tokens.len()).sum();
    assert_eq!(index.doc_lengths().total(), total as u64);
    assert_eq!(index.doc_lengths().count(), data.documents.len());
}

#[rstest]
fn test_on_disk(#[values("standard", "vbyte")] codec: &str) {
    init_logger();
    let data = TestCollection::new(4, 25, 500, 10., Some(42));
    let options = BuilderOptions {
        codec: codec_by_name(codec).unwrap(),
        ..Default::default()
    };
    let index = TestIndex::new(data, &options);
    info!("Index built in {}", index.dir.path().display());
    assert_eq!(index.summary.blocks, 4);
    assert_eq!(index.summary.documents, 100);

    let term_ids = IdMap::load(&index.dir.path().join(TERMS_DICT)).unwrap();
    let doc_ids = IdMap::load(&index.dir.path().join(DOCS_DICT)).unwrap();
    let reader = IndexReader::open(index.dir.path(), MAIN_INDEX, BufferMode::Mmap).unwrap();
    check_postings(&reader, &term_ids, &doc_ids, &index.data);

    let manifest = load_manifest(index.dir.path()).unwrap();
    assert_eq!(manifest.index_name, MAIN_INDEX);
    assert_eq!(manifest.documents, 100);
    assert_eq!(manifest.terms, term_ids.len() as u64);
    assert_eq!(manifest.normalizer, NormalizerConfig::default());

    // Only the final index remains
    let mut files: Vec<String> = fs::read_dir(index.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec!["docs.dict", "index.cbor", "main_index.dict", "main_index.index", "terms.dict"]
    );
}

#[test]
fn test_keep_intermediate() {
    let data = TestCollection::new(3, 5, 50, 5., Some(1));
    let options = BuilderOptions {
        keep_intermediate: true,
        ..Default::default()
    };
    let (indexer, storage) = build_in_memory(&data.collection, options);
    assert_eq!(
        indexer.intermediate_indices(),
        &[
            "intermediate_index_000",
            "intermediate_index_001",
            "intermediate_index_002"
        ]
    );
    assert_eq!(storage.names().len(), 4);

    let (_, storage) = build_in_memory(&data.collection, BuilderOptions::default());
    assert_eq!(storage.names(), vec![MAIN_INDEX.to_string()]);
}

#[test]
fn test_document_in_two_blocks() {
    let mut collection = MemoryCollection::new();
    collection
        .add_block("0", vec![("a", "cat dog")])
        .add_block("1", vec![("b", "dog"), ("a", "cat")]);

    let storage = MemoryStorage::new();
    let mut indexer = BsbiIndexer::new(Box::new(TextNormalizer::default()), BuilderOptions::default());
    assert!(matches!(
        indexer.index(&collection, &storage),
        Err(Error::OrderingViolation(_))
    ));
    assert!(storage.get(MAIN_INDEX).is_none());
}

#[test]
fn test_indexer_is_single_use() {
    let mut collection = MemoryCollection::new();
    collection.add_block("0", vec![("a", "cat")]);

    let storage = MemoryStorage::new();
    let mut indexer = BsbiIndexer::new(Box::new(TextNormalizer::default()), BuilderOptions::default());
    indexer.index(&collection, &storage).unwrap();
    assert!(indexer.index(&collection, &storage).is_err());
}

#[test]
fn test_empty_documents() {
    let mut collection = MemoryCollection::new();
    collection.add_block("0", vec![("empty", "..."), ("full", "cat cat")]);

    let (indexer, storage) = build_in_memory(&collection, BuilderOptions::default());
    let index = storage.get(MAIN_INDEX).unwrap();

    // The empty document has an ID but no length
    assert_eq!(indexer.doc_ids().len(), 2);
    assert_eq!(index.doc_lengths().count(), 1);
    assert_eq!(index.doc_lengths().get(1), Some(2));
    assert_eq!(storage.cursor(MAIN_INDEX).unwrap().count(), 1);
}

#[test]
fn test_directory_collection() {
    init_logger();
    let source = TempDir::new().expect("Could not create temporary directory");
    for (block, file, text) in [
        ("b0", "x.txt", "the cat sat"),
        ("b0", "y.txt", "the dog"),
        ("b1", "z.txt", "a cat and a dog"),
    ] {
        let block_dir = source.path().join(block);
        fs::create_dir_all(&block_dir).unwrap();
        fs::write(block_dir.join(file), text).unwrap();
    }

    let output = TempDir::new().expect("Could not create temporary directory");
    let collection = DirectoryCollection::new(source.path()).unwrap();
    let summary = build_on_disk(
        &collection,
        output.path(),
        &BuilderOptions::default(),
        &NormalizerConfig::default(),
    )
    .unwrap();
    assert_eq!(summary.blocks, 2);
    assert_eq!(summary.documents, 3);

    let doc_ids = IdMap::load(&output.path().join(DOCS_DICT)).unwrap();
    assert_eq!(
        doc_ids.keys().collect::<Vec<_>>(),
        vec!["b0/x.txt", "b0/y.txt", "b1/z.txt"]
    );

    let term_ids = IdMap::load(&output.path().join(TERMS_DICT)).unwrap();
    let reader = IndexReader::open(output.path(), MAIN_INDEX, BufferMode::File).unwrap();
    let cat = reader
        .get_postings_list(term_ids.get("cat").unwrap())
        .unwrap();
    assert_eq!(cat.doc_ids, vec![0, 2]);
    let a = reader.get_postings_list(term_ids.get("a").unwrap()).unwrap();
    assert_eq!(a.tfs, vec![2]);
}

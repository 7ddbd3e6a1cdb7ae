use criterion::{criterion_group, criterion_main, Criterion};

use bsbi_index::{
    builder::BuilderOptions,
    search::{Scoring, SearchEngine},
    utils::buffer::BufferMode,
};
use helpers::{documents::TestCollection, index::TestIndex};

fn criterion_benchmark(c: &mut Criterion) {
    // 10 blocks of 1000 documents
    let data = TestCollection::new(10, 1_000, 5_000, 50., None);
    let index = TestIndex::new(data, &BuilderOptions::default());

    let query = "t0 t5 t42 t1000";
    for mode in [BufferMode::File, BufferMode::Mmap] {
        let engine =
            SearchEngine::open(index.dir.path(), mode).expect("Error while opening the index");

        c.bench_function(&format!("tfidf-{:?}", mode), |b| {
            b.iter(|| engine.retrieve(query, 10, &Scoring::TfIdf))
        });
        c.bench_function(&format!("bm25-{:?}", mode), |b| {
            b.iter(|| engine.retrieve(query, 10, &Scoring::bm25()))
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(100);
    targets = criterion_benchmark
}
criterion_main!(benches);

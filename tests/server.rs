use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bsbi_index::{
    builder::{BsbiIndexer, BuilderOptions},
    collection::MemoryCollection,
    index::MemoryStorage,
    normalize::TextNormalizer,
    search::SearchEngine,
    server::create_router,
};
use tower::ServiceExt;

fn router() -> Router {
    let mut collection = MemoryCollection::new();
    collection
        .add_block("0", vec![("doc1", "cat dog cat")])
        .add_block("1", vec![("doc2", "dog bird"), ("doc3", "bird bird cat")]);

    let storage = MemoryStorage::new();
    let options = BuilderOptions::default();
    let index_name = options.index_name.clone();
    let mut indexer = BsbiIndexer::new(Box::new(TextNormalizer::default()), options);
    indexer.index(&collection, &storage).unwrap();
    let (term_ids, doc_ids) = indexer.into_id_maps();

    let engine = SearchEngine::new(
        Box::new(storage.get(&index_name).unwrap()),
        term_ids,
        doc_ids,
        Box::new(TextNormalizer::default()),
    );
    create_router(Arc::new(engine))
}

async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
}

#[tokio::test]
async fn test_search() {
    let (status, body) = get("/search?q=cat").await;
    assert_eq!(status, StatusCode::OK);
    // tf(doc1) = 2, tf(doc3) = 1
    assert_eq!(body, serde_json::json!(["doc1", "doc3"]));

    let (_, body) = get("/search?q=cat&k=1").await;
    assert_eq!(body, serde_json::json!(["doc1"]));

    let (_, body) = get("/search?q=bird&mode=bm25").await;
    assert_eq!(body, serde_json::json!(["doc3", "doc2"]));
}

#[tokio::test]
async fn test_unknown_terms() {
    let (status, body) = get("/search?q=zebra").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_bad_requests() {
    let (status, body) = get("/search?q=cat&mode=lucene").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = get("/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_welcome() {
    let response = router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

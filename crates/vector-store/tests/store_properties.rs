use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rag_vector_store::{
    EmbeddingError, EmbeddingProvider, Metadata, MetadataFilter, SearchOptions, VectorStore,
    VectorStoreError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn meta(value: Value) -> Metadata {
    value.as_object().cloned().unwrap_or_default()
}

/// Hands out a fixed batch of vectors and counts calls.
struct FixedEmbeddings {
    batch: Vec<Vec<f32>>,
    batch_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl FixedEmbeddings {
    fn new(batch: Vec<Vec<f32>>) -> Arc<Self> {
        Arc::new(Self {
            batch,
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.single_calls.fetch_add(1, Ordering::Relaxed);
        self.batch
            .first()
            .cloned()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.batch.clone())
    }
}

struct FailingEmbeddings;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddings {
    async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Api {
            status: 429,
            body: "rate limited".to_string(),
        })
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Request("connection reset".to_string()))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn reinsert_overwrites_vector_and_keeps_metadata_unless_given() {
    let mut store = VectorStore::new();
    store.insert("a", vec![1.0, 0.0, 0.0], Some(meta(json!({"v": 1}))));
    store.insert("a", vec![0.0, 1.0, 0.0], None);

    assert_eq!(store.len(), 1);
    assert_eq!(store.get_vector("a"), Some(&[0.0, 1.0, 0.0][..]));
    assert_eq!(store.get_metadata("a"), meta(json!({"v": 1})));

    store.insert("a", vec![0.0, 0.0, 1.0], Some(meta(json!({"v": 2}))));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get_metadata("a"), meta(json!({"v": 2})));
}

#[test]
fn search_ranks_by_cosine_descending() {
    let mut store = VectorStore::new();
    store.insert("x", vec![1.0, 0.0], None);
    store.insert("y", vec![0.0, 1.0], None);
    store.insert("z", vec![0.7, 0.7], None);

    let hits = store.search(&[1.0, 0.0], 2, &SearchOptions::default());
    let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
    assert_eq!(keys, vec!["x", "z"]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - 0.707_106_8).abs() < 1e-4);
}

#[test]
fn k_zero_and_k_beyond_len() {
    let mut store = VectorStore::new();
    store.insert("x", vec![1.0, 0.0], None);
    store.insert("y", vec![0.0, 1.0], None);
    store.insert("z", vec![0.7, 0.7], None);

    assert!(store.search(&[1.0, 0.0], 0, &SearchOptions::default()).is_empty());

    let hits = store.search(&[1.0, 0.0], 100, &SearchOptions::default());
    let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
    assert_eq!(keys, vec!["x", "z", "y"]);
}

#[test]
fn search_can_carry_metadata() {
    let mut store = VectorStore::new();
    store.insert("x", vec![1.0, 0.0], Some(meta(json!({"page": 1}))));
    store.insert("y", vec![0.0, 1.0], None);

    let hits = store.search(
        &[1.0, 0.0],
        2,
        &SearchOptions::new().with_metadata(true),
    );
    assert_eq!(hits[0].metadata, Some(meta(json!({"page": 1}))));
    assert_eq!(hits[1].metadata, Some(Metadata::new()));
}

#[test]
fn metadata_filter_semantics() {
    let mut store = VectorStore::new();
    store.insert("p", vec![1.0], Some(meta(json!({"type": "a"}))));
    store.insert("q", vec![1.0], Some(meta(json!({"type": "b"}))));
    store.insert("r", vec![1.0], Some(Metadata::new()));

    assert_eq!(
        store.filter_by_metadata(&MetadataFilter::new().equals("type", "a")),
        vec!["p".to_string()]
    );
    assert_eq!(
        store.filter_by_metadata(&MetadataFilter::new()),
        vec!["p".to_string(), "q".to_string()]
    );
    assert!(store
        .filter_by_metadata(&MetadataFilter::new().equals("missing", "a"))
        .is_empty());
}

#[test]
fn predicate_filter_over_pages() {
    let mut store = VectorStore::new();
    for page in 1..=4 {
        store.insert_with_metadata(
            format!("page-{page}"),
            vec![1.0],
            meta(json!({"page": page, "source": "PDF"})),
        );
    }

    let filter = MetadataFilter::new()
        .equals("source", "PDF")
        .matches("page", |v| v.as_i64().is_some_and(|p| p <= 2));
    assert_eq!(
        store.filter_by_metadata(&filter),
        strings(&["page-1", "page-2"])
    );
}

#[tokio::test]
async fn bulk_build_pairs_metadata_by_position() {
    let provider = FixedEmbeddings::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    let mut store = VectorStore::with_embeddings(provider.clone());
    store
        .build_from_texts(
            strings(&["t1", "t2"]),
            Some(vec![meta(json!({"id": 1})), meta(json!({"id": 2}))]),
        )
        .await
        .unwrap();

    assert_eq!(store.get_metadata("t1"), meta(json!({"id": 1})));
    assert_eq!(store.get_metadata("t2"), meta(json!({"id": 2})));
    assert_eq!(store.get_vector("t2"), Some(&[0.0, 1.0][..]));
    assert_eq!(provider.batch_calls.load(Ordering::Relaxed), 1);
    assert_eq!(provider.single_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn bulk_build_with_short_metadata_list() {
    let provider = FixedEmbeddings::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    let mut store = VectorStore::with_embeddings(provider);
    store
        .build_from_texts(strings(&["t1", "t2"]), Some(vec![meta(json!({"id": 1}))]))
        .await
        .unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get_metadata("t1"), meta(json!({"id": 1})));
    assert!(store.get_metadata("t2").is_empty());
}

#[tokio::test]
async fn duplicate_texts_collapse_last_write_wins() {
    let provider = FixedEmbeddings::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    let mut store = VectorStore::with_embeddings(provider);
    store
        .build_from_texts(
            strings(&["dup", "dup"]),
            Some(vec![meta(json!({"v": 1})), meta(json!({"v": 2}))]),
        )
        .await
        .unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get_metadata("dup"), meta(json!({"v": 2})));
    assert_eq!(store.get_vector("dup"), Some(&[0.0, 1.0][..]));
}

#[tokio::test]
async fn build_chains_into_search() {
    let provider = FixedEmbeddings::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    let mut store = VectorStore::with_embeddings(provider);
    let hits = store
        .build_from_texts(strings(&["left", "up"]), None)
        .await
        .unwrap()
        .search(&[0.0, 1.0], 1, &SearchOptions::default());
    assert_eq!(hits[0].key, "up");
}

#[tokio::test]
async fn missing_provider_is_a_configuration_error() {
    let mut store = VectorStore::new();
    store.insert("kept", vec![1.0, 0.0], None);

    let err = store
        .search_by_text("query", 1, &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VectorStoreError::Configuration(_)));
    assert!(err.to_string().contains("no embedding model available"));

    let err = store
        .build_from_texts(strings(&["new"]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, VectorStoreError::Configuration(_)));

    assert_eq!(store.len(), 1);
    assert!(!store.contains_key("new"));
}

#[test]
fn update_metadata_on_absent_key_is_not_found() {
    let mut store = VectorStore::new();
    store.insert("present", vec![1.0], Some(meta(json!({"a": 1}))));

    let err = store
        .update_metadata("absent", meta(json!({"b": 2})))
        .unwrap_err();
    assert!(matches!(err, VectorStoreError::NotFound(_)));
    assert_eq!(store.len(), 1);
    assert!(store.get_metadata("absent").is_empty());
    assert_eq!(store.get_metadata("present"), meta(json!({"a": 1})));
}

#[tokio::test]
async fn provider_errors_propagate_without_mutation() {
    let mut store = VectorStore::with_embeddings(Arc::new(FailingEmbeddings));

    let err = store
        .build_from_texts(strings(&["a", "b"]), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VectorStoreError::Embedding(EmbeddingError::Request(_))
    ));
    assert!(store.is_empty());

    let err = store
        .search_by_text("a", 1, &SearchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Embedding API returned 429: rate limited");
}

#[tokio::test]
async fn short_provider_batch_inserts_nothing() {
    let provider = FixedEmbeddings::new(vec![vec![1.0, 0.0]]);
    let mut store = VectorStore::with_embeddings(provider);

    let err = store
        .build_from_texts(strings(&["a", "b"]), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VectorStoreError::Embedding(EmbeddingError::BatchLengthMismatch {
            expected: 2,
            actual: 1
        })
    ));
    assert!(store.is_empty());
}

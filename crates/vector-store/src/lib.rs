//! # RAG Vector Store
//!
//! Small in-memory vector store for retrieval-augmented generation demos.
//!
//! ## Features
//!
//! - **Exact top-k search** by linear scan with a pluggable similarity
//!   function (cosine by default)
//! - **Per-key metadata** with equality and predicate filters
//! - **Batched bulk build** from texts through an injected
//!   [`EmbeddingProvider`]
//!
//! ## Architecture
//!
//! ```text
//! texts[]
//!     │
//!     ├──> EmbeddingProvider (stub / OpenAI)
//!     │      └─> one batched call ─> Vec<f32>[]
//!     │
//!     └──> VectorStore
//!            ├─> key -> vector, metadata
//!            └─> linear-scan search, metadata filter
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rag_vector_store::{
//!     provider_from_config, EmbeddingConfig, MetadataFilter, SearchOptions, VectorStore,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = provider_from_config(&EmbeddingConfig::from_env()?)?;
//!     let mut store = VectorStore::with_embeddings(provider);
//!
//!     let food = json!({"category": "food"}).as_object().cloned().unwrap_or_default();
//!     store
//!         .build_from_texts(vec!["I like bananas.".to_string()], Some(vec![food]))
//!         .await?;
//!
//!     let options = SearchOptions::new()
//!         .with_filter(MetadataFilter::new().equals("category", "food"))
//!         .with_metadata(true);
//!     for hit in store.search_by_text("fruit", 3, &options).await? {
//!         println!("{}: {:.3}", hit.key, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod filter;
mod similarity;
mod store;
mod types;

pub use embeddings::{
    provider_from_config, EmbeddingConfig, EmbeddingMode, EmbeddingProvider, OpenAiEmbeddings,
    StubEmbeddings, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, DEFAULT_STUB_DIMENSION,
};
pub use error::{EmbeddingError, Result, VectorStoreError};
pub use filter::{FieldFilter, MetadataFilter};
pub use similarity::{cosine_similarity, dot_product, euclidean_similarity, SimilarityFn};
pub use store::{SearchOptions, VectorStore};
pub use types::{Metadata, SearchHit};

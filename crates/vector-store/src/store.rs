use crate::embeddings::EmbeddingProvider;
use crate::error::{EmbeddingError, Result, VectorStoreError};
use crate::filter::MetadataFilter;
use crate::similarity::{cosine_similarity, SimilarityFn};
use crate::types::{Metadata, SearchHit, StoredEntry};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const NO_EMBEDDING_MODEL: &str = "no embedding model available";

/// Knobs for [`VectorStore::search`] and the text-search variants.
#[derive(Clone)]
pub struct SearchOptions {
    pub similarity: SimilarityFn,
    pub include_metadata: bool,
    pub filter: Option<MetadataFilter>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            similarity: Arc::new(cosine_similarity),
            include_metadata: false,
            filter: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_similarity<F>(mut self, similarity: F) -> Self
    where
        F: Fn(&[f32], &[f32]) -> f32 + Send + Sync + 'static,
    {
        self.similarity = Arc::new(similarity);
        self
    }

    #[must_use]
    pub const fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("include_metadata", &self.include_metadata)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Exact-search, in-memory vector store keyed by string.
///
/// Entries keep their first-insertion position; that order breaks score ties
/// in [`search`](Self::search) and orders [`keys`](Self::keys) and
/// [`filter_by_metadata`](Self::filter_by_metadata).
#[derive(Default)]
pub struct VectorStore {
    entries: Vec<StoredEntry>,
    positions: HashMap<String, usize>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
}

impl fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("len", &self.entries.len())
            .field("has_embeddings", &self.embeddings.is_some())
            .finish()
    }
}

impl VectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_embeddings(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embeddings: Some(provider),
            ..Self::default()
        }
    }

    pub fn set_embeddings(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        self.embeddings = Some(provider);
    }

    #[must_use]
    pub fn embeddings(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.embeddings.as_ref()
    }

    /// Sets the vector for `key`. Metadata is replaced when given and left
    /// alone when `None`.
    pub fn insert(&mut self, key: impl Into<String>, vector: Vec<f32>, metadata: Option<Metadata>) {
        let key = key.into();
        if let Some(&pos) = self.positions.get(&key) {
            let entry = &mut self.entries[pos];
            entry.vector = vector;
            if let Some(metadata) = metadata {
                entry.metadata = metadata;
            }
            return;
        }

        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push(StoredEntry {
            key,
            vector,
            metadata: metadata.unwrap_or_default(),
        });
    }

    /// Like [`insert`](Self::insert) but always replaces metadata; an empty
    /// map clears it.
    pub fn insert_with_metadata(
        &mut self,
        key: impl Into<String>,
        vector: Vec<f32>,
        metadata: Metadata,
    ) {
        self.insert(key, vector, Some(metadata));
    }

    /// Shallow-merges `partial` into the metadata of an existing key.
    pub fn update_metadata(&mut self, key: &str, partial: Metadata) -> Result<()> {
        let pos = *self
            .positions
            .get(key)
            .ok_or_else(|| VectorStoreError::NotFound(format!("Vector with key '{key}' not found")))?;
        self.entries[pos].metadata.extend(partial);
        Ok(())
    }

    /// Never fails: unknown keys and keys without metadata yield an empty map.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Metadata {
        self.entry(key)
            .map(|entry| entry.metadata.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get_vector(&self, key: &str) -> Option<&[f32]> {
        self.entry(key).map(|entry| entry.vector.as_slice())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Keys whose metadata passes `filter`, in insertion order.
    #[must_use]
    pub fn filter_by_metadata(&self, filter: &MetadataFilter) -> Vec<String> {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| filter.accepts(&entry.metadata))
            .map(|entry| entry.key.clone())
            .collect();
        log::debug!(
            "Metadata filter over {} fields matched {} of {} keys",
            filter.len(),
            keys.len(),
            self.entries.len()
        );
        keys
    }

    /// Exact top-`k` by linear scan, best score first.
    ///
    /// Equal scores keep insertion order. NaN scores (zero-norm vectors under
    /// cosine) are returned, ranked after every real score.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize, options: &SearchOptions) -> Vec<SearchHit> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(&StoredEntry, f32)> = self
            .entries
            .iter()
            .filter(|entry| {
                options
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter.accepts(&entry.metadata))
            })
            .map(|entry| (entry, (options.similarity)(query, entry.vector.as_slice())))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| rank_descending(a.1, b.1));
        scored.truncate(k);

        log::debug!(
            "Search over {} entries returned {} hits (k={k})",
            self.entries.len(),
            scored.len()
        );

        scored
            .into_iter()
            .map(|(entry, score)| SearchHit {
                key: entry.key.clone(),
                score,
                metadata: options.include_metadata.then(|| entry.metadata.clone()),
            })
            .collect()
    }

    /// Embeds `query` with the bound provider, then runs [`search`](Self::search).
    pub async fn search_by_text(
        &self,
        query: &str,
        k: usize,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        let provider = self.require_embeddings()?;
        let vector = provider.embed_one(query).await?;
        Ok(self.search(&vector, k, options))
    }

    /// Ranked keys only; handy when keys are the source text chunks.
    pub async fn search_texts(
        &self,
        query: &str,
        k: usize,
        options: &SearchOptions,
    ) -> Result<Vec<String>> {
        let hits = self.search_by_text(query, k, options).await?;
        Ok(hits.into_iter().map(|hit| hit.key).collect())
    }

    /// Embeds all `texts` in a single provider call and inserts each text
    /// under itself as key. `metadata[i]` pairs with `texts[i]`; a shorter
    /// or absent list leaves the remaining texts without new metadata.
    ///
    /// Nothing is inserted unless the provider call succeeds. Repeated texts
    /// collapse into one entry, last write wins.
    pub async fn build_from_texts(
        &mut self,
        texts: Vec<String>,
        metadata: Option<Vec<Metadata>>,
    ) -> Result<&mut Self> {
        let provider = self.require_embeddings()?.clone();
        if texts.is_empty() {
            return Ok(self);
        }

        log::info!("Embedding {} texts in one batch", texts.len());
        let vectors = provider.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            log::warn!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
            return Err(EmbeddingError::BatchLengthMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let mut metadata = metadata.unwrap_or_default().into_iter();
        for (text, vector) in texts.into_iter().zip(vectors) {
            self.insert(text, vector, metadata.next());
        }

        log::info!("Store now holds {} entries", self.entries.len());
        Ok(self)
    }

    fn entry(&self, key: &str) -> Option<&StoredEntry> {
        self.positions.get(key).map(|&pos| &self.entries[pos])
    }

    fn require_embeddings(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.embeddings
            .as_ref()
            .ok_or_else(|| VectorStoreError::Configuration(NO_EMBEDDING_MODEL.to_string()))
    }
}

/// Descending by score with NaN last, so the comparator stays a total order.
fn rank_descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

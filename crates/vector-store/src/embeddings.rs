use crate::error::EmbeddingError;
use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::sync::Arc;

pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_STUB_DIMENSION: usize = 384;

/// Text-to-vector capability injected into a [`crate::VectorStore`].
///
/// `embed_batch` must return exactly one vector per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    Stub,
    OpenAi,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self, EmbeddingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "openai" => Ok(Self::OpenAi),
            other => Err(EmbeddingError::Config(format!(
                "Unsupported RAG_EMBEDDING_MODE '{other}' (expected 'stub' or 'openai')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::OpenAi => "openai",
        }
    }
}

/// Provider selection, usually read from the process environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model: String,
    pub stub_dimension: usize,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Stub,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            stub_dimension: DEFAULT_STUB_DIMENSION,
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self, EmbeddingError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EmbeddingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mode = match lookup("RAG_EMBEDDING_MODE") {
            Some(raw) => EmbeddingMode::parse(&raw)?,
            None => defaults.mode,
        };
        let stub_dimension = match lookup("RAG_EMBEDDING_DIMENSION") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(dim) if dim > 0 => dim,
                _ => {
                    return Err(EmbeddingError::Config(format!(
                        "Invalid RAG_EMBEDDING_DIMENSION '{raw}' (expected a positive integer)"
                    )))
                }
            },
            None => defaults.stub_dimension,
        };
        Ok(Self {
            mode,
            model: lookup("RAG_EMBEDDING_MODEL").unwrap_or(defaults.model),
            stub_dimension,
            api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
        })
    }
}

pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    log::debug!(
        "Embedding provider: mode={}, model={}",
        config.mode.as_str(),
        config.model
    );
    match config.mode {
        EmbeddingMode::Stub => Ok(Arc::new(StubEmbeddings::new(config.stub_dimension))),
        EmbeddingMode::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                EmbeddingError::Config("OPENAI_API_KEY is required for openai mode".to_string())
            })?;
            Ok(Arc::new(
                OpenAiEmbeddings::new(api_key, config.model.clone())
                    .with_base_url(config.base_url.clone()),
            ))
        }
    }
}

/// Deterministic offline embeddings: the same text always maps to the
/// same unit vector. Useful for tests and demos, useless for semantics.
#[derive(Clone, Debug)]
pub struct StubEmbeddings {
    dimension: usize,
}

impl StubEmbeddings {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddings {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(stub_embed(text, self.dimension))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// OpenAI-compatible `/embeddings` endpoint.
///
/// One `embed_batch` call is one HTTP request. Retries and rate limiting are
/// left to the caller.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddings")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("Empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body: payload,
            });
        }

        parse_embeddings_response(&payload, texts.len())
    }
}

/// Rows are placed by their `index` field; the API does not promise to list
/// them in request order.
fn parse_embeddings_response(
    payload: &str,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let parsed: EmbeddingsResponse = serde_json::from_str(payload)
        .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
    if parsed.data.len() != expected {
        return Err(EmbeddingError::BatchLengthMismatch {
            expected,
            actual: parsed.data.len(),
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for row in parsed.data {
        let slot = slots.get_mut(row.index).ok_or_else(|| {
            EmbeddingError::InvalidResponse(format!("row index {} out of range", row.index))
        })?;
        if slot.replace(row.embedding).is_some() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "duplicate row index {}",
                row.index
            )));
        }
    }
    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| EmbeddingError::InvalidResponse("missing embedding row".to_string()))
        })
        .collect()
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form annotation attached to a stored vector.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub key: String,
    pub score: f32,
    /// Present only when the search asked for metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
    pub key: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

use anyhow::{Context as AnyhowContext, Result};
use rag_vector_store::{Metadata, MetadataFilter};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

/// Texts plus their positional metadata, ready for `build_from_texts`.
#[derive(Debug, Default, PartialEq)]
pub struct Corpus {
    pub texts: Vec<String>,
    pub metadata: Vec<Metadata>,
}

#[derive(Deserialize)]
struct JsonlRecord {
    text: String,
    #[serde(default)]
    metadata: Metadata,
}

impl Corpus {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let is_jsonl = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));
        if is_jsonl {
            Self::parse_jsonl(&raw).with_context(|| format!("Invalid {}", path.display()))
        } else {
            Ok(Self::parse_lines(&raw))
        }
    }

    /// One `{"text": .., "metadata": {..}}` object per non-empty line.
    pub fn parse_jsonl(raw: &str) -> Result<Self> {
        let mut corpus = Self::default();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: JsonlRecord = serde_json::from_str(line)
                .with_context(|| format!("line {}", idx + 1))?;
            corpus.texts.push(record.text);
            corpus.metadata.push(record.metadata);
        }
        Ok(corpus)
    }

    pub fn parse_lines(raw: &str) -> Self {
        let texts: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
        Self {
            texts,
            metadata: Vec::new(),
        }
    }

    /// The fruit-and-pets sentences used by `rag-store demo`.
    pub fn demo() -> Self {
        let rows = [
            (
                "I like to eat broccoli and bananas.",
                json!({"category": "food", "sentiment": "positive", "source": "personal"}),
            ),
            (
                "I ate a banana and spinach smoothie for breakfast.",
                json!({"category": "food", "sentiment": "neutral", "source": "personal"}),
            ),
            (
                "Chinchillas and kittens are cute.",
                json!({"category": "animals", "sentiment": "positive", "source": "general"}),
            ),
            (
                "My sister adopted a kitten yesterday.",
                json!({"category": "animals", "sentiment": "positive", "source": "family"}),
            ),
            (
                "Look at this cute hamster munching on a piece of broccoli.",
                json!({"category": "animals", "sentiment": "positive", "source": "observation"}),
            ),
        ];
        let mut corpus = Self::default();
        for (text, metadata) in rows {
            corpus.texts.push(text.to_string());
            corpus
                .metadata
                .push(metadata.as_object().cloned().unwrap_or_default());
        }
        corpus
    }
}

/// Parses repeated `field=value` flags. Values are read as JSON when they
/// parse (`page=2`, `draft=true`), otherwise kept as plain strings.
pub fn parse_where(clauses: &[String]) -> Result<Option<MetadataFilter>> {
    if clauses.is_empty() {
        return Ok(None);
    }
    let mut filter = MetadataFilter::new();
    for clause in clauses {
        let (field, raw) = clause
            .split_once('=')
            .with_context(|| format!("Invalid --where '{clause}' (expected field=value)"))?;
        let field = field.trim();
        if field.is_empty() {
            anyhow::bail!("Invalid --where '{clause}' (empty field name)");
        }
        let value = serde_json::from_str::<Value>(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        filter = filter.equals(field, value);
    }
    Ok(Some(filter))
}

use crate::types::Metadata;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Test applied to a single metadata field.
#[derive(Clone)]
pub enum FieldFilter {
    Equals(Value),
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl FieldFilter {
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => values_equal(expected, value),
            Self::Predicate(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// Conjunction of per-field tests over an entry's metadata.
///
/// A key matches when every field named here exists in its metadata and
/// passes the field's test. The empty filter matches every key that has
/// non-empty metadata.
///
/// ```
/// use rag_vector_store::MetadataFilter;
///
/// let filter = MetadataFilter::new()
///     .equals("category", "technical")
///     .matches("page", |v| v.as_i64().is_some_and(|p| p <= 2));
/// assert_eq!(filter.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MetadataFilter {
    fields: BTreeMap<String, FieldFilter>,
}

impl MetadataFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(field.into(), FieldFilter::Equals(value.into()));
        self
    }

    #[must_use]
    pub fn matches<F>(mut self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.fields
            .insert(field.into(), FieldFilter::Predicate(Arc::new(predicate)));
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, filter: FieldFilter) -> Self {
        self.fields.insert(field.into(), filter);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Empty metadata never matches, not even the empty filter.
    #[must_use]
    pub fn accepts(&self, metadata: &Metadata) -> bool {
        if metadata.is_empty() {
            return false;
        }
        self.fields.iter().all(|(field, filter)| {
            metadata
                .get(field)
                .is_some_and(|value| filter.matches(value))
        })
    }
}

/// JSON equality, except numbers compare by value so `2` equals `2.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                x == y
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

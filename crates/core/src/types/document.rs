//! Documents and filters.
//!
//! A [`Document`] is a JSON object as stored in a collection. A [`Filter`] is a
//! conjunction of top-level field equalities. Values compare as JSON values
//! with numbers compared by value, so `2` equals `2.0` but `["a"]` does not
//! equal `["a", "b"]`. This is the same equality `PostgreSQL` applies to
//! `jsonb` values.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A stored record in its serialized form.
pub type Document = Map<String, Value>;

/// Name of the identifier field every record carries.
pub const ID_FIELD: &str = "id";

/// Equality filter over top-level document fields.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Filter(Document);

impl Filter {
    /// Create a filter that matches every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter matching the record with the given ID.
    #[must_use]
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// Require `field` to equal `value`.
    ///
    /// Repeating a field replaces the earlier value.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Whether `document` satisfies every equality in this filter.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| {
                document
                    .get(field)
                    .is_some_and(|actual| values_equal(actual, expected))
            })
    }

    /// The field equalities as a JSON object.
    #[must_use]
    pub const fn as_document(&self) -> &Document {
        &self.0
    }

    /// Whether this filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// JSON equality with numbers compared by value.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, value)| {
                    right
                        .get(key)
                        .is_some_and(|other| values_equal(value, other))
                })
        }
        _ => left == right,
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

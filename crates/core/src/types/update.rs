//! Update expressions.
//!
//! An [`Update`] is a set of field assignments and numeric increments applied
//! to a single document. Collections apply it through [`Update::apply`] so the
//! semantics are the same for every backend:
//!
//! - `set` replaces (or adds) a top-level field.
//! - `inc` adds to a numeric field; a missing field counts as zero.
//! - The `id` field can never be modified.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use thiserror::Error;

use super::document::{Document, Filter, ID_FIELD};

/// Errors produced when an update cannot be applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The update tries to change the record identifier.
    #[error("field '{0}' is immutable")]
    ImmutableField(String),

    /// The same field is both assigned and incremented.
    #[error("field '{0}' is targeted by more than one operator")]
    ConflictingOperators(String),

    /// `inc` targets a field that holds a non-numeric value.
    #[error("cannot increment non-numeric field '{0}'")]
    NotNumeric(String),

    /// The increment does not fit in a 64-bit integer.
    #[error("increment of field '{0}' overflows")]
    Overflow(String),
}

/// A single-document update expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
    inc: BTreeMap<String, i64>,
    /// First field whose combined increment left the `i64` range.
    overflow: Option<String>,
}

impl Update {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `field`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Add `by` to the numeric `field`.
    ///
    /// Repeated increments of the same field accumulate. If the combined
    /// increment overflows, the update fails validation with
    /// [`UpdateError::Overflow`].
    #[must_use]
    pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
        let field = field.into();
        let entry = self.inc.entry(field.clone()).or_insert(0);
        match entry.checked_add(by) {
            Some(total) => *entry = total,
            None => {
                self.overflow.get_or_insert(field);
            }
        }
        self
    }

    /// Whether the update has no operators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty()
    }

    /// Check the update for operator conflicts and immutable fields.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::ImmutableField` if the update touches `id`, or
    /// `UpdateError::ConflictingOperators` if a field is both set and incremented,
    /// or `UpdateError::Overflow` if repeated increments of a field overflow.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if let Some(field) = &self.overflow {
            return Err(UpdateError::Overflow(field.clone()));
        }
        for field in self.set.keys().chain(self.inc.keys()) {
            if field == ID_FIELD {
                return Err(UpdateError::ImmutableField(field.clone()));
            }
        }
        if let Some(field) = self.inc.keys().find(|field| self.set.contains_key(*field)) {
            return Err(UpdateError::ConflictingOperators(field.clone()));
        }
        Ok(())
    }

    /// Apply the update to `document` in place.
    ///
    /// The document is left untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns an `UpdateError` if the update is invalid or an increment
    /// targets a non-numeric field or overflows.
    pub fn apply(&self, document: &mut Document) -> Result<(), UpdateError> {
        self.validate()?;

        let mut increments = Vec::with_capacity(self.inc.len());
        for (field, by) in &self.inc {
            let next = match document.get(field) {
                None | Some(Value::Null) => Value::from(*by),
                Some(Value::Number(current)) => increment(field, current, *by)?,
                Some(_) => return Err(UpdateError::NotNumeric(field.clone())),
            };
            increments.push((field.clone(), next));
        }

        for (field, value) in &self.set {
            document.insert(field.clone(), value.clone());
        }
        document.extend(increments);
        Ok(())
    }

    /// Build the document an upsert inserts when nothing matches `filter`.
    ///
    /// The filter's equalities seed the document, then the update is applied.
    ///
    /// # Errors
    ///
    /// Returns an `UpdateError` if the update cannot be applied.
    pub fn upsert_document(&self, filter: &Filter) -> Result<Document, UpdateError> {
        let mut document = filter.as_document().clone();
        document.remove(ID_FIELD);
        self.apply(&mut document)?;
        Ok(document)
    }
}

fn increment(field: &str, current: &Number, by: i64) -> Result<Value, UpdateError> {
    if let Some(current) = current.as_i64() {
        return current
            .checked_add(by)
            .map(Value::from)
            .ok_or_else(|| UpdateError::Overflow(field.to_owned()));
    }
    if let Some(current) = current.as_u64() {
        // Above i64::MAX; only a negative increment can bring it back in range.
        let next = i128::from(current) + i128::from(by);
        return u64::try_from(next)
            .map(Value::from)
            .map_err(|_| UpdateError::Overflow(field.to_owned()));
    }
    #[allow(clippy::cast_precision_loss)] // Float fields stay floats, as in the store
    let next = current.as_f64().unwrap_or_default() + by as f64;
    Number::from_f64(next)
        .map(Value::Number)
        .ok_or_else(|| UpdateError::Overflow(field.to_owned()))
}

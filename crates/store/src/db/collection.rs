//! The document collection abstraction.
//!
//! A [`DocumentCollection`] is the minimal query surface a store must offer.
//! Repositories are built on top of it, so swapping `PostgreSQL` for the
//! in-memory backend changes nothing above this layer.

use async_trait::async_trait;
use serde_json::Value;
use trolley_core::{Document, Filter, ID_FIELD, Update};
use uuid::Uuid;

use super::RepositoryError;

/// Options for [`DocumentCollection::find_one_and_update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document seeded from the filter when nothing matches.
    pub upsert: bool,
}

impl UpdateOptions {
    /// Options for an upsert.
    #[must_use]
    pub const fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// A single collection of JSON documents.
///
/// "First" always means first in the collection's natural insertion order.
/// Implementations must apply updates atomically with respect to other
/// callers of the same collection.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name, used in logs and errors.
    fn name(&self) -> &str;

    /// Insert a document. The document must carry a UUID `id` field.
    async fn insert_one(&self, document: Document) -> Result<Document, RepositoryError>;

    /// All documents matching `filter`, in natural order.
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, RepositoryError>;

    /// The first document matching `filter`.
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, RepositoryError>;

    /// Apply `update` to the first document matching `filter` and return the
    /// post-update document.
    ///
    /// With `options.upsert`, a document built by
    /// [`Update::upsert_document`] is inserted when nothing matches.
    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<Option<Document>, RepositoryError>;

    /// Delete the first document matching `filter` and return it.
    async fn find_one_and_delete(&self, filter: &Filter)
    -> Result<Option<Document>, RepositoryError>;
}

/// Read the UUID stored in a document's `id` field.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the field is missing or not a UUID.
pub fn document_id(document: &Document) -> Result<Uuid, RepositoryError> {
    match document.get(ID_FIELD) {
        Some(Value::String(id)) => Uuid::parse_str(id)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid document id: {e}"))),
        Some(other) => Err(RepositoryError::DataCorruption(format!(
            "document id must be a string, got {other}"
        ))),
        None => Err(RepositoryError::DataCorruption(
            "document has no id".to_owned(),
        )),
    }
}

/// Build the document an upsert inserts, with a freshly generated id.
///
/// # Errors
///
/// Returns `RepositoryError::InvalidUpdate` if the update cannot be applied.
pub fn new_upsert_document(filter: &Filter, update: &Update) -> Result<Document, RepositoryError> {
    let mut document = update.upsert_document(filter)?;
    document.insert(
        ID_FIELD.to_owned(),
        Value::String(Uuid::new_v4().to_string()),
    );
    Ok(document)
}

//! In-process document collection.
//!
//! Documents are kept in insertion order behind a `tokio` read-write lock.
//! Every mutating operation holds the write lock for its whole
//! read-modify-write cycle, which makes upserts atomic.

use async_trait::async_trait;
use tokio::sync::RwLock;
use trolley_core::{Document, Filter, ID_FIELD, Update};

use super::collection::{DocumentCollection, UpdateOptions, document_id, new_upsert_document};
use super::repository::Record;
use super::RepositoryError;

/// A collection stored in memory.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    unique_keys: Vec<Vec<String>>,
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    /// Create an empty collection with no unique keys besides `id`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique_keys: Vec::new(),
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Create an empty collection with the name and unique keys of `T`.
    #[must_use]
    pub fn for_record<T: Record>() -> Self {
        T::UNIQUE_KEYS
            .iter()
            .fold(Self::new(T::COLLECTION), |collection, key| {
                collection.with_unique_key(key)
            })
    }

    /// Declare a compound unique key.
    #[must_use]
    pub fn with_unique_key(mut self, fields: &[&str]) -> Self {
        self.unique_keys
            .push(fields.iter().map(|field| (*field).to_owned()).collect());
        self
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Reject `candidate` if it collides with any document other than the one
    /// at index `replacing`.
    fn check_unique(
        &self,
        documents: &[Document],
        candidate: &Document,
        replacing: Option<usize>,
    ) -> Result<(), RepositoryError> {
        let id_key = [ID_FIELD.to_owned()];
        let keys = std::iter::once(id_key.as_slice())
            .chain(self.unique_keys.iter().map(Vec::as_slice));

        for key in keys {
            let Some(values) = key
                .iter()
                .map(|field| candidate.get(field))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            let collides = documents.iter().enumerate().any(|(index, existing)| {
                Some(index) != replacing
                    && key
                        .iter()
                        .zip(&values)
                        .all(|(field, value)| existing.get(field) == Some(*value))
            });

            if collides {
                return Err(RepositoryError::Conflict(format!(
                    "duplicate key ({}) in {}",
                    key.join(", "),
                    self.name
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, document: Document) -> Result<Document, RepositoryError> {
        document_id(&document)?;
        let mut documents = self.documents.write().await;
        self.check_unique(&documents, &document, None)?;
        documents.push(document.clone());
        Ok(document)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<Option<Document>, RepositoryError> {
        update.validate()?;
        let mut documents = self.documents.write().await;
        let position = documents.iter().position(|document| filter.matches(document));

        match position {
            Some(index) => {
                let Some(current) = documents.get(index) else {
                    return Ok(None);
                };
                let mut updated = current.clone();
                update.apply(&mut updated)?;
                self.check_unique(&documents, &updated, Some(index))?;
                if let Some(slot) = documents.get_mut(index) {
                    slot.clone_from(&updated);
                }
                Ok(Some(updated))
            }
            None if options.upsert => {
                let document = new_upsert_document(filter, update)?;
                self.check_unique(&documents, &document, None)?;
                documents.push(document.clone());
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn find_one_and_delete(
        &self,
        filter: &Filter,
    ) -> Result<Option<Document>, RepositoryError> {
        let mut documents = self.documents.write().await;
        let position = documents.iter().position(|document| filter.matches(document));
        Ok(position.map(|index| documents.remove(index)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    fn with_id(value: Value) -> Document {
        let mut document = doc(value);
        document.insert(
            ID_FIELD.to_owned(),
            Value::String(Uuid::new_v4().to_string()),
        );
        document
    }

    fn lines() -> MemoryCollection {
        MemoryCollection::new("cart_items").with_unique_key(&["cart_id", "product_id"])
    }

    #[tokio::test]
    async fn test_insert_requires_id() {
        let collection = MemoryCollection::new("users");
        let err = collection
            .insert_one(doc(json!({"name": "a"})))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_find_preserves_insertion_order() {
        let collection = MemoryCollection::new("users");
        for n in 0..3 {
            collection
                .insert_one(with_id(json!({"n": n, "group": "a"})))
                .await
                .unwrap();
        }

        let found = collection
            .find(&Filter::new().eq("group", "a"))
            .await
            .unwrap();
        let order: Vec<_> = found.iter().map(|d| d["n"].clone()).collect();
        assert_eq!(order, vec![json!(0), json!(1), json!(2)]);

        let first = collection
            .find_one(&Filter::new().eq("group", "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first["n"], json!(0));
    }

    #[tokio::test]
    async fn test_unique_key_rejects_duplicates() {
        let collection = lines();
        collection
            .insert_one(with_id(json!({"cart_id": "c1", "product_id": "p1"})))
            .await
            .unwrap();

        let err = collection
            .insert_one(with_id(json!({"cart_id": "c1", "product_id": "p1"})))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        collection
            .insert_one(with_id(json!({"cart_id": "c1", "product_id": "p2"})))
            .await
            .unwrap();
        assert_eq!(collection.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_without_match_returns_none() {
        let collection = lines();
        let result = collection
            .find_one_and_update(
                &Filter::new().eq("cart_id", "c1"),
                &Update::new().inc("quantity", 1),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(collection.is_empty().await);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_increments() {
        let collection = lines();
        let filter = Filter::new().eq("cart_id", "c1").eq("product_id", "p1");
        let update = Update::new().inc("quantity", 2);

        let created = collection
            .find_one_and_update(&filter, &update, UpdateOptions::upsert())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created["quantity"], json!(2));
        assert!(document_id(&created).is_ok());

        let updated = collection
            .find_one_and_update(&filter, &update, UpdateOptions::upsert())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["quantity"], json!(4));
        assert_eq!(updated[ID_FIELD], created[ID_FIELD]);
        assert_eq!(collection.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_document_unchanged() {
        let collection = MemoryCollection::new("users");
        collection
            .insert_one(with_id(json!({"quantity": "many"})))
            .await
            .unwrap();

        let err = collection
            .find_one_and_update(
                &Filter::new(),
                &Update::new().inc("quantity", 1),
                UpdateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidUpdate(_)));

        let stored = collection.find_one(&Filter::new()).await.unwrap().unwrap();
        assert_eq!(stored["quantity"], json!("many"));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_document() {
        let collection = MemoryCollection::new("users");
        collection
            .insert_one(with_id(json!({"name": "a"})))
            .await
            .unwrap();

        let removed = collection
            .find_one_and_delete(&Filter::new().eq("name", "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed["name"], json!("a"));
        assert!(collection.is_empty().await);

        let again = collection
            .find_one_and_delete(&Filter::new().eq("name", "a"))
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_produce_one_document() {
        let collection = Arc::new(lines());
        let filter = Filter::new().eq("cart_id", "c1").eq("product_id", "p1");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let collection = Arc::clone(&collection);
            let filter = filter.clone();
            handles.push(tokio::spawn(async move {
                collection
                    .find_one_and_update(
                        &filter,
                        &Update::new().inc("quantity", 1),
                        UpdateOptions::upsert(),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = collection.find(&filter).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["quantity"], json!(16));
    }
}

//! Generic record repository.
//!
//! [`Repository<T>`] wraps one [`DocumentCollection`] and converts between
//! documents and the typed record `T`. Single-record reads return `Option`;
//! the `require_*` variants turn absence into [`RepositoryError::NotFound`]
//! and log the filter that matched nothing.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use trolley_core::{Document, Filter, ID_FIELD, Update};
use uuid::Uuid;

use super::collection::{DocumentCollection, UpdateOptions};
use super::memory::MemoryCollection;
use super::postgres::PgCollection;
use super::RepositoryError;

/// A record type stored in its own collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Collection (and table) name.
    const COLLECTION: &'static str;

    /// Compound unique keys enforced by the collection, besides `id`.
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[];

    /// Caller-supplied fields used to create a record; `id` is generated.
    type Draft: Serialize + Send + Sync;
}

/// Repository for one record type, bound to one collection.
pub struct Repository<T> {
    collection: Arc<dyn DocumentCollection>,
    record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl<T: Record> Repository<T> {
    /// Create a repository over an existing collection handle.
    #[must_use]
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self {
            collection,
            record: PhantomData,
        }
    }

    /// Create a repository over the `PostgreSQL` table for `T`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgCollection::new(pool, T::COLLECTION)))
    }

    /// Create a repository over a fresh in-memory collection for `T`.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCollection::for_record::<T>()))
    }

    /// Name of the underlying collection.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Create a record with a freshly generated ID.
    ///
    /// The generated `id` overrides any `id` field present in the draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the draft does not
    /// serialize to a JSON object, `RepositoryError::Conflict` on a unique key
    /// violation, or the store's error.
    pub async fn create(&self, draft: &T::Draft) -> Result<T, RepositoryError> {
        let mut document = match serde_json::to_value(draft) {
            Ok(Value::Object(document)) => document,
            Ok(other) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "record must serialize to an object, got {other}"
                )));
            }
            Err(e) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "failed to serialize record: {e}"
                )));
            }
        };
        document.insert(
            ID_FIELD.to_owned(),
            Value::String(Uuid::new_v4().to_string()),
        );

        let stored = self.collection.insert_one(document).await?;
        decode(stored)
    }

    /// All records matching `filter`, possibly none.
    ///
    /// # Errors
    ///
    /// Returns the store's error, or `RepositoryError::DataCorruption` if a
    /// stored document does not decode as `T`.
    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, RepositoryError> {
        self.collection
            .find(filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// The first record matching `filter`.
    ///
    /// When several records match, the first in natural insertion order wins.
    ///
    /// # Errors
    ///
    /// Returns the store's error or `RepositoryError::DataCorruption`.
    pub async fn find_one(&self, filter: &Filter) -> Result<Option<T>, RepositoryError> {
        self.collection.find_one(filter).await?.map(decode).transpose()
    }

    /// Apply `update` to the first record matching `filter` and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidUpdate` if the update cannot be
    /// applied, or the store's error.
    pub async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<T>, RepositoryError> {
        self.collection
            .find_one_and_update(filter, update, UpdateOptions::default())
            .await?
            .map(decode)
            .transpose()
    }

    /// Delete the first record matching `filter` and return its last state.
    ///
    /// # Errors
    ///
    /// Returns the store's error or `RepositoryError::DataCorruption`.
    pub async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<T>, RepositoryError> {
        self.collection
            .find_one_and_delete(filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Atomically update the first record matching `filter`, or insert one
    /// seeded from the filter's fields when none matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidUpdate`, `RepositoryError::Conflict`
    /// if concurrent inserts kept colliding, or the store's error.
    pub async fn upsert(&self, filter: &Filter, update: &Update) -> Result<T, RepositoryError> {
        let document = self
            .collection
            .find_one_and_update(filter, update, UpdateOptions::upsert())
            .await?
            .ok_or_else(|| {
                RepositoryError::Unavailable(format!(
                    "upsert into {} returned no document",
                    self.collection.name()
                ))
            })?;
        decode(document)
    }

    /// Like [`find_one`](Self::find_one), but a missing record is an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing matches.
    pub async fn require_one(&self, filter: &Filter) -> Result<T, RepositoryError> {
        let found = self.find_one(filter).await?;
        found.ok_or_else(|| self.not_found(filter))
    }

    /// Like [`find_one_and_update`](Self::find_one_and_update), but a missing
    /// record is an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing matches.
    pub async fn require_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<T, RepositoryError> {
        let updated = self.find_one_and_update(filter, update).await?;
        updated.ok_or_else(|| self.not_found(filter))
    }

    /// Like [`find_one_and_delete`](Self::find_one_and_delete), but a missing
    /// record is an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing matches.
    pub async fn require_one_and_delete(&self, filter: &Filter) -> Result<T, RepositoryError> {
        let deleted = self.find_one_and_delete(filter).await?;
        deleted.ok_or_else(|| self.not_found(filter))
    }

    fn not_found(&self, filter: &Filter) -> RepositoryError {
        let collection = self.collection.name();
        tracing::warn!(collection, filter = %filter, "Document was not found with filter");
        RepositoryError::NotFound {
            collection: collection.to_owned(),
            filter: filter.to_string(),
        }
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> Result<T, RepositoryError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid document: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        title: String,
        #[serde(default)]
        views: i64,
    }

    #[derive(Debug, Serialize)]
    struct NewNote {
        title: String,
    }

    impl Record for Note {
        const COLLECTION: &'static str = "notes";
        type Draft = NewNote;
    }

    fn draft(title: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_generates_distinct_ids() {
        let repo = Repository::<Note>::in_memory();
        let mut ids = HashSet::new();
        for n in 0..20 {
            let note = repo.create(&draft(&format!("note {n}"))).await.unwrap();
            assert!(ids.insert(note.id));
        }
        assert_eq!(repo.find(&Filter::new()).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_create_overrides_caller_id() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Loose {
            id: Uuid,
        }
        impl Record for Loose {
            const COLLECTION: &'static str = "loose";
            type Draft = Value;
        }

        let repo = Repository::<Loose>::in_memory();
        let supplied = Uuid::new_v4();
        let created = repo.create(&json!({"id": supplied.to_string()})).await.unwrap();
        assert_ne!(created.id, supplied);
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_draft() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Scalar;
        impl Record for Scalar {
            const COLLECTION: &'static str = "scalars";
            type Draft = u32;
        }

        let err = Repository::<Scalar>::in_memory()
            .create(&7)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_find_with_no_matches_is_empty() {
        let repo = Repository::<Note>::in_memory();
        repo.create(&draft("a")).await.unwrap();
        let found = repo.find(&Filter::new().eq("title", "b")).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_missing_record_contracts() {
        let repo = Repository::<Note>::in_memory();
        let filter = Filter::new().eq("title", "missing");

        assert!(repo.find_one(&filter).await.unwrap().is_none());
        assert!(
            repo.find_one_and_update(&filter, &Update::new().inc("views", 1))
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.find_one_and_delete(&filter).await.unwrap().is_none());

        let err = repo.require_one(&filter).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let err = repo
            .require_one_and_update(&filter, &Update::new().inc("views", 1))
            .await
            .unwrap_err();
        match err {
            RepositoryError::NotFound { collection, filter } => {
                assert_eq!(collection, "notes");
                assert_eq!(filter, r#"{"title":"missing"}"#);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }

        let err = repo.require_one_and_delete(&filter).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_returns_post_update_state() {
        let repo = Repository::<Note>::in_memory();
        let note = repo.create(&draft("a")).await.unwrap();

        let updated = repo
            .require_one_and_update(
                &Filter::by_id(note.id.to_string()),
                &Update::new().inc("views", 3).set("title", "b"),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, note.id);
        assert_eq!(updated.views, 3);
        assert_eq!(updated.title, "b");
    }

    #[tokio::test]
    async fn test_delete_returns_pre_delete_state() {
        let repo = Repository::<Note>::in_memory();
        let note = repo.create(&draft("a")).await.unwrap();

        let deleted = repo
            .find_one_and_delete(&Filter::by_id(note.id.to_string()))
            .await
            .unwrap();
        assert_eq!(deleted, Some(note));
        assert!(repo.find(&Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_document_is_data_corruption() {
        let collection = Arc::new(MemoryCollection::new("notes"));
        let mut document = Document::new();
        document.insert(ID_FIELD.to_owned(), json!(Uuid::new_v4().to_string()));
        collection.insert_one(document).await.unwrap();

        let repo = Repository::<Note>::new(collection);
        let err = repo.find_one(&Filter::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[allow(clippy::indexing_slicing)]
    mod not_found_logging {
        use std::collections::BTreeMap;
        use std::fmt;
        use std::sync::{Arc, Mutex};

        use tracing::field::{Field, Visit};
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        use super::*;

        #[derive(Debug)]
        struct CapturedEvent {
            level: Level,
            fields: BTreeMap<String, String>,
        }

        /// Records every event's level and fields.
        #[derive(Clone, Default)]
        struct EventLog(Arc<Mutex<Vec<CapturedEvent>>>);

        impl EventLog {
            fn take(&self) -> Vec<CapturedEvent> {
                std::mem::take(&mut *self.0.lock().unwrap())
            }
        }

        struct FieldRecorder<'a>(&'a mut BTreeMap<String, String>);

        impl Visit for FieldRecorder<'_> {
            fn record_str(&mut self, field: &Field, value: &str) {
                self.0.insert(field.name().to_owned(), value.to_owned());
            }

            fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
                self.0.insert(field.name().to_owned(), format!("{value:?}"));
            }
        }

        impl<S: Subscriber> Layer<S> for EventLog {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                let mut fields = BTreeMap::new();
                event.record(&mut FieldRecorder(&mut fields));
                self.0.lock().unwrap().push(CapturedEvent {
                    level: *event.metadata().level(),
                    fields,
                });
            }
        }

        fn assert_single_not_found_warning(log: &EventLog) {
            let events = log.take();
            assert_eq!(events.len(), 1, "{events:?}");
            let event = &events[0];
            assert_eq!(event.level, Level::WARN);
            assert_eq!(event.fields["collection"], "notes");
            assert_eq!(event.fields["filter"], r#"{"title":"missing"}"#);
            assert_eq!(event.fields["message"], "Document was not found with filter");
        }

        #[tokio::test]
        async fn test_every_require_variant_warns_with_collection_and_filter() {
            let log = EventLog::default();
            let subscriber = tracing_subscriber::registry().with(log.clone());
            let _guard = tracing::subscriber::set_default(subscriber);

            let repo = Repository::<Note>::in_memory();
            let filter = Filter::new().eq("title", "missing");

            repo.require_one(&filter).await.unwrap_err();
            assert_single_not_found_warning(&log);

            repo.require_one_and_update(&filter, &Update::new().inc("views", 1))
                .await
                .unwrap_err();
            assert_single_not_found_warning(&log);

            repo.require_one_and_delete(&filter).await.unwrap_err();
            assert_single_not_found_warning(&log);
        }

        #[tokio::test]
        async fn test_found_record_does_not_warn() {
            let log = EventLog::default();
            let subscriber = tracing_subscriber::registry().with(log.clone());
            let _guard = tracing::subscriber::set_default(subscriber);

            let repo = Repository::<Note>::in_memory();
            let note = repo.create(&draft("present")).await.unwrap();
            repo.require_one(&Filter::by_id(note.id.to_string()))
                .await
                .unwrap();

            assert!(log.take().iter().all(|event| event.level != Level::WARN));
        }
    }
}

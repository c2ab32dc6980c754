//! `PostgreSQL` document collection.
//!
//! Each collection is a table `store.<name>` with columns
//! `id UUID PRIMARY KEY, body JSONB, created_at, updated_at`. The document
//! (including its `id`) lives in `body`. A filter compiles to a per-field
//! `jsonb` equality check, guarded by `body @> $1` so the GIN index applies.
//! Natural order is `(created_at, id)`.
//!
//! Queries are built at runtime because the table name is only known when the
//! collection is constructed.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use trolley_core::{Document, Filter, Update};
use uuid::Uuid;

use super::collection::{DocumentCollection, UpdateOptions, document_id, new_upsert_document};
use super::RepositoryError;

/// How many times an upsert retries after losing an insert race.
const MAX_UPSERT_ATTEMPTS: usize = 3;

/// Outcome of a single find-and-update transaction.
enum Attempt {
    Done(Option<Document>),
    /// An upsert insert hit the unique index; another writer got there first.
    Raced(RepositoryError),
}

/// Matches rows whose top-level fields equal every field of the `$1` filter.
///
/// Equality implies containment, so the `@>` guard never drops a match.
const FILTER_CLAUSE: &str = "body @> $1 AND NOT EXISTS (\
     SELECT 1 FROM jsonb_each($1) AS wanted(key, value) \
     WHERE body -> wanted.key IS DISTINCT FROM wanted.value)";

/// SQL statements for one collection table.
#[derive(Debug)]
struct Statements {
    insert: String,
    find: String,
    find_one: String,
    lock_one: String,
    update: String,
    delete_one: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            insert: format!("INSERT INTO {table} (id, body) VALUES ($1, $2) RETURNING body"),
            find: format!(
                "SELECT body FROM {table} WHERE {FILTER_CLAUSE} ORDER BY created_at, id"
            ),
            find_one: format!(
                "SELECT body FROM {table} WHERE {FILTER_CLAUSE} ORDER BY created_at, id LIMIT 1"
            ),
            lock_one: format!(
                "SELECT id, body FROM {table} WHERE {FILTER_CLAUSE} \
                 ORDER BY created_at, id LIMIT 1 FOR UPDATE"
            ),
            update: format!(
                "UPDATE {table} SET body = $2, updated_at = NOW() WHERE id = $1 RETURNING body"
            ),
            delete_one: format!(
                "DELETE FROM {table} WHERE id = (\
                 SELECT id FROM {table} WHERE {FILTER_CLAUSE} \
                 ORDER BY created_at, id LIMIT 1 FOR UPDATE) \
                 RETURNING body"
            ),
        }
    }
}

/// A collection backed by a JSONB table in the `store` schema.
#[derive(Debug, Clone)]
pub struct PgCollection {
    pool: PgPool,
    name: &'static str,
    statements: Arc<Statements>,
}

impl PgCollection {
    /// Bind to the table `store.<name>`.
    ///
    /// `name` must be a plain SQL identifier (lowercase letters and underscores);
    /// record types declare it as a constant.
    #[must_use]
    pub fn new(pool: PgPool, name: &'static str) -> Self {
        debug_assert!(
            name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
            "collection name must be a plain identifier"
        );
        let statements = Statements::for_table(&format!("store.{name}"));
        Self {
            pool,
            name,
            statements: Arc::new(statements),
        }
    }

    /// Run one attempt of find-and-update inside a transaction.
    async fn update_once(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<Attempt, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, Json<Document>)> = sqlx::query_as(&self.statements.lock_one)
            .bind(Json(filter.as_document()))
            .fetch_optional(&mut *tx)
            .await?;

        let result = match row {
            Some((id, Json(mut document))) => {
                update.apply(&mut document)?;
                let updated: Json<Document> = sqlx::query_scalar(&self.statements.update)
                    .bind(id)
                    .bind(Json(&document))
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| self.classify(e))?;
                Some(updated.0)
            }
            None if options.upsert => {
                let document = new_upsert_document(filter, update)?;
                let id = document_id(&document)?;
                let inserted = sqlx::query_scalar::<_, Json<Document>>(&self.statements.insert)
                    .bind(id)
                    .bind(Json(&document))
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| self.classify(e));
                match inserted {
                    Ok(inserted) => Some(inserted.0),
                    Err(e) if e.is_conflict() => return Ok(Attempt::Raced(e)),
                    Err(e) => return Err(e),
                }
            }
            None => None,
        };

        tx.commit().await?;
        Ok(Attempt::Done(result))
    }

    fn classify(&self, err: sqlx::Error) -> RepositoryError {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(format!("duplicate key in {}", self.name));
        }
        RepositoryError::Database(err)
    }
}

#[async_trait]
impl DocumentCollection for PgCollection {
    fn name(&self) -> &str {
        self.name
    }

    async fn insert_one(&self, document: Document) -> Result<Document, RepositoryError> {
        let id = document_id(&document)?;
        let row: Json<Document> = sqlx::query_scalar(&self.statements.insert)
            .bind(id)
            .bind(Json(&document))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(row.0)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, RepositoryError> {
        let rows: Vec<Json<Document>> = sqlx::query_scalar(&self.statements.find)
            .bind(Json(filter.as_document()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, RepositoryError> {
        let row: Option<Json<Document>> = sqlx::query_scalar(&self.statements.find_one)
            .bind(Json(filter.as_document()))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.0))
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<Option<Document>, RepositoryError> {
        update.validate()?;

        let mut last_conflict = None;
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            match self.update_once(filter, update, options).await? {
                Attempt::Done(document) => return Ok(document),
                Attempt::Raced(conflict) => {
                    tracing::debug!(
                        collection = self.name,
                        attempt,
                        "Upsert lost an insert race, retrying"
                    );
                    last_conflict = Some(conflict);
                }
            }
        }

        Err(last_conflict.unwrap_or_else(|| {
            RepositoryError::Conflict(format!("upsert into {} did not settle", self.name))
        }))
    }

    async fn find_one_and_delete(
        &self,
        filter: &Filter,
    ) -> Result<Option<Document>, RepositoryError> {
        let row: Option<Json<Document>> = sqlx::query_scalar(&self.statements.delete_one)
            .bind(Json(filter.as_document()))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_target_store_schema() {
        let statements = Statements::for_table("store.cart_items");
        assert!(statements.insert.starts_with("INSERT INTO store.cart_items"));
        assert!(statements.find.contains("body @> $1"));
        assert!(statements.find.contains("IS DISTINCT FROM"));
        assert!(statements.lock_one.contains(FILTER_CLAUSE));
        assert!(statements.delete_one.contains(FILTER_CLAUSE));
        assert!(statements.find_one.ends_with("LIMIT 1"));
        assert!(statements.lock_one.ends_with("FOR UPDATE"));
        assert!(statements.delete_one.contains("RETURNING body"));
    }
}

//! The main access-layer interface.

use crate::backup::{BackupExporter, BackupReport};
use crate::cache::QueryCache;
use crate::connection::ConnectionManager;
use crate::document::{Document, DocumentId};
use crate::errors::VeridocResult;
use crate::migration::{MigrationReport, MigrationRunner};
use crate::query::Query;
use crate::schema::SchemaRegistry;
use crate::veridoc_builder::VeridocBuilder;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The document-store access layer.
///
/// `Veridoc` is the entry point for all operations. It validates documents
/// against the schemas registered per collection, keeps a read-through query
/// cache with per-collection invalidation, and owns the connection to the
/// underlying store.
///
/// `Veridoc` uses the PIMPL (Pointer to Implementation) pattern: clones
/// share the same state through `Arc`, so an instance can be handed to
/// multiple threads cheaply.
///
/// Every mutating operation follows a fixed order: validate, invalidate the
/// collection's cache, then execute against the store. If the store call
/// fails after invalidation the cache is merely empty, never stale.
///
/// # Examples
///
/// ```rust,ignore
/// use veridoc::veridoc::Veridoc;
/// use veridoc::schema::{Schema, FieldType};
/// use veridoc::{doc, query};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Veridoc::builder()
///     .schema("evasao_dados", Schema::new()
///         .field("curso", FieldType::String)
///         .field("semestre", FieldType::Int))
///     .build()?;
///
/// if !db.connect("memory://local", "evasao", 3, Duration::from_secs(2)) {
///     return Err("could not reach the store".into());
/// }
///
/// db.insert("evasao_dados", doc!{ curso: "Engenharia", semestre: 2 })?;
/// let rows = db.find("evasao_dados", &query!{ curso: "Engenharia" })?;
/// assert_eq!(rows.len(), 1);
///
/// db.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Veridoc {
    inner: Arc<VeridocInner>,
}

impl std::fmt::Debug for Veridoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Veridoc").finish_non_exhaustive()
    }
}

struct VeridocInner {
    schemas: SchemaRegistry,
    cache: QueryCache,
    connection: ConnectionManager,
}

impl Veridoc {
    /// Creates a new [VeridocBuilder] for configuring an access layer.
    pub fn builder() -> VeridocBuilder {
        VeridocBuilder::new()
    }

    pub(crate) fn new(
        schemas: SchemaRegistry,
        cache: QueryCache,
        connection: ConnectionManager,
    ) -> Self {
        Veridoc {
            inner: Arc::new(VeridocInner {
                schemas,
                cache,
                connection,
            }),
        }
    }

    /// Establishes the store connection, retrying transient failures up to
    /// `max_retries` attempts with `retry_delay` between them. Returns
    /// whether a connection is live afterwards; connectivity failure is a
    /// value, not a panic.
    pub fn connect(
        &self,
        address: &str,
        database: &str,
        max_retries: u32,
        retry_delay: Duration,
    ) -> bool {
        self.inner
            .connection
            .connect(address, database, max_retries, retry_delay)
    }

    /// Closes the store connection and clears the entire query cache.
    pub fn disconnect(&self) {
        self.inner.connection.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// The schema registry backing this access layer. Schemas may be
    /// registered here as well as through the builder; once registered they
    /// are immutable.
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.inner.schemas
    }

    /// Inserts a single document after validating it against the
    /// collection's schema. Returns the store-assigned identifier.
    pub fn insert(&self, collection: &str, document: Document) -> VeridocResult<DocumentId> {
        let store = self.inner.connection.store()?;
        self.inner.schemas.validate(collection, &document)?;
        self.inner.cache.invalidate(collection);
        let id = store.insert_one(collection, document)?;
        log::info!("inserted 1 document into '{}'", collection);
        Ok(id)
    }

    /// Inserts a batch of documents. Every document is validated before any
    /// write; when one fails, nothing is written and the error names the
    /// offending field's dotted path.
    pub fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VeridocResult<Vec<DocumentId>> {
        let store = self.inner.connection.store()?;
        for document in &documents {
            self.inner.schemas.validate(collection, document)?;
        }
        self.inner.cache.invalidate(collection);
        let ids = store.insert_many(collection, documents)?;
        log::info!("inserted {} documents into '{}'", ids.len(), collection);
        Ok(ids)
    }

    /// Returns the documents matching `query`, serving repeated queries
    /// from the cache until a mutation touches the collection.
    pub fn find(&self, collection: &str, query: &Query) -> VeridocResult<Vec<Document>> {
        let store = self.inner.connection.store()?;
        if let Some(documents) = self.inner.cache.get(collection, query) {
            return Ok(documents);
        }

        let documents = store.find(collection, query)?;
        self.inner.cache.put(collection, query, documents.clone());
        log::info!(
            "retrieved {} documents from '{}' and cached the result",
            documents.len(),
            collection
        );
        Ok(documents)
    }

    /// Sets `fields` on the first document matching `query`, validating
    /// every schema-declared field first. Returns the number of documents
    /// modified.
    pub fn update_one(
        &self,
        collection: &str,
        query: &Query,
        fields: Document,
    ) -> VeridocResult<u64> {
        self.update(collection, query, fields, false)
    }

    /// Sets `fields` on every document matching `query`. Returns the number
    /// of documents modified.
    pub fn update_many(
        &self,
        collection: &str,
        query: &Query,
        fields: Document,
    ) -> VeridocResult<u64> {
        self.update(collection, query, fields, true)
    }

    fn update(
        &self,
        collection: &str,
        query: &Query,
        fields: Document,
        many: bool,
    ) -> VeridocResult<u64> {
        let store = self.inner.connection.store()?;
        self.inner.schemas.validate_fields(collection, &fields)?;
        self.inner.cache.invalidate(collection);
        let modified = if many {
            store.update_many(collection, query, &fields)?
        } else {
            store.update_one(collection, query, &fields)?
        };
        log::info!("updated {} documents in '{}'", modified, collection);
        Ok(modified)
    }

    /// Removes the first document matching `query`. Returns the number
    /// removed.
    pub fn delete_one(&self, collection: &str, query: &Query) -> VeridocResult<u64> {
        self.delete(collection, query, false)
    }

    /// Removes every document matching `query`. Returns the number removed.
    pub fn delete_many(&self, collection: &str, query: &Query) -> VeridocResult<u64> {
        self.delete(collection, query, true)
    }

    fn delete(&self, collection: &str, query: &Query, many: bool) -> VeridocResult<u64> {
        let store = self.inner.connection.store()?;
        self.inner.cache.invalidate(collection);
        let removed = if many {
            store.delete_many(collection, query)?
        } else {
            store.delete_one(collection, query)?
        };
        log::info!("removed {} documents from '{}'", removed, collection);
        Ok(removed)
    }

    /// Applies `transform` to every document matching `filter`, re-validating
    /// and persisting each result. See [MigrationRunner] for the per-item
    /// failure semantics.
    pub fn migrate<F>(
        &self,
        collection: &str,
        filter: &Query,
        transform: F,
    ) -> VeridocResult<MigrationReport>
    where
        F: Fn(&Document) -> VeridocResult<Document>,
    {
        MigrationRunner::new(self).run(collection, filter, transform)
    }

    /// Exports every collection to timestamped JSON files under
    /// `target_dir`. See [BackupExporter] for the per-collection failure
    /// semantics.
    pub fn backup(&self, target_dir: impl AsRef<Path>) -> VeridocResult<BackupReport> {
        BackupExporter::new(self).export(target_dir)
    }

    /// Number of live cache entries, across all collections.
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    pub(crate) fn connection(&self) -> &ConnectionManager {
        &self.inner.connection
    }

    pub(crate) fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub(crate) fn schema_registry(&self) -> &SchemaRegistry {
        &self.inner.schemas
    }
}

//! In-memory storage backend.

use crate::document::{Document, DocumentId, DOC_ID};
use crate::errors::{ErrorKind, VeridocError, VeridocResult};
use crate::query::Query;
use crate::store::{ConnectError, Store, StoreConnector, StoreProvider};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory implementation of a document store.
///
/// # Purpose
/// `InMemoryStore` keeps named collections of documents in concurrent maps,
/// assigning identifiers on insert. Suitable for tests, temporary data, and
/// embedded use where persistence is not required; all data is lost when the
/// store is dropped.
///
/// # Characteristics
/// - **Thread-Safe**: collections live in a `DashMap`, safe to share across
///   threads
/// - **Identity**: assigns a fresh [DocumentId] to every inserted document
/// - **Update semantics**: updates merge the given fields into matching
///   documents and report only documents whose content actually changed
/// - **No Persistence**: nothing survives the process
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    closed: AtomicBool,
    collections: DashMap<String, Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    fn check_open(&self) -> VeridocResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(VeridocError::new(
                "store has been closed",
                ErrorKind::Backend,
            ));
        }
        Ok(())
    }

    // Applies the update fields to a document, skipping the reserved
    // identifier field. Returns the merged document.
    fn merge(document: &Document, fields: &Document) -> VeridocResult<Document> {
        let mut merged = document.clone();
        for (field, value) in fields.iter() {
            if field == DOC_ID {
                continue;
            }
            merged.put(field.clone(), value.clone())?;
        }
        Ok(merged)
    }

    fn update(
        &self,
        collection: &str,
        query: &Query,
        fields: &Document,
        many: bool,
    ) -> VeridocResult<u64> {
        self.check_open()?;
        let mut modified = 0u64;
        if let Some(mut documents) = self.inner.collections.get_mut(collection) {
            for document in documents.iter_mut() {
                if !query.matches(document) {
                    continue;
                }
                let merged = Self::merge(document, fields)?;
                if merged != *document {
                    *document = merged;
                    modified += 1;
                }
                if !many {
                    break;
                }
            }
        }
        Ok(modified)
    }

    fn delete(&self, collection: &str, query: &Query, many: bool) -> VeridocResult<u64> {
        self.check_open()?;
        let mut removed = 0u64;
        if let Some(mut documents) = self.inner.collections.get_mut(collection) {
            if many {
                let before = documents.len();
                documents.retain(|document| !query.matches(document));
                removed = (before - documents.len()) as u64;
            } else if let Some(position) =
                documents.iter().position(|document| query.matches(document))
            {
                documents.remove(position);
                removed = 1;
            }
        }
        Ok(removed)
    }
}

impl StoreProvider for InMemoryStore {
    fn insert_one(&self, collection: &str, document: Document) -> VeridocResult<DocumentId> {
        self.check_open()?;
        let id = DocumentId::random();
        let mut document = document;
        document.set_id(id);
        self.inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VeridocResult<Vec<DocumentId>> {
        self.check_open()?;
        let mut ids = Vec::with_capacity(documents.len());
        let mut entry = self
            .inner
            .collections
            .entry(collection.to_string())
            .or_default();
        for mut document in documents {
            let id = DocumentId::random();
            document.set_id(id);
            entry.push(document);
            ids.push(id);
        }
        Ok(ids)
    }

    fn find(&self, collection: &str, query: &Query) -> VeridocResult<Vec<Document>> {
        self.check_open()?;
        let documents = match self.inner.collections.get(collection) {
            Some(documents) => documents
                .iter()
                .filter(|document| query.matches(document))
                .cloned()
                .collect(),
            None => vec![],
        };
        Ok(documents)
    }

    fn update_one(
        &self,
        collection: &str,
        query: &Query,
        fields: &Document,
    ) -> VeridocResult<u64> {
        self.update(collection, query, fields, false)
    }

    fn update_many(
        &self,
        collection: &str,
        query: &Query,
        fields: &Document,
    ) -> VeridocResult<u64> {
        self.update(collection, query, fields, true)
    }

    fn delete_one(&self, collection: &str, query: &Query) -> VeridocResult<u64> {
        self.delete(collection, query, false)
    }

    fn delete_many(&self, collection: &str, query: &Query) -> VeridocResult<u64> {
        self.delete(collection, query, true)
    }

    fn list_collection_names(&self) -> VeridocResult<Vec<String>> {
        self.check_open()?;
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn ping(&self) -> VeridocResult<()> {
        self.check_open()
    }

    fn close(&self) -> VeridocResult<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A [StoreConnector] handing out the same shared [InMemoryStore] on every
/// open. The default connector of the access layer; also what tests use to
/// observe store contents from outside.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    store: InMemoryStore,
}

impl MemoryConnector {
    pub fn new() -> Self {
        MemoryConnector::default()
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        MemoryConnector { store }
    }

    /// The backing store shared by every connection this connector opens.
    pub fn store(&self) -> InMemoryStore {
        self.store.clone()
    }
}

impl StoreConnector for MemoryConnector {
    fn open(
        &self,
        _address: &str,
        _database: &str,
        _timeout: Duration,
    ) -> Result<Store, ConnectError> {
        Ok(Store::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc, query};

    #[test]
    fn test_insert_one_assigns_id() {
        let store = InMemoryStore::new();
        let id = store.insert_one("users", doc! { name: "Alice" }).unwrap();

        let found = store.find("users", &Query::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), Some(id));
        assert_eq!(found[0].get("name").as_str(), Some("Alice"));
    }

    #[test]
    fn test_insert_many_assigns_distinct_ids() {
        let store = InMemoryStore::new();
        let ids = store
            .insert_many(
                "users",
                vec![doc! { name: "Alice" }, doc! { name: "Bob" }],
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.find("users", &Query::new()).unwrap().len(), 2);
    }

    #[test]
    fn test_find_filters_by_query() {
        let store = InMemoryStore::new();
        store.insert_one("rows", doc! { ano: 2023, curso: "CS" }).unwrap();
        store.insert_one("rows", doc! { ano: 2024, curso: "CS" }).unwrap();

        let found = store.find("rows", &query! { ano: 2023 }).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("ano").as_i64(), Some(2023));
    }

    #[test]
    fn test_find_unknown_collection_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.find("nothing", &Query::new()).unwrap().is_empty());
    }

    #[test]
    fn test_update_one_stops_after_first_match() {
        let store = InMemoryStore::new();
        store.insert_one("rows", doc! { ano: 2023, visto: false }).unwrap();
        store.insert_one("rows", doc! { ano: 2023, visto: false }).unwrap();

        let modified = store
            .update_one("rows", &query! { ano: 2023 }, &doc! { visto: true })
            .unwrap();
        assert_eq!(modified, 1);

        let still_false = store.find("rows", &query! { visto: false }).unwrap();
        assert_eq!(still_false.len(), 1);
    }

    #[test]
    fn test_update_many_touches_all_matches() {
        let store = InMemoryStore::new();
        store.insert_one("rows", doc! { ano: 2023, visto: false }).unwrap();
        store.insert_one("rows", doc! { ano: 2023, visto: false }).unwrap();
        store.insert_one("rows", doc! { ano: 2024, visto: false }).unwrap();

        let modified = store
            .update_many("rows", &query! { ano: 2023 }, &doc! { visto: true })
            .unwrap();
        assert_eq!(modified, 2);
    }

    #[test]
    fn test_update_counts_only_actual_changes() {
        let store = InMemoryStore::new();
        store.insert_one("rows", doc! { ano: 2023, visto: true }).unwrap();

        let modified = store
            .update_many("rows", &query! { ano: 2023 }, &doc! { visto: true })
            .unwrap();
        assert_eq!(modified, 0);
    }

    #[test]
    fn test_update_preserves_id() {
        let store = InMemoryStore::new();
        let id = store.insert_one("rows", doc! { ano: 2023 }).unwrap();

        store
            .update_one("rows", &Query::by_id(id), &doc! { visto: true })
            .unwrap();
        let found = store.find("rows", &Query::by_id(id)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), Some(id));
        assert_eq!(found[0].get("visto").as_bool(), Some(true));
    }

    #[test]
    fn test_delete_one_and_many() {
        let store = InMemoryStore::new();
        store.insert_one("rows", doc! { ano: 2023 }).unwrap();
        store.insert_one("rows", doc! { ano: 2023 }).unwrap();
        store.insert_one("rows", doc! { ano: 2024 }).unwrap();

        assert_eq!(store.delete_one("rows", &query! { ano: 2023 }).unwrap(), 1);
        assert_eq!(store.delete_many("rows", &query! { ano: 2023 }).unwrap(), 1);
        assert_eq!(store.delete_many("rows", &query! { ano: 2023 }).unwrap(), 0);
        assert_eq!(store.find("rows", &Query::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_list_collection_names_sorted() {
        let store = InMemoryStore::new();
        store.insert_one("previsoes", doc! { a: 1 }).unwrap();
        store.insert_one("analises", doc! { a: 1 }).unwrap();

        assert_eq!(
            store.list_collection_names().unwrap(),
            vec!["analises".to_string(), "previsoes".to_string()]
        );
    }

    #[test]
    fn test_operations_fail_after_close() {
        let store = InMemoryStore::new();
        store.insert_one("rows", doc! { a: 1 }).unwrap();
        store.close().unwrap();

        assert!(store.ping().is_err());
        let err = store.find("rows", &Query::new()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Backend);
    }

    #[test]
    fn test_clones_share_data() {
        let store = InMemoryStore::new();
        let clone = store.clone();
        store.insert_one("rows", doc! { a: 1 }).unwrap();
        assert_eq!(clone.find("rows", &Query::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_memory_connector_hands_out_shared_store() {
        let connector = MemoryConnector::new();
        let store = connector
            .open("memory://", "test", Duration::from_secs(1))
            .unwrap();
        store.insert_one("rows", doc! { a: 1 }).unwrap();

        assert_eq!(
            connector.store().find("rows", &Query::new()).unwrap().len(),
            1
        );
    }
}

//! Read-through query cache with per-collection invalidation.

use crate::document::Document;
use crate::query::Query;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    collection: String,
    query: String,
}

impl CacheKey {
    fn new(collection: &str, query: &Query) -> Self {
        CacheKey {
            collection: collection.to_string(),
            query: query.cache_key(),
        }
    }
}

/// In-memory mapping from (collection, canonical query) to the last
/// materialized result list.
///
/// Entries are created on a read miss and destroyed whenever a mutating
/// operation touches their collection; invalidation is coarse-grained
/// (whole collection), never per document. Cloning the cache shares the
/// underlying map, so every component of an access layer observes the same
/// entries.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<DashMap<CacheKey, Vec<Document>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        QueryCache {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Returns the cached result list for a query, if present.
    pub fn get(&self, collection: &str, query: &Query) -> Option<Vec<Document>> {
        let key = CacheKey::new(collection, query);
        let hit = self.entries.get(&key).map(|entry| entry.value().clone());
        if hit.is_some() {
            log::debug!("cache hit for collection '{}' query {}", collection, query);
        }
        hit
    }

    /// Stores the result list for a query.
    pub fn put(&self, collection: &str, query: &Query, documents: Vec<Document>) {
        let key = CacheKey::new(collection, query);
        self.entries.insert(key, documents);
    }

    /// Removes every cached entry belonging to a collection. Entries of
    /// other collections are untouched.
    pub fn invalidate(&self, collection: &str) {
        self.entries.retain(|key, _| key.collection != collection);
        log::debug!("cache invalidated for collection '{}'", collection);
    }

    /// Removes every cached entry of every collection.
    pub fn clear(&self) {
        self.entries.clear();
        log::debug!("cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc, query};

    fn sample_docs() -> Vec<Document> {
        vec![doc! { curso: "CS", ano: 2023 }, doc! { curso: "EE", ano: 2023 }]
    }

    #[test]
    fn test_round_trip() {
        let cache = QueryCache::new();
        let query = query! { ano: 2023 };
        assert_eq!(cache.get("evasao_dados", &query), None);

        cache.put("evasao_dados", &query, sample_docs());
        assert_eq!(cache.get("evasao_dados", &query), Some(sample_docs()));
    }

    #[test]
    fn test_equivalent_queries_share_an_entry() {
        let cache = QueryCache::new();
        let first = Query::new().with("ano", 2023).with("semestre", 1);
        let second = Query::new().with("semestre", 1).with("ano", 2023);

        cache.put("evasao_dados", &first, sample_docs());
        assert_eq!(cache.get("evasao_dados", &second), Some(sample_docs()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_collections_do_not_share_entries() {
        let cache = QueryCache::new();
        let query = query! { ano: 2023 };
        cache.put("evasao_dados", &query, sample_docs());
        assert_eq!(cache.get("analises", &query), None);
    }

    #[test]
    fn test_invalidate_scopes_to_one_collection() {
        let cache = QueryCache::new();
        let query = query! { ano: 2023 };
        cache.put("evasao_dados", &query, sample_docs());
        cache.put("analises", &query, vec![doc! { tipo: "regressao" }]);

        cache.invalidate("evasao_dados");
        assert_eq!(cache.get("evasao_dados", &query), None);
        assert!(cache.get("analises", &query).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_removes_all_queries_of_a_collection() {
        let cache = QueryCache::new();
        cache.put("evasao_dados", &query! { ano: 2023 }, sample_docs());
        cache.put("evasao_dados", &query! { ano: 2024 }, vec![]);
        cache.put("evasao_dados", &Query::new(), sample_docs());

        cache.invalidate("evasao_dados");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = QueryCache::new();
        cache.put("evasao_dados", &query! { ano: 2023 }, sample_docs());
        cache.put("analises", &Query::new(), vec![]);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = QueryCache::new();
        let clone = cache.clone();
        cache.put("evasao_dados", &Query::new(), sample_docs());
        assert_eq!(clone.len(), 1);

        clone.invalidate("evasao_dados");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_replaces_previous_entry() {
        let cache = QueryCache::new();
        let query = query! { ano: 2023 };
        cache.put("evasao_dados", &query, sample_docs());
        cache.put("evasao_dados", &query, vec![]);
        assert_eq!(cache.get("evasao_dados", &query), Some(vec![]));
        assert_eq!(cache.len(), 1);
    }
}

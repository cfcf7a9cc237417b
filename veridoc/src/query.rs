//! Equality queries over collections.
//!
//! A query is a set of field/value pairs; a document matches when every pair
//! equals the document's value for that field (dotted paths reach into
//! nested documents). The empty query matches every document.

use crate::document::{Document, DocumentId, Value, DOC_ID};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// An equality filter over the documents of a collection.
///
/// # Examples
///
/// ```rust
/// use veridoc::query;
///
/// let by_year = query! { ano: 2023 };
/// let all = query! {};
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filters: BTreeMap<String, Value>,
}

impl Query {
    /// Creates an empty query, matching every document of a collection.
    pub fn new() -> Self {
        Query {
            filters: BTreeMap::new(),
        }
    }

    /// Adds an equality condition for a field. Dotted field names address
    /// values inside nested documents.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// A query selecting a single document by its store-assigned identifier.
    pub fn by_id(id: DocumentId) -> Self {
        let mut query = Query::new();
        query.filters.insert(DOC_ID.to_string(), Value::Id(id));
        query
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.filters.iter()
    }

    /// Checks whether a document satisfies every condition of this query.
    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| &document.get(field) == expected)
    }

    /// Renders this query into the deterministic form used as a cache key.
    ///
    /// The field/value pairs are emitted in sorted field order, so two
    /// semantically identical queries built with different insertion orders
    /// produce the same key.
    pub fn cache_key(&self) -> String {
        self.filters
            .iter()
            .map(|(field, value)| format!("{}={:?}", field, value))
            .join("&")
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.cache_key())
    }
}

/// Creates a [Query] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use veridoc::query;
///
/// let query = query! { curso: "Engenharia", ano: 2023 };
/// assert_eq!(query.len(), 2);
/// ```
#[macro_export]
macro_rules! query {
    () => {
        $crate::query::Query::new()
    };

    ($($field:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut query = $crate::query::Query::new();
            $(
                query = query.with(
                    $crate::document::normalize(stringify!($field)),
                    $crate::doc_value!($value),
                );
            )*
            query
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc, query};

    #[test]
    fn test_empty_query_matches_everything() {
        let query = Query::new();
        assert!(query.is_empty());
        assert!(query.matches(&doc! { anything: 1 }));
        assert!(query.matches(&Document::new()));
    }

    #[test]
    fn test_matches_on_equality() {
        let query = query! { ano: 2023 };
        assert!(query.matches(&doc! { ano: 2023, curso: "CS" }));
        assert!(!query.matches(&doc! { ano: 2024 }));
        assert!(!query.matches(&doc! { curso: "CS" }));
    }

    #[test]
    fn test_matches_multiple_conditions() {
        let query = query! { ano: 2023, semestre: 1 };
        assert!(query.matches(&doc! { ano: 2023, semestre: 1 }));
        assert!(!query.matches(&doc! { ano: 2023, semestre: 2 }));
    }

    #[test]
    fn test_matches_dotted_path() {
        let query = Query::new().with("periodo.ano", 2023);
        assert!(query.matches(&doc! { periodo: { ano: 2023, semestre: 1 } }));
        assert!(!query.matches(&doc! { periodo: { ano: 2024 } }));
    }

    #[test]
    fn test_by_id_matches_only_that_document() {
        let mut first = doc! { curso: "CS" };
        let mut second = doc! { curso: "CS" };
        let id = crate::document::DocumentId::random();
        first.set_id(id);
        second.set_id(crate::document::DocumentId::random());

        let query = Query::by_id(id);
        assert!(query.matches(&first));
        assert!(!query.matches(&second));
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let first = Query::new().with("b", 2).with("a", 1);
        let second = Query::new().with("a", 1).with("b", 2);
        assert_eq!(first.cache_key(), second.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_values() {
        let first = query! { ano: 2023 };
        let second = query! { ano: 2024 };
        assert_ne!(first.cache_key(), second.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_value_types() {
        let as_int = query! { ano: 2023 };
        let as_string = query! { ano: "2023" };
        assert_ne!(as_int.cache_key(), as_string.cache_key());
    }

    #[test]
    fn test_empty_query_cache_key() {
        assert_eq!(Query::new().cache_key(), "");
    }

    #[test]
    fn test_query_macro_builds_expected_filters() {
        let query = query! { curso: "CS", ano: 2023 };
        assert_eq!(query.len(), 2);
        let fields: Vec<&String> = query.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["ano", "curso"]);
    }
}

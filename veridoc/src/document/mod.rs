//! Documents and their field values.
//!
//! A document is an ordered-irrelevant mapping from field name to [Value].
//! Nested documents are supported; the value inside a nested document can be
//! retrieved with a dotted key (e.g. `document.get("metadata.fonte_dados")`).
//!
//! The `_id` field is reserved: it holds the [DocumentId] assigned by the
//! store on insert and cannot be written through [Document::put].

mod document_id;
mod value;

pub use document_id::DocumentId;
pub use value::Value;

use crate::errors::{ErrorKind, VeridocError, VeridocResult};
use im::OrdMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// The reserved identifier field of a document.
pub const DOC_ID: &str = "_id";

/// Separator for addressing fields of nested documents.
pub(crate) const FIELD_SEPARATOR: char = '.';

/// Represents a document using a persistent ordered map.
///
/// Documents are composed of key-value pairs. The key is always a [String]
/// and the value is a [Value]. Cloning is O(1) via structural sharing, so
/// documents move freely between the cache, the store and callers without
/// deep copies.
///
/// # Examples
///
/// ```ignore
/// let mut doc = Document::new();
/// doc.put("curso", "Ciência da Computação")?;
/// doc.put("semestre", 2)?;
/// assert_eq!(doc.get("semestre"), Value::I64(2));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the specified key in this
    /// document, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, is the reserved `_id` field, or
    /// contains the field separator (nested values are written as nested
    /// documents, not through dotted keys).
    pub fn put<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) -> VeridocResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("document does not support empty keys");
            return Err(VeridocError::new(
                "document does not support empty keys",
                ErrorKind::InvalidOperation,
            ));
        }

        if key == DOC_ID {
            log::error!("document id is assigned by the store and cannot be set manually");
            return Err(VeridocError::new(
                "document id is assigned by the store and cannot be set manually",
                ErrorKind::InvalidOperation,
            ));
        }

        if key.contains(FIELD_SEPARATOR) {
            return Err(VeridocError::new(
                &format!(
                    "key '{}' contains the field separator; write nested values as nested documents",
                    key
                ),
                ErrorKind::InvalidOperation,
            ));
        }

        self.data.insert(key, value.into());
        Ok(())
    }

    /// Returns the [Value] associated with the specified key, or
    /// [Value::Null] if this document contains no mapping for the key.
    ///
    /// Dotted keys resolve into nested documents:
    ///
    /// ```ignore
    /// let doc = doc!{ metadata: { fonte_dados: "censo" } };
    /// assert_eq!(doc.get("metadata.fonte_dados"), Value::String("censo".to_string()));
    /// ```
    pub fn get(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value) => value.clone(),
            None => {
                // Only resolve as a nested path if not found at top level
                if key.contains(FIELD_SEPARATOR) {
                    self.deep_get(key)
                } else {
                    Value::Null
                }
            }
        }
    }

    fn deep_get(&self, key: &str) -> Value {
        let mut current = self.clone();
        let mut segments = key.split(FIELD_SEPARATOR).peekable();

        while let Some(segment) = segments.next() {
            match current.data.get(segment) {
                Some(Value::Document(nested)) if segments.peek().is_some() => {
                    current = nested.clone();
                }
                Some(value) if segments.peek().is_none() => return value.clone(),
                _ => return Value::Null,
            }
        }
        Value::Null
    }

    /// Returns a reference to the top-level value for `key`, distinguishing
    /// an absent field (`None`) from a field explicitly set to null
    /// (`Some(&Value::Null)`). Schema validation relies on this distinction.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Removes a top-level field, returning its previous value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Returns the store-assigned identifier of this document, if it has
    /// been inserted.
    pub fn id(&self) -> Option<DocumentId> {
        match self.data.get(DOC_ID) {
            Some(Value::Id(id)) => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: DocumentId) {
        self.data.insert(DOC_ID.to_string(), Value::Id(id));
    }

    /// Returns a copy of this document with the reserved `_id` field
    /// removed. Used when a full document is turned into a set of update
    /// fields.
    pub fn without_id(&self) -> Document {
        let mut copy = self.clone();
        copy.data.remove(DOC_ID);
        copy
    }

    /// Iterates over the fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", rendered)
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.data.len()))?;
        for (key, value) in self.data.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Strips the quotes `stringify!` leaves around literal keys in the `doc!`
/// and `query!` macros.
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use veridoc::doc;
///
/// // Empty document
/// let empty = doc!{};
///
/// // Simple key-value pairs
/// let simple = doc!{
///     curso: "Engenharia",
///     semestre: 2
/// };
///
/// // Nested documents; literal keys may be quoted
/// let nested = doc!{
///     curso: "Engenharia",
///     desistentes: {
///         "1C": 5,
///         "2C": 3
///     }
/// };
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document
    () => {
        $crate::document::Document::new()
    };

    // match a document with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::document::Document::new();
            $(
                doc.put($crate::document::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the `doc!` and `query!` macros.
/// Handles nested documents and expressions.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::document::Value::Document($crate::doc!{ $($key : $value),* })
    };

    // match an expression (variable, function call, literal, etc.)
    ($value:expr) => {
        $crate::document::Value::from($value)
    };
}

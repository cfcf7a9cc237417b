//! Storage backend abstractions.
//!
//! The access layer treats the underlying document store as an opaque
//! collaborator: named collections of documents with insert, find, update,
//! delete and list-collections operations plus a connectivity probe. The
//! [StoreProvider] trait is that contract; [StoreConnector] is how a
//! connection to a concrete backend is established.

pub mod memory;

pub use memory::{InMemoryStore, MemoryConnector};

use crate::document::{Document, DocumentId};
use crate::errors::VeridocResult;
use crate::query::Query;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Low-level interface every storage backend must implement.
///
/// # Key Responsibilities
/// - **Document operations**: insert, find, update and delete documents in
///   named collections
/// - **Catalog**: enumerate collection names
/// - **Liveness**: answer a cheap connectivity probe
/// - **Lifecycle**: release resources on close
///
/// # Thread Safety
/// Implementers must be `Send + Sync` for safe use in concurrent contexts.
pub trait StoreProvider: Send + Sync {
    /// Inserts a single document and returns its store-assigned identifier.
    fn insert_one(&self, collection: &str, document: Document) -> VeridocResult<DocumentId>;

    /// Inserts a batch of documents and returns their assigned identifiers
    /// in input order.
    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VeridocResult<Vec<DocumentId>>;

    /// Returns every document of the collection matching the query.
    fn find(&self, collection: &str, query: &Query) -> VeridocResult<Vec<Document>>;

    /// Sets the given fields on the first matching document; returns the
    /// number of documents actually modified (0 or 1).
    fn update_one(&self, collection: &str, query: &Query, fields: &Document)
        -> VeridocResult<u64>;

    /// Sets the given fields on every matching document; returns the number
    /// of documents actually modified.
    fn update_many(
        &self,
        collection: &str,
        query: &Query,
        fields: &Document,
    ) -> VeridocResult<u64>;

    /// Removes the first matching document; returns the number removed.
    fn delete_one(&self, collection: &str, query: &Query) -> VeridocResult<u64>;

    /// Removes every matching document; returns the number removed.
    fn delete_many(&self, collection: &str, query: &Query) -> VeridocResult<u64>;

    /// Enumerates the names of all collections holding documents.
    fn list_collection_names(&self) -> VeridocResult<Vec<String>>;

    /// Lightweight liveness probe.
    fn ping(&self) -> VeridocResult<()>;

    /// Releases the backend handle. Operations after close fail.
    fn close(&self) -> VeridocResult<()>;
}

/// High-level wrapper for a storage backend.
///
/// `Store` wraps a concrete [StoreProvider] in an `Arc` for cheap,
/// thread-safe sharing, and implements `Deref` for seamless access to the
/// provider's methods.
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn StoreProvider>,
}

impl Store {
    pub fn new<T: StoreProvider + 'static>(inner: T) -> Self {
        Store {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for Store {
    type Target = Arc<dyn StoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// Failure to establish a connection to a backend.
///
/// The two variants drive the retry policy of the connection manager:
/// unreachable backends are worth retrying, rejected configurations are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The backend could not be reached (transient; the attempt may be
    /// retried)
    Unreachable(String),
    /// The address or credentials were refused (retrying cannot help)
    Rejected(String),
}

impl Display for ConnectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Unreachable(reason) => write!(f, "store unreachable: {}", reason),
            ConnectError::Rejected(reason) => write!(f, "connection rejected: {}", reason),
        }
    }
}

impl Error for ConnectError {}

/// Establishes connections to a concrete storage backend.
///
/// The connection manager calls `open` once per connect attempt; the
/// connector resolves the address and database name into a live [Store]
/// handle within the given timeout, or reports how it failed.
pub trait StoreConnector: Send + Sync {
    fn open(&self, address: &str, database: &str, timeout: Duration) -> Result<Store, ConnectError>;
}

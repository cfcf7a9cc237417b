//! Builder for configuring a [Veridoc] access layer.

use crate::cache::QueryCache;
use crate::connection::ConnectionManager;
use crate::errors::VeridocResult;
use crate::schema::{Schema, SchemaRegistry};
use crate::store::memory::MemoryConnector;
use crate::store::StoreConnector;
use crate::veridoc::Veridoc;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configures and creates [Veridoc] instances.
///
/// Each built instance owns its own schema registry, query cache and
/// connection manager, so tests can construct isolated access layers
/// instead of sharing process-wide state.
///
/// # Examples
///
/// ```rust,ignore
/// let db = Veridoc::builder()
///     .schema("previsoes", Schema::new().field("curso", FieldType::String))
///     .connect_timeout(Duration::from_secs(2))
///     .build()?;
/// ```
pub struct VeridocBuilder {
    connector: Option<Arc<dyn StoreConnector>>,
    schemas: Vec<(String, Schema)>,
    connect_timeout: Duration,
}

impl VeridocBuilder {
    pub fn new() -> Self {
        VeridocBuilder {
            connector: None,
            schemas: Vec::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Uses the given connector to reach the storage backend. Defaults to a
    /// fresh in-memory store when not set.
    pub fn connector<C: StoreConnector + 'static>(mut self, connector: C) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Declares the schema of a collection.
    pub fn schema(mut self, collection: impl Into<String>, schema: Schema) -> Self {
        self.schemas.push((collection.into(), schema));
        self
    }

    /// Bounded timeout for each connection attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the access layer.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when the same collection is given
    /// two schemas.
    pub fn build(self) -> VeridocResult<Veridoc> {
        let registry = SchemaRegistry::new();
        for (collection, schema) in self.schemas {
            registry.register(&collection, schema)?;
        }

        let cache = QueryCache::new();
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(MemoryConnector::new()));
        let connection = ConnectionManager::new(connector, cache.clone(), self.connect_timeout);

        Ok(Veridoc::new(registry, cache, connection))
    }
}

impl Default for VeridocBuilder {
    fn default() -> Self {
        Self::new()
    }
}

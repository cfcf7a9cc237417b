//! Bulk transform-and-persist passes over a collection.

use crate::document::{Document, DocumentId};
use crate::errors::{ErrorKind, VeridocError, VeridocResult};
use crate::query::Query;
use crate::veridoc::Veridoc;

/// Applies a caller-supplied transform to every document matching a filter,
/// re-validating and persisting each result.
///
/// Documents are fetched straight from the store so the pass always sees
/// fresh data, never a cached result. Each document is processed
/// independently: a failing transform, validation or persist is recorded in
/// the report and does not abort the remaining documents. The collection's
/// cache is invalidated exactly once at the end of the pass.
///
/// The transform receives a document and returns a new one; it must not
/// mutate its input (the `&Document` signature enforces this) and its output
/// is re-validated against the collection's schema before persistence.
pub struct MigrationRunner {
    db: Veridoc,
}

impl MigrationRunner {
    pub fn new(db: &Veridoc) -> Self {
        MigrationRunner { db: db.clone() }
    }

    /// Runs one migration pass. Returns how many documents were modified
    /// and which ones failed, with per-item attribution.
    pub fn run<F>(
        &self,
        collection: &str,
        filter: &Query,
        transform: F,
    ) -> VeridocResult<MigrationReport>
    where
        F: Fn(&Document) -> VeridocResult<Document>,
    {
        let store = self.db.connection().store()?;
        let documents = store.find(collection, filter)?;

        let mut report = MigrationReport::default();
        for document in documents {
            let id = match document.id() {
                Some(id) => id,
                None => {
                    report.record_failure(
                        None,
                        VeridocError::new(
                            "document has no store-assigned identifier",
                            ErrorKind::Migration,
                        ),
                    );
                    continue;
                }
            };

            let migrated = match transform(&document) {
                Ok(migrated) => migrated,
                Err(err) => {
                    report.record_failure(
                        Some(id),
                        VeridocError::new_with_cause(
                            &format!("transform failed for document {}", id),
                            ErrorKind::Migration,
                            err,
                        ),
                    );
                    continue;
                }
            };

            if let Err(err) = self.db.schema_registry().validate(collection, &migrated) {
                report.record_failure(Some(id), err.into());
                continue;
            }

            match store.update_one(collection, &Query::by_id(id), &migrated.without_id()) {
                Ok(modified) => report.migrated += modified,
                Err(err) => report.record_failure(Some(id), err),
            }
        }

        // one coarse invalidation at the end, not one per document
        self.db.cache().invalidate(collection);
        log::info!(
            "migration modified {} documents in '{}' ({} failures)",
            report.migrated,
            collection,
            report.failures.len()
        );
        Ok(report)
    }
}

/// Outcome of a migration pass.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Number of documents actually modified in the store
    pub migrated: u64,
    /// Documents the pass could not process, with the error for each
    pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, id: Option<DocumentId>, error: VeridocError) {
        log::warn!(
            "migration skipped document {}: {}",
            id.map(|id| id.to_string()).unwrap_or_else(|| "<no id>".to_string()),
            error
        );
        self.failures.push(MigrationFailure { id, error });
    }
}

/// A single document the migration pass had to skip.
#[derive(Debug)]
pub struct MigrationFailure {
    /// The document's identifier, when it had one
    pub id: Option<DocumentId>,
    pub error: VeridocError,
}

//! Point-in-time export of every collection to JSON files.

use crate::document::Document;
use crate::errors::{VeridocError, VeridocResult};
use crate::query::Query;
use crate::store::Store;
use crate::veridoc::Veridoc;
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializes every collection of the store to timestamped files.
///
/// One file per collection is written as
/// `{dir}/{collection}_backup_{YYYYMMDD_HHMMSS}.json`: a pretty-printed
/// UTF-8 JSON array of the collection's documents, identifiers coerced to
/// their string form, non-ASCII text preserved literally. Documents are
/// fetched straight from the store so the export never reflects a partial
/// or invalidated cache state.
///
/// A collection that fails to export is reported in the result and does not
/// prevent the remaining collections from being attempted.
pub struct BackupExporter {
    db: Veridoc,
}

impl BackupExporter {
    pub fn new(db: &Veridoc) -> Self {
        BackupExporter { db: db.clone() }
    }

    /// Exports all collections into `target_dir`, creating the directory if
    /// absent.
    pub fn export(&self, target_dir: impl AsRef<Path>) -> VeridocResult<BackupReport> {
        let store = self.db.connection().store()?;
        let target_dir = target_dir.as_ref();

        if !target_dir.exists() {
            fs::create_dir_all(target_dir)?;
            log::info!("created backup directory '{}'", target_dir.display());
        }

        // one timestamp for the whole run, so the files of a backup pass
        // sort together
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        let mut report = BackupReport::default();
        for collection in store.list_collection_names()? {
            match export_collection(&store, &collection, target_dir, &timestamp) {
                Ok(path) => {
                    log::info!(
                        "backed up collection '{}' to '{}'",
                        collection,
                        path.display()
                    );
                    report.files.push(path);
                }
                Err(err) => {
                    log::error!("backup of collection '{}' failed: {}", collection, err);
                    report.failures.push((collection, err));
                }
            }
        }
        Ok(report)
    }
}

fn export_collection(
    store: &Store,
    collection: &str,
    target_dir: &Path,
    timestamp: &str,
) -> VeridocResult<PathBuf> {
    let documents = store.find(collection, &Query::new())?;
    let path = target_dir.join(format!("{}_backup_{}.json", collection, timestamp));

    let file = fs::File::create(&path)?;
    write_pretty_json(file, &documents)?;
    Ok(path)
}

fn write_pretty_json(writer: impl std::io::Write, documents: &[Document]) -> VeridocResult<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    documents.serialize(&mut serializer)?;
    Ok(())
}

/// Outcome of a backup run.
#[derive(Debug, Default)]
pub struct BackupReport {
    /// The files written, one per successfully exported collection
    pub files: Vec<PathBuf>,
    /// Collections that could not be exported, with the error for each
    pub failures: Vec<(String, VeridocError)>,
}

impl BackupReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use crate::errors::ErrorKind;
    use crate::store::memory::InMemoryStore;
    use crate::store::{ConnectError, StoreConnector, StoreProvider};
    use crate::veridoc::Veridoc;
    use crate::{doc, query::Query};
    use std::time::Duration;

    const NO_DELAY: Duration = Duration::from_millis(0);

    fn connected_db() -> Veridoc {
        let db = Veridoc::builder().build().unwrap();
        assert!(db.connect("memory://", "test", 1, NO_DELAY));
        db
    }

    fn backup_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_backup_requires_connection() {
        let db = Veridoc::builder().build().unwrap();
        let err = db.backup("anywhere").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotConnected);
    }

    #[test]
    fn test_backup_writes_one_file_per_collection() {
        let db = connected_db();
        db.insert("evasao_dados", doc! { curso: "CS", ano: 2023 }).unwrap();
        db.insert("analises", doc! { tipo_analise: "tendencia" }).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let report = db.backup(dir.path()).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.files.len(), 2);
        let files = backup_files(dir.path());
        assert_eq!(files.len(), 2);

        let names: Vec<String> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names[0].starts_with("analises_backup_"));
        assert!(names[0].ends_with(".json"));
        assert!(names[1].starts_with("evasao_dados_backup_"));
    }

    #[test]
    fn test_backup_creates_missing_target_dir() {
        let db = connected_db();
        db.insert("rows", doc! { a: 1 }).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("ainda/nao/existe");
        let report = db.backup(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(report.files.len(), 1);
    }

    #[test]
    fn test_backup_content_is_a_json_array_with_string_ids() {
        let db = connected_db();
        let id = db
            .insert("evasao_dados", doc! { curso: "Computação", ano: 2023 })
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let report = db.backup(dir.path()).unwrap();

        let content = fs::read_to_string(&report.files[0]).unwrap();
        // non-ASCII characters are preserved literally
        assert!(content.contains("Computação"));

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["curso"], "Computação");
        assert_eq!(rows[0]["ano"], 2023);
        // the identifier is coerced to its string form
        assert_eq!(rows[0]["_id"], id.to_string());
    }

    #[test]
    fn test_backup_of_empty_store_writes_nothing() {
        let db = connected_db();
        let dir = tempfile::tempdir().unwrap();
        let report = db.backup(dir.path()).unwrap();
        assert!(report.files.is_empty());
        assert!(report.is_complete());
    }

    /// A store whose find fails for one specific collection.
    struct PartiallyBroken {
        inner: InMemoryStore,
        broken: String,
    }

    impl StoreProvider for PartiallyBroken {
        fn insert_one(&self, collection: &str, document: Document) -> VeridocResult<DocumentId> {
            self.inner.insert_one(collection, document)
        }

        fn insert_many(
            &self,
            collection: &str,
            documents: Vec<Document>,
        ) -> VeridocResult<Vec<DocumentId>> {
            self.inner.insert_many(collection, documents)
        }

        fn find(&self, collection: &str, query: &Query) -> VeridocResult<Vec<Document>> {
            if collection == self.broken {
                return Err(VeridocError::new("read refused", ErrorKind::Backend));
            }
            self.inner.find(collection, query)
        }

        fn update_one(
            &self,
            collection: &str,
            query: &Query,
            fields: &Document,
        ) -> VeridocResult<u64> {
            self.inner.update_one(collection, query, fields)
        }

        fn update_many(
            &self,
            collection: &str,
            query: &Query,
            fields: &Document,
        ) -> VeridocResult<u64> {
            self.inner.update_many(collection, query, fields)
        }

        fn delete_one(&self, collection: &str, query: &Query) -> VeridocResult<u64> {
            self.inner.delete_one(collection, query)
        }

        fn delete_many(&self, collection: &str, query: &Query) -> VeridocResult<u64> {
            self.inner.delete_many(collection, query)
        }

        fn list_collection_names(&self) -> VeridocResult<Vec<String>> {
            self.inner.list_collection_names()
        }

        fn ping(&self) -> VeridocResult<()> {
            self.inner.ping()
        }

        fn close(&self) -> VeridocResult<()> {
            self.inner.close()
        }
    }

    struct PartiallyBrokenConnector {
        store: InMemoryStore,
        broken: String,
    }

    impl StoreConnector for PartiallyBrokenConnector {
        fn open(
            &self,
            _address: &str,
            _database: &str,
            _timeout: Duration,
        ) -> Result<Store, ConnectError> {
            Ok(Store::new(PartiallyBroken {
                inner: self.store.clone(),
                broken: self.broken.clone(),
            }))
        }
    }

    #[test]
    fn test_failed_collection_does_not_stop_the_others() {
        let backing = InMemoryStore::new();
        backing.insert_one("boa", doc! { a: 1 }).unwrap();
        backing.insert_one("quebrada", doc! { a: 1 }).unwrap();

        let db = Veridoc::builder()
            .connector(PartiallyBrokenConnector {
                store: backing,
                broken: "quebrada".to_string(),
            })
            .build()
            .unwrap();
        assert!(db.connect("memory://", "test", 1, NO_DELAY));

        let dir = tempfile::tempdir().unwrap();
        let report = db.backup(dir.path()).unwrap();

        assert_eq!(report.files.len(), 1);
        assert!(report.files[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("boa_backup_"));

        assert_eq!(report.failures.len(), 1);
        let (collection, error) = &report.failures[0];
        assert_eq!(collection, "quebrada");
        assert_eq!(error.kind(), &ErrorKind::Backend);
        assert!(!report.is_complete());
    }
}

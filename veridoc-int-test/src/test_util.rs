use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use veridoc::doc;
use veridoc::document::Document;
use veridoc::schema::{FieldType, Schema};
use veridoc::store::memory::{InMemoryStore, MemoryConnector};
use veridoc::store::{ConnectError, Store, StoreConnector};
use veridoc::veridoc::Veridoc;

pub const NO_DELAY: Duration = Duration::from_millis(0);

/// A connected access layer plus a handle on its backing store, so tests
/// can observe and manipulate stored documents from outside the layer.
pub struct TestContext {
    db: Veridoc,
    store: InMemoryStore,
}

impl TestContext {
    pub fn db(&self) -> &Veridoc {
        &self.db
    }

    /// Direct access to the backing store, bypassing validation and cache.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

/// Builds a connected access layer with the three domain schemas
/// registered, backed by a fresh in-memory store.
pub fn create_test_context() -> TestContext {
    let connector = MemoryConnector::new();
    let store = connector.store();
    let db = Veridoc::builder()
        .connector(connector)
        .schema("evasao_dados", evasao_schema())
        .schema("analises", analises_schema())
        .schema("previsoes", previsoes_schema())
        .build()
        .expect("Failed to build access layer");
    assert!(
        db.connect("memory://local", "evasao", 3, NO_DELAY),
        "Failed to connect to the in-memory store"
    );
    TestContext { db, store }
}

/// Schema of the dropout-rate collection.
pub fn evasao_schema() -> Schema {
    Schema::new()
        .field("curso", FieldType::String)
        .field("turno", FieldType::String)
        .field("semestre", FieldType::Int)
        .field("ano", FieldType::Int)
        .nested(
            "desistentes",
            Schema::new()
                .field("1C", FieldType::Int)
                .field("2C", FieldType::Int)
                .field("3C", FieldType::Int)
                .field("4C", FieldType::Int)
                .field("5C", FieldType::Int)
                .field("6C", FieldType::Int),
        )
        .nested(
            "metadata",
            Schema::new()
                .field("data_insercao", FieldType::DateTime)
                .field("ultima_atualizacao", FieldType::DateTime)
                .field("fonte_dados", FieldType::String),
        )
}

/// Schema of the analysis-results collection. Parameter and result payloads
/// are free-form nested documents.
pub fn analises_schema() -> Schema {
    Schema::new()
        .field("tipo_analise", FieldType::String)
        .nested("parametros", Schema::new())
        .nested("resultados", Schema::new())
        .field("data_analise", FieldType::DateTime)
        .nested(
            "metadata",
            Schema::new()
                .field("versao_modelo", FieldType::String)
                .field("precisao", FieldType::Float)
                .field("observacoes", FieldType::String),
        )
}

/// Schema of the prediction collection.
pub fn previsoes_schema() -> Schema {
    Schema::new()
        .field("curso", FieldType::String)
        .nested(
            "periodo",
            Schema::new()
                .field("ano", FieldType::Int)
                .field("semestre", FieldType::Int),
        )
        .field("valor_previsto", FieldType::Float)
        .nested(
            "intervalo_confianca",
            Schema::new()
                .field("inferior", FieldType::Float)
                .field("superior", FieldType::Float),
        )
        .nested(
            "metadata",
            Schema::new()
                .field("modelo_usado", FieldType::String)
                .field("data_previsao", FieldType::DateTime)
                .nested("parametros_modelo", Schema::new()),
        )
}

/// A well-formed dropout-rate row.
pub fn evasao_row(curso: &str, ano: i64, semestre: i64) -> Document {
    let agora = chrono::Utc::now();
    doc! {
        curso: curso,
        turno: "noturno",
        semestre: semestre,
        ano: ano,
        desistentes: {
            "1C": 5, "2C": 3, "3C": 2, "4C": 1, "5C": 0, "6C": 0
        },
        metadata: {
            data_insercao: agora,
            ultima_atualizacao: agora,
            fonte_dados: "censo escolar"
        }
    }
}

/// A connector that fails transiently a fixed number of times before
/// handing out its in-memory store.
pub struct FlakyConnector {
    attempts: Arc<AtomicU32>,
    failures: u32,
    store: InMemoryStore,
}

impl FlakyConnector {
    pub fn new(failures: u32) -> Self {
        FlakyConnector {
            attempts: Arc::new(AtomicU32::new(0)),
            failures,
            store: InMemoryStore::new(),
        }
    }

    pub fn attempts(&self) -> Arc<AtomicU32> {
        self.attempts.clone()
    }
}

impl StoreConnector for FlakyConnector {
    fn open(
        &self,
        _address: &str,
        _database: &str,
        _timeout: Duration,
    ) -> Result<Store, ConnectError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            Err(ConnectError::Unreachable("connection reset".to_string()))
        } else {
            Ok(Store::new(self.store.clone()))
        }
    }
}

/// A connector that rejects every attempt outright, as a malformed address
/// would.
pub struct RejectingConnector {
    attempts: Arc<AtomicU32>,
}

impl RejectingConnector {
    pub fn new() -> Self {
        RejectingConnector {
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn attempts(&self) -> Arc<AtomicU32> {
        self.attempts.clone()
    }
}

impl Default for RejectingConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreConnector for RejectingConnector {
    fn open(
        &self,
        _address: &str,
        _database: &str,
        _timeout: Duration,
    ) -> Result<Store, ConnectError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ConnectError::Rejected("malformed address".to_string()))
    }
}

//! # Veridoc - Schema-Validating Document Store Access Layer
//!
//! Veridoc is an access layer over a document store: named collections of
//! structured documents, validated against declared schemas before every
//! write, with a read-through query cache and a retrying connection
//! lifecycle.
//!
//! ## Key Features
//!
//! - **Schema validation**: one recursive schema per collection; declared
//!   fields are required (possibly null), unknown extra fields are permitted
//! - **Query caching**: repeated reads are served from memory until a
//!   mutation invalidates the collection's entries
//! - **Bounded retry**: transient connection failures are retried with a
//!   fixed delay; configuration failures fail fast
//! - **Bulk migration**: transform-and-persist passes with per-document
//!   failure attribution
//! - **Point-in-time export**: every collection serialized to timestamped
//!   JSON files
//! - **Pluggable backend**: the store is a trait; an in-memory
//!   implementation ships with the crate
//! - **Clean API**: PIMPL pattern provides a stable, thread-safe interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use veridoc::veridoc::Veridoc;
//! use veridoc::schema::{Schema, FieldType};
//! use veridoc::{doc, query};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Veridoc::builder()
//!     .schema("evasao_dados", Schema::new()
//!         .field("curso", FieldType::String)
//!         .field("semestre", FieldType::Int))
//!     .build()?;
//!
//! if !db.connect("memory://local", "evasao", 3, Duration::from_secs(2)) {
//!     return Err("store unreachable".into());
//! }
//!
//! db.insert("evasao_dados", doc!{ curso: "Engenharia", semestre: 2 })?;
//! let rows = db.find("evasao_dados", &query!{ curso: "Engenharia" })?;
//! assert_eq!(rows.len(), 1);
//!
//! db.disconnect();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`backup`] - Point-in-time export of collections to JSON files
//! - [`cache`] - Read-through query cache with per-collection invalidation
//! - [`connection`] - Connection lifecycle with bounded retry
//! - [`document`] - Documents, field values and identifiers
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - Bulk transform-and-persist passes
//! - [`query`] - Equality queries and cache-key canonicalization
//! - [`schema`] - Schema declaration and recursive validation
//! - [`store`] - Storage backend abstractions and the in-memory backend
//! - [`veridoc`] - The main access-layer interface
//! - [`veridoc_builder`] - Builder for configuring an access layer

pub mod backup;
pub mod cache;
pub mod connection;
pub mod document;
pub mod errors;
pub mod migration;
pub mod query;
pub mod schema;
pub mod store;
pub mod veridoc;
pub mod veridoc_builder;

//! Connection lifecycle management.
//!
//! Owns the single live [Store] handle. Establishing a connection retries
//! transient failures with a fixed delay up to a bounded number of attempts;
//! failures are returned as values, never panics. Lifecycle transitions are
//! serialized, and tearing a connection down always clears the query cache
//! so a later reconnect can never serve stale reads.

use crate::cache::QueryCache;
use crate::errors::{ErrorKind, VeridocError, VeridocResult};
use crate::store::{ConnectError, Store, StoreConnector};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Owns the lifecycle of the connection to the underlying store.
///
/// At most one handle is live at a time; opening a new one tears down any
/// prior handle first. Cloning shares the same state.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    connector: Arc<dyn StoreConnector>,
    handle: RwLock<Option<Store>>,
    // serializes connect/disconnect transitions
    lifecycle: Mutex<()>,
    cache: QueryCache,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub(crate) fn new(
        connector: Arc<dyn StoreConnector>,
        cache: QueryCache,
        connect_timeout: Duration,
    ) -> Self {
        ConnectionManager {
            inner: Arc::new(ConnectionInner {
                connector,
                handle: RwLock::new(None),
                lifecycle: Mutex::new(()),
                cache,
                connect_timeout,
            }),
        }
    }

    /// Establishes a connection to the store, retrying transient failures.
    ///
    /// Each attempt closes any existing handle, opens a new one with the
    /// configured timeout and issues a liveness probe. A transient failure
    /// sleeps `retry_delay` and retries, up to `max_retries` attempts total;
    /// a rejected address or configuration fails immediately without
    /// consuming the remaining retries.
    ///
    /// Returns `true` on success, `false` after exhausting the attempts or
    /// on a non-retryable failure.
    pub fn connect(
        &self,
        address: &str,
        database: &str,
        max_retries: u32,
        retry_delay: Duration,
    ) -> bool {
        let _lifecycle = self.inner.lifecycle.lock();

        let mut attempts = 0;
        while attempts < max_retries {
            self.teardown();

            let outcome = self
                .inner
                .connector
                .open(address, database, self.inner.connect_timeout)
                .and_then(|store| match store.ping() {
                    Ok(()) => Ok(store),
                    Err(err) => {
                        let _ = store.close();
                        Err(ConnectError::Unreachable(format!(
                            "liveness probe failed: {}",
                            err
                        )))
                    }
                });

            match outcome {
                Ok(store) => {
                    *self.inner.handle.write() = Some(store);
                    log::info!("connected to document store at '{}/{}'", address, database);
                    return true;
                }
                Err(ConnectError::Unreachable(reason)) => {
                    attempts += 1;
                    if attempts < max_retries {
                        log::warn!(
                            "connection attempt {} failed: {}; retrying in {:?}",
                            attempts,
                            reason,
                            retry_delay
                        );
                        thread::sleep(retry_delay);
                    } else {
                        log::error!(
                            "failed to connect after {} attempts: {}",
                            max_retries,
                            reason
                        );
                        return false;
                    }
                }
                Err(ConnectError::Rejected(reason)) => {
                    log::error!("connection to '{}/{}' rejected: {}", address, database, reason);
                    return false;
                }
            }
        }
        false
    }

    /// Closes the handle, nulls the internal state and clears the entire
    /// query cache.
    pub fn disconnect(&self) {
        let _lifecycle = self.inner.lifecycle.lock();
        if self.teardown() {
            log::info!("disconnected from document store; query cache cleared");
        }
    }

    // Drops the current handle if any, closing it and clearing the cache.
    // Returns whether a handle existed. Callers hold the lifecycle lock.
    fn teardown(&self) -> bool {
        let previous = self.inner.handle.write().take();
        match previous {
            Some(store) => {
                if let Err(err) = store.close() {
                    log::warn!("error closing store handle: {}", err);
                }
                self.inner.cache.clear();
                true
            }
            None => false,
        }
    }

    /// Returns the live store handle.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::NotConnected] when no connection is
    /// established.
    pub fn store(&self) -> VeridocResult<Store> {
        self.inner.handle.read().as_ref().cloned().ok_or_else(|| {
            VeridocError::new("not connected to the document store", ErrorKind::NotConnected)
        })
    }

    pub fn is_connected(&self) -> bool {
        self.inner.handle.read().is_some()
    }
}

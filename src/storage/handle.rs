// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Store Connection Handle
//!
//! [`StoreHandle`] owns the process's connection to the marketplace database.
//! It is created at startup, cloned into the application state and handed to
//! every handler. Handlers never open the database themselves.
//!
//! ## Lifecycle
//!
//! 1. `main` makes one connection attempt with [`StoreHandle::connect`].
//! 2. [`ConnectionSupervisor`] runs as a background task and re-attempts the
//!    connection every [`RECONNECT_DELAY`] while the handle is disconnected.
//! 3. A handler that hits an I/O fault calls [`StoreHandle::invalidate`]; the
//!    supervisor reopens the database on its next sweep.
//!
//! Invalidating only empties the slot. Handlers already running keep their
//! `Arc<MarketDatabase>`, so the old redb file stays open until the last one
//! returns. Reopen attempts made before then fail with
//! `DatabaseAlreadyOpen`, which the supervisor logs separately and retries.
//!
//! The HTTP server is served regardless of the connection state. Requests
//! that need storage fail until the connection is restored.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::database::{MarketDatabase, StoreError, StoreResult};
use super::seed::load_services;

/// Fixed delay between reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Live connection state, as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

struct HandleInner {
    path: PathBuf,
    seed_path: Option<PathBuf>,
    slot: RwLock<Option<Arc<MarketDatabase>>>,
}

/// Shared, explicitly owned handle to the marketplace database.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<HandleInner>,
}

impl StoreHandle {
    /// Create a disconnected handle for the database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_seed(path, None)
    }

    /// Seed the service catalog from `seed_path` on every successful connect.
    pub fn with_seed(path: impl Into<PathBuf>, seed_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                path: path.into(),
                seed_path,
                slot: RwLock::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Open the database if not already connected.
    pub fn connect(&self) -> StoreResult<()> {
        if self.state() == ConnectionState::Connected {
            return Ok(());
        }

        let db = MarketDatabase::open(&self.inner.path)?;

        if let Some(seed_path) = &self.inner.seed_path {
            match load_services(seed_path) {
                Ok(services) => {
                    let count = db.upsert_services(&services)?;
                    info!(path = %seed_path.display(), services = count, "Service catalog seeded");
                }
                Err(e) => {
                    warn!(path = %seed_path.display(), error = %e, "Skipping service catalog seed");
                }
            }
        }

        let mut slot = self.inner.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(db));
        info!(path = %self.inner.path.display(), "Database connected");
        Ok(())
    }

    /// Current connection state, read from the live slot.
    pub fn state(&self) -> ConnectionState {
        let slot = self.inner.slot.read().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// The connected database, or [`StoreError::Disconnected`].
    pub fn database(&self) -> StoreResult<Arc<MarketDatabase>> {
        let slot = self.inner.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.clone().ok_or(StoreError::Disconnected)
    }

    /// Drop the current connection so the supervisor reopens it.
    pub fn invalidate(&self) {
        let mut slot = self.inner.slot.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            warn!(path = %self.inner.path.display(), "Database connection lost");
        }
    }
}

/// Background task that keeps a [`StoreHandle`] connected.
pub struct ConnectionSupervisor {
    handle: StoreHandle,
    retry_delay: Duration,
}

impl ConnectionSupervisor {
    pub fn new(handle: StoreHandle) -> Self {
        Self {
            handle,
            retry_delay: RECONNECT_DELAY,
        }
    }

    /// Override the delay between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run the reconnect loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(supervisor.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            retry_secs = self.retry_delay.as_secs(),
            "Database connection supervisor starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {},
                _ = shutdown.cancelled() => {
                    info!("Database connection supervisor shutting down");
                    return;
                }
            }

            if self.handle.state() == ConnectionState::Connected {
                continue;
            }

            match self.handle.connect() {
                Ok(()) => {}
                Err(e) if e.is_already_open() => {
                    info!(
                        retry_secs = self.retry_delay.as_secs(),
                        "Previous database connection still in use, will retry"
                    );
                }
                Err(e) => warn!(
                    error = %e,
                    retry_secs = self.retry_delay.as_secs(),
                    "Database connection failed, will retry"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_is_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::new(dir.path().join("db.redb"));
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert!(matches!(handle.database(), Err(StoreError::Disconnected)));
    }

    #[test]
    fn connect_and_invalidate_toggle_state() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::new(dir.path().join("db.redb"));

        handle.connect().unwrap();
        assert_eq!(handle.state(), ConnectionState::Connected);
        assert!(handle.database().is_ok());

        // Connecting again is a no-op
        handle.connect().unwrap();

        handle.invalidate();
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn connect_seeds_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("services.json");
        std::fs::write(
            &seed,
            r#"[{"serviceId":"svc1","name":"GPU","provider":"Acme","price":2.5,"priceInAITK":10}]"#,
        )
        .unwrap();

        let handle = StoreHandle::with_seed(dir.path().join("db.redb"), Some(seed));
        handle.connect().unwrap();

        let services = handle.database().unwrap().list_active_services().unwrap();
        assert_eq!(services.len(), 1);
    }

    #[test]
    fn bad_seed_does_not_block_connection() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::with_seed(
            dir.path().join("db.redb"),
            Some(dir.path().join("missing.json")),
        );
        handle.connect().unwrap();
        assert_eq!(handle.state(), ConnectionState::Connected);
    }

    #[test]
    fn connect_fails_when_path_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file
        let handle = StoreHandle::new(dir.path());
        assert!(handle.connect().is_err());
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn reopen_waits_for_in_flight_users_of_old_connection() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::new(dir.path().join("db.redb"));
        handle.connect().unwrap();

        let in_flight = handle.database().unwrap();
        handle.invalidate();

        let err = handle.connect().unwrap_err();
        assert!(err.is_already_open(), "unexpected error: {err}");
        assert_eq!(handle.state(), ConnectionState::Disconnected);

        drop(in_flight);
        handle.connect().unwrap();
        assert_eq!(handle.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn supervisor_reconnects_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::new(dir.path().join("db.redb"));
        let shutdown = CancellationToken::new();

        let supervisor =
            ConnectionSupervisor::new(handle.clone()).with_retry_delay(Duration::from_millis(10));
        let task = tokio::spawn(supervisor.run(shutdown.clone()));

        for _ in 0..200 {
            if handle.state() == ConnectionState::Connected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(handle.state(), ConnectionState::Connected);

        shutdown.cancel();
        task.await.unwrap();
    }
}

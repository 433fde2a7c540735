// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::ChainConfig;
use crate::error::ApiError;
use crate::storage::{MarketDatabase, StoreError, StoreHandle};

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub chain: Arc<ChainConfig>,
}

impl AppState {
    pub fn new(store: StoreHandle, chain: ChainConfig) -> Self {
        Self {
            store,
            chain: Arc::new(chain),
        }
    }

    /// Run a storage operation against the connected database.
    ///
    /// I/O faults drop the connection so the supervisor can reopen it.
    pub fn with_db<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&MarketDatabase) -> Result<T, StoreError>,
    {
        let db = self.store.database()?;
        op(db.as_ref()).map_err(|e| {
            if e.is_connection_fault() {
                self.store.invalidate();
            }
            ApiError::from(e)
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_state;
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn with_db_fails_when_disconnected() {
        let (state, _dir) = test_state();
        state.store.invalidate();

        let err = state.with_db(|db| db.get_user("0xABC")).unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "database not connected");
    }

    #[test]
    fn with_db_maps_not_found() {
        let (state, _dir) = test_state();
        let err = state
            .with_db(|db| db.confirm_transaction("tx_missing", "0x1"))
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}

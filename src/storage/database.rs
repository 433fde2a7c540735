// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded marketplace database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: wallet_address → serialized User
//! - `services`: service_id → serialized Service
//! - `transactions`: tx_id → serialized Transaction
//! - `wallet_tx_index`: composite key (wallet|!created_at|tx_id) → tx_id
//!
//! Keys double as uniqueness constraints: a wallet address can only ever map
//! to one user and a transaction id to one transaction.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::records::{Service, Transaction, TxStatus, User};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const SERVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("services");

const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Index: composite key → tx_id.
/// Key format: `len(wallet)_be | wallet | !created_at_micros_be | tx_id` for
/// newest-first range scans.
const WALLET_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("wallet_tx_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database not connected")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the file is still held open by an earlier connection.
    pub fn is_already_open(&self) -> bool {
        matches!(
            self,
            StoreError::RedbDatabase(redb::DatabaseError::DatabaseAlreadyOpen)
        )
    }

    /// Whether the underlying file became unusable and must be reopened.
    pub fn is_connection_fault(&self) -> bool {
        match self {
            StoreError::Disconnected => true,
            StoreError::RedbStorage(e) => is_io(e),
            StoreError::RedbTransaction(redb::TransactionError::Storage(e)) => is_io(e),
            StoreError::RedbCommit(redb::CommitError::Storage(e)) => is_io(e),
            StoreError::RedbTable(redb::TableError::Storage(e)) => is_io(e),
            _ => false,
        }
    }
}

fn is_io(e: &redb::StorageError) -> bool {
    matches!(e, redb::StorageError::Io(_))
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a confirm request against a stored transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// The transaction moved from pending to confirmed.
    Confirmed(Transaction),
    /// Already confirmed with the same hash; nothing changed.
    AlreadyConfirmed(Transaction),
    /// Already confirmed with a different hash; nothing changed.
    HashMismatch(Transaction),
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Length-prefixed wallet bytes. Exact per wallet, so one address can never
/// be a prefix of another's keys.
fn make_prefix(wallet_address: &str) -> Vec<u8> {
    let addr = wallet_address.as_bytes();
    let mut prefix = Vec::with_capacity(4 + addr.len());
    prefix.extend_from_slice(&(addr.len() as u32).to_be_bytes());
    prefix.extend_from_slice(addr);
    prefix
}

/// Build a composite key for the wallet_tx_index table.
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_index_key(wallet_address: &str, created_at_micros: i64, tx_id: &str) -> Vec<u8> {
    let mut key = make_prefix(wallet_address);
    key.reserve(8 + tx_id.len());
    key.extend_from_slice(&(!(created_at_micros as u64)).to_be_bytes());
    key.extend_from_slice(tx_id.as_bytes());
    key
}

// =============================================================================
// MarketDatabase
// =============================================================================

/// Embedded ACID marketplace database.
pub struct MarketDatabase {
    db: Database,
}

impl MarketDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(SERVICES)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(WALLET_TX_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user by wallet address.
    pub fn get_user(&self, wallet_address: &str) -> StoreResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(wallet_address)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Return the user for `wallet_address`, creating it on first sight.
    ///
    /// The second element is `true` when the user was created by this call.
    /// The check and the insert share one write transaction, so concurrent
    /// callers for the same address observe a single record.
    pub fn get_or_create_user(&self, wallet_address: &str) -> StoreResult<(User, bool)> {
        if let Some(user) = self.get_user(wallet_address)? {
            return Ok((user, false));
        }

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(USERS)?;

            let existing = table
                .get(wallet_address)?
                .map(|value| value.value().to_vec());

            match existing {
                Some(bytes) => (serde_json::from_slice(&bytes)?, false),
                None => {
                    let user = User::new(wallet_address);
                    let json = serde_json::to_vec(&user)?;
                    table.insert(wallet_address, json.as_slice())?;
                    (user, true)
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Look up a service by id, active or not.
    pub fn get_service(&self, service_id: &str) -> StoreResult<Option<Service>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SERVICES)?;
        match table.get(service_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All services with `active = true`, ordered by service id.
    pub fn list_active_services(&self) -> StoreResult<Vec<Service>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SERVICES)?;

        let mut services = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let service: Service = serde_json::from_slice(value.value())?;
            if service.active {
                services.push(service);
            }
        }
        Ok(services)
    }

    /// Insert or replace catalog entries in a single write transaction.
    pub fn upsert_services(&self, services: &[Service]) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SERVICES)?;
            for service in services {
                let json = serde_json::to_vec(service)?;
                table.insert(service.service_id.as_str(), json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(services.len())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Insert a new transaction and its wallet index entry.
    ///
    /// Fails with [`StoreError::Conflict`] if the id is already taken; an
    /// existing record is never overwritten.
    pub fn insert_transaction(&self, tx: &Transaction) -> StoreResult<()> {
        let json = serde_json::to_vec(tx)?;
        let key = make_index_key(
            &tx.wallet_address,
            tx.created_at.timestamp_micros(),
            &tx.tx_id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut tx_table = write_txn.open_table(TRANSACTIONS)?;
            if tx_table.get(tx.tx_id.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("Transaction {}", tx.tx_id)));
            }
            tx_table.insert(tx.tx_id.as_str(), json.as_slice())?;

            let mut idx_table = write_txn.open_table(WALLET_TX_INDEX)?;
            idx_table.insert(key.as_slice(), tx.tx_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single transaction by id.
    pub fn get_transaction(&self, tx_id: &str) -> StoreResult<Option<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        match table.get(tx_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Confirm a transaction with the client-reported on-chain hash.
    ///
    /// Pending transactions become confirmed. A confirmed transaction is
    /// never rewritten: the outcome reports whether the hash matched.
    pub fn confirm_transaction(&self, tx_id: &str, tx_hash: &str) -> StoreResult<ConfirmOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(TRANSACTIONS)?;

            let existing_bytes = {
                let existing = table
                    .get(tx_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("Transaction {tx_id}")))?;
                existing.value().to_vec()
            };

            let mut tx: Transaction = serde_json::from_slice(&existing_bytes)?;
            match tx.status {
                TxStatus::Pending => {
                    tx.mark_confirmed(tx_hash);
                    let json = serde_json::to_vec(&tx)?;
                    table.insert(tx_id, json.as_slice())?;
                    ConfirmOutcome::Confirmed(tx)
                }
                TxStatus::Confirmed if tx.tx_hash.as_deref() == Some(tx_hash) => {
                    ConfirmOutcome::AlreadyConfirmed(tx)
                }
                TxStatus::Confirmed => ConfirmOutcome::HashMismatch(tx),
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// All transactions of a wallet, newest first.
    pub fn list_transactions_by_wallet(&self, wallet_address: &str) -> StoreResult<Vec<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(WALLET_TX_INDEX)?;
        let tx_table = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(wallet_address);
        let mut results = Vec::new();

        for entry in idx_table.range(prefix.as_slice()..)? {
            let (key, tx_id) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }

            match tx_table.get(tx_id.value())? {
                Some(value) => results.push(serde_json::from_slice(value.value())?),
                None => {
                    tracing::warn!(tx_id = %tx_id.value(), "Index entry without transaction record");
                }
            }
        }

        Ok(results)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn temp_db() -> (MarketDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = MarketDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn service(id: &str, price_in_aitk: f64, active: bool) -> Service {
        Service {
            service_id: id.to_string(),
            name: format!("Service {id}"),
            provider: "Acme AI".to_string(),
            price: 1.0,
            price_in_aitk,
            active,
        }
    }

    #[test]
    fn get_or_create_user_is_idempotent() {
        let (db, _dir) = temp_db();

        let (first, created) = db.get_or_create_user("0xABC").unwrap();
        assert!(created);
        assert_eq!(first.balance, 0.0);

        let (second, created_again) = db.get_or_create_user("0xABC").unwrap();
        assert!(!created_again);
        assert_eq!(second, first);
    }

    #[test]
    fn concurrent_connects_create_one_user() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(MarketDatabase::open(&dir.path().join("race.redb")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || db.get_or_create_user("0xRACE").unwrap())
            })
            .collect();

        let results: Vec<(User, bool)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|(_, created)| *created).count();
        assert_eq!(created, 1);

        let stored = db.get_user("0xRACE").unwrap().unwrap();
        for (user, _) in results {
            assert_eq!(user.created_at, stored.created_at);
        }
    }

    #[test]
    fn unknown_user_is_none() {
        let (db, _dir) = temp_db();
        assert!(db.get_user("0xnobody").unwrap().is_none());
    }

    #[test]
    fn list_active_services_filters_inactive() {
        let (db, _dir) = temp_db();
        db.upsert_services(&[
            service("svc1", 10.0, true),
            service("svc2", 20.0, false),
            service("svc3", 30.0, true),
        ])
        .unwrap();

        let active = db.list_active_services().unwrap();
        let ids: Vec<_> = active.iter().map(|s| s.service_id.as_str()).collect();
        assert_eq!(ids, vec!["svc1", "svc3"]);

        // Inactive services remain addressable by id
        assert!(db.get_service("svc2").unwrap().is_some());
    }

    #[test]
    fn insert_transaction_rejects_duplicate_id() {
        let (db, _dir) = temp_db();
        let tx = Transaction::new_pending("0xABC", &service("svc1", 10.0, true));
        db.insert_transaction(&tx).unwrap();

        let mut clash = tx.clone();
        clash.amount = 99.0;
        let err = db.insert_transaction(&clash).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = db.get_transaction(&tx.tx_id).unwrap().unwrap();
        assert_eq!(stored.amount, 10.0);
    }

    #[test]
    fn confirm_moves_pending_to_confirmed() {
        let (db, _dir) = temp_db();
        let tx = Transaction::new_pending("0xABC", &service("svc1", 10.0, true));
        db.insert_transaction(&tx).unwrap();

        let outcome = db.confirm_transaction(&tx.tx_id, "0xdeadbeef").unwrap();
        let ConfirmOutcome::Confirmed(confirmed) = outcome else {
            panic!("expected Confirmed, got {outcome:?}");
        };
        assert_eq!(confirmed.status, TxStatus::Confirmed);
        assert_eq!(confirmed.tx_hash.as_deref(), Some("0xdeadbeef"));
        assert_eq!(confirmed.created_at, tx.created_at);

        let stored = db.get_transaction(&tx.tx_id).unwrap().unwrap();
        assert_eq!(stored, confirmed);
    }

    #[test]
    fn reconfirm_never_overwrites_hash() {
        let (db, _dir) = temp_db();
        let tx = Transaction::new_pending("0xABC", &service("svc1", 10.0, true));
        db.insert_transaction(&tx).unwrap();
        db.confirm_transaction(&tx.tx_id, "0xfirst").unwrap();

        let same = db.confirm_transaction(&tx.tx_id, "0xfirst").unwrap();
        assert!(matches!(same, ConfirmOutcome::AlreadyConfirmed(_)));

        let other = db.confirm_transaction(&tx.tx_id, "0xsecond").unwrap();
        assert!(matches!(other, ConfirmOutcome::HashMismatch(_)));

        let stored = db.get_transaction(&tx.tx_id).unwrap().unwrap();
        assert_eq!(stored.tx_hash.as_deref(), Some("0xfirst"));
    }

    #[test]
    fn confirm_unknown_transaction_is_not_found() {
        let (db, _dir) = temp_db();
        let err = db.confirm_transaction("tx_missing", "0x1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn list_by_wallet_is_newest_first_and_scoped() {
        let (db, _dir) = temp_db();
        let svc = service("svc1", 10.0, true);

        for i in 0..3 {
            let mut tx = Transaction::new_pending("0xABC", &svc);
            tx.tx_id = format!("tx_{i}");
            tx.created_at = Utc::now() - Duration::seconds(10 - i);
            db.insert_transaction(&tx).unwrap();
        }
        // Address that extends "0xABC" must not leak into its history
        let mut other = Transaction::new_pending("0xABCD", &svc);
        other.tx_id = "tx_other".to_string();
        db.insert_transaction(&other).unwrap();

        let listed = db.list_transactions_by_wallet("0xABC").unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.tx_id.as_str()).collect();
        assert_eq!(ids, vec!["tx_2", "tx_1", "tx_0"]);

        assert!(db.list_transactions_by_wallet("0xnobody").unwrap().is_empty());
    }

    #[test]
    fn make_index_key_ordering() {
        // Newer timestamps should produce smaller composite keys (descending)
        let key_old = make_index_key("0xaddr", 1000, "tx1");
        let key_new = make_index_key("0xaddr", 2000, "tx2");
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }
}

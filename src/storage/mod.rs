// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Marketplace Storage
//!
//! Persistence for the three marketplace record kinds (users, services and
//! transactions) in an embedded redb database.
//!
//! ## Layout
//!
//! - [`records`]: the stored documents
//! - [`database`]: tables and atomic operations over them
//! - [`handle`]: the owned connection handle and its reconnect supervisor
//! - [`seed`]: catalog seeding from a JSON file
//!
//! All consistency guarantees come from redb write transactions, which are
//! serialized. No in-process locks or caches sit in front of the database.

pub mod database;
pub mod handle;
pub mod records;
pub mod seed;

pub use database::{ConfirmOutcome, MarketDatabase, StoreError, StoreResult};
pub use handle::{ConnectionState, ConnectionSupervisor, StoreHandle, RECONNECT_DELAY};
pub use records::{Service, Transaction, TxStatus, User};
pub use seed::{load_services, SeedError};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AITK Marketplace - Token-priced Service Marketplace Backend
//!
//! This crate registers wallet-identified users, lists services priced in
//! the AITK utility token and records purchase transactions from creation
//! (`pending`) to client-reported blockchain confirmation (`confirmed`).
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `config` - Environment configuration
//! - `storage` - Embedded redb database and its connection supervisor

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

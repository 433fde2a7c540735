// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted marketplace records.
//!
//! Records are stored as JSON documents and serialized with the same
//! camelCase field names the HTTP API returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A wallet-identified marketplace user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Wallet address, unique across users.
    pub wallet_address: String,
    /// Stored AITK balance. No operation in this service changes it.
    #[serde(default)]
    pub balance: f64,
    /// When the wallet first connected.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a zero balance.
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            balance: 0.0,
            created_at: Utc::now(),
        }
    }
}

/// A purchasable service in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Catalog key.
    pub service_id: String,
    pub name: String,
    pub provider: String,
    /// Fiat-equivalent price.
    pub price: f64,
    /// Price in AITK token units.
    #[serde(rename = "priceInAITK")]
    pub price_in_aitk: f64,
    /// Only active services are listed.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Created, waiting for the client to pay on-chain
    #[default]
    Pending,
    /// The client reported the on-chain transaction hash
    Confirmed,
}

/// A purchase of a service by a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server-generated identifier.
    pub tx_id: String,
    pub wallet_address: String,
    pub service_id: String,
    /// The service's `priceInAITK` at creation time.
    pub amount: f64,
    pub status: TxStatus,
    /// On-chain hash, set on confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a pending purchase of `service`, priced from the catalog.
    pub fn new_pending(wallet_address: impl Into<String>, service: &Service) -> Self {
        let created_at = Utc::now();
        Self {
            tx_id: generate_tx_id(created_at),
            wallet_address: wallet_address.into(),
            service_id: service.service_id.clone(),
            amount: service.price_in_aitk,
            status: TxStatus::Pending,
            tx_hash: None,
            created_at,
        }
    }

    /// Mark the transaction as confirmed with the client-reported hash.
    pub fn mark_confirmed(&mut self, tx_hash: impl Into<String>) {
        self.status = TxStatus::Confirmed;
        self.tx_hash = Some(tx_hash.into());
    }
}

/// `tx_<millis>_<random>`. The random part keeps ids distinct within one tick.
fn generate_tx_id(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("tx_{}_{}", now.timestamp_millis(), &random[..12])
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Every response is a JSON
//! envelope carrying `success: bool`; failures use
//! [`ErrorBody`](crate::error::ErrorBody).
//!
//! Request bodies implement [`RequestSchema`]: they declare their required
//! fields and are checked with `validator` before a handler sees them.
//!
//! ## Model Categories
//!
//! - **Health**: process, database and chain configuration status
//! - **Catalog**: active services
//! - **Wallets**: connect and balance lookup
//! - **Transactions**: create, confirm and history

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::extract::RequestSchema;
use crate::storage::{ConnectionState, Service, Transaction, User};

// =============================================================================
// Validation Helpers
// =============================================================================

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// =============================================================================
// Health Models
// =============================================================================

/// Chain configuration echoed by the health endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlockchainInfo {
    pub network: String,
    #[serde(rename = "aitkToken", skip_serializing_if = "Option::is_none")]
    pub aitk_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" while the process answers.
    pub status: String,
    /// Service display name.
    pub service: String,
    pub blockchain: BlockchainInfo,
    /// Live database connection state.
    pub database: ConnectionState,
    /// RFC 3339 time of the check.
    pub timestamp: String,
}

// =============================================================================
// Catalog Models
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceListResponse {
    pub success: bool,
    pub total: usize,
    pub services: Vec<Service>,
}

// =============================================================================
// Wallet Models
// =============================================================================

/// Request to register (or re-fetch) a wallet.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub wallet_address: String,
}

impl RequestSchema for ConnectWalletRequest {
    const REQUIRED_FIELDS: &'static [&'static str] = &["walletAddress"];
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectWalletResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub success: bool,
    pub wallet_address: String,
    pub balance: f64,
}

// =============================================================================
// Transaction Models
// =============================================================================

/// Request to open a purchase of a service.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub wallet_address: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub service_id: String,
    /// Amount shown to the client. The stored amount always comes from the
    /// service's `priceInAITK`.
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
}

impl RequestSchema for CreateTransactionRequest {
    const REQUIRED_FIELDS: &'static [&'static str] = &["walletAddress", "serviceId", "amount"];
}

/// What the client needs to submit the on-chain payment itself.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub tx_id: String,
    /// Amount to pay, in AITK.
    pub amount: f64,
    /// Service name.
    pub service: String,
    #[serde(rename = "aitkToken", skip_serializing_if = "Option::is_none")]
    pub aitk_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTransactionResponse {
    pub success: bool,
    pub transaction: PaymentInstructions,
}

/// Request to confirm a transaction with its on-chain hash.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTransactionRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub tx_id: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub tx_hash: String,
}

impl RequestSchema for ConfirmTransactionRequest {
    const REQUIRED_FIELDS: &'static [&'static str] = &["txId", "txHash"];
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmTransactionResponse {
    pub success: bool,
    pub message: String,
    pub transaction: Transaction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub success: bool,
    pub total: usize,
    pub transactions: Vec<Transaction>,
}

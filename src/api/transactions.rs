// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Purchase transaction endpoints.
//!
//! The lifecycle is `pending → confirmed`. This service never talks to the
//! chain: `create` hands the client what it needs to pay on-chain itself and
//! `confirm` records the hash the client reports. That hash is NOT verified
//! against an actual transfer.

use axum::{extract::State, Json};

use crate::{
    api::extract::{ApiPath, ValidatedJson},
    error::ApiError,
    models::{
        ConfirmTransactionRequest, ConfirmTransactionResponse, CreateTransactionRequest,
        CreateTransactionResponse, PaymentInstructions, TransactionListResponse,
    },
    state::AppState,
    storage::{ConfirmOutcome, StoreError, Transaction},
};

/// Open a pending purchase of a service.
///
/// The stored amount is the service's `priceInAITK`; the request `amount`
/// is required but never stored.
#[utoipa::path(
    post,
    path = "/api/transactions/create",
    tag = "Transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 200, description = "Pending transaction created", body = CreateTransactionResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorBody),
        (status = 404, description = "Service not found", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody)
    )
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateTransactionRequest>,
) -> Result<Json<CreateTransactionResponse>, ApiError> {
    // Existence only; inactive services can still be purchased by id
    let service = state
        .with_db(|db| db.get_service(&request.service_id))?
        .ok_or_else(|| ApiError::not_found("Service not found"))?;

    let tx = Transaction::new_pending(&request.wallet_address, &service);
    state.with_db(|db| db.insert_transaction(&tx))?;

    if tx.amount != request.amount {
        tracing::debug!(
            tx_id = %tx.tx_id,
            requested = request.amount,
            price = tx.amount,
            "Client amount differs from catalog price"
        );
    }
    tracing::info!(
        tx_id = %tx.tx_id,
        wallet = %tx.wallet_address,
        service_id = %tx.service_id,
        amount = tx.amount,
        "Transaction created"
    );

    let chain = &state.chain;
    Ok(Json(CreateTransactionResponse {
        success: true,
        transaction: PaymentInstructions {
            tx_id: tx.tx_id,
            amount: tx.amount,
            service: service.name,
            aitk_token: chain.aitk_token.clone(),
            router: chain.router.clone(),
            rpc_url: chain.rpc_url.clone(),
        },
    }))
}

/// Confirm a transaction with the client-reported on-chain hash.
///
/// Confirming again with the same hash is a no-op. A different hash for an
/// already confirmed transaction is rejected and the stored hash is kept.
#[utoipa::path(
    post,
    path = "/api/transactions/confirm",
    tag = "Transactions",
    request_body = ConfirmTransactionRequest,
    responses(
        (status = 200, description = "Transaction confirmed", body = ConfirmTransactionResponse),
        (status = 400, description = "Missing fields or conflicting hash", body = crate::error::ErrorBody),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody)
    )
)]
pub async fn confirm_transaction(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ConfirmTransactionRequest>,
) -> Result<Json<ConfirmTransactionResponse>, ApiError> {
    let outcome = state
        .with_db(|db| match db.confirm_transaction(&request.tx_id, &request.tx_hash) {
            Err(StoreError::NotFound(_)) => Err(StoreError::NotFound("Transaction".to_string())),
            other => other,
        })?;

    let transaction = match outcome {
        ConfirmOutcome::Confirmed(tx) => {
            tracing::info!(tx_id = %tx.tx_id, tx_hash = %request.tx_hash, "Transaction confirmed");
            tx
        }
        ConfirmOutcome::AlreadyConfirmed(tx) => {
            tracing::debug!(tx_id = %tx.tx_id, "Transaction already confirmed with same hash");
            tx
        }
        ConfirmOutcome::HashMismatch(tx) => {
            tracing::warn!(
                tx_id = %tx.tx_id,
                stored = tx.tx_hash.as_deref().unwrap_or_default(),
                submitted = %request.tx_hash,
                "Rejected confirmation with a different hash"
            );
            return Err(ApiError::bad_request(
                "Transaction already confirmed with a different txHash",
            ));
        }
    };

    Ok(Json(ConfirmTransactionResponse {
        success: true,
        message: "Transaction confirmed".to_string(),
        transaction,
    }))
}

/// List a wallet's transactions, newest first.
///
/// Unknown wallets yield an empty list rather than 404.
#[utoipa::path(
    get,
    path = "/api/transactions/{walletAddress}",
    tag = "Transactions",
    params(
        ("walletAddress" = String, Path, description = "Wallet address")
    ),
    responses(
        (status = 200, description = "Transaction history", body = TransactionListResponse),
        (status = 400, description = "Undecodable wallet address", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody)
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    ApiPath(wallet_address): ApiPath<String>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let transactions = state.with_db(|db| db.list_transactions_by_wallet(&wallet_address))?;

    Ok(Json(TransactionListResponse {
        success: true,
        total: transactions.len(),
        transactions,
    }))
}

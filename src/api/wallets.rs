// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet registration and balance endpoints.
//!
//! Wallet addresses are taken as given. Ownership is not verified.

use axum::{extract::State, Json};

use crate::{
    api::extract::{ApiPath, ValidatedJson},
    error::ApiError,
    models::{BalanceResponse, ConnectWalletRequest, ConnectWalletResponse},
    state::AppState,
};

/// Register a wallet, or return the existing user for it.
///
/// Idempotent: repeated calls return the record created by the first one.
#[utoipa::path(
    post,
    path = "/api/auth/connect",
    tag = "Wallets",
    request_body = ConnectWalletRequest,
    responses(
        (status = 200, description = "User for the wallet", body = ConnectWalletResponse),
        (status = 400, description = "walletAddress missing", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody)
    )
)]
pub async fn connect_wallet(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ConnectWalletRequest>,
) -> Result<Json<ConnectWalletResponse>, ApiError> {
    let (user, created) = state.with_db(|db| db.get_or_create_user(&request.wallet_address))?;

    if created {
        tracing::info!(wallet = %user.wallet_address, "New wallet connected");
    }

    Ok(Json(ConnectWalletResponse {
        success: true,
        user,
    }))
}

/// Get the stored balance of a registered wallet.
#[utoipa::path(
    get,
    path = "/api/balance/{walletAddress}",
    tag = "Wallets",
    params(
        ("walletAddress" = String, Path, description = "Wallet address")
    ),
    responses(
        (status = 200, description = "Stored balance", body = BalanceResponse),
        (status = 400, description = "Undecodable wallet address", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody)
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    ApiPath(wallet_address): ApiPath<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user = state
        .with_db(|db| db.get_user(&wallet_address))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(BalanceResponse {
        success: true,
        wallet_address,
        balance: user.balance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::state::test_support::test_state;

    fn connect_request(address: &str) -> ValidatedJson<ConnectWalletRequest> {
        ValidatedJson(ConnectWalletRequest {
            wallet_address: address.to_string(),
        })
    }

    #[tokio::test]
    async fn connect_twice_returns_same_user() {
        let (state, _dir) = test_state();

        let Json(first) = connect_wallet(State(state.clone()), connect_request("0xABC"))
            .await
            .expect("first connect succeeds");
        let Json(second) = connect_wallet(State(state.clone()), connect_request("0xABC"))
            .await
            .expect("second connect succeeds");

        assert!(first.success);
        assert_eq!(first.user.balance, 0.0);
        assert_eq!(first.user, second.user);
        assert_eq!(first.user.created_at, second.user.created_at);
    }

    #[tokio::test]
    async fn balance_of_connected_wallet_is_zero() {
        let (state, _dir) = test_state();
        connect_wallet(State(state.clone()), connect_request("0xABC"))
            .await
            .unwrap();

        let Json(response) = get_balance(State(state), ApiPath("0xABC".to_string()))
            .await
            .expect("balance lookup succeeds");
        assert!(response.success);
        assert_eq!(response.wallet_address, "0xABC");
        assert_eq!(response.balance, 0.0);
    }

    #[tokio::test]
    async fn balance_of_unknown_wallet_is_not_found() {
        let (state, _dir) = test_state();
        let err = get_balance(State(state), ApiPath("0xnobody".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "User not found");
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};

use crate::models::{BlockchainInfo, HealthResponse};
use crate::state::AppState;

/// Display name reported by the health endpoint.
pub const SERVICE_NAME: &str = "AITK Marketplace Backend";

/// Health check endpoint handler.
///
/// Always returns 200 while the process is up. The `database` field reflects
/// the live connection state of the store handle.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let chain = &state.chain;

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        blockchain: BlockchainInfo {
            network: chain.network.clone(),
            aitk_token: chain.aitk_token.clone(),
            router: chain.router.clone(),
            rpc: chain.rpc_url.clone(),
        },
        database: state.store.state(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

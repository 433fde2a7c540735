// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service catalog endpoint.

use axum::{extract::State, Json};

use crate::{error::ApiError, models::ServiceListResponse, state::AppState};

/// List all active services.
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Catalog",
    responses(
        (status = 200, description = "Active services", body = ServiceListResponse),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody)
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ServiceListResponse>, ApiError> {
    let services = state.with_db(|db| db.list_active_services())?;

    Ok(Json(ServiceListResponse {
        success: true,
        total: services.len(),
        services,
    }))
}

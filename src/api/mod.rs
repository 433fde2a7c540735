// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::InvalidHeaderValue, HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::{ApiError, ErrorBody},
    models::{
        BalanceResponse, BlockchainInfo, ConfirmTransactionRequest, ConfirmTransactionResponse,
        ConnectWalletRequest, ConnectWalletResponse, CreateTransactionRequest,
        CreateTransactionResponse, HealthResponse, PaymentInstructions, ServiceListResponse,
        TransactionListResponse,
    },
    state::AppState,
    storage::{ConnectionState, Service, Transaction, TxStatus, User},
};

pub mod extract;
pub mod health;
pub mod services;
pub mod transactions;
pub mod wallets;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router.
///
/// `allowed_origins` is the CORS allow-list; empty means any origin.
pub fn router(state: AppState, allowed_origins: &[String]) -> Result<Router, InvalidHeaderValue> {
    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/services", get(services::list_services))
        .route("/auth/connect", post(wallets::connect_wallet))
        .route("/balance/{walletAddress}", get(wallets::get_balance))
        .route("/transactions/create", post(transactions::create_transaction))
        .route("/transactions/confirm", post(transactions::confirm_transaction))
        .route(
            "/transactions/{walletAddress}",
            get(transactions::list_transactions),
        )
        .method_not_allowed_fallback(route_not_found)
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Ok(Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors_layer(allowed_origins)?))
}

/// CORS policy for the frontend.
///
/// Credentials cannot be combined with a wildcard origin, so they are only
/// allowed for an explicit allow-list.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}

fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "Handler panicked");

    ApiError::internal("Internal server error").into_response()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        services::list_services,
        wallets::connect_wallet,
        wallets::get_balance,
        transactions::create_transaction,
        transactions::confirm_transaction,
        transactions::list_transactions
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            BlockchainInfo,
            ConnectionState,
            Service,
            ServiceListResponse,
            User,
            ConnectWalletRequest,
            ConnectWalletResponse,
            BalanceResponse,
            Transaction,
            TxStatus,
            CreateTransactionRequest,
            PaymentInstructions,
            CreateTransactionResponse,
            ConfirmTransactionRequest,
            ConfirmTransactionResponse,
            TransactionListResponse
        )
    ),
    tags(
        (name = "Health", description = "Process and database status"),
        (name = "Catalog", description = "Purchasable services"),
        (name = "Wallets", description = "Wallet registration and balance"),
        (name = "Transactions", description = "Purchase transaction lifecycle")
    )
)]
pub struct ApiDoc;

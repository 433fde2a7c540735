// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request extractors that reject with the JSON error envelope.
//!
//! [`ValidatedJson`] replaces axum's `Json` extractor for request bodies. Any
//! body that cannot be parsed, has the wrong field types or fails its
//! `validator` rules is rejected with one uniform client-input error naming
//! the schema's required fields.
//!
//! [`ApiPath`] replaces axum's `Path` so undecodable path parameters are
//! client-input errors too, instead of plain-text rejections.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// A request body with a declared set of required fields.
pub trait RequestSchema: DeserializeOwned + Validate {
    /// Wire names of the required fields, in display order.
    const REQUIRED_FIELDS: &'static [&'static str];

    /// Client-input error message for this schema.
    fn rejection_message() -> String {
        required_message(Self::REQUIRED_FIELDS)
    }
}

/// `a required`, `a and b required`, `a, b, and c required`.
pub fn required_message(fields: &[&str]) -> String {
    let list = match fields {
        [] => return "request body required".to_string(),
        [only] => only.to_string(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    };
    format!("{list} required")
}

/// JSON body extractor that enforces a [`RequestSchema`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: RequestSchema + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            ApiError::bad_request(T::rejection_message())
        })?;

        value.validate().map_err(|errors| {
            tracing::debug!(error = %errors, "Request body failed validation");
            ApiError::bad_request(T::rejection_message())
        })?;

        Ok(ValidatedJson(value))
    }
}

/// Path parameter extractor whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                let detail = rejection.body_text();
                tracing::debug!(error = %detail, "Rejected path parameters");
                ApiError::bad_request(detail)
            })?;

        Ok(ApiPath(value))
    }
}

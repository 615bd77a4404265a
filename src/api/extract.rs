// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Body and path extractors that reject with problem details.
//!
//! axum's `Json` and `Path` answer malformed input with a `text/plain`
//! body. These wrappers keep the same parsing and turn the rejection into
//! an `application/problem+json` response for the current request.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;

use crate::auth::Context;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Title of a problem caused by an unreadable body or path.
pub const INVALID_INPUT_TITLE: &str = "One or more validation errors occurred.";

fn invalid_input(ctx: &RequestContext, status: StatusCode, detail: String) -> ApiError {
    ctx.problem(ApiError::new(status, detail).with_title(INVALID_INPUT_TITLE))
}

/// JSON request body.
pub struct ApiJson<T>(pub T);

impl<T> FromRequest<AppState> for ApiJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = request.into_parts();
        let Ok(Context(ctx)) = Context::from_request_parts(&mut parts, state).await;

        match Json::<T>::from_request(Request::from_parts(parts, body), state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(invalid_input(&ctx, rejection.status(), rejection.body_text())),
        }
    }
}

/// Typed path parameters.
pub struct ApiPath<T>(pub T);

impl<T> FromRequestParts<AppState> for ApiPath<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                let Ok(Context(ctx)) = Context::from_request_parts(parts, state).await;
                Err(invalid_input(&ctx, rejection.status(), rejection.body_text()))
            }
        }
    }
}

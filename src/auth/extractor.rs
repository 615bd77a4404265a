// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the request context and authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth, Context(ctx): Context) -> impl IntoResponse {
//!     // user is AuthenticatedUser, ctx is Arc<RequestContext>
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// The per-request context built by the authentication middleware.
///
/// Outside the middleware (e.g. a bare router in tests) a fresh anonymous
/// context is built from the request.
pub struct Context(pub Arc<RequestContext>);

impl FromRequestParts<AppState> for Context {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = match parts.extensions.get::<Arc<RequestContext>>() {
            Some(ctx) => ctx.clone(),
            None => {
                let ctx = Arc::new(RequestContext::from_parts(parts));
                parts.extensions.insert(ctx.clone());
                ctx
            }
        };
        Ok(Context(ctx))
    }
}

/// Extractor for authenticated users.
///
/// Rejects with 401 and the reason the token failed, if it did.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_cards(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<CardDto>>, ApiError> {
///     // user.user_id contains the authenticated user's ID
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Ok(Context(ctx)) = Context::from_request_parts(parts, state).await;

        if let Some(user) = ctx.user().authenticated() {
            return Ok(Auth(user));
        }

        let err = match (ctx.auth_error(), ctx.authorization()) {
            (Some(err), _) => err.clone(),
            (None, None) => AuthError::MissingAuthHeader,
            // Validated claims without a usable user id
            (None, Some(_)) => AuthError::MissingIdentity,
        };
        Err(ctx.problem(err.to_api_error()))
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            let Ok(Context(ctx)) = Context::from_request_parts(parts, state).await;
            return Err(ctx.problem(AuthError::InsufficientPermissions.to_api_error()));
        }

        Ok(AdminOnly(user))
    }
}

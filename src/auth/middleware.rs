// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request pipeline middleware.
//!
//! ## Order
//!
//! 1. [`establish_context`] builds the [`RequestContext`]: request coordinates,
//!    a cancellation token tied to the request and the validated identity.
//!    A request without a bearer token continues unauthenticated.
//! 2. [`reject_revoked_tokens`] answers 401 for a token revoked by logout.
//!
//! Handlers read the context through the [`Context`](super::Context) extractor.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{AuthError, CurrentUser};
use crate::context::RequestContext;
use crate::state::AppState;

/// Validate the bearer token and attach the request context.
pub async fn establish_context(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let mut ctx = RequestContext::from_parts(&parts);

    // Cancelled when the request future is dropped (client gone) or on shutdown
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    ctx = ctx.with_cancel(cancel);

    if ctx.authorization().is_some() {
        ctx = authenticate(&state, ctx);
    }

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(Arc::new(ctx));
    next.run(request).await
}

fn authenticate(state: &AppState, ctx: RequestContext) -> RequestContext {
    let Some(token) = ctx.bearer_token() else {
        return ctx.with_auth_error(AuthError::InvalidAuthHeader);
    };

    match state.tokens.validate(token) {
        Ok(claims) => {
            let user = CurrentUser::from_claims(claims, ctx.request_id.clone());
            ctx.with_user(user)
        }
        Err(err) => {
            debug!(
                request_id = ctx.request_id.as_deref().unwrap_or(""),
                error = err.error_code(),
                "Bearer token rejected"
            );
            ctx.with_auth_error(err)
        }
    }
}

/// Reject requests whose validated bearer token has been revoked.
pub async fn reject_revoked_tokens(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(ctx) = request.extensions().get::<Arc<RequestContext>>().cloned() else {
        return next.run(request).await;
    };

    if ctx.user().is_authenticated() {
        if let Some(token) = ctx.bearer_token() {
            match state.auth().is_token_revoked(ctx.cancel_token(), token).await {
                Ok(false) => {}
                Ok(true) => {
                    debug!(user_id = ?ctx.user().user_id(), "Revoked token presented");
                    return ctx
                        .problem(AuthError::TokenRevoked.to_api_error())
                        .into_response();
                }
                Err(err) => {
                    warn!(error = %err, "Revocation check failed");
                    return ctx.problem(err).into_response();
                }
            }
        }
    }

    next.run(request).await
}

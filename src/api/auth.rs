// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, registration and logout endpoints.

use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};

use super::extract::ApiJson;
use crate::{
    auth::{Auth, Context},
    error::{ApiError, ProblemDetails},
    models::{LoginRequest, LoginResponse, RegisterRequest, UserDto},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = ProblemDetails),
        (status = 401, description = "Invalid credentials", body = ProblemDetails),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Context(ctx): Context,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = state
        .auth()
        .login(&ctx, &request)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "User created", body = UserDto),
        (status = 400, description = "Invalid input", body = ProblemDetails),
        (status = 409, description = "Email already registered", body = ProblemDetails),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Context(ctx): Context,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth()
        .register(&ctx, &request)
        .await
        .map_err(|e| ctx.problem(e))?;
    let location = format!("/users/{}", user.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(user)))
}

/// Revoke the bearer token used for this request.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing, invalid or expired token", body = ProblemDetails),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
) -> Result<StatusCode, ApiError> {
    state.auth().logout(&ctx).await.map_err(|e| ctx.problem(e))?;
    Ok(StatusCode::NO_CONTENT)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::State,
    Json,
};

use super::extract::{ApiJson, ApiPath};
use crate::{
    auth::{AdminOnly, Auth, Context},
    error::{ApiError, ProblemDetails},
    models::{UpdateUserRequest, UserDto},
    state::AppState,
};

/// List every user. Admin only.
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [UserDto]),
        (status = 403, description = "Caller is not an administrator", body = ProblemDetails),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminOnly,
    Context(ctx): Context,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = state.users().list_users(&ctx).await.map_err(|e| ctx.problem(e))?;
    Ok(Json(users))
}

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User information", body = UserDto),
        (status = 401, description = "Unauthorized - invalid or missing token", body = ProblemDetails),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .users()
        .get_current_user(&ctx)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = i64, Path, description = "User identifier")),
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserDto),
        (status = 404, body = ProblemDetails),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .users()
        .get_user(&ctx, user_id)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    params(("user_id" = i64, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserDto),
        (status = 400, body = ProblemDetails),
        (status = 404, body = ProblemDetails),
        (status = 409, body = ProblemDetails),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .users()
        .update_user(&ctx, user_id, &request)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(user))
}

/// Delete a user with their cards and revoked tokens.
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    params(("user_id" = i64, Path, description = "User identifier")),
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted user", body = UserDto),
        (status = 404, body = ProblemDetails),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .users()
        .delete_user(&ctx, user_id)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(user))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card endpoints. Every route acts on the caller's own cards.

use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};

use super::extract::{ApiJson, ApiPath};
use crate::{
    auth::{Auth, Context},
    error::{ApiError, ProblemDetails},
    models::{CardDto, CreateCardRequest, UpdateCardRequest},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/cards",
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [CardDto]),
        (status = 401, body = ProblemDetails),
    )
)]
pub async fn list_cards(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
) -> Result<Json<Vec<CardDto>>, ApiError> {
    let cards = state.cards().list_cards(&ctx).await.map_err(|e| ctx.problem(e))?;
    Ok(Json(cards))
}

#[utoipa::path(
    post,
    path = "/cards",
    request_body = CreateCardRequest,
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = CardDto),
        (status = 400, body = ProblemDetails),
        (status = 409, description = "Barcode already registered by the caller", body = ProblemDetails),
    )
)]
pub async fn create_card(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiJson(request): ApiJson<CreateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card = state
        .cards()
        .create_card(&ctx, &request)
        .await
        .map_err(|e| ctx.problem(e))?;
    let location = format!("/cards/{}", card.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(card)))
}

#[utoipa::path(
    get,
    path = "/cards/{card_id}",
    params(("card_id" = i64, Path, description = "Card identifier")),
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = CardDto),
        (status = 404, description = "Missing or owned by someone else", body = ProblemDetails),
    )
)]
pub async fn get_card(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiPath(card_id): ApiPath<i64>,
) -> Result<Json<CardDto>, ApiError> {
    let card = state
        .cards()
        .get_card(&ctx, card_id)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(card))
}

#[utoipa::path(
    patch,
    path = "/cards/{card_id}",
    params(("card_id" = i64, Path, description = "Card identifier")),
    request_body = UpdateCardRequest,
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = CardDto),
        (status = 400, body = ProblemDetails),
        (status = 404, body = ProblemDetails),
        (status = 409, body = ProblemDetails),
    )
)]
pub async fn update_card(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiPath(card_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateCardRequest>,
) -> Result<Json<CardDto>, ApiError> {
    let card = state
        .cards()
        .update_card(&ctx, card_id, &request)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(card))
}

#[utoipa::path(
    delete,
    path = "/cards/{card_id}",
    params(("card_id" = i64, Path, description = "Card identifier")),
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted card", body = CardDto),
        (status = 404, body = ProblemDetails),
    )
)]
pub async fn delete_card(
    State(state): State<AppState>,
    _auth: Auth,
    Context(ctx): Context,
    ApiPath(card_id): ApiPath<i64>,
) -> Result<Json<CardDto>, ApiError> {
    let card = state
        .cards()
        .delete_card(&ctx, card_id)
        .await
        .map_err(|e| ctx.problem(e))?;
    Ok(Json(card))
}

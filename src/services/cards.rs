// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Loyalty cards.
//!
//! Cards are strictly owner-only; admins get no special access. A card that
//! belongs to someone else is reported exactly like a missing one.

use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{CardDto, CreateCardRequest, UpdateCardRequest, DEFAULT_CARD_IMAGE};
use crate::services::validation::{is_http_url, not_blank_if_provided};
use crate::storage::{
    CardRepository, Database, NewCard, OwnershipCheck, OwnershipDenied, StoreError, StoredCard,
};

pub const CARD_NOT_FOUND: &str = "Card not found.";
pub const DUPLICATE_BARCODE: &str = "A card with this barcode already exists for the user.";

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;

pub struct CardService<'a> {
    db: &'a Database,
}

impl<'a> CardService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create_card(&self, ctx: &RequestContext, request: &CreateCardRequest) -> ServiceResult<CardDto> {
        let Some(user_id) = ctx.user().user_id() else {
            return Err(ServiceError::Unauthorized(
                "User ID is required to create a card.".into(),
            ));
        };

        let name = request.name.trim();
        check_name(name)?;
        let barcode = request.barcode.trim();
        if barcode.is_empty() {
            return Err(ServiceError::BadRequest("Barcode is required.".into()));
        }
        let image_url = match request.image_url.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_CARD_IMAGE.to_string(),
            Some(url) => {
                check_image_url(url)?;
                url.to_string()
            }
        };

        let repo = CardRepository::new(self.db);
        let cancel = ctx.cancel_token();
        if repo.barcode_exists(cancel, user_id, barcode).await? {
            return Err(ServiceError::Conflict(DUPLICATE_BARCODE.into()));
        }
        ctx.ensure_active()?;

        let card = repo
            .create(
                cancel,
                NewCard {
                    name: name.to_string(),
                    image_url,
                    barcode: barcode.to_string(),
                    user_id,
                },
            )
            .await
            .map_err(store_to_service)?;

        info!(user_id, card_id = card.id, "Card created");
        Ok(card.into())
    }

    pub async fn get_card(&self, ctx: &RequestContext, id: i64) -> ServiceResult<CardDto> {
        Ok(self.load_owned(ctx, id, "access this card").await?.into())
    }

    /// Cards of the caller, ordered by id.
    pub async fn list_cards(&self, ctx: &RequestContext) -> ServiceResult<Vec<CardDto>> {
        let Some(user_id) = ctx.user().user_id() else {
            return Err(ServiceError::Unauthorized(
                "User ID is required to access cards.".into(),
            ));
        };
        let cards = CardRepository::new(self.db)
            .list_by_owner(ctx.cancel_token(), user_id)
            .await?;
        debug!(user_id, count = cards.len(), "Listed cards");
        Ok(cards.into_iter().map(CardDto::from).collect())
    }

    /// Patch a card. Omitted fields keep their value.
    pub async fn update_card(
        &self,
        ctx: &RequestContext,
        id: i64,
        request: &UpdateCardRequest,
    ) -> ServiceResult<CardDto> {
        not_blank_if_provided("Name", request.name.as_deref())?;
        not_blank_if_provided("ImageUrl", request.image_url.as_deref())?;
        not_blank_if_provided("Barcode", request.barcode.as_deref())?;

        let mut card = self.load_owned(ctx, id, "update this card").await?;

        if let Some(name) = &request.name {
            let name = name.trim();
            check_name(name)?;
            card.name = name.to_string();
        }
        if let Some(url) = &request.image_url {
            let url = url.trim();
            check_image_url(url)?;
            card.image_url = url.to_string();
        }
        if let Some(barcode) = &request.barcode {
            card.barcode = barcode.trim().to_string();
        }

        ctx.ensure_active()?;
        let updated = CardRepository::new(self.db)
            .update(ctx.cancel_token(), card)
            .await
            .map_err(store_to_service)?;

        info!(user_id = updated.user_id, card_id = id, "Card updated");
        Ok(updated.into())
    }

    /// Delete a card and return it.
    pub async fn delete_card(&self, ctx: &RequestContext, id: i64) -> ServiceResult<CardDto> {
        self.load_owned(ctx, id, "delete this card").await?;
        ctx.ensure_active()?;

        let deleted = CardRepository::new(self.db)
            .delete(ctx.cancel_token(), id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CARD_NOT_FOUND.into()))?;

        info!(user_id = deleted.user_id, card_id = id, "Card deleted");
        Ok(deleted.into())
    }

    async fn load_owned(&self, ctx: &RequestContext, id: i64, action: &str) -> ServiceResult<StoredCard> {
        let unauthenticated =
            || ServiceError::Unauthorized(format!("User ID is required to {action}."));
        if ctx.user().user_id().is_none() {
            return Err(unauthenticated());
        }
        CardRepository::new(self.db)
            .get(ctx.cancel_token(), id)
            .await?
            .verify_owner(ctx.user())
            .map_err(|denied| match denied {
                OwnershipDenied::Unauthenticated => unauthenticated(),
                OwnershipDenied::Missing | OwnershipDenied::NotOwner => {
                    ServiceError::NotFound(CARD_NOT_FOUND.into())
                }
            })
    }
}

fn check_name(name: &str) -> ServiceResult<()> {
    let len = name.chars().count();
    if (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "Name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters."
        )))
    }
}

fn check_image_url(url: &str) -> ServiceResult<()> {
    if is_http_url(url) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest("ImageUrl must be a valid URL.".into()))
    }
}

fn store_to_service(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(_) => ServiceError::Conflict(DUPLICATE_BARCODE.into()),
        StoreError::NotFound(_) => ServiceError::NotFound(CARD_NOT_FOUND.into()),
        StoreError::MissingReference(_) => ServiceError::NotFound("User not found.".into()),
        other => other.into(),
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card repository.
//!
//! Cards are stored as JSON under their numeric id. The
//! `cards_by_owner_barcode` index (`"{user_id}|{barcode}"` → card id) keeps a
//! barcode unique per owner; two different users may hold the same barcode.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::super::database::{
    next_id, scan_json, Database, StoreError, StoreResult, CARDS, CARDS_BY_OWNER_BARCODE, USERS,
};
use super::super::OwnedResource;

const CARD_SEQUENCE: &str = "cards";

/// Card stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCard {
    pub id: i64,
    pub name: String,
    pub image_url: String,
    pub barcode: String,
    pub added_at: DateTime<Utc>,
    /// Owner user ID
    pub user_id: i64,
}

impl StoredCard {
    pub(crate) fn index_key(&self) -> String {
        barcode_key(self.user_id, &self.barcode)
    }
}

impl OwnedResource for StoredCard {
    fn owner_user_id(&self) -> i64 {
        self.user_id
    }
}

/// Fields for a card that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub image_url: String,
    pub barcode: String,
    pub user_id: i64,
}

fn barcode_key(user_id: i64, barcode: &str) -> String {
    format!("{user_id}|{barcode}")
}

/// Repository for card operations.
pub struct CardRepository<'a> {
    db: &'a Database,
}

impl<'a> CardRepository<'a> {
    /// Create a new CardRepository.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a card.
    ///
    /// Fails with `MissingReference` if the owner does not exist and with
    /// `UniqueViolation` if the owner already has this barcode.
    pub async fn create(&self, cancel: &CancellationToken, card: NewCard) -> StoreResult<StoredCard> {
        self.db
            .write(cancel, move |txn| {
                let users = txn.open_table(USERS)?;
                if users.get(card.user_id)?.is_none() {
                    return Err(StoreError::MissingReference(format!("User {}", card.user_id)));
                }

                let key = barcode_key(card.user_id, &card.barcode);
                let mut by_barcode = txn.open_table(CARDS_BY_OWNER_BARCODE)?;
                if by_barcode.get(key.as_str())?.is_some() {
                    return Err(StoreError::UniqueViolation("cards_by_owner_barcode"));
                }

                let stored = StoredCard {
                    id: next_id(txn, CARD_SEQUENCE)?,
                    name: card.name,
                    image_url: card.image_url,
                    barcode: card.barcode,
                    added_at: Utc::now(),
                    user_id: card.user_id,
                };

                by_barcode.insert(key.as_str(), stored.id)?;
                let mut cards = txn.open_table(CARDS)?;
                cards.insert(stored.id, serde_json::to_vec(&stored)?.as_slice())?;
                Ok(stored)
            })
            .await
    }

    /// Get a card by ID.
    pub async fn get(&self, cancel: &CancellationToken, id: i64) -> StoreResult<Option<StoredCard>> {
        self.db
            .read(cancel, move |txn| {
                let cards = txn.open_table(CARDS)?;
                let card = match cards.get(id)? {
                    Some(raw) => Some(serde_json::from_slice(raw.value())?),
                    None => None,
                };
                Ok(card)
            })
            .await
    }

    /// List all cards owned by a user, ordered by id.
    pub async fn list_by_owner(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
    ) -> StoreResult<Vec<StoredCard>> {
        self.db
            .read(cancel, move |txn| {
                let cards = txn.open_table(CARDS)?;
                scan_json(cards.iter()?, |card: &StoredCard| card.user_id == user_id)
            })
            .await
    }

    pub async fn barcode_exists(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        barcode: &str,
    ) -> StoreResult<bool> {
        let key = barcode_key(user_id, barcode);
        self.db
            .read(cancel, move |txn| {
                let by_barcode = txn.open_table(CARDS_BY_OWNER_BARCODE)?;
                Ok(by_barcode.get(key.as_str())?.is_some())
            })
            .await
    }

    /// Replace an existing card, keeping the barcode index in step.
    pub async fn update(&self, cancel: &CancellationToken, card: StoredCard) -> StoreResult<StoredCard> {
        self.db
            .write(cancel, move |txn| {
                let mut cards = txn.open_table(CARDS)?;
                let previous: StoredCard = match cards.get(card.id)? {
                    Some(raw) => serde_json::from_slice(raw.value())?,
                    None => return Err(StoreError::NotFound(format!("Card {}", card.id))),
                };

                let old_key = previous.index_key();
                let new_key = card.index_key();
                if old_key != new_key {
                    let mut by_barcode = txn.open_table(CARDS_BY_OWNER_BARCODE)?;
                    if by_barcode.get(new_key.as_str())?.is_some() {
                        return Err(StoreError::UniqueViolation("cards_by_owner_barcode"));
                    }
                    by_barcode.remove(old_key.as_str())?;
                    by_barcode.insert(new_key.as_str(), card.id)?;
                }

                cards.insert(card.id, serde_json::to_vec(&card)?.as_slice())?;
                Ok(card)
            })
            .await
    }

    /// Delete a card; returns it, or `None` if it did not exist.
    pub async fn delete(&self, cancel: &CancellationToken, id: i64) -> StoreResult<Option<StoredCard>> {
        self.db
            .write(cancel, move |txn| {
                let mut cards = txn.open_table(CARDS)?;
                let card: StoredCard = match cards.remove(id)? {
                    Some(raw) => serde_json::from_slice(raw.value())?,
                    None => return Ok(None),
                };

                let mut by_barcode = txn.open_table(CARDS_BY_OWNER_BARCODE)?;
                by_barcode.remove(card.index_key().as_str())?;
                Ok(Some(card))
            })
            .await
    }
}

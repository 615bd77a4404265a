// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users are stored as JSON under their numeric id. The `users_by_email`
//! index holds the lower-cased email and enforces uniqueness. Deleting a
//! user removes their cards and revoked-token rows in the same transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::super::database::{
    next_id, scan_json, Database, StoreError, StoreResult, CARDS, CARDS_BY_OWNER_BARCODE,
    REVOKED_TOKENS, USERS, USERS_BY_EMAIL,
};
use super::super::OwnedResource;
use super::cards::StoredCard;
use super::revoked_tokens::RevokedToken;
use crate::auth::Role;

const USER_SEQUENCE: &str = "users";

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub account_created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Free-form client preferences
    pub settings: Option<String>,
}

impl OwnedResource for StoredUser {
    const ADMIN_ACCESS: bool = true;

    fn owner_user_id(&self) -> i64 {
        self.id
    }
}

/// Fields for a user that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a user; fails with `UniqueViolation` if the email is taken.
    pub async fn create(&self, cancel: &CancellationToken, user: NewUser) -> StoreResult<StoredUser> {
        self.db
            .write(cancel, move |txn| {
                let key = email_key(&user.email);
                let mut by_email = txn.open_table(USERS_BY_EMAIL)?;
                if by_email.get(key.as_str())?.is_some() {
                    return Err(StoreError::UniqueViolation("users_by_email"));
                }

                let stored = StoredUser {
                    id: next_id(txn, USER_SEQUENCE)?,
                    user_name: user.user_name,
                    email: user.email,
                    password_hash: user.password_hash,
                    role: user.role,
                    account_created_date: Utc::now(),
                    settings: None,
                };

                by_email.insert(key.as_str(), stored.id)?;
                let mut users = txn.open_table(USERS)?;
                users.insert(stored.id, serde_json::to_vec(&stored)?.as_slice())?;
                Ok(stored)
            })
            .await
    }

    /// Get a user by ID.
    pub async fn get(&self, cancel: &CancellationToken, id: i64) -> StoreResult<Option<StoredUser>> {
        self.db
            .read(cancel, move |txn| {
                let users = txn.open_table(USERS)?;
                let user = match users.get(id)? {
                    Some(raw) => Some(serde_json::from_slice(raw.value())?),
                    None => None,
                };
                Ok(user)
            })
            .await
    }

    /// Look a user up by email (case-insensitive).
    pub async fn find_by_email(
        &self,
        cancel: &CancellationToken,
        email: &str,
    ) -> StoreResult<Option<StoredUser>> {
        let key = email_key(email);
        self.db
            .read(cancel, move |txn| {
                let by_email = txn.open_table(USERS_BY_EMAIL)?;
                let Some(id) = by_email.get(key.as_str())?.map(|v| v.value()) else {
                    return Ok(None);
                };
                let users = txn.open_table(USERS)?;
                let user = match users.get(id)? {
                    Some(raw) => Some(serde_json::from_slice(raw.value())?),
                    None => None,
                };
                Ok(user)
            })
            .await
    }

    pub async fn email_exists(&self, cancel: &CancellationToken, email: &str) -> StoreResult<bool> {
        let key = email_key(email);
        self.db
            .read(cancel, move |txn| {
                let by_email = txn.open_table(USERS_BY_EMAIL)?;
                Ok(by_email.get(key.as_str())?.is_some())
            })
            .await
    }

    /// List all users (admin view).
    pub async fn list(&self, cancel: &CancellationToken) -> StoreResult<Vec<StoredUser>> {
        self.db
            .read(cancel, |txn| {
                let users = txn.open_table(USERS)?;
                scan_json(users.iter()?, |_: &StoredUser| true)
            })
            .await
    }

    /// Replace an existing user, keeping the email index in step.
    pub async fn update(&self, cancel: &CancellationToken, user: StoredUser) -> StoreResult<StoredUser> {
        self.db
            .write(cancel, move |txn| {
                let mut users = txn.open_table(USERS)?;
                let previous: StoredUser = match users.get(user.id)? {
                    Some(raw) => serde_json::from_slice(raw.value())?,
                    None => return Err(StoreError::NotFound(format!("User {}", user.id))),
                };

                let old_key = email_key(&previous.email);
                let new_key = email_key(&user.email);
                if old_key != new_key {
                    let mut by_email = txn.open_table(USERS_BY_EMAIL)?;
                    if by_email.get(new_key.as_str())?.is_some() {
                        return Err(StoreError::UniqueViolation("users_by_email"));
                    }
                    by_email.remove(old_key.as_str())?;
                    by_email.insert(new_key.as_str(), user.id)?;
                }

                users.insert(user.id, serde_json::to_vec(&user)?.as_slice())?;
                Ok(user)
            })
            .await
    }

    /// Delete a user together with everything they own.
    ///
    /// Returns the deleted user, or `None` if it did not exist.
    pub async fn delete(&self, cancel: &CancellationToken, id: i64) -> StoreResult<Option<StoredUser>> {
        self.db
            .write(cancel, move |txn| {
                let mut users = txn.open_table(USERS)?;
                let user: StoredUser = match users.remove(id)? {
                    Some(raw) => serde_json::from_slice(raw.value())?,
                    None => return Ok(None),
                };

                let mut by_email = txn.open_table(USERS_BY_EMAIL)?;
                by_email.remove(email_key(&user.email).as_str())?;

                remove_owned_rows(txn, id)?;
                Ok(Some(user))
            })
            .await
    }
}

/// Cascade: remove the cards and revoked tokens of a deleted user.
fn remove_owned_rows(txn: &WriteTransaction, user_id: i64) -> StoreResult<()> {
    let mut cards = txn.open_table(CARDS)?;
    let owned_cards = scan_json(cards.iter()?, |card: &StoredCard| card.user_id == user_id)?;

    let mut by_barcode = txn.open_table(CARDS_BY_OWNER_BARCODE)?;
    for card in &owned_cards {
        cards.remove(card.id)?;
        by_barcode.remove(card.index_key().as_str())?;
    }

    let mut revoked = txn.open_table(REVOKED_TOKENS)?;
    let owned_tokens = scan_json(revoked.iter()?, |row: &RevokedToken| row.user_id == user_id)?;
    for row in &owned_tokens {
        revoked.remove(row.token.as_str())?;
    }

    tracing::debug!(
        user_id,
        cards = owned_cards.len(),
        revoked_tokens = owned_tokens.len(),
        "Removed rows owned by deleted user"
    );
    Ok(())
}

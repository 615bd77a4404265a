// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Revoked token repository.
//!
//! A row is keyed by the full token string. Once a token is in this table
//! it reads as revoked for as long as the row exists, whether or not its
//! natural expiry has passed. A row is removed by
//! [`RevokedTokenRepository::purge_expired`] only once its token would fail
//! validation, clock-skew leeway included.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::auth::jwt::rejected_from;

use super::super::database::{scan_json, Database, StoreError, StoreResult, REVOKED_TOKENS, USERS};

/// Revocation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevokedToken {
    pub token: String,
    pub user_id: i64,
    pub expiry_time: DateTime<Utc>,
}

/// Repository for revoked token operations.
pub struct RevokedTokenRepository<'a> {
    db: &'a Database,
}

impl<'a> RevokedTokenRepository<'a> {
    /// Create a new RevokedTokenRepository.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a revocation.
    ///
    /// The owning user must exist. Revoking an already revoked token is a
    /// no-op that returns the existing row.
    pub async fn add(
        &self,
        cancel: &CancellationToken,
        token: &str,
        expiry_time: DateTime<Utc>,
        user_id: i64,
    ) -> StoreResult<RevokedToken> {
        let row = RevokedToken {
            token: token.to_string(),
            user_id,
            expiry_time,
        };

        self.db
            .write(cancel, move |txn| {
                let users = txn.open_table(USERS)?;
                if users.get(user_id)?.is_none() {
                    return Err(StoreError::MissingReference(format!("User {user_id}")));
                }

                let mut revoked = txn.open_table(REVOKED_TOKENS)?;
                if let Some(existing) = revoked.get(row.token.as_str())? {
                    return Ok(serde_json::from_slice(existing.value())?);
                }
                revoked.insert(row.token.as_str(), serde_json::to_vec(&row)?.as_slice())?;
                Ok(row)
            })
            .await
    }

    /// Whether the token has been revoked.
    pub async fn is_revoked(&self, cancel: &CancellationToken, token: &str) -> StoreResult<bool> {
        let token = token.to_string();
        self.db
            .read(cancel, move |txn| {
                let revoked = txn.open_table(REVOKED_TOKENS)?;
                Ok(revoked.get(token.as_str())?.is_some())
            })
            .await
    }

    /// Remove every revocation owned by a user. Returns how many were removed.
    pub async fn revoke_all_for_user(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
    ) -> StoreResult<usize> {
        self.remove_where(cancel, move |row| row.user_id == user_id).await
    }

    /// Remove revocations whose token fails lifetime validation at `now`.
    pub async fn purge_expired(
        &self,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> StoreResult<usize> {
        self.remove_where(cancel, move |row| rejected_from(row.expiry_time) <= now)
            .await
    }

    async fn remove_where<P>(&self, cancel: &CancellationToken, predicate: P) -> StoreResult<usize>
    where
        P: Fn(&RevokedToken) -> bool + Send + 'static,
    {
        self.db
            .write(cancel, move |txn| {
                let mut revoked = txn.open_table(REVOKED_TOKENS)?;
                let doomed = scan_json(revoked.iter()?, |row: &RevokedToken| predicate(row))?;
                for row in &doomed {
                    revoked.remove(row.token.as_str())?;
                }
                Ok(doomed.len())
            })
            .await
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage in a single redb file.
//!
//! ## Tables
//!
//! ```text
//! users                   id → user JSON
//! users_by_email          lower-cased email → id      (unique)
//! cards                   id → card JSON
//! cards_by_owner_barcode  "{user_id}|{barcode}" → id  (unique)
//! revoked_tokens          token → revocation JSON
//! sequences               name → last id
//! ```
//!
//! ## Important Notes
//!
//! - Every call takes the request's `CancellationToken`
//! - Blocking redb work runs on the tokio blocking pool
//! - Deleting a user cascades to their cards and revoked tokens

pub mod database;
pub mod ownership;
pub mod repository;

pub use database::{Database, StoreError, StoreResult};
pub use ownership::{OwnedResource, OwnershipCheck, OwnershipDenied, OwnershipEnforcer};
pub use repository::{
    CardRepository, NewCard, NewUser, RevokedToken, RevokedTokenRepository, StoredCard,
    StoredUser, UserRepository,
};

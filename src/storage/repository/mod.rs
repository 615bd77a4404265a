// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the redb store.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! borrowing the shared [`Database`](super::Database) handle.

pub mod cards;
pub mod revoked_tokens;
pub mod users;

pub use cards::{CardRepository, NewCard, StoredCard};
pub use revoked_tokens::{RevokedToken, RevokedTokenRepository};
pub use users::{NewUser, StoredUser, UserRepository};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for user-owned records.
//!
//! Every read or write of a card or user profile passes through these
//! checks before the record leaves the service layer.
//!
//! ## Decision Order
//!
//! 1. No caller identity → [`OwnershipDenied::Unauthenticated`]
//! 2. Record absent → [`OwnershipDenied::Missing`]
//! 3. Caller is the owner, or an admin where the record allows it → granted
//! 4. Otherwise → [`OwnershipDenied::NotOwner`]
//!
//! Services report `Missing` and `NotOwner` identically so a non-owner
//! cannot learn whether a record exists.

use crate::auth::CurrentUser;

/// Reason an ownership check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipDenied {
    Unauthenticated,
    Missing,
    NotOwner,
}

/// Trait for records that belong to exactly one user.
pub trait OwnedResource {
    /// Whether an admin may act on records they do not own.
    const ADMIN_ACCESS: bool = false;

    /// Get the owner's user ID.
    fn owner_user_id(&self) -> i64;
}

/// Trait for enforcing ownership on a loaded record.
pub trait OwnershipEnforcer {
    fn verify_ownership(&self, caller: &CurrentUser) -> Result<(), OwnershipDenied>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, caller: &CurrentUser) -> Result<(), OwnershipDenied> {
        let caller_id = caller.user_id().ok_or(OwnershipDenied::Unauthenticated)?;

        if self.owner_user_id() == caller_id || (T::ADMIN_ACCESS && caller.is_admin()) {
            Ok(())
        } else {
            Err(OwnershipDenied::NotOwner)
        }
    }
}

/// Extension trait for checking ownership on a lookup result.
pub trait OwnershipCheck<T> {
    /// Verify ownership and return the record if authorized.
    fn verify_owner(self, caller: &CurrentUser) -> Result<T, OwnershipDenied>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn verify_owner(self, caller: &CurrentUser) -> Result<T, OwnershipDenied> {
        if caller.user_id().is_none() {
            return Err(OwnershipDenied::Unauthenticated);
        }
        let record = self.ok_or(OwnershipDenied::Missing)?;
        record.verify_ownership(caller)?;
        Ok(record)
    }
}

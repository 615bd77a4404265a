// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request identity resolved from the validated bearer token.
//!
//! The user id and email are computed on first read and then memoized for
//! the rest of the request. A `CurrentUser` is built fresh for every request
//! and never shared between requests.

use std::sync::OnceLock;

use super::claims::{AuthenticatedUser, ClaimSet};
use super::Role;

#[derive(Debug, Default)]
pub struct CurrentUser {
    /// Claims of a token that passed validation; `None` when unauthenticated.
    claims: Option<ClaimSet>,
    request_id: Option<String>,
    user_id: OnceLock<Option<i64>>,
    email: OnceLock<Option<String>>,
}

impl CurrentUser {
    pub fn anonymous(request_id: Option<String>) -> Self {
        Self {
            request_id,
            ..Self::default()
        }
    }

    pub fn from_claims(claims: ClaimSet, request_id: Option<String>) -> Self {
        Self {
            claims: Some(claims),
            request_id,
            ..Self::default()
        }
    }

    /// True iff the request carried a token that passed validation.
    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    pub fn claims(&self) -> Option<&ClaimSet> {
        self.claims.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        *self.user_id.get_or_init(|| {
            let parsed = self.claims.as_ref().and_then(ClaimSet::user_id);
            tracing::debug!(
                request_id = self.request_id.as_deref().unwrap_or(""),
                resolved = parsed.is_some(),
                "Resolved current user id"
            );
            parsed
        })
    }

    pub fn email(&self) -> Option<&str> {
        self.email
            .get_or_init(|| {
                let email = self.claims.as_ref().and_then(ClaimSet::email);
                tracing::debug!(
                    request_id = self.request_id.as_deref().unwrap_or(""),
                    resolved = email.is_some(),
                    "Resolved current user email"
                );
                email
            })
            .as_deref()
    }

    pub fn role(&self) -> Role {
        self.claims
            .as_ref()
            .map(ClaimSet::role)
            .unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role() == Role::Admin
    }

    /// Identity snapshot; `None` unless authenticated with a usable user id.
    pub fn authenticated(&self) -> Option<AuthenticatedUser> {
        Some(AuthenticatedUser {
            user_id: self.user_id()?,
            email: self.email().map(str::to_string),
            role: self.role(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::NAME_IDENTIFIER_CLAIM;

    fn claims(sub: &str) -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.insert("sub", sub).insert("email", "user@example.com");
        claims
    }

    #[test]
    fn anonymous_user_has_no_identity() {
        let user = CurrentUser::anonymous(Some("req-1".into()));
        assert!(!user.is_authenticated());
        assert_eq!(user.user_id(), None);
        assert_eq!(user.email(), None);
        assert!(user.authenticated().is_none());
    }

    #[test]
    fn identity_is_resolved_lazily_and_once() {
        let user = CurrentUser::from_claims(claims("12"), None);
        assert!(user.user_id.get().is_none());
        assert!(user.email.get().is_none());

        assert_eq!(user.user_id(), Some(12));
        assert_eq!(user.email(), Some("user@example.com"));
        assert_eq!(user.user_id.get(), Some(&Some(12)));

        // A second read is served from the memo
        assert_eq!(user.user_id(), Some(12));
    }

    #[test]
    fn unparsable_subject_is_authenticated_without_id() {
        let user = CurrentUser::from_claims(claims("user_abc"), None);
        assert!(user.is_authenticated());
        assert_eq!(user.user_id(), None);
        assert!(user.authenticated().is_none());
    }

    #[test]
    fn name_identifier_is_preferred() {
        let mut set = claims("12");
        set.insert(NAME_IDENTIFIER_CLAIM, "34");
        let user = CurrentUser::from_claims(set, None);
        assert_eq!(user.user_id(), Some(34));
    }

    #[test]
    fn admin_requires_role_claim() {
        let mut set = claims("1");
        assert!(!CurrentUser::from_claims(set.clone(), None).is_admin());

        set.insert("role", "Admin");
        let admin = CurrentUser::from_claims(set, None);
        assert!(admin.is_admin());
        assert_eq!(admin.authenticated().unwrap().role, Role::Admin);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.
//!
//! ## Claim Lookup Order
//!
//! Tokens carry both the short registered names (`sub`, `email`) and the
//! long URI forms understood by other identity stacks. When reading a claim
//! the candidates are checked in order and the first one present wins:
//!
//! | Value | Candidates (in order) |
//! |-------|-----------------------|
//! | user id | `nameidentifier` URI, `sub` |
//! | email | `emailaddress` URI, `email` |
//! | role | `role` URI, `role` |
//!
//! A candidate that is present but unparsable does not fall through to the
//! next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::roles::Role;

pub const NAME_IDENTIFIER_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
pub const EMAIL_ADDRESS_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
pub const ROLE_CLAIM_URI: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

pub const USER_ID_CLAIMS: [&str; 2] = [NAME_IDENTIFIER_CLAIM, "sub"];
pub const EMAIL_CLAIMS: [&str; 2] = [EMAIL_ADDRESS_CLAIM, "email"];
pub const ROLE_CLAIMS: [&str; 2] = [ROLE_CLAIM_URI, "role"];

/// Validated claims of a bearer token, kept as a loose map so alternate
/// claim names can be looked up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Raw claim as a string. Numbers are rendered, other types ignored.
    pub fn get(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First candidate claim that is present.
    pub fn first_of(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|name| self.get(name))
    }

    pub fn user_id(&self) -> Option<i64> {
        self.first_of(&USER_ID_CLAIMS)?.trim().parse().ok()
    }

    pub fn email(&self) -> Option<String> {
        self.first_of(&EMAIL_CLAIMS)
    }

    /// Role claim, or the default role when absent or unknown.
    pub fn role(&self) -> Role {
        self.first_of(&ROLE_CLAIMS)
            .and_then(|r| Role::from_str(&r))
            .unwrap_or_default()
    }

    /// `exp` as a UTC timestamp; `None` when missing or unparsable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let seconds = match self.0.get("exp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        DateTime::from_timestamp(seconds, 0)
    }
}

/// Authenticated caller information extracted from the validated claims.
///
/// This is the type handed to handlers through the `Auth` extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Numeric user id (`nameidentifier` or `sub` claim)
    pub user_id: i64,

    /// Email claim, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role claim (defaults to `User`)
    pub role: Role,
}

impl AuthenticatedUser {
    /// Build from claims; `None` without a parsable user id.
    pub fn from_claims(claims: &ClaimSet) -> Option<Self> {
        Some(Self {
            user_id: claims.user_id()?,
            email: claims.email(),
            role: claims.role(),
        })
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

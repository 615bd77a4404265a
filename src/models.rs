// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize` or `Deserialize` and
//! `ToSchema` for automatic JSON handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Auth**: Login, registration and the issued token
//! - **Users**: Public user profile and profile updates
//! - **Cards**: Loyalty cards and their create/patch payloads
//!
//! Response types never carry the password hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{StoredCard, StoredUser};

/// Image used when a card is created without one.
pub const DEFAULT_CARD_IMAGE: &str = "https://..default-image.png";

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed bearer token
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Users
// =============================================================================

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserDto {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub account_created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<String>,
}

impl From<StoredUser> for UserDto {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            account_created_date: user.account_created_date,
            settings: user.settings,
        }
    }
}

/// Partial profile update. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    /// Required when `new_password` is set
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    /// Replaces the stored settings; an empty string clears them
    pub settings: Option<String>,
}

// =============================================================================
// Cards
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CardDto {
    pub id: i64,
    pub name: String,
    pub image_url: String,
    pub barcode: String,
    pub added_at: DateTime<Utc>,
    pub user_id: i64,
}

impl From<StoredCard> for CardDto {
    fn from(card: StoredCard) -> Self {
        Self {
            id: card.id,
            name: card.name,
            image_url: card.image_url,
            barcode: card.barcode,
            added_at: card.added_at,
            user_id: card.user_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCardRequest {
    #[serde(default)]
    pub name: String,
    /// Defaults to a placeholder image
    pub image_url: Option<String>,
    #[serde(default)]
    pub barcode: String,
}

/// Partial card update. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateCardRequest {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub barcode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    #[test]
    fn user_dto_never_exposes_the_hash() {
        let user = StoredUser {
            id: 3,
            user_name: "tester".into(),
            email: "t@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            account_created_date: Utc::now(),
            settings: None,
        };

        let json = serde_json::to_value(UserDto::from(user)).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["email"], "t@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn create_card_request_image_is_optional() {
        let request: CreateCardRequest =
            serde_json::from_str(r#"{"name":"Coffee","barcode":"123"}"#).unwrap();
        assert!(request.image_url.is_none());
    }
}

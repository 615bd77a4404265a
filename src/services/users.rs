// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profiles.
//!
//! A profile is visible to its owner and to admins. A caller who may not see
//! a profile gets the same `NotFound` as for a missing one.

use tracing::info;

use crate::auth::password::{self, PasswordVerification};
use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{UpdateUserRequest, UserDto};
use crate::services::validation::{not_blank_if_provided, require_email};
use crate::storage::{
    Database, OwnershipCheck, OwnershipDenied, StoreError, StoredUser, UserRepository,
};

const USER_NOT_FOUND: &str = "User not found.";

pub struct UserService<'a> {
    db: &'a Database,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Every user. Admin only.
    pub async fn list_users(&self, ctx: &RequestContext) -> ServiceResult<Vec<UserDto>> {
        let caller = ctx.user();
        if caller.user_id().is_none() {
            return Err(ServiceError::Unauthorized(
                "User ID is required to list users.".into(),
            ));
        }
        if !caller.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only administrators can list users.".into(),
            ));
        }

        let users = UserRepository::new(self.db).list(ctx.cancel_token()).await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn get_user(&self, ctx: &RequestContext, id: i64) -> ServiceResult<UserDto> {
        Ok(self.load_owned(ctx, id, "access this user").await?.into())
    }

    /// Profile of the caller.
    pub async fn get_current_user(&self, ctx: &RequestContext) -> ServiceResult<UserDto> {
        let Some(id) = ctx.user().user_id() else {
            return Err(ServiceError::Unauthorized("User ID not found in token.".into()));
        };
        UserRepository::new(self.db)
            .get(ctx.cancel_token(), id)
            .await?
            .map(UserDto::from)
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.into()))
    }

    /// Patch email and/or password.
    ///
    /// A password change needs the current password, admins included.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        id: i64,
        request: &UpdateUserRequest,
    ) -> ServiceResult<UserDto> {
        not_blank_if_provided("Email", request.email.as_deref())?;
        not_blank_if_provided("NewPassword", request.new_password.as_deref())?;
        if let Some(email) = &request.email {
            require_email(email)?;
        }

        let mut user = self.load_owned(ctx, id, "update this user").await?;

        if let Some(email) = &request.email {
            user.email = email.trim().to_string();
        }

        if let Some(settings) = &request.settings {
            user.settings = (!settings.trim().is_empty()).then(|| settings.clone());
        }

        if let Some(new_password) = &request.new_password {
            let current = request.current_password.as_deref().unwrap_or_default();
            let verified = password::verify_password(current, &user.password_hash)?;
            if verified == PasswordVerification::Failed {
                return Err(ServiceError::BadRequest(
                    "Current password is incorrect.".into(),
                ));
            }
            password::check_password_rules("NewPassword", new_password)
                .map_err(ServiceError::BadRequest)?;
            user.password_hash = password::hash_password(new_password)?;
        }

        ctx.ensure_active()?;
        let updated = UserRepository::new(self.db)
            .update(ctx.cancel_token(), user)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    ServiceError::Conflict("A user with this email already exists.".into())
                }
                StoreError::NotFound(_) => ServiceError::NotFound(USER_NOT_FOUND.into()),
                other => other.into(),
            })?;

        info!(user_id = id, "User updated");
        Ok(updated.into())
    }

    /// Delete a user together with their cards and revoked tokens.
    pub async fn delete_user(&self, ctx: &RequestContext, id: i64) -> ServiceResult<UserDto> {
        self.load_owned(ctx, id, "delete this user").await?;
        ctx.ensure_active()?;

        let deleted = UserRepository::new(self.db)
            .delete(ctx.cancel_token(), id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.into()))?;

        info!(user_id = id, "User deleted");
        Ok(deleted.into())
    }

    async fn load_owned(&self, ctx: &RequestContext, id: i64, action: &str) -> ServiceResult<StoredUser> {
        if ctx.user().user_id().is_none() {
            return Err(ServiceError::Unauthorized(format!(
                "User ID is required to {action}."
            )));
        }
        UserRepository::new(self.db)
            .get(ctx.cancel_token(), id)
            .await?
            .verify_owner(ctx.user())
            .map_err(|denied| match denied {
                OwnershipDenied::Unauthenticated => {
                    ServiceError::Unauthorized(format!("User ID is required to {action}."))
                }
                OwnershipDenied::Missing | OwnershipDenied::NotOwner => {
                    ServiceError::NotFound(USER_NOT_FOUND.into())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::test_support::{
        anonymous_ctx, ctx_as, seed_user, test_state, STRONG_PASSWORD,
    };
    use crate::storage::{CardRepository, NewCard};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn owner_and_admin_can_read_a_profile() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let admin = seed_user(&state, "admin@example.com", Role::Admin).await;

        let own = state
            .users()
            .get_user(&ctx_as(&state, alice.id, Role::User), alice.id)
            .await
            .unwrap();
        assert_eq!(own.email, "a@example.com");

        let by_admin = state
            .users()
            .get_user(&ctx_as(&state, admin.id, Role::Admin), alice.id)
            .await
            .unwrap();
        assert_eq!(by_admin, own);
    }

    #[tokio::test]
    async fn other_users_profile_reads_as_missing() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let bob = seed_user(&state, "b@example.com", Role::User).await;
        let as_bob = ctx_as(&state, bob.id, Role::User);

        let hidden = state.users().get_user(&as_bob, alice.id).await.unwrap_err();
        let missing = state.users().get_user(&as_bob, 999).await.unwrap_err();
        assert!(matches!(&hidden, ServiceError::NotFound(m) if m == USER_NOT_FOUND));
        assert!(matches!(&missing, ServiceError::NotFound(m) if m == USER_NOT_FOUND));
    }

    #[tokio::test]
    async fn anonymous_caller_is_unauthorized() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;

        assert!(matches!(
            state.users().get_user(&anonymous_ctx(), alice.id).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            state.users().get_current_user(&anonymous_ctx()).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn current_user_of_a_deleted_account_is_not_found() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let ctx = ctx_as(&state, alice.id, Role::User);

        assert_eq!(state.users().get_current_user(&ctx).await.unwrap().id, alice.id);
        state.users().delete_user(&ctx, alice.id).await.unwrap();
        assert!(matches!(
            state.users().get_current_user(&ctx).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_users_is_admin_only() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let admin = seed_user(&state, "admin@example.com", Role::Admin).await;

        assert!(matches!(
            state.users().list_users(&ctx_as(&state, alice.id, Role::User)).await,
            Err(ServiceError::Forbidden(_))
        ));
        let all = state
            .users()
            .list_users(&ctx_as(&state, admin.id, Role::Admin))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn password_change_requires_the_current_password() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let ctx = ctx_as(&state, alice.id, Role::User);

        let wrong = UpdateUserRequest {
            current_password: Some("Wr0ngPassword!".into()),
            new_password: Some("N3wPassword!!".into()),
            ..Default::default()
        };
        assert!(matches!(
            state.users().update_user(&ctx, alice.id, &wrong).await,
            Err(ServiceError::BadRequest(m)) if m == "Current password is incorrect."
        ));

        let right = UpdateUserRequest {
            current_password: Some(STRONG_PASSWORD.into()),
            new_password: Some("N3wPassword!!".into()),
            ..Default::default()
        };
        state.users().update_user(&ctx, alice.id, &right).await.unwrap();

        let stored = UserRepository::new(&state.db)
            .get(&CancellationToken::new(), alice.id)
            .await
            .unwrap()
            .unwrap();
        assert!(password::verify_password("N3wPassword!!", &stored.password_hash)
            .unwrap()
            .is_success());
    }

    #[tokio::test]
    async fn weak_new_password_is_rejected() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let request = UpdateUserRequest {
            current_password: Some(STRONG_PASSWORD.into()),
            new_password: Some("weak".into()),
            ..Default::default()
        };

        let err = state
            .users()
            .update_user(&ctx_as(&state, alice.id, Role::User), alice.id, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(m) if m.starts_with("NewPassword must")));
    }

    #[tokio::test]
    async fn email_change_checks_uniqueness() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        seed_user(&state, "b@example.com", Role::User).await;
        let ctx = ctx_as(&state, alice.id, Role::User);

        let clash = UpdateUserRequest {
            email: Some("b@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            state.users().update_user(&ctx, alice.id, &clash).await,
            Err(ServiceError::Conflict(_))
        ));

        let blank = UpdateUserRequest {
            email: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            state.users().update_user(&ctx, alice.id, &blank).await,
            Err(ServiceError::BadRequest(_))
        ));

        let fresh = UpdateUserRequest {
            email: Some("c@example.com".into()),
            ..Default::default()
        };
        let updated = state.users().update_user(&ctx, alice.id, &fresh).await.unwrap();
        assert_eq!(updated.email, "c@example.com");
    }

    #[tokio::test]
    async fn settings_are_stored_and_cleared() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let ctx = ctx_as(&state, alice.id, Role::User);

        let set = UpdateUserRequest {
            settings: Some(r#"{"theme":"dark"}"#.into()),
            ..Default::default()
        };
        let updated = state.users().update_user(&ctx, alice.id, &set).await.unwrap();
        assert_eq!(updated.settings.as_deref(), Some(r#"{"theme":"dark"}"#));
        assert_eq!(
            state.users().get_user(&ctx, alice.id).await.unwrap().settings,
            updated.settings
        );

        let clear = UpdateUserRequest {
            settings: Some(String::new()),
            ..Default::default()
        };
        let cleared = state.users().update_user(&ctx, alice.id, &clear).await.unwrap();
        assert!(cleared.settings.is_none());
    }

    #[tokio::test]
    async fn delete_cascades_to_cards() {
        let (state, _dir) = test_state();
        let alice = seed_user(&state, "a@example.com", Role::User).await;
        let cancel = CancellationToken::new();
        let card = CardRepository::new(&state.db)
            .create(
                &cancel,
                NewCard {
                    name: "Coffee".into(),
                    image_url: "https://img.example.com/c.png".into(),
                    barcode: "1".into(),
                    user_id: alice.id,
                },
            )
            .await
            .unwrap();

        let deleted = state
            .users()
            .delete_user(&ctx_as(&state, alice.id, Role::User), alice.id)
            .await
            .unwrap();
        assert_eq!(deleted.id, alice.id);
        assert!(CardRepository::new(&state.db)
            .get(&cancel, card.id)
            .await
            .unwrap()
            .is_none());
    }
}

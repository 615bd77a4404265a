// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, registration, logout and token revocation.
//!
//! ## Token Lifecycle
//!
//! ```text
//! issued --(exp passes)--> expired
//!   |
//!   +--(logout)--> revoked (never un-revoked)
//! ```
//!
//! Credential failures always surface as the same `"Invalid credentials."`
//! message whether the email is unknown or the password is wrong.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::jwt::rejected_from;
use crate::auth::password::{self, PasswordVerification};
use crate::auth::{Role, TokenCodec};
use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{LoginRequest, RegisterRequest, UserDto};
use crate::services::validation::require_email;
use crate::storage::{
    Database, NewUser, RevokedToken, RevokedTokenRepository, StoreError, UserRepository,
};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Auth orchestrator bound to the shared store and token codec.
pub struct AuthService<'a> {
    db: &'a Database,
    codec: &'a TokenCodec,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a Database, codec: &'a TokenCodec) -> Self {
        Self { db, codec }
    }

    /// Verify credentials and issue a bearer token.
    pub async fn login(&self, ctx: &RequestContext, request: &LoginRequest) -> ServiceResult<String> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Email and password are required.".into(),
            ));
        }

        let cancel = ctx.cancel_token();
        let users = UserRepository::new(self.db);
        let Some(user) = users.find_by_email(cancel, &request.email).await? else {
            debug!("Login attempt for unknown email");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        match password::verify_password(&request.password, &user.password_hash)? {
            PasswordVerification::Failed => {
                debug!(user_id = user.id, "Login attempt with wrong password");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
            PasswordVerification::SuccessRehashNeeded => {
                let mut upgraded = user.clone();
                upgraded.password_hash = password::hash_password(&request.password)?;
                match users.update(cancel, upgraded).await {
                    Ok(_) => debug!(user_id = user.id, "Password hash upgraded"),
                    Err(StoreError::Cancelled) => return Err(ServiceError::Cancelled),
                    Err(e) => warn!(user_id = user.id, error = %e, "Failed to upgrade password hash"),
                }
            }
            PasswordVerification::Success => {}
        }

        // No token once the request has been abandoned
        ctx.ensure_active()?;

        let token = self
            .codec
            .issue(&user.id.to_string(), &user.email, user.role)
            .map_err(|e| {
                warn!(user_id = user.id, error = %e, "Token issuance failed");
                ServiceError::Internal("Token generation failed.".into())
            })?;
        if token.is_empty() {
            return Err(ServiceError::Internal("Token generation failed.".into()));
        }

        info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Create a new account with the `User` role.
    pub async fn register(&self, ctx: &RequestContext, request: &RegisterRequest) -> ServiceResult<UserDto> {
        if request.user_name.trim().is_empty() {
            return Err(ServiceError::BadRequest("UserName is required.".into()));
        }
        if request.email.trim().is_empty() {
            return Err(ServiceError::BadRequest("Email is required.".into()));
        }
        require_email(&request.email)?;
        password::check_password_rules("Password", &request.password)
            .map_err(ServiceError::BadRequest)?;

        let cancel = ctx.cancel_token();
        let users = UserRepository::new(self.db);
        if users.email_exists(cancel, &request.email).await? {
            return Err(ServiceError::Conflict(email_taken()));
        }

        let password_hash = password::hash_password(&request.password)?;
        ctx.ensure_active()?;

        // The email index rejects a racing registration inside the insert
        let created = users
            .create(
                cancel,
                NewUser {
                    user_name: request.user_name.trim().to_string(),
                    email: request.email.trim().to_string(),
                    password_hash,
                    role: Role::User,
                },
            )
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => ServiceError::Conflict(email_taken()),
                other => other.into(),
            })?;

        info!(user_id = created.id, "User registered");
        Ok(created.into())
    }

    /// Revoke the bearer token the request was authenticated with.
    pub async fn logout(&self, ctx: &RequestContext) -> ServiceResult<()> {
        let Some(token) = ctx.bearer_token() else {
            return Err(ServiceError::Unauthorized(
                "Authorization header is missing or invalid.".into(),
            ));
        };
        let Some(caller) = ctx.user().user_id() else {
            return Err(ServiceError::Unauthorized("User ID not found in token.".into()));
        };
        let Some(expiry) = ctx.user().claims().and_then(|c| c.expires_at()) else {
            return Err(ServiceError::NotFound(
                "Token expiration not found or invalid.".into(),
            ));
        };
        if rejected_from(expiry) <= Utc::now() {
            return Err(ServiceError::Unauthorized("Token has already expired.".into()));
        }

        self.revoke_token(ctx, token, expiry, caller).await?;
        info!(user_id = caller, "User logged out");
        Ok(())
    }

    /// Record a revocation attributed to `user_id`, which must be the caller.
    pub async fn revoke_token(
        &self,
        ctx: &RequestContext,
        token: &str,
        expiry: DateTime<Utc>,
        user_id: i64,
    ) -> ServiceResult<RevokedToken> {
        let Some(caller) = ctx.user().user_id() else {
            return Err(ServiceError::Unauthorized("User ID not found in token.".into()));
        };
        if caller != user_id {
            return Err(ServiceError::Forbidden(
                "You can only revoke your own tokens.".into(),
            ));
        }
        ctx.ensure_active()?;

        RevokedTokenRepository::new(self.db)
            .add(ctx.cancel_token(), token, expiry, user_id)
            .await
            .map_err(|e| match e {
                StoreError::MissingReference(_) => ServiceError::NotFound("User not found.".into()),
                other => other.into(),
            })
    }

    /// Drop every revocation row of a user. Self or Admin only.
    pub async fn revoke_all_for_user(&self, ctx: &RequestContext, user_id: i64) -> ServiceResult<usize> {
        let current = ctx.user();
        let Some(caller) = current.user_id() else {
            return Err(ServiceError::Unauthorized("User ID not found in token.".into()));
        };
        if caller != user_id && !current.is_admin() {
            return Err(ServiceError::Forbidden(
                "You can only manage your own tokens.".into(),
            ));
        }

        let removed = RevokedTokenRepository::new(self.db)
            .revoke_all_for_user(ctx.cancel_token(), user_id)
            .await?;
        debug!(user_id, removed, "Cleared revoked tokens");
        Ok(removed)
    }

    /// Whether a presented token was revoked. An empty token never is.
    pub async fn is_token_revoked(&self, cancel: &CancellationToken, token: &str) -> ServiceResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        Ok(RevokedTokenRepository::new(self.db)
            .is_revoked(cancel, token)
            .await?)
    }
}

fn email_taken() -> String {
    "A user with this email already exists.".into()
}

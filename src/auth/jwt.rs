// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token issuance and validation.
//!
//! ## Issued Claims
//!
//! - `sub`, `email`, `role`, `jti` (random UUID), `iat`, `exp`
//! - `iss` / `aud` from configuration
//! - `nameidentifier` and `emailaddress` URI forms of `sub` and `email`
//!
//! ## Validation
//!
//! Signature, issuer, audience and lifetime are all checked. A token failing
//! any of them is rejected. Clock skew tolerance is 60 seconds.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::claims::{ClaimSet, EMAIL_ADDRESS_CLAIM, NAME_IDENTIFIER_CLAIM};
use super::{AuthError, Role};
use crate::config::JwtSettings;

/// Minimum HMAC secret length in bytes.
pub const MIN_SECRET_KEY_LENGTH: usize = 32;

/// Clock skew tolerance (60 seconds).
pub const CLOCK_SKEW_LEEWAY: u64 = 60;

/// First instant at which a token expiring at `expiry` fails validation.
///
/// Validation compares whole seconds, so the bound sits one second past
/// `expiry + leeway`.
pub fn rejected_from(expiry: DateTime<Utc>) -> DateTime<Utc> {
    expiry + Duration::seconds(CLOCK_SKEW_LEEWAY as i64 + 1)
}

/// Token issuance failure. Preconditions are checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Key for JWT authentication is not configured, is empty or not long enough.")]
    SigningKeyTooShort,

    #[error("Wrong expiration time set for token.")]
    InvalidExpiration,

    #[error("Can't generate token without valid user ID.")]
    InvalidUserId,

    #[error("Can't generate token without valid email.")]
    InvalidEmail,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Issues and validates signed bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    settings: JwtSettings,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(settings: JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[&settings.issuer]);
        validation.set_audience(&[&settings.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            settings,
            validation,
        }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Issue a token for the given user.
    ///
    /// `user_id` is taken as text and must parse as a non-negative integer.
    pub fn issue(&self, user_id: &str, email: &str, role: Role) -> Result<String, TokenError> {
        let secret = self.settings.secret_key.as_bytes();
        if self.settings.secret_key.trim().is_empty() || secret.len() < MIN_SECRET_KEY_LENGTH {
            return Err(TokenError::SigningKeyTooShort);
        }

        let minutes = self
            .settings
            .expiration_minutes
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|m| m.is_finite() && *m > 0.0)
            .ok_or(TokenError::InvalidExpiration)?;

        let subject = user_id
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id >= 0)
            .ok_or(TokenError::InvalidUserId)?;

        if email.trim().is_empty() {
            return Err(TokenError::InvalidEmail);
        }

        let now = Utc::now();
        let lifetime = Duration::milliseconds((minutes * 60_000.0) as i64);
        let expires_at = now + lifetime;
        let subject = subject.to_string();

        let mut claims = ClaimSet::new();
        claims
            .insert("sub", subject.as_str())
            .insert("email", email)
            .insert("role", role.as_str())
            .insert("jti", Uuid::new_v4().to_string())
            .insert("iat", now.timestamp())
            .insert("exp", expires_at.timestamp())
            .insert("iss", self.settings.issuer.as_str())
            .insert("aud", self.settings.audience.as_str())
            .insert(NAME_IDENTIFIER_CLAIM, subject.as_str())
            .insert(EMAIL_ADDRESS_CLAIM, email);

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer, audience and lifetime; return the claims.
    pub fn validate(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let key = DecodingKey::from_secret(self.settings.secret_key.as_bytes());
        let data = decode::<ClaimSet>(token, &key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> JwtSettings {
    JwtSettings {
        secret_key: "SecretKey123456SecretKey123456ab".to_string(),
        expiration_minutes: "2".to_string(),
        issuer: "TestIssuer".to_string(),
        audience: "TestAudience".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn codec_with(f: impl FnOnce(&mut JwtSettings)) -> TokenCodec {
        let mut settings = test_settings();
        f(&mut settings);
        TokenCodec::new(settings)
    }

    #[test]
    fn issue_then_validate_round_trips_identity() {
        let codec = TokenCodec::new(test_settings());
        let token = codec.issue("1", "test@test.test", Role::User).unwrap();

        let claims = codec.validate(&token).unwrap();
        assert_eq!(claims.get("sub").as_deref(), Some("1"));
        assert_eq!(claims.get("email").as_deref(), Some("test@test.test"));
        assert_eq!(claims.user_id(), Some(1));
        assert_eq!(claims.role(), Role::User);
        assert!(claims.get("jti").is_some());
    }

    #[test]
    fn each_issuance_gets_a_fresh_jti() {
        let codec = TokenCodec::new(test_settings());
        let a = codec.validate(&codec.issue("1", "a@b.c", Role::User).unwrap()).unwrap();
        let b = codec.validate(&codec.issue("1", "a@b.c", Role::User).unwrap()).unwrap();
        assert_ne!(a.get("jti"), b.get("jti"));
    }

    #[test]
    fn expiry_follows_configured_minutes() {
        let codec = TokenCodec::new(test_settings());
        let before = Utc::now().timestamp();
        let claims = codec
            .validate(&codec.issue("5", "a@b.c", Role::User).unwrap())
            .unwrap();
        let exp = claims.expires_at().unwrap().timestamp();
        assert!(exp >= before + 120 && exp <= before + 121);
    }

    #[test]
    fn short_secret_is_rejected_first() {
        let codec = codec_with(|s| {
            s.secret_key = "short".into();
            s.expiration_minutes = "nope".into();
        });
        assert_eq!(
            codec.issue("bad", "", Role::User),
            Err(TokenError::SigningKeyTooShort)
        );
    }

    #[test]
    fn invalid_expiration_is_rejected() {
        for value in ["", "abc", "0", "-5"] {
            let codec = codec_with(|s| s.expiration_minutes = value.into());
            assert_eq!(
                codec.issue("1", "a@b.c", Role::User),
                Err(TokenError::InvalidExpiration),
                "expiration {value:?}"
            );
        }
    }

    #[test]
    fn invalid_user_id_is_rejected() {
        let codec = TokenCodec::new(test_settings());
        for value in ["", "abc", "-1223"] {
            assert_eq!(
                codec.issue(value, "a@b.c", Role::User),
                Err(TokenError::InvalidUserId),
                "user id {value:?}"
            );
        }
    }

    #[test]
    fn empty_email_is_rejected() {
        let codec = TokenCodec::new(test_settings());
        assert_eq!(codec.issue("1", "  ", Role::User), Err(TokenError::InvalidEmail));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let codec = TokenCodec::new(test_settings());
        let token = codec.issue("1", "a@b.c", Role::User).unwrap();

        let other_issuer = codec_with(|s| s.issuer = "Elsewhere".into());
        assert_eq!(other_issuer.validate(&token), Err(AuthError::InvalidIssuer));

        let other_audience = codec_with(|s| s.audience = "Elsewhere".into());
        assert_eq!(other_audience.validate(&token), Err(AuthError::InvalidAudience));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let codec = TokenCodec::new(test_settings());
        let token = codec.issue("1", "a@b.c", Role::User).unwrap();

        let other = codec_with(|s| s.secret_key = "AnotherSecretAnotherSecret123456".into());
        assert_eq!(other.validate(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = TokenCodec::new(test_settings());
        let token = codec.issue("1", "a@b.c", Role::User).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged = URL_SAFE_NO_PAD.encode(
            br#"{"sub":"2","email":"a@b.c","iss":"TestIssuer","aud":"TestAudience","exp":9999999999}"#,
        );
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(codec.validate(&tampered), Err(AuthError::InvalidSignature));
    }

    fn signed_with_exp(settings: &JwtSettings, exp: i64) -> String {
        let mut claims = ClaimSet::new();
        claims
            .insert("sub", "1")
            .insert("iss", settings.issuer.as_str())
            .insert("aud", settings.audience.as_str())
            .insert("exp", exp);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(settings.secret_key.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn expired_token_is_rejected() {
        let settings = test_settings();
        let token = signed_with_exp(&settings, Utc::now().timestamp() - 3600);

        let codec = TokenCodec::new(settings);
        assert_eq!(codec.validate(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn token_inside_leeway_validates_until_rejected_from() {
        let settings = test_settings();
        let exp = Utc::now().timestamp() - 30;
        let token = signed_with_exp(&settings, exp);

        let codec = TokenCodec::new(settings);
        let claims = codec.validate(&token).unwrap();
        let expiry = claims.expires_at().unwrap();
        assert!(rejected_from(expiry) > Utc::now());
        assert_eq!(
            rejected_from(expiry).timestamp(),
            exp + CLOCK_SKEW_LEEWAY as i64 + 1
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = TokenCodec::new(test_settings());
        assert_eq!(codec.validate("not.a.jwt"), Err(AuthError::MalformedToken));
    }
}

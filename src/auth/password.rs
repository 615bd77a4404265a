// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing, verification and composition rules.
//!
//! Hashes are Argon2id PHC strings with a random per-password salt.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};

use crate::error::{ServiceError, ServiceResult};

pub const MIN_PASSWORD_LENGTH: usize = 12;
pub const PASSWORD_SPECIAL_CHARACTERS: &str = "!$#@&*%()_+=";

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerification {
    Failed,
    Success,
    /// Correct password, but the hash was made with outdated parameters.
    SuccessRehashNeeded,
}

impl PasswordVerification {
    pub fn is_success(&self) -> bool {
        !matches!(self, PasswordVerification::Failed)
    }
}

/// Hash a password with the current Argon2id defaults.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password in constant time.
///
/// A stored value that is not a PHC string never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> ServiceResult<PasswordVerification> {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash is not a PHC string");
        return Ok(PasswordVerification::Failed);
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) if needs_rehash(&parsed) => Ok(PasswordVerification::SuccessRehashNeeded),
        Ok(()) => Ok(PasswordVerification::Success),
        Err(argon2::password_hash::Error::Password) => Ok(PasswordVerification::Failed),
        Err(e) => Err(ServiceError::Internal(format!(
            "Password verification failed: {e}"
        ))),
    }
}

fn needs_rehash(hash: &PasswordHash<'_>) -> bool {
    if hash.algorithm != argon2::Algorithm::default().ident() {
        return true;
    }
    let current = Params::default();
    match Params::try_from(hash) {
        Ok(params) => {
            params.m_cost() != current.m_cost()
                || params.t_cost() != current.t_cost()
                || params.p_cost() != current.p_cost()
        }
        Err(_) => true,
    }
}

/// Check the composition rules; every violation is reported at once.
pub fn check_password_rules(label: &str, password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err(format!("{label} is required."));
    }

    let mut errors = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "{label} must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        errors.push(format!("{label} must contain at least 1 lowercase letter."));
    }
    if !password.chars().any(char::is_uppercase) {
        errors.push(format!("{label} must contain at least 1 uppercase letter."));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(format!("{label} must contain at least 1 digit."));
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARACTERS.contains(c)) {
        errors.push(format!(
            "{label} must contain at least 1 special character: {PASSWORD_SPECIAL_CHARACTERS}"
        ));
    }
    if password.chars().any(char::is_whitespace) {
        errors.push(format!("{label} cannot contain whitespace."));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join(" "))
    }
}

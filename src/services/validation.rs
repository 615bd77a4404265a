// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Field checks shared by the services.

use crate::error::{ServiceError, ServiceResult};

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.ends_with('.'),
        None => false,
    }
}

pub fn require_email(email: &str) -> ServiceResult<()> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest("Invalid email address format.".into()))
    }
}

/// Reject a provided-but-blank optional field.
pub fn not_blank_if_provided(label: &str, value: Option<&str>) -> ServiceResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ServiceError::BadRequest(format!(
            "{label} can't be empty or whitespace."
        ))),
        _ => Ok(()),
    }
}

/// Absolute http(s) URL with a host.
pub fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("test@test.test"));
        assert!(is_valid_email("first.last@mail.example.com"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@exa mple.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn blank_optional_field_is_rejected() {
        assert!(not_blank_if_provided("Name", None).is_ok());
        assert!(not_blank_if_provided("Name", Some("Coffee")).is_ok());
        let err = not_blank_if_provided("Name", Some("  ")).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(m) if m == "Name can't be empty or whitespace."));
    }

    #[test]
    fn http_urls() {
        assert!(is_http_url("https://img.example.com/a.png"));
        assert!(is_http_url("http://localhost:8080/x"));
        assert!(is_http_url("https://..default-image.png"));
        assert!(!is_http_url("ftp://example.com/a.png"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("not a url"));
    }
}

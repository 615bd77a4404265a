// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup; a missing JWT setting is fatal there rather than on a
//! later request.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATABASE_PATH` | redb database file | `data/loyalty-cards.redb` |
//! | `DATABASE_TIMEOUT_MS` | Upper bound for a single store operation | `5000` |
//! | `JWT_SECRET` | HMAC-SHA256 signing secret (at least 32 bytes) | Required |
//! | `JWT_ISSUER` | Expected/issued `iss` claim | Required |
//! | `JWT_AUDIENCE` | Expected/issued `aud` claim | Required |
//! | `JWT_EXPIRATION_MINUTES` | Token lifetime in minutes | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const DATABASE_TIMEOUT_ENV: &str = "DATABASE_TIMEOUT_MS";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION_MINUTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_PATH: &str = "data/loyalty-cards.redb";
pub const DEFAULT_DATABASE_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Startup configuration failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// JWT settings shared by the token codec and the bearer validation.
///
/// `expiration_minutes` stays as the raw configured string: the codec
/// validates it at issuance time so a bad value is reported with the same
/// error no matter where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtSettings {
    pub secret_key: String,
    pub expiration_minutes: String,
    pub issuer: String,
    pub audience: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub database_timeout: Duration,
    pub jwt: JwtSettings,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let jwt = JwtSettings {
            secret_key: required(JWT_SECRET_ENV)?,
            issuer: required(JWT_ISSUER_ENV)?,
            audience: required(JWT_AUDIENCE_ENV)?,
            expiration_minutes: required(JWT_EXPIRATION_ENV)?,
        };

        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let database_timeout = match lookup(DATABASE_TIMEOUT_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::Invalid {
                    name: DATABASE_TIMEOUT_ENV,
                    value: raw,
                })?,
            None => DEFAULT_DATABASE_TIMEOUT,
        };

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_path: lookup(DATABASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            database_timeout,
            jwt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            (JWT_SECRET_ENV, "SecretKey123456SecretKey123456ab"),
            (JWT_ISSUER_ENV, "TestIssuer"),
            (JWT_AUDIENCE_ENV, "TestAudience"),
            (JWT_EXPIRATION_ENV, "2"),
        ]
    }

    #[test]
    fn loads_required_settings_and_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&complete())).unwrap();
        assert_eq!(config.jwt.issuer, "TestIssuer");
        assert_eq!(config.jwt.audience, "TestAudience");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.database_timeout, DEFAULT_DATABASE_TIMEOUT);
    }

    #[test]
    fn missing_issuer_is_fatal() {
        let pairs: Vec<_> = complete()
            .into_iter()
            .filter(|(k, _)| *k != JWT_ISSUER_ENV)
            .collect();
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing(JWT_ISSUER_ENV));
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let mut pairs = complete();
        pairs[0] = (JWT_SECRET_ENV, "   ");
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing(JWT_SECRET_ENV));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut pairs = complete();
        pairs.push((PORT_ENV, "eighty"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PORT_ENV, .. }));
    }
}

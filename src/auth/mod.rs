// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Self-issued HS256 bearer tokens for the loyalty cards API.
//!
//! ## Auth Flow
//!
//! 1. Client logs in with email and password (`POST /auth/login`)
//! 2. Server verifies the Argon2id hash and issues a signed JWT
//! 3. Client sends `Authorization: Bearer <jwt>` on later requests
//! 4. Middleware, per request:
//!    - Verifies signature, expiry, issuer and audience
//!    - Rejects tokens revoked by a logout
//!    - Builds the [`CurrentUser`] of the request context
//! 5. Handlers take [`Auth`] or [`AdminOnly`] to require an identity
//!
//! ## Security
//!
//! - Signing key must be at least 32 bytes
//! - Clock skew tolerance is 60 seconds
//! - Identity is resolved per request and never shared across requests

pub mod claims;
pub mod current_user;
pub mod error;
pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;

pub use claims::{AuthenticatedUser, ClaimSet};
pub use current_user::CurrentUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, Context};
pub use jwt::{TokenCodec, TokenError};
pub use roles::Role;

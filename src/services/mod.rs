// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Layer
//!
//! Business operations behind the HTTP handlers. Every operation takes the
//! [`RequestContext`](crate::context::RequestContext) of the calling request
//! and returns a [`ServiceResult`](crate::error::ServiceResult).
//!
//! - `auth` - Login, registration, logout and token revocation
//! - `users` - User profiles (owner or admin)
//! - `cards` - Loyalty cards (owner only)

pub mod auth;
pub mod cards;
pub mod users;
pub mod validation;

pub use auth::AuthService;
pub use cards::CardService;
pub use users::UserService;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Loyalty Cards API - card wallet service with revocable JWT authentication
//!
//! Registered users log in with email and password, receive an HS256 bearer
//! token and manage the loyalty cards they own. Logging out revokes the token
//! server-side before its natural expiry.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, password hashing, current-user resolution
//! - `services` - Login, registration, users and cards
//! - `storage` - redb persistence and ownership checks

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod revocation_sweeper;
pub mod services;
pub mod state;
pub mod storage;

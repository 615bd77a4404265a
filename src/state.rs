// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::TokenCodec;
use crate::services::{AuthService, CardService, UserService};
use crate::storage::Database;

/// Shared application state.
///
/// Cheap to clone; handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: Arc<TokenCodec>,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenCodec) -> Self {
        Self {
            db,
            tokens: Arc::new(tokens),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.db, &self.tokens)
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(&self.db)
    }

    pub fn cards(&self) -> CardService<'_> {
        CardService::new(&self.db)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Revocation Sweeper
//!
//! Background task that deletes revocation rows whose token can no longer
//! pass lifetime validation, clock-skew leeway included. Such a row no
//! longer protects anything.
//!
//! ## Shutdown
//!
//! Stops when the shared shutdown `CancellationToken` fires. A sweep in
//! progress observes the same token and aborts before committing.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{Database, RevokedTokenRepository};

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct RevocationSweeper {
    db: Database,
    sweep_interval: Duration,
}

impl RevocationSweeper {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run the sweeper loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Revocation sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Revocation sweeper shutting down");
                return;
            }

            self.sweep_step(&shutdown).await;

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Revocation sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep. Returns how many rows were removed.
    async fn sweep_step(&self, cancel: &CancellationToken) -> usize {
        match RevokedTokenRepository::new(&self.db)
            .purge_expired(cancel, Utc::now())
            .await
        {
            Ok(0) => {
                debug!("Revocation sweeper: nothing to purge");
                0
            }
            Ok(removed) => {
                info!(removed, "Revocation sweeper: purged expired rows");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Revocation sweeper: purge failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::database::temp_db;
    use crate::storage::{NewUser, UserRepository};
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let (db, _dir) = temp_db();
        let cancel = CancellationToken::new();
        let user = UserRepository::new(&db)
            .create(
                &cancel,
                NewUser {
                    user_name: "owner".into(),
                    email: "a@example.com".into(),
                    password_hash: "$argon2id$placeholder".into(),
                    role: Role::User,
                },
            )
            .await
            .unwrap();
        let repo = RevokedTokenRepository::new(&db);
        repo.add(&cancel, "old", Utc::now() - ChronoDuration::minutes(5), user.id)
            .await
            .unwrap();
        repo.add(&cancel, "live", Utc::now() + ChronoDuration::minutes(5), user.id)
            .await
            .unwrap();
        repo.add(&cancel, "in-leeway", Utc::now() - ChronoDuration::seconds(10), user.id)
            .await
            .unwrap();

        let sweeper = RevocationSweeper::new(db.clone());
        assert_eq!(sweeper.sweep_step(&cancel).await, 1);
        assert_eq!(sweeper.sweep_step(&cancel).await, 0);
        assert!(repo.is_revoked(&cancel, "live").await.unwrap());
        assert!(repo.is_revoked(&cancel, "in-leeway").await.unwrap());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (db, _dir) = temp_db();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            RevocationSweeper::new(db)
                .with_interval(Duration::from_millis(10))
                .run(shutdown.clone()),
        );

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

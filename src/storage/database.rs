// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded relational store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser
//! - `users_by_email`: lowercase email → user id (unique index)
//! - `cards`: card id → serialized StoredCard
//! - `cards_by_owner_barcode`: `user_id|barcode` → card id (unique index)
//! - `revoked_tokens`: token string → serialized RevokedToken
//! - `sequences`: sequence name → last issued id
//!
//! Uniqueness is checked inside the same write transaction that inserts the
//! row. redb serializes write transactions, so two concurrent registrations
//! with the same email cannot both pass the check.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redb::{
    Database as RedbDatabase, Key, Range, ReadTransaction, ReadableDatabase, ReadableTable,
    TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::DEFAULT_DATABASE_TIMEOUT;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<i64, &[u8]> = TableDefinition::new("users");

pub(crate) const USERS_BY_EMAIL: TableDefinition<&str, i64> =
    TableDefinition::new("users_by_email");

pub(crate) const CARDS: TableDefinition<i64, &[u8]> = TableDefinition::new("cards");

pub(crate) const CARDS_BY_OWNER_BARCODE: TableDefinition<&str, i64> =
    TableDefinition::new("cards_by_owner_barcode");

pub(crate) const REVOKED_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("revoked_tokens");

const SEQUENCES: TableDefinition<&str, i64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),

    #[error("foreign key violated: {0}")]
    MissingReference(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store operation cancelled")]
    Cancelled,

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("database directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the redb file.
///
/// Cloning is cheap. All work runs on the blocking pool; every call checks
/// its cancellation token before starting, and write transactions check it
/// again right before committing.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
    op_timeout: Duration,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                warn!(path = %parent.display(), error = %e, "Cannot create database directory");
                e
            })?;
        }
        let db = RedbDatabase::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_EMAIL)?;
            let _ = write_txn.open_table(CARDS)?;
            let _ = write_txn.open_table(CARDS_BY_OWNER_BARCODE)?;
            let _ = write_txn.open_table(REVOKED_TOKENS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            op_timeout: DEFAULT_DATABASE_TIMEOUT,
        })
    }

    /// Bound the wall-clock time of a single store operation.
    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Run a read transaction.
    pub async fn read<T, F>(&self, cancel: &CancellationToken, op: F) -> StoreResult<T>
    where
        F: FnOnce(&ReadTransaction) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.blocking(cancel, move |db, _| {
            let read_txn = db.begin_read()?;
            op(&read_txn)
        })
        .await
    }

    /// Run a write transaction, committing only if `op` succeeds, the
    /// caller has not cancelled and the operation has not timed out.
    ///
    /// A write that reports `Timeout` never commits afterwards.
    pub async fn write<T, F>(&self, cancel: &CancellationToken, op: F) -> StoreResult<T>
    where
        F: FnOnce(&WriteTransaction) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.blocking(cancel, move |db, gate| {
            let write_txn = db.begin_write()?;
            let value = op(&write_txn)?;
            if !gate.begin_commit() {
                write_txn.abort()?;
                return Err(StoreError::Cancelled);
            }
            write_txn.commit()?;
            Ok(value)
        })
        .await
    }

    /// Cheap liveness probe used by the readiness endpoint.
    pub async fn ping(&self, cancel: &CancellationToken) -> StoreResult<()> {
        self.read(cancel, |txn| {
            let _ = txn.open_table(SEQUENCES)?;
            Ok(())
        })
        .await
    }

    async fn blocking<T, F>(&self, cancel: &CancellationToken, op: F) -> StoreResult<T>
    where
        F: FnOnce(&RedbDatabase, &CommitGate) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let db = Arc::clone(&self.db);
        let gate = Arc::new(CommitGate::new(cancel.clone()));
        let task_gate = Arc::clone(&gate);
        let mut task = tokio::task::spawn_blocking(move || op(&db, &task_gate));

        match tokio::time::timeout(self.op_timeout, &mut task).await {
            Ok(joined) => joined?,
            Err(_) if gate.expire() => Err(StoreError::Timeout(self.op_timeout)),
            // Commit already under way when the deadline passed
            Err(_) => task.await?,
        }
    }
}

/// Decides, exactly once, whether a write commits or its deadline wins.
struct CommitGate {
    state: AtomicU8,
    cancel: CancellationToken,
}

impl CommitGate {
    const OPEN: u8 = 0;
    const COMMITTING: u8 = 1;
    const EXPIRED: u8 = 2;

    fn new(cancel: CancellationToken) -> Self {
        Self {
            state: AtomicU8::new(Self::OPEN),
            cancel,
        }
    }

    /// Claim the right to commit. False once cancelled or expired.
    fn begin_commit(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .state
                .compare_exchange(Self::OPEN, Self::COMMITTING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Mark the operation as timed out. False if a commit already started.
    fn expire(&self) -> bool {
        self.state
            .compare_exchange(Self::OPEN, Self::EXPIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Allocate the next id of a named sequence inside a write transaction.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<i64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Deserialize every row of a JSON-valued table that matches `keep`.
pub(crate) fn scan_json<K, T, P>(rows: Range<'_, K, &'static [u8]>, mut keep: P) -> StoreResult<Vec<T>>
where
    K: Key + 'static,
    T: DeserializeOwned,
    P: FnMut(&T) -> bool,
{
    let mut matches = Vec::new();
    for entry in rows {
        let (_, value) = entry?;
        let row: T = serde_json::from_slice(value.value())?;
        if keep(&row) {
            matches.push(row);
        }
    }
    Ok(matches)
}

#[cfg(test)]
pub(crate) fn temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequences_increment_per_name() {
        let (db, _dir) = temp_db();
        let cancel = CancellationToken::new();

        let ids = db
            .write(&cancel, |txn| {
                Ok((
                    next_id(txn, "users")?,
                    next_id(txn, "users")?,
                    next_id(txn, "cards")?,
                ))
            })
            .await
            .unwrap();

        assert_eq!(ids, (1, 2, 1));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_operation() {
        let (db, _dir) = temp_db();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = db.write(&cancel, |txn| next_id(txn, "users")).await;
        assert!(matches!(result, Err(StoreError::Cancelled)));

        let fresh = CancellationToken::new();
        let id = db.write(&fresh, |txn| next_id(txn, "users")).await.unwrap();
        assert_eq!(id, 1, "cancelled write must not have advanced the sequence");
    }

    #[tokio::test]
    async fn cancellation_before_commit_aborts_the_write() {
        let (db, _dir) = temp_db();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let result = db
            .write(&cancel, move |txn| {
                let id = next_id(txn, "users")?;
                trigger.cancel();
                Ok(id)
            })
            .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));

        let fresh = CancellationToken::new();
        let id = db.write(&fresh, |txn| next_id(txn, "users")).await.unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn timed_out_write_never_commits() {
        let (db, _dir) = temp_db();
        let slow = db.clone().with_timeout(Duration::from_millis(20));

        let result = slow
            .write(&CancellationToken::new(), |txn| {
                let id = next_id(txn, "users")?;
                std::thread::sleep(Duration::from_millis(200));
                Ok(id)
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));

        // Let the abandoned closure reach its commit point
        tokio::time::sleep(Duration::from_millis(400)).await;

        let id = db
            .write(&CancellationToken::new(), |txn| next_id(txn, "users"))
            .await
            .unwrap();
        assert_eq!(id, 1, "timed out write must not have advanced the sequence");
    }

    #[test]
    fn commit_gate_decides_once() {
        let gate = CommitGate::new(CancellationToken::new());
        assert!(gate.expire());
        assert!(!gate.begin_commit());

        let gate = CommitGate::new(CancellationToken::new());
        assert!(gate.begin_commit());
        assert!(!gate.expire());

        let cancel = CancellationToken::new();
        let gate = CommitGate::new(cancel.clone());
        cancel.cancel();
        assert!(!gate.begin_commit());
    }

    #[test]
    fn open_reports_unusable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Database::open(&blocker.join("test.redb"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn ping_succeeds_on_open_database() {
        let (db, _dir) = temp_db();
        db.ping(&CancellationToken::new()).await.unwrap();
    }
}

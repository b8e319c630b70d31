// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded relay database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `transport_keys`: key id → serialized TransportKeyRecord
//! - `audit_events`: `{timestamp_micros:020}-{event_id}` → serialized AuditEvent

use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: key id → TransportKeyRecord (JSON bytes).
pub(crate) const TRANSPORT_KEYS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("transport_keys");

/// Append-only audit log ordered by time.
pub(crate) const AUDIT_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("audit_events");

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

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// RelayDatabase
// =============================================================================

/// Handle to the relay's redb file. Shared behind an `Arc`.
pub struct RelayDatabase {
    db: Database,
}

impl RelayDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TRANSPORT_KEYS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened relay database");
        Ok(Self { db })
    }

    pub(crate) fn inner(&self) -> &Database {
        &self.db
    }

    /// Cheap read used by the readiness probe.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(TRANSPORT_KEYS)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_db() -> (RelayDatabase, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = RelayDatabase::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directory_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("relay.redb");
        let db = RelayDatabase::open(&path).unwrap();

        assert!(path.exists());
        db.ping().unwrap();
    }

    #[test]
    fn reopen_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.redb");
        drop(RelayDatabase::open(&path).unwrap());

        let db = RelayDatabase::open(&path).unwrap();
        db.ping().unwrap();
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for transport-key lifecycle operations.
//!
//! Registry mutations append one event each. Events never carry secret
//! material; the relay path writes none.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    database::{RelayDatabase, AUDIT_EVENTS},
    StoreResult,
};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    KeyCreated,
    KeyUpdated,
    KeyRegenerated,
    KeyDeleted,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who performed the operation.
    pub actor_user_id: Option<String>,
    /// User who owns the affected key.
    pub owner_user_id: Option<String>,
    /// Affected transport key.
    pub resource_id: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor_user_id: None,
            owner_user_id: None,
            resource_id: None,
            details: None,
        }
    }

    pub fn with_actor(mut self, user_id: impl Into<String>) -> Self {
        self.actor_user_id = Some(user_id.into());
        self
    }

    /// Set the affected key and its owner.
    pub fn with_resource(mut self, owner_user_id: impl Into<String>, key_id: impl Into<String>) -> Self {
        self.owner_user_id = Some(owner_user_id.into());
        self.resource_id = Some(key_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Table key: zero-padded microsecond timestamp, then the event id.
    fn storage_key(&self) -> String {
        format!(
            "{:020}-{}",
            self.timestamp.timestamp_micros().max(0),
            self.event_id
        )
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a RelayDatabase,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a RelayDatabase) -> Self {
        Self { db }
    }

    /// Append an event.
    pub fn log(&self, event: &AuditEvent) -> StoreResult<()> {
        let json = serde_json::to_vec(event)?;
        let key = event.storage_key();
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Most recent events first, at most `limit`.
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::with_capacity(limit.min(256));
        for entry in table.iter()?.rev().take(limit) {
            let (_, value) = entry?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    /// Most recent events touching one key.
    pub fn for_resource(&self, key_id: &str, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::new();
        for entry in table.iter()?.rev() {
            if events.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;
            if event.resource_id.as_deref() == Some(key_id) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

/// Append an audit event, logging (not propagating) a storage failure.
#[macro_export]
macro_rules! audit_log {
    ($db:expr, $event_type:expr, $actor:expr, $owner:expr, $key_id:expr) => {{
        let repo = $crate::storage::AuditRepository::new($db);
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_actor($actor)
            .with_resource($owner, $key_id);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, event_type = ?event.event_type, "Failed to write audit event");
        }
    }};
}

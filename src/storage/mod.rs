// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Storage
//!
//! Persistent state lives in a single redb file (`DATA_DIR/relay.redb`).
//!
//! ## Tables
//!
//! ```text
//! transport_keys   key id -> TransportKeyRecord (JSON)
//! audit_events     {timestamp_micros}-{event_id} -> AuditEvent (JSON)
//! ```
//!
//! ## Access Pattern
//!
//! - Registry operations are the only writers of `transport_keys`
//! - The relay path reads the active set and never writes
//! - Repositories borrow the shared [`RelayDatabase`] per call

pub mod audit;
pub mod database;
pub mod ownership;
pub mod transport_keys;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use database::{RelayDatabase, StoreError, StoreResult};
pub use ownership::{check_user_scope, OwnedResource, OwnershipCheck};
pub use transport_keys::{Provider, TransportKeyRecord, TransportKeyStore, TransportKeyView};

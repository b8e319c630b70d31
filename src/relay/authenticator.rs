// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resolution of a presented transport secret to its record.
//!
//! Only hashes are stored, so there is no index from secret to record: every
//! active key in the system is a candidate and each one costs an Argon2
//! verification. Latency therefore grows linearly with the active-key count.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::{
    error::RelayError,
    storage::{RelayDatabase, TransportKeyRecord, TransportKeyStore},
    vault::CredentialVault,
};

/// Dedicated header for the transport secret.
pub const TRANSPORT_KEY_HEADER: &str = "x-transport-key";

/// Pull the presented secret from `X-Transport-Key`, else `Authorization: Bearer`.
pub fn presented_transport_key(headers: &HeaderMap) -> Option<String> {
    let dedicated = headers
        .get(TRANSPORT_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);
    let bearer = || {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
    };

    dedicated
        .filter(|v| !v.is_empty())
        .or_else(|| bearer().filter(|v| !v.is_empty()))
        .map(str::to_string)
}

#[derive(Clone)]
pub struct RelayAuthenticator {
    db: Arc<RelayDatabase>,
    vault: Arc<CredentialVault>,
}

impl RelayAuthenticator {
    pub fn new(db: Arc<RelayDatabase>, vault: Arc<CredentialVault>) -> Self {
        Self { db, vault }
    }

    /// Find the active record whose hash matches `presented`.
    ///
    /// Blocking. A missing secret fails before the store is touched.
    pub fn authenticate(&self, presented: Option<&str>) -> Result<TransportKeyRecord, RelayError> {
        let secret = presented
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RelayError::MissingTransportKey)?;

        let candidates = TransportKeyStore::new(&self.db).list_active()?;
        let scanned = candidates.len();

        match candidates
            .into_iter()
            .find(|record| self.vault.verify_secret(secret, &record.secret_hash))
        {
            Some(record) => {
                tracing::debug!(key_id = %record.id, scanned, "Transport key authenticated");
                Ok(record)
            }
            None => {
                tracing::warn!(scanned, "Presented transport key matched no active record");
                Err(RelayError::InvalidTransportKey)
            }
        }
    }
}

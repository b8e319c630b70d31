// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport-key records and their redb table.
//!
//! ## Security
//!
//! - The transport secret is stored only as an Argon2 hash plus a masked form
//! - The provider API key is stored only as an AES-GCM blob
//! - Neither the hash nor the blob is ever returned via API ([`TransportKeyView`])

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::{
    database::{RelayDatabase, TRANSPORT_KEYS},
    OwnedResource, StoreError, StoreResult,
};

/// Upstream vendor a transport key relays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI-compatible chat completions
    Openai,
    Anthropic,
    Google,
    /// Azure OpenAI deployment
    Azure,
    /// Accepted in configuration; has no adapter.
    Other,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Azure => "azure",
            Provider::Other => "other",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::Openai),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            "azure" => Ok(Provider::Azure),
            "other" => Ok(Provider::Other),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Persisted transport key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportKeyRecord {
    pub id: String,
    pub owner_user_id: String,
    pub nickname: String,
    pub provider: Provider,
    pub model_name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Advisory only; not enforced.
    pub max_requests_per_minute: u32,
    /// Argon2 PHC string of the transport secret.
    pub secret_hash: String,
    /// Masked transport secret for display.
    pub display_key: String,
    /// `hex(iv):hex(ciphertext)` of the provider API key.
    pub encrypted_provider_key: String,
    pub active: bool,
    #[serde(default)]
    pub custom_params: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for TransportKeyRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

/// Transport key as returned to API clients (no hash, no encrypted blob).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransportKeyView {
    pub id: String,
    pub owner_user_id: String,
    pub nickname: String,
    pub provider: Provider,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub max_requests_per_minute: u32,
    /// Masked transport secret, e.g. `tkp_3f2***9c0d1e`
    pub display_key: String,
    pub active: bool,
    #[schema(value_type = Object)]
    pub custom_params: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransportKeyRecord> for TransportKeyView {
    fn from(record: TransportKeyRecord) -> Self {
        Self {
            id: record.id,
            owner_user_id: record.owner_user_id,
            nickname: record.nickname,
            provider: record.provider,
            model_name: record.model_name,
            base_url: record.base_url,
            deployment: record.deployment,
            api_version: record.api_version,
            temperature: record.temperature,
            system_prompt: record.system_prompt,
            max_requests_per_minute: record.max_requests_per_minute,
            display_key: record.display_key,
            active: record.active,
            custom_params: record.custom_params,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Repository over the `transport_keys` table.
pub struct TransportKeyStore<'a> {
    db: &'a RelayDatabase,
}

impl<'a> TransportKeyStore<'a> {
    pub fn new(db: &'a RelayDatabase) -> Self {
        Self { db }
    }

    /// Insert a new record. Fails if the id is already taken.
    pub fn insert(&self, record: &TransportKeyRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(TRANSPORT_KEYS)?;
            if table.get(record.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "transport key {}",
                    record.id
                )));
            }
            table.insert(record.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<TransportKeyRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(TRANSPORT_KEYS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write of one record inside a single write transaction.
    ///
    /// A record that is absent or owned by someone other than `owner_user_id`
    /// is `NotFound`. `apply` must not block: redb serializes writers, so the
    /// expensive parts of a change (hashing, encryption) are computed before
    /// calling this.
    pub fn modify<F>(
        &self,
        id: &str,
        owner_user_id: &str,
        apply: F,
    ) -> StoreResult<TransportKeyRecord>
    where
        F: FnOnce(&mut TransportKeyRecord),
    {
        let write_txn = self.db.inner().begin_write()?;
        let record = {
            let mut table = write_txn.open_table(TRANSPORT_KEYS)?;
            let existing: Option<TransportKeyRecord> = match table.get(id)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            let mut record = match existing {
                Some(record) if record.owner_user_id == owner_user_id => record,
                _ => return Err(StoreError::NotFound(format!("transport key {id}"))),
            };

            apply(&mut record);
            let json = serde_json::to_vec(&record)?;
            table.insert(id, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Hard delete. Returns whether a record was removed.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        let write_txn = self.db.inner().begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(TRANSPORT_KEYS)?;
            let existing = table.remove(id)?;
            existing.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn list_by_owner(&self, owner_user_id: &str) -> StoreResult<Vec<TransportKeyRecord>> {
        self.scan(|r| r.owner_user_id == owner_user_id)
    }

    pub fn list_all(&self) -> StoreResult<Vec<TransportKeyRecord>> {
        self.scan(|_| true)
    }

    /// Every active record in the system, regardless of owner.
    pub fn list_active(&self) -> StoreResult<Vec<TransportKeyRecord>> {
        self.scan(|r| r.active)
    }

    /// Full-table scan, oldest first.
    fn scan<F>(&self, keep: F) -> StoreResult<Vec<TransportKeyRecord>>
    where
        F: Fn(&TransportKeyRecord) -> bool,
    {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(TRANSPORT_KEYS)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: TransportKeyRecord = serde_json::from_slice(value.value())?;
            if keep(&record) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: &str, owner: &str) -> TransportKeyRecord {
    let now = Utc::now();
    TransportKeyRecord {
        id: id.to_string(),
        owner_user_id: owner.to_string(),
        nickname: format!("key {id}"),
        provider: Provider::Openai,
        model_name: "gpt-4".to_string(),
        base_url: None,
        deployment: None,
        api_version: None,
        temperature: 0.7,
        system_prompt: None,
        max_requests_per_minute: 60,
        secret_hash: "$argon2id$placeholder".to_string(),
        display_key: "tkp_abc***def012".to_string(),
        encrypted_provider_key: "00:00".to_string(),
        active: true,
        custom_params: Map::new(),
        created_at: now,
        updated_at: now,
    }
}

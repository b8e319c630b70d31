// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transport Key Registry
//!
//! Lifecycle of transport keys: create, update, regenerate, delete, list.
//!
//! Every operation takes the acting user and the user whose keys are
//! targeted. Non-admins may only target themselves; a key that does not
//! belong to the targeted user is reported as `NotFound`.
//!
//! The plaintext transport secret (and, on create, the provider key) leave
//! this module exactly once, inside the create/regenerate result. Only the
//! Argon2 hash, the masked display form and the AES-GCM blob are stored.
//!
//! All methods are blocking (redb I/O and Argon2); async callers run them on
//! the blocking pool.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Map;

use crate::{
    audit_log,
    auth::AuthenticatedUser,
    error::RelayError,
    models::{
        CreateTransportKeyRequest, IssuedTransportKey, RegeneratedTransportKey,
        UpdateTransportKeyRequest,
    },
    storage::{
        check_user_scope, AuditEventType, OwnershipCheck, Provider, RelayDatabase,
        TransportKeyRecord, TransportKeyStore, TransportKeyView,
    },
    vault::{generate_transport_secret, mask_secret, CredentialVault},
};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 60;
pub const MAX_TEMPERATURE: f32 = 2.0;

const RESOURCE: &str = "transport key";

#[derive(Clone)]
pub struct TransportKeyRegistry {
    db: Arc<RelayDatabase>,
    vault: Arc<CredentialVault>,
}

impl TransportKeyRegistry {
    pub fn new(db: Arc<RelayDatabase>, vault: Arc<CredentialVault>) -> Self {
        Self { db, vault }
    }

    /// Create a key for `owner_user_id`.
    ///
    /// The secret is generated here and never accepted from the caller.
    pub fn create(
        &self,
        actor: &AuthenticatedUser,
        owner_user_id: &str,
        request: CreateTransportKeyRequest,
    ) -> Result<IssuedTransportKey, RelayError> {
        check_user_scope(actor, owner_user_id)?;

        let nickname = required("nickname", request.nickname)?;
        let provider = parse_provider(&required("provider", request.provider)?)?;
        let model_name = required("model_name", request.model_name)?;
        let provider_api_key = required("provider_api_key", request.provider_api_key)?;
        let temperature = validate_temperature(request.temperature)?.unwrap_or(DEFAULT_TEMPERATURE);

        let transport_key = generate_transport_secret();
        let now = Utc::now();
        let record = TransportKeyRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: owner_user_id.to_string(),
            nickname,
            provider,
            model_name,
            base_url: non_empty(request.base_url),
            deployment: non_empty(request.deployment),
            api_version: non_empty(request.api_version),
            temperature,
            system_prompt: non_empty(request.system_prompt),
            max_requests_per_minute: request
                .max_requests_per_minute
                .unwrap_or(DEFAULT_MAX_REQUESTS_PER_MINUTE),
            secret_hash: self.vault.hash_secret(&transport_key)?,
            display_key: mask_secret(&transport_key),
            encrypted_provider_key: self.vault.encrypt(&provider_api_key)?,
            active: true,
            custom_params: request.custom_params.unwrap_or_else(Map::new),
            created_at: now,
            updated_at: now,
        };

        TransportKeyStore::new(&self.db).insert(&record)?;
        audit_log!(&self.db, AuditEventType::KeyCreated, actor.user_id.clone(), owner_user_id, record.id.clone());
        tracing::info!(
            key_id = %record.id,
            user_id = %owner_user_id,
            provider = %record.provider,
            "Transport key created"
        );

        Ok(IssuedTransportKey {
            key: record.into(),
            transport_key,
            provider_api_key,
        })
    }

    /// Apply a partial update. Never rotates the secret.
    ///
    /// Validation and re-encryption happen up front; the record is then
    /// changed in one write transaction so concurrent updates and
    /// regenerations never overwrite each other's fields.
    pub fn update(
        &self,
        actor: &AuthenticatedUser,
        owner_user_id: &str,
        key_id: &str,
        request: UpdateTransportKeyRequest,
    ) -> Result<TransportKeyView, RelayError> {
        check_user_scope(actor, owner_user_id)?;

        let UpdateTransportKeyRequest {
            nickname,
            provider,
            model_name,
            provider_api_key,
            base_url,
            deployment,
            api_version,
            temperature,
            system_prompt,
            max_requests_per_minute,
            custom_params,
            active,
        } = request;

        let nickname = nickname.map(|v| required("nickname", Some(v))).transpose()?;
        let provider = provider.map(|v| parse_provider(&v)).transpose()?;
        let model_name = model_name.map(|v| required("model_name", Some(v))).transpose()?;
        let encrypted_provider_key = match provider_api_key {
            Some(key) => Some(self.vault.encrypt(&required("provider_api_key", Some(key))?)?),
            None => None,
        };
        let temperature = validate_temperature(temperature)?;

        let record = TransportKeyStore::new(&self.db).modify(key_id, owner_user_id, |record| {
            if let Some(nickname) = nickname {
                record.nickname = nickname;
            }
            if let Some(provider) = provider {
                record.provider = provider;
            }
            if let Some(model_name) = model_name {
                record.model_name = model_name;
            }
            if let Some(blob) = encrypted_provider_key {
                record.encrypted_provider_key = blob;
            }
            if let Some(temperature) = temperature {
                record.temperature = temperature;
            }
            if let Some(rpm) = max_requests_per_minute {
                record.max_requests_per_minute = rpm;
            }
            if let Some(params) = custom_params {
                record.custom_params = params;
            }
            if let Some(active) = active {
                record.active = active;
            }
            apply_optional(&mut record.base_url, base_url);
            apply_optional(&mut record.deployment, deployment);
            apply_optional(&mut record.api_version, api_version);
            apply_optional(&mut record.system_prompt, system_prompt);
            record.updated_at = Utc::now();
        })?;

        audit_log!(&self.db, AuditEventType::KeyUpdated, actor.user_id.clone(), owner_user_id, key_id);
        tracing::info!(key_id = %key_id, user_id = %owner_user_id, active = record.active, "Transport key updated");

        Ok(record.into())
    }

    /// Replace the secret, its hash and its mask. Provider key and settings are kept.
    pub fn regenerate(
        &self,
        actor: &AuthenticatedUser,
        owner_user_id: &str,
        key_id: &str,
    ) -> Result<RegeneratedTransportKey, RelayError> {
        check_user_scope(actor, owner_user_id)?;
        let store = TransportKeyStore::new(&self.db);
        store.get(key_id)?.owned_by(owner_user_id, RESOURCE)?;

        let transport_key = generate_transport_secret();
        let secret_hash = self.vault.hash_secret(&transport_key)?;
        let display_key = mask_secret(&transport_key);

        let record = store.modify(key_id, owner_user_id, |record| {
            record.secret_hash = secret_hash;
            record.display_key = display_key;
            record.updated_at = Utc::now();
        })?;
        audit_log!(&self.db, AuditEventType::KeyRegenerated, actor.user_id.clone(), owner_user_id, key_id);
        tracing::info!(key_id = %key_id, user_id = %owner_user_id, "Transport key regenerated");

        Ok(RegeneratedTransportKey {
            key: record.into(),
            transport_key,
        })
    }

    /// Hard delete after the ownership check.
    pub fn delete(
        &self,
        actor: &AuthenticatedUser,
        owner_user_id: &str,
        key_id: &str,
    ) -> Result<(), RelayError> {
        check_user_scope(actor, owner_user_id)?;
        let store = TransportKeyStore::new(&self.db);
        store.get(key_id)?.owned_by(owner_user_id, RESOURCE)?;

        if !store.remove(key_id)? {
            // Lost a race with a concurrent delete.
            return Err(RelayError::NotFound(RESOURCE.to_string()));
        }
        audit_log!(&self.db, AuditEventType::KeyDeleted, actor.user_id.clone(), owner_user_id, key_id);
        tracing::info!(key_id = %key_id, user_id = %owner_user_id, "Transport key deleted");
        Ok(())
    }

    pub fn list(
        &self,
        actor: &AuthenticatedUser,
        owner_user_id: &str,
    ) -> Result<Vec<TransportKeyView>, RelayError> {
        check_user_scope(actor, owner_user_id)?;
        let records = TransportKeyStore::new(&self.db).list_by_owner(owner_user_id)?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Every key in the system. Callers gate this to admins.
    pub fn list_all(&self) -> Result<Vec<TransportKeyView>, RelayError> {
        let records = TransportKeyStore::new(&self.db).list_all()?;
        Ok(records.into_iter().map(Into::into).collect())
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, RelayError> {
    non_empty(value).ok_or_else(|| RelayError::InvalidRequest(format!("{field} is required")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `Some("")` clears, `Some(v)` sets, `None` keeps.
fn apply_optional(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *target = non_empty(Some(value));
    }
}

fn parse_provider(value: &str) -> Result<Provider, RelayError> {
    value.parse().map_err(RelayError::InvalidRequest)
}

fn validate_temperature(value: Option<f32>) -> Result<Option<f32>, RelayError> {
    match value {
        Some(t) if !t.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&t) => Err(
            RelayError::InvalidRequest(format!("temperature must be between 0 and {MAX_TEMPERATURE}")),
        ),
        other => Ok(other),
    }
}

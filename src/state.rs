// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state handed to every handler.

use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use crate::{
    config::{JwtMode, RelayConfig},
    error::RelayError,
    providers::ProviderAdapters,
    registry::TransportKeyRegistry,
    relay::{RelayAuthenticator, RelayOrchestrator},
    storage::RelayDatabase,
    vault::CredentialVault,
};

/// How the `Auth` extractor checks user tokens.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 key; `None` means development decoding without signature checks.
    pub decoding_key: Option<DecodingKey>,
    pub issuer: Option<String>,
}

impl AuthConfig {
    pub fn hs256(secret: &[u8], issuer: Option<String>) -> Self {
        Self {
            decoding_key: Some(DecodingKey::from_secret(secret)),
            issuer,
        }
    }

    pub fn insecure() -> Self {
        Self {
            decoding_key: None,
            issuer: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.decoding_key.is_some()
    }
}

impl From<&JwtMode> for AuthConfig {
    fn from(mode: &JwtMode) -> Self {
        match mode {
            JwtMode::Verified { secret, issuer } => Self::hs256(secret.as_bytes(), issuer.clone()),
            JwtMode::Insecure => Self::insecure(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RelayDatabase>,
    pub registry: TransportKeyRegistry,
    pub relay: Arc<RelayOrchestrator>,
    pub auth: AuthConfig,
    pub dev_mode: bool,
}

impl AppState {
    /// Wire the vault, registry and relay from resolved configuration.
    pub fn new(config: &RelayConfig, db: RelayDatabase) -> Result<Self, RelayError> {
        let db = Arc::new(db);
        let vault = Arc::new(CredentialVault::new(&config.vault).map_err(|e| {
            RelayError::Internal(format!("credential vault configuration: {e}"))
        })?);

        let relay = RelayOrchestrator::new(
            RelayAuthenticator::new(db.clone(), vault.clone()),
            vault.clone(),
            ProviderAdapters::new(&config.endpoints),
            RelayOrchestrator::http_client(config.upstream_timeout)?,
        );

        Ok(Self {
            registry: TransportKeyRegistry::new(db.clone(), vault),
            relay: Arc::new(relay),
            auth: AuthConfig::from(&config.jwt),
            dev_mode: config.dev_mode,
            db,
        })
    }
}

#[cfg(test)]
pub(crate) const TEST_JWT_SECRET: &[u8] = b"state-test-jwt-secret";

/// State over a throwaway database, low-cost hashing and the given provider base URL.
#[cfg(test)]
pub(crate) fn test_state(provider_base_url: &str) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let base = provider_base_url.to_string();
    let dir_path = dir.path().to_string_lossy().to_string();
    let config = RelayConfig::from_vars(|name| match name {
        "ENCRYPTION_SECRET" => Some("state-test-passphrase".to_string()),
        "HASH_WORK_FACTOR" => Some("1".to_string()),
        "HASH_MEMORY_KIB" => Some("64".to_string()),
        "JWT_SECRET" => Some(String::from_utf8_lossy(TEST_JWT_SECRET).to_string()),
        "DATA_DIR" => Some(dir_path.clone()),
        "OPENAI_BASE_URL" | "ANTHROPIC_BASE_URL" | "GOOGLE_BASE_URL" | "AZURE_OPENAI_ENDPOINT" => {
            Some(base.clone())
        }
        _ => None,
    })
    .expect("test config");
    let db = RelayDatabase::open(&config.database_path()).expect("test database");
    let state = AppState::new(&config, db).expect("test state");
    (state, dir)
}

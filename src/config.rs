// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is resolved once at startup into [`RelayConfig`] and passed
//! explicitly to the vault, the provider adapters and the router state.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RELAY_DEV_MODE` | `1`/`true` enables development fallbacks | off |
//! | `ENCRYPTION_SECRET` | Passphrase the provider-key encryption key is derived from | Required outside dev mode |
//! | `HASH_WORK_FACTOR` | Argon2 time cost for transport secrets | Required outside dev mode (dev: `2`) |
//! | `HASH_MEMORY_KIB` | Argon2 memory cost in KiB | `19456` |
//! | `JWT_SECRET` | HS256 secret for user tokens | Required outside dev mode |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `DATA_DIR` | Directory holding `relay.redb` | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AZURE_OPENAI_ENDPOINT` | Azure base URL used when a key has none | Optional |
//! | `OPENAI_BASE_URL` | OpenAI endpoint override | `https://api.openai.com` |
//! | `ANTHROPIC_BASE_URL` | Anthropic endpoint override | `https://api.anthropic.com` |
//! | `GOOGLE_BASE_URL` | Google endpoint override | `https://generativelanguage.googleapis.com` |
//! | `UPSTREAM_TIMEOUT_SECS` | Connect and first-byte timeout for provider calls | `120` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use zeroize::Zeroizing;

use crate::vault::VaultConfig;

pub const DEV_MODE_ENV: &str = "RELAY_DEV_MODE";
pub const ENCRYPTION_SECRET_ENV: &str = "ENCRYPTION_SECRET";
pub const HASH_WORK_FACTOR_ENV: &str = "HASH_WORK_FACTOR";
pub const HASH_MEMORY_KIB_ENV: &str = "HASH_MEMORY_KIB";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const AZURE_ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const ANTHROPIC_BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
pub const GOOGLE_BASE_URL_ENV: &str = "GOOGLE_BASE_URL";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19_456;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 120;

/// Database file created under `DATA_DIR`.
pub const DATABASE_FILE: &str = "relay.redb";

/// Used only when `RELAY_DEV_MODE` is set and `ENCRYPTION_SECRET` is absent.
const DEV_ENCRYPTION_SECRET: &str = "transport-relay-development-only";
const DEV_HASH_WORK_FACTOR: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set (set {DEV_MODE_ENV}=1 for development fallbacks)")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Base URLs of the fixed-endpoint providers plus the Azure fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub anthropic: String,
    pub google: String,
    pub azure_default: Option<String>,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: DEFAULT_OPENAI_BASE_URL.to_string(),
            anthropic: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            google: DEFAULT_GOOGLE_BASE_URL.to_string(),
            azure_default: None,
        }
    }
}

/// How user JWTs are checked.
#[derive(Clone)]
pub enum JwtMode {
    /// Verify HS256 signatures with the shared secret.
    Verified {
        secret: Zeroizing<String>,
        issuer: Option<String>,
    },
    /// Decode claims without verifying the signature. Development only.
    Insecure,
}

impl fmt::Debug for JwtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtMode::Verified { issuer, .. } => f
                .debug_struct("Verified")
                .field("secret", &"<redacted>")
                .field("issuer", issuer)
                .finish(),
            JwtMode::Insecure => f.write_str("Insecure"),
        }
    }
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub dev_mode: bool,
    pub vault: VaultConfig,
    pub jwt: JwtMode,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub endpoints: ProviderEndpoints,
    pub upstream_timeout: Duration,
}

impl RelayConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Resolve from an arbitrary lookup. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let dev_mode = get(DEV_MODE_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let passphrase = match get(ENCRYPTION_SECRET_ENV) {
            Some(secret) => secret,
            None if dev_mode => {
                tracing::warn!(
                    "{ENCRYPTION_SECRET_ENV} not set; using the development passphrase. \
                     Stored provider keys are NOT protected."
                );
                DEV_ENCRYPTION_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing(ENCRYPTION_SECRET_ENV)),
        };

        let work_factor = match get(HASH_WORK_FACTOR_ENV) {
            Some(raw) => parse_number::<u32>(HASH_WORK_FACTOR_ENV, &raw)?,
            None if dev_mode => DEV_HASH_WORK_FACTOR,
            None => return Err(ConfigError::Missing(HASH_WORK_FACTOR_ENV)),
        };
        if work_factor == 0 {
            return Err(ConfigError::Invalid {
                name: HASH_WORK_FACTOR_ENV,
                reason: "must be at least 1".to_string(),
            });
        }

        let memory_kib = match get(HASH_MEMORY_KIB_ENV) {
            Some(raw) => parse_number::<u32>(HASH_MEMORY_KIB_ENV, &raw)?,
            None => DEFAULT_HASH_MEMORY_KIB,
        };

        let jwt = match get(JWT_SECRET_ENV) {
            Some(secret) => JwtMode::Verified {
                secret: Zeroizing::new(secret),
                issuer: get(JWT_ISSUER_ENV),
            },
            None if dev_mode => {
                tracing::warn!("{JWT_SECRET_ENV} not set; user tokens are decoded WITHOUT verification");
                JwtMode::Insecure
            }
            None => return Err(ConfigError::Missing(JWT_SECRET_ENV)),
        };

        let port = match get(PORT_ENV) {
            Some(raw) => parse_number::<u16>(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get(UPSTREAM_TIMEOUT_ENV) {
            Some(raw) => parse_number::<u64>(UPSTREAM_TIMEOUT_ENV, &raw)?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let endpoints = ProviderEndpoints {
            openai: base_url(OPENAI_BASE_URL_ENV, get(OPENAI_BASE_URL_ENV), DEFAULT_OPENAI_BASE_URL)?,
            anthropic: base_url(
                ANTHROPIC_BASE_URL_ENV,
                get(ANTHROPIC_BASE_URL_ENV),
                DEFAULT_ANTHROPIC_BASE_URL,
            )?,
            google: base_url(GOOGLE_BASE_URL_ENV, get(GOOGLE_BASE_URL_ENV), DEFAULT_GOOGLE_BASE_URL)?,
            azure_default: match get(AZURE_ENDPOINT_ENV) {
                Some(raw) => Some(validate_url(AZURE_ENDPOINT_ENV, &raw)?),
                None => None,
            },
        };

        Ok(Self {
            dev_mode,
            vault: VaultConfig {
                passphrase: Zeroizing::new(passphrase),
                work_factor,
                memory_kib,
            },
            jwt,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            endpoints,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn base_url(name: &'static str, value: Option<String>, default: &str) -> Result<String, ConfigError> {
    match value {
        Some(raw) => validate_url(name, &raw),
        None => Ok(default.to_string()),
    }
}

/// Parse as an absolute http(s) URL and strip any trailing slash.
fn validate_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn production_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENCRYPTION_SECRET_ENV, "prod-passphrase"),
            (HASH_WORK_FACTOR_ENV, "3"),
            (JWT_SECRET_ENV, "jwt-secret"),
        ]
    }

    #[test]
    fn production_requires_encryption_secret() {
        let vars = [(HASH_WORK_FACTOR_ENV, "3"), (JWT_SECRET_ENV, "s")];
        let err = RelayConfig::from_vars(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENCRYPTION_SECRET_ENV)));
    }

    #[test]
    fn production_requires_work_factor() {
        let vars = [(ENCRYPTION_SECRET_ENV, "p"), (JWT_SECRET_ENV, "s")];
        let err = RelayConfig::from_vars(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(HASH_WORK_FACTOR_ENV)));
    }

    #[test]
    fn production_requires_jwt_secret() {
        let vars = [(ENCRYPTION_SECRET_ENV, "p"), (HASH_WORK_FACTOR_ENV, "3")];
        let err = RelayConfig::from_vars(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(JWT_SECRET_ENV)));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let vars = [
            (ENCRYPTION_SECRET_ENV, "   "),
            (HASH_WORK_FACTOR_ENV, "3"),
            (JWT_SECRET_ENV, "s"),
        ];
        assert!(matches!(
            RelayConfig::from_vars(lookup(&vars)),
            Err(ConfigError::Missing(ENCRYPTION_SECRET_ENV))
        ));
    }

    #[test]
    fn production_config_resolves_defaults() {
        let config = RelayConfig::from_vars(lookup(&production_vars())).unwrap();

        assert!(!config.dev_mode);
        assert_eq!(config.vault.work_factor, 3);
        assert_eq!(config.vault.memory_kib, DEFAULT_HASH_MEMORY_KIB);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database_path(), PathBuf::from("./data/relay.redb"));
        assert_eq!(config.endpoints, ProviderEndpoints::default());
        assert_eq!(config.upstream_timeout, Duration::from_secs(120));
        assert!(matches!(config.jwt, JwtMode::Verified { issuer: None, .. }));
    }

    #[test]
    fn dev_mode_fills_in_fallbacks() {
        let config = RelayConfig::from_vars(lookup(&[(DEV_MODE_ENV, "true")])).unwrap();

        assert!(config.dev_mode);
        assert_eq!(config.vault.work_factor, DEV_HASH_WORK_FACTOR);
        assert_eq!(config.vault.passphrase.as_str(), DEV_ENCRYPTION_SECRET);
        assert!(matches!(config.jwt, JwtMode::Insecure));
    }

    #[test]
    fn dev_mode_still_uses_explicit_values() {
        let mut vars = production_vars();
        vars.push((DEV_MODE_ENV, "1"));
        let config = RelayConfig::from_vars(lookup(&vars)).unwrap();

        assert_eq!(config.vault.passphrase.as_str(), "prod-passphrase");
        assert_eq!(config.vault.work_factor, 3);
        assert!(matches!(config.jwt, JwtMode::Verified { .. }));
    }

    #[test]
    fn invalid_numbers_fail() {
        let mut vars = production_vars();
        vars.push((PORT_ENV, "eighty"));
        assert!(matches!(
            RelayConfig::from_vars(lookup(&vars)),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));

        let vars = [
            (ENCRYPTION_SECRET_ENV, "p"),
            (HASH_WORK_FACTOR_ENV, "0"),
            (JWT_SECRET_ENV, "s"),
        ];
        assert!(matches!(
            RelayConfig::from_vars(lookup(&vars)),
            Err(ConfigError::Invalid { name: HASH_WORK_FACTOR_ENV, .. })
        ));
    }

    #[test]
    fn endpoint_overrides_are_normalized() {
        let mut vars = production_vars();
        vars.push((OPENAI_BASE_URL_ENV, "http://localhost:9000/"));
        vars.push((AZURE_ENDPOINT_ENV, "https://acme.openai.azure.com"));
        let config = RelayConfig::from_vars(lookup(&vars)).unwrap();

        assert_eq!(config.endpoints.openai, "http://localhost:9000");
        assert_eq!(
            config.endpoints.azure_default.as_deref(),
            Some("https://acme.openai.azure.com")
        );
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let mut vars = production_vars();
        vars.push((GOOGLE_BASE_URL_ENV, "ftp://example.com"));
        assert!(matches!(
            RelayConfig::from_vars(lookup(&vars)),
            Err(ConfigError::Invalid { name: GOOGLE_BASE_URL_ENV, .. })
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = RelayConfig::from_vars(lookup(&production_vars())).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("prod-passphrase"));
        assert!(!rendered.contains("jwt-secret"));
    }
}

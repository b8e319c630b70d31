// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport secret generation, hashing and display masking.

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::RngCore;

use super::VaultError;

/// Every transport secret starts with this prefix.
pub const TRANSPORT_KEY_PREFIX: &str = "tkp_";

/// Random bytes behind each transport secret (256 bits).
const SECRET_BYTES: usize = 32;

/// Shorter secrets are displayed as-is.
const MASK_MIN_LEN: usize = 12;
const MASK_HEAD: usize = 7;
const MASK_TAIL: usize = 6;

/// Generate a new transport secret: `tkp_` followed by 64 hex characters.
pub fn generate_transport_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{TRANSPORT_KEY_PREFIX}{}", hex::encode(bytes))
}

/// Display form of a secret: first 7 and last 6 characters around `***`.
///
/// Deterministic truncation for UI display only.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < MASK_MIN_LEN {
        return secret.to_string();
    }
    let head: String = chars[..MASK_HEAD].iter().collect();
    let tail: String = chars[chars.len() - MASK_TAIL..].iter().collect();
    format!("{head}***{tail}")
}

/// Argon2id hasher with a fixed, process-wide work factor.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
    work_factor: u32,
}

impl fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHasher")
            .field("work_factor", &self.work_factor)
            .finish()
    }
}

impl SecretHasher {
    pub fn new(work_factor: u32, memory_kib: u32) -> Result<Self, VaultError> {
        let params = Params::new(memory_kib, work_factor, 1, None)
            .map_err(|e| VaultError::InvalidConfig(format!("invalid hash parameters: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            work_factor,
        })
    }

    pub fn hash(&self, secret: &str) -> Result<String, VaultError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| VaultError::Hashing(e.to_string()))
    }

    /// Verification reads cost parameters from the stored PHC string, so
    /// hashes made under an older work factor still verify.
    pub fn verify(&self, secret: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored transport secret hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_format() {
        let secret = generate_transport_secret();
        assert!(secret.starts_with(TRANSPORT_KEY_PREFIX));
        assert_eq!(secret.len(), TRANSPORT_KEY_PREFIX.len() + SECRET_BYTES * 2);
        assert!(secret[TRANSPORT_KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_secrets_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            assert!(seen.insert(generate_transport_secret()));
        }
    }

    #[test]
    fn mask_keeps_head_and_tail() {
        let secret = "tkp_0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        assert_eq!(mask_secret(secret), "tkp_012***abcdef");
    }

    #[test]
    fn mask_is_deterministic() {
        let secret = generate_transport_secret();
        assert_eq!(mask_secret(&secret), mask_secret(&secret));
    }

    #[test]
    fn short_secrets_are_returned_unchanged() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("tkp_short"), "tkp_short");
        assert_eq!(mask_secret("12345678901"), "12345678901");
    }

    #[test]
    fn mask_at_threshold_length() {
        assert_eq!(mask_secret("abcdefghijkl"), "abcdefg***ghijkl");
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            SecretHasher::new(0, 64),
            Err(VaultError::InvalidConfig(_))
        ));
    }

    #[test]
    fn hash_records_work_factor() {
        let hasher = SecretHasher::new(2, 64).unwrap();
        let hash = hasher.hash("tkp_abc").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("t=2"));
    }
}

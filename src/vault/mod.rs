// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Vault
//!
//! Holds the two pieces of secret material every transport key carries:
//!
//! - the **transport secret** (`tkp_...`) presented on relay calls, stored only
//!   as a salted Argon2 hash plus a masked display form
//! - the **provider API key**, stored encrypted with AES-256-GCM under a single
//!   server-wide key derived from the configured passphrase
//!
//! The vault is built once at startup from [`VaultConfig`] and shared by
//! reference. Nothing here reads the environment.

mod cipher;
mod secret;

use std::fmt;

use zeroize::Zeroizing;

pub use cipher::{ProviderKeyCipher, IV_LEN};
pub use secret::{generate_transport_secret, mask_secret, SecretHasher, TRANSPORT_KEY_PREFIX};

/// Errors raised by the credential vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Stored blob does not have the `iv:ciphertext` shape.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// Blob has the right shape but does not authenticate under the vault key.
    #[error("credential could not be decrypted")]
    DecryptionFailed,

    #[error("credential encryption failed")]
    EncryptionFailed,

    #[error("secret hashing failed: {0}")]
    Hashing(String),

    #[error("invalid vault configuration: {0}")]
    InvalidConfig(String),
}

/// Process-wide vault settings, resolved once from [`crate::config::RelayConfig`].
#[derive(Clone)]
pub struct VaultConfig {
    /// Passphrase the encryption key is derived from.
    pub passphrase: Zeroizing<String>,
    /// Argon2 time cost applied to every transport secret.
    pub work_factor: u32,
    /// Argon2 memory cost in KiB.
    pub memory_kib: u32,
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("passphrase", &"<redacted>")
            .field("work_factor", &self.work_factor)
            .field("memory_kib", &self.memory_kib)
            .finish()
    }
}

/// Encryption, hashing and verification of transport-key secret material.
#[derive(Clone)]
pub struct CredentialVault {
    cipher: ProviderKeyCipher,
    hasher: SecretHasher,
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// Build the vault from its configuration.
    pub fn new(config: &VaultConfig) -> Result<Self, VaultError> {
        if config.passphrase.is_empty() {
            return Err(VaultError::InvalidConfig(
                "encryption passphrase must not be empty".to_string(),
            ));
        }
        Ok(Self {
            cipher: ProviderKeyCipher::from_passphrase(&config.passphrase)?,
            hasher: SecretHasher::new(config.work_factor, config.memory_kib)?,
        })
    }

    /// Encrypt a provider API key into its stored `hex(iv):hex(ciphertext)` form.
    ///
    /// Every call draws a fresh IV.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        self.cipher.encrypt(plaintext)
    }

    /// Decrypt a stored blob back into the provider API key.
    ///
    /// The plaintext is wiped from memory when the returned value is dropped.
    pub fn decrypt(&self, blob: &str) -> Result<Zeroizing<String>, VaultError> {
        self.cipher.decrypt(blob)
    }

    /// Salted one-way hash of a transport secret (PHC string format).
    pub fn hash_secret(&self, secret: &str) -> Result<String, VaultError> {
        self.hasher.hash(secret)
    }

    /// Check a presented secret against a stored hash.
    pub fn verify_secret(&self, secret: &str, hash: &str) -> bool {
        self.hasher.verify(secret, hash)
    }
}

#[cfg(test)]
pub(crate) fn test_vault() -> CredentialVault {
    CredentialVault::new(&VaultConfig {
        passphrase: Zeroizing::new("test-passphrase".to_string()),
        work_factor: 1,
        memory_kib: 64,
    })
    .expect("test vault")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_verifies_against_its_hash() {
        let vault = test_vault();
        let secret = generate_transport_secret();
        let hash = vault.hash_secret(&secret).unwrap();

        assert!(vault.verify_secret(&secret, &hash));
        assert!(!vault.verify_secret(&generate_transport_secret(), &hash));
        assert!(!vault.verify_secret("tkp_", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let vault = test_vault();
        let secret = generate_transport_secret();
        let first = vault.hash_secret(&secret).unwrap();
        let second = vault.hash_secret(&secret).unwrap();

        assert_ne!(first, second);
        assert!(vault.verify_secret(&secret, &first));
        assert!(vault.verify_secret(&secret, &second));
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let vault = test_vault();
        let secret = generate_transport_secret();
        let hash = vault.hash_secret(&secret).unwrap();
        assert!(!hash.contains(&secret[TRANSPORT_KEY_PREFIX.len()..]));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        let vault = test_vault();
        assert!(!vault.verify_secret("tkp_abc", "not-a-phc-string"));
        assert!(!vault.verify_secret("tkp_abc", ""));
    }

    #[test]
    fn encrypt_decrypt_restores_provider_key() {
        let vault = test_vault();
        let long = "x".repeat(4096);
        for key in ["sk-test-123", "", "ключ-🔑", long.as_str()] {
            let blob = vault.encrypt(key).unwrap();
            assert_eq!(vault.decrypt(&blob).unwrap().as_str(), key);
        }
    }

    #[test]
    fn encrypting_twice_never_repeats_ciphertext() {
        let vault = test_vault();
        let a = vault.encrypt("sk-same").unwrap();
        let b = vault.encrypt("sk-same").unwrap();
        assert_ne!(a, b);
        assert_ne!(a.split(':').next(), b.split(':').next());
    }

    #[test]
    fn empty_passphrase_is_rejected() {
        let result = CredentialVault::new(&VaultConfig {
            passphrase: Zeroizing::new(String::new()),
            work_factor: 1,
            memory_kib: 64,
        });
        assert!(matches!(result, Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn debug_output_hides_passphrase() {
        let config = VaultConfig {
            passphrase: Zeroizing::new("super-secret".to_string()),
            work_factor: 3,
            memory_kib: 64,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("work_factor: 3"));
    }
}

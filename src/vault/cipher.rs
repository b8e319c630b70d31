// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM encryption of provider API keys.
//!
//! ## Stored Format
//!
//! ```text
//! hex(iv) ":" hex(ciphertext || tag)
//! ```
//!
//! The IV is 12 random bytes drawn per call. The key is derived once from the
//! server passphrase with Argon2id (fixed cost, independent of the transport
//! secret hashing parameters so stored blobs survive a cost change).

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use super::VaultError;

/// Length of the AES-GCM IV in bytes.
pub const IV_LEN: usize = 12;

const KEY_DERIVATION_SALT: &[u8] = b"transport-relay/provider-key-salt/v1";

/// Argon2id cost for the passphrase KDF: 19 MiB, 2 passes, 1 lane.
const KDF_MEMORY_KIB: u32 = 19_456;
const KDF_ITERATIONS: u32 = 2;
const KDF_LANES: u32 = 1;
const KEY_LEN: usize = 32;

/// Symmetric cipher bound to the server-wide encryption key.
#[derive(Clone)]
pub struct ProviderKeyCipher {
    cipher: Aes256Gcm,
}

impl ProviderKeyCipher {
    /// Derive the encryption key from the configured passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, VaultError> {
        let params = Params::new(KDF_MEMORY_KIB, KDF_ITERATIONS, KDF_LANES, Some(KEY_LEN))
            .map_err(|e| VaultError::InvalidConfig(format!("invalid kdf parameters: {e}")))?;
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase.as_bytes(), KEY_DERIVATION_SALT, &mut key[..])
            .map_err(|e| VaultError::InvalidConfig(format!("key derivation failed: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| VaultError::InvalidConfig(format!("invalid encryption key: {e}")))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let iv = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&iv, plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionFailed)?;

        Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    pub fn decrypt(&self, blob: &str) -> Result<Zeroizing<String>, VaultError> {
        let (iv_hex, ciphertext_hex) = blob.split_once(':').ok_or_else(|| {
            VaultError::MalformedCredential("missing iv delimiter".to_string())
        })?;

        let iv = hex::decode(iv_hex)
            .map_err(|_| VaultError::MalformedCredential("iv is not hex".to_string()))?;
        if iv.len() != IV_LEN {
            return Err(VaultError::MalformedCredential(format!(
                "iv must be {IV_LEN} bytes, got {}",
                iv.len()
            )));
        }

        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|_| VaultError::MalformedCredential("ciphertext is not hex".to_string()))?;

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
                .map_err(|_| VaultError::DecryptionFailed)?,
        );

        let text = std::str::from_utf8(&plaintext).map_err(|_| VaultError::DecryptionFailed)?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> ProviderKeyCipher {
        ProviderKeyCipher::from_passphrase("unit-test-passphrase").unwrap()
    }

    #[test]
    fn blob_has_hex_iv_and_ciphertext() {
        let blob = cipher().encrypt("sk-live-abc").unwrap();
        let (iv, ct) = blob.split_once(':').unwrap();

        assert_eq!(iv.len(), IV_LEN * 2);
        assert!(iv.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(ct.chars().all(|c| c.is_ascii_hexdigit()));
        // 11 bytes plaintext + 16 byte tag
        assert_eq!(ct.len(), (11 + 16) * 2);
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        let result = cipher().decrypt("deadbeef");
        assert!(matches!(result, Err(VaultError::MalformedCredential(_))));
    }

    #[test]
    fn wrong_iv_length_is_malformed() {
        let result = cipher().decrypt("abcd:00112233");
        assert!(matches!(result, Err(VaultError::MalformedCredential(_))));
    }

    #[test]
    fn non_hex_parts_are_malformed() {
        let c = cipher();
        assert!(matches!(
            c.decrypt("zz:0011"),
            Err(VaultError::MalformedCredential(_))
        ));

        let blob = c.encrypt("sk").unwrap();
        let (iv, _) = blob.split_once(':').unwrap();
        assert!(matches!(
            c.decrypt(&format!("{iv}:not-hex")),
            Err(VaultError::MalformedCredential(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let c = cipher();
        let blob = c.encrypt("sk-live-abc").unwrap();
        let (iv, ct) = blob.split_once(':').unwrap();

        let mut bytes = hex::decode(ct).unwrap();
        bytes[0] ^= 0x01;
        let tampered = format!("{iv}:{}", hex::encode(bytes));

        assert!(matches!(c.decrypt(&tampered), Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn key_is_stretched_with_argon2id() {
        let mut expected = [0u8; KEY_LEN];
        Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(KDF_MEMORY_KIB, KDF_ITERATIONS, KDF_LANES, Some(KEY_LEN)).unwrap(),
        )
        .hash_password_into(b"unit-test-passphrase", KEY_DERIVATION_SALT, &mut expected)
        .unwrap();

        let blob = cipher().encrypt("sk-live-abc").unwrap();
        let (iv, ct) = blob.split_once(':').unwrap();
        let iv = hex::decode(iv).unwrap();
        let plaintext = Aes256Gcm::new_from_slice(&expected)
            .unwrap()
            .decrypt(Nonce::from_slice(&iv), hex::decode(ct).unwrap().as_slice())
            .unwrap();
        assert_eq!(plaintext, b"sk-live-abc");
    }

    #[test]
    fn derivation_is_stable_across_instances() {
        let blob = cipher().encrypt("sk-live-abc").unwrap();
        assert_eq!(cipher().decrypt(&blob).unwrap().as_str(), "sk-live-abc");
    }

    #[test]
    fn other_passphrase_cannot_decrypt() {
        let blob = cipher().encrypt("sk-live-abc").unwrap();
        let other = ProviderKeyCipher::from_passphrase("rotated-passphrase").unwrap();
        assert!(matches!(other.decrypt(&blob), Err(VaultError::DecryptionFailed)));
    }
}

//! Mnemonic vault
//!
//! Authenticated encryption at rest of the real recovery phrase.
//!
//! ## Record format
//!
//! ```text
//! { version, ciphertext, nonce, salt, kdfIterations, checksum }
//! ```
//!
//! - key = Argon2id(password, salt, t = kdfIterations), 32 bytes
//! - ciphertext = ChaCha20-Poly1305(key, nonce, phrase, aad = domain || salt || iterations)
//! - checksum = SHA-256(ciphertext), checked before any key derivation
//!
//! The display phrase is a cosmetic word sequence derived from the record's
//! nonce and salt only, so it never depends on the sealed phrase.

use crate::VaultError;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use custody_core::codec::{self, Phrase};
use custody_core::keystream::{Argon2id, PasswordKdf};
use custody_core::{KdfParams, SecureRandom, MIN_SALT_LEN};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Current record version
pub const VAULT_RECORD_VERSION: u8 = 1;

/// Nonce length for ChaCha20-Poly1305
pub const NONCE_LEN: usize = 12;

/// Vault salt length
pub const VAULT_SALT_LEN: usize = 16;

const KEY_LEN: usize = 32;
const AAD_DOMAIN: &[u8] = b"custody/vault/v1";
const DISPLAY_DOMAIN: &[u8] = b"custody/display-phrase/v1";

type VaultResult<T> = std::result::Result<T, VaultError>;

/// Encrypted vault record, one per wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Record format version
    pub version: u8,
    /// AEAD ciphertext with tag
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    /// AEAD nonce
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,
    /// KDF salt
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    /// KDF time cost used at seal time
    pub kdf_iterations: u32,
    /// SHA-256 of the ciphertext
    #[serde(with = "hex_bytes")]
    pub checksum: Vec<u8>,
}

impl VaultRecord {
    /// Parse from stored JSON
    pub fn from_json(raw: &str) -> VaultResult<Self> {
        serde_json::from_str(raw).map_err(|e| VaultError::CorruptRecord(e.to_string()))
    }

    /// Serialize for storage
    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string(self).map_err(|e| VaultError::Encryption(e.to_string()))
    }

    /// Verify format and integrity without decrypting
    pub fn verify_integrity(&self) -> VaultResult<()> {
        if self.version != VAULT_RECORD_VERSION {
            return Err(VaultError::CorruptRecord(format!(
                "Unsupported record version: {}",
                self.version
            )));
        }
        if self.nonce.len() != NONCE_LEN {
            return Err(VaultError::CorruptRecord("Invalid nonce length".to_string()));
        }
        if self.salt.len() < MIN_SALT_LEN {
            return Err(VaultError::CorruptRecord("Salt too short".to_string()));
        }
        if self.kdf_iterations == 0 {
            return Err(VaultError::CorruptRecord("Invalid iteration count".to_string()));
        }
        if ciphertext_checksum(&self.ciphertext).as_slice() != self.checksum.as_slice() {
            return Err(VaultError::CorruptRecord("Checksum mismatch".to_string()));
        }
        Ok(())
    }

    fn associated_data(&self) -> Vec<u8> {
        associated_data(&self.salt, self.kdf_iterations)
    }
}

/// Human-facing decoy phrase shown before authentication
#[derive(Clone, PartialEq, Eq)]
pub struct CosmeticPhrase(Phrase);

impl CosmeticPhrase {
    /// Words as a space-separated string
    pub fn to_phrase_string(&self) -> Zeroizing<String> {
        self.0.to_phrase_string()
    }

    /// Individual words
    pub fn words(&self) -> Vec<&'static str> {
        self.0.words().collect()
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CosmeticPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmeticPhrase")
            .field("words", &self.len())
            .finish_non_exhaustive()
    }
}

/// Mnemonic vault
pub struct MnemonicVault {
    kdf: Arc<dyn PasswordKdf>,
    rng: Arc<dyn SecureRandom>,
    iterations: u32,
}

impl MnemonicVault {
    /// Create with an injected KDF and random source
    pub fn new(kdf: Arc<dyn PasswordKdf>, rng: Arc<dyn SecureRandom>, iterations: u32) -> Self {
        Self {
            kdf,
            rng,
            iterations,
        }
    }

    /// Create with Argon2id and the configured vault parameters
    pub fn with_params(params: &KdfParams, rng: Arc<dyn SecureRandom>) -> Self {
        Self::new(
            Arc::new(Argon2id::from_params(params)),
            rng,
            params.vault_iterations,
        )
    }

    /// KDF iterations written into new records
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encrypt a phrase under a password-derived key
    pub fn seal(&self, phrase: &Phrase, password: &str) -> VaultResult<VaultRecord> {
        let mut salt = vec![0u8; VAULT_SALT_LEN];
        self.rng.fill_bytes(&mut salt);
        let mut nonce = vec![0u8; NONCE_LEN];
        self.rng.fill_bytes(&mut nonce);

        let key = self.derive_key(password, &salt, self.iterations)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
        let plaintext = phrase.to_phrase_string();
        let aad = associated_data(&salt, self.iterations);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|e| VaultError::Encryption(e.to_string()))?;
        let checksum = ciphertext_checksum(&ciphertext).to_vec();

        tracing::info!(words = phrase.len(), "Recovery phrase sealed");
        Ok(VaultRecord {
            version: VAULT_RECORD_VERSION,
            ciphertext,
            nonce,
            salt,
            kdf_iterations: self.iterations,
            checksum,
        })
    }

    /// Decrypt a record
    ///
    /// Integrity is checked before the key is derived, so a corrupted record
    /// is rejected as [`VaultError::CorruptRecord`] without KDF cost.
    pub fn open(&self, record: &VaultRecord, password: &str) -> VaultResult<Phrase> {
        record.verify_integrity()?;

        let key = self.derive_key(password, &record.salt, record.kdf_iterations)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
        let aad = record.associated_data();

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&record.nonce),
                Payload {
                    msg: &record.ciphertext,
                    aad: &aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| {
                tracing::warn!("Vault authentication tag rejected");
                VaultError::WrongPassword
            })?;

        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| VaultError::CorruptRecord("Plaintext is not UTF-8".to_string()))?;
        let phrase = Phrase::parse(text)?;
        if !codec::is_valid(&phrase) {
            return Err(VaultError::CorruptRecord(
                "Sealed phrase failed checksum".to_string(),
            ));
        }
        Ok(phrase)
    }

    /// Re-seal a record under a new password
    pub fn rekey(
        &self,
        record: &VaultRecord,
        old_password: &str,
        new_password: &str,
    ) -> VaultResult<VaultRecord> {
        let phrase = self.open(record, old_password)?;
        let rekeyed = self.seal(&phrase, new_password)?;
        tracing::info!("Vault password changed");
        Ok(rekeyed)
    }

    /// Cosmetic phrase for a record
    pub fn display_phrase(&self, record: &VaultRecord) -> VaultResult<CosmeticPhrase> {
        display_phrase(record)
    }

    fn derive_key(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> VaultResult<Zeroizing<[u8; KEY_LEN]>> {
        if password.is_empty() {
            return Err(VaultError::KeyDerivation(
                "Password must not be empty".to_string(),
            ));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        self.kdf
            .derive_into(password.as_bytes(), salt, iterations, key.as_mut_slice())?;
        Ok(key)
    }
}

/// Cosmetic 24-word phrase for a record
///
/// Stable for a given record; depends only on the nonce and salt.
pub fn display_phrase(record: &VaultRecord) -> VaultResult<CosmeticPhrase> {
    let seed = Sha256::new()
        .chain_update(DISPLAY_DOMAIN)
        .chain_update(&record.nonce)
        .chain_update(&record.salt)
        .finalize();
    let phrase = codec::encode(&seed)?;
    Ok(CosmeticPhrase(phrase))
}

fn associated_data(salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_DOMAIN.len() + salt.len() + 4);
    aad.extend_from_slice(AAD_DOMAIN);
    aad.extend_from_slice(salt);
    aad.extend_from_slice(&iterations.to_le_bytes());
    aad
}

fn ciphertext_checksum(ciphertext: &[u8]) -> [u8; 32] {
    Sha256::digest(ciphertext).into()
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

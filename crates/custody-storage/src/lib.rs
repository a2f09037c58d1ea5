//! Secure storage, vault and authentication for the custody wallet
//!
//! Provides the at-rest key-value store abstraction, the mnemonic vault
//! record, the authentication gateway and the persisted quick-pay policy.
//!
//! ## Security Features
//!
//! - **Vault Encryption**: ChaCha20-Poly1305 with record-bound associated data
//! - **Passphrase KDF**: Argon2id with 64 MiB memory, 3 iterations, 4 lanes
//! - **Integrity Check**: SHA-256 over the ciphertext, verified before key derivation
//! - **Biometric Gateway**: startup probe with passcode fallback, bounded prompts, lockout
//! - **Cosmetic Phrase**: decoy words for display before authentication

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod policy;
pub mod store;
pub mod vault;

pub use auth::{AuthGateway, AuthMechanism, Availability, BiometricKind, MockAuthMechanism};
pub use error::{AuthError, Error, Result, VaultError};
pub use policy::{DailySpent, PolicyUpdate, QuickPayPolicy, DEFAULT_IDLE_TIMEOUT_MS};
pub use store::{default_store_dir, load_json, save_json, FileStore, MemoryStore, SecureStore, StorageKeys};
pub use vault::{
    display_phrase, CosmeticPhrase, MnemonicVault, VaultRecord, NONCE_LEN, VAULT_RECORD_VERSION,
    VAULT_SALT_LEN,
};

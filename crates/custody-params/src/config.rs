//! Loadable core configuration

use crate::entropy::EntropySize;
use crate::kdf::{KdfParams, KdfProfile};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default authentication prompt timeout (30s)
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 30_000;

/// Upper bound for the authentication prompt timeout (5 min)
pub const MAX_AUTH_TIMEOUT_MS: u64 = 300_000;

/// Default wallet identifier
pub const DEFAULT_WALLET_ID: &str = "default";

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Wallet identifier used to namespace storage keys
    pub wallet_id: String,
    /// KDF profile the params were taken from
    pub kdf_profile: KdfProfile,
    /// KDF parameters
    pub kdf: KdfParams,
    /// Salt size for surrogate phrases
    pub salt_size: EntropySize,
    /// Entropy size for newly created wallets
    pub default_entropy_size: EntropySize,
    /// Authentication prompt timeout in milliseconds
    pub auth_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            wallet_id: DEFAULT_WALLET_ID.to_string(),
            kdf_profile: KdfProfile::Standard,
            kdf: KdfParams::standard(),
            salt_size: EntropySize::Bits128,
            default_entropy_size: EntropySize::Bits256,
            auth_timeout_ms: DEFAULT_AUTH_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Config with cheap KDF parameters for tests
    pub fn testing() -> Self {
        Self {
            kdf_profile: KdfProfile::Testing,
            kdf: KdfParams::testing(),
            ..Self::default()
        }
    }

    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Write to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validate all fields
    pub fn validate(&self) -> Result<()> {
        let id = self.wallet_id.trim();
        if id.is_empty() || id.len() > 64 {
            return Err(Error::InvalidConfig(
                "wallet id must be 1-64 characters".to_string(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidConfig(format!(
                "wallet id contains unsupported characters: {id}"
            )));
        }
        if self.auth_timeout_ms == 0 || self.auth_timeout_ms > MAX_AUTH_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "auth timeout must be 1..={} ms",
                MAX_AUTH_TIMEOUT_MS
            )));
        }
        self.kdf
            .validate(self.kdf_profile == KdfProfile::Testing)
    }
}

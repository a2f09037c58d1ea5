//! Password KDF parameter profiles

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minimum PBKDF2 iteration count accepted outside of tests
pub const MIN_KEYSTREAM_ITERATIONS: u32 = 1_000;

/// Minimum Argon2id memory cost (KiB)
pub const MIN_ARGON2_MEMORY_KIB: u32 = 8;

/// KDF profile enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KdfProfile {
    /// Production parameters
    Standard,
    /// Cheap parameters for unit tests and simulators
    Testing,
}

/// Parameters for the two password-derived secrets
///
/// The keystream masks phrase entropy (PBKDF2-HMAC-SHA256), the vault key
/// seals the stored phrase (Argon2id). Iteration counts are persisted next to
/// the data they protect, so changing a profile only affects new artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// PBKDF2 iterations for the mnemonic keystream
    pub keystream_iterations: u32,
    /// Argon2id time cost for the vault key
    pub vault_iterations: u32,
    /// Argon2id memory cost in KiB
    pub vault_memory_kib: u32,
    /// Argon2id parallelism
    pub vault_lanes: u32,
}

impl KdfParams {
    /// Production parameters
    ///
    /// PBKDF2: 600,000 iterations (OWASP 2023, HMAC-SHA256).
    /// Argon2id: 64 MiB, 3 iterations, 4 lanes.
    pub const fn standard() -> Self {
        Self {
            keystream_iterations: 600_000,
            vault_iterations: 3,
            vault_memory_kib: 65_536,
            vault_lanes: 4,
        }
    }

    /// Test parameters
    pub const fn testing() -> Self {
        Self {
            keystream_iterations: 2,
            vault_iterations: 1,
            vault_memory_kib: 64,
            vault_lanes: 1,
        }
    }

    /// Get params by profile
    pub const fn from_profile(profile: KdfProfile) -> Self {
        match profile {
            KdfProfile::Standard => Self::standard(),
            KdfProfile::Testing => Self::testing(),
        }
    }

    /// Check that the params are usable
    ///
    /// `allow_weak` skips the production minimums (test profiles only).
    pub fn validate(&self, allow_weak: bool) -> Result<()> {
        if self.keystream_iterations == 0 || self.vault_iterations == 0 {
            return Err(Error::InvalidKdfParams(
                "iteration counts must be non-zero".to_string(),
            ));
        }
        if self.vault_lanes == 0 {
            return Err(Error::InvalidKdfParams("lanes must be non-zero".to_string()));
        }
        // Argon2 requires at least 8 KiB per lane
        if self.vault_memory_kib < MIN_ARGON2_MEMORY_KIB * self.vault_lanes {
            return Err(Error::InvalidKdfParams(format!(
                "memory cost {} KiB too small for {} lanes",
                self.vault_memory_kib, self.vault_lanes
            )));
        }
        if !allow_weak && self.keystream_iterations < MIN_KEYSTREAM_ITERATIONS {
            return Err(Error::InvalidKdfParams(format!(
                "keystream iterations below minimum of {}",
                MIN_KEYSTREAM_ITERATIONS
            )));
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

//! Keystream derivation
//!
//! Deterministic, deliberately slow password-to-bytes derivation. The
//! [`PasswordKdf`] trait is the injected KDF primitive; PBKDF2-HMAC-SHA256
//! backs the mnemonic keystream and Argon2id backs the vault key.

use crate::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Minimum salt length accepted by any KDF
pub const MIN_SALT_LEN: usize = 16;

/// KDF algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    /// PBKDF2-HMAC-SHA256
    Pbkdf2Sha256,
    /// Argon2id (v0x13)
    Argon2id,
}

/// Password-based key derivation primitive
pub trait PasswordKdf: Send + Sync {
    /// Algorithm implemented
    fn algorithm(&self) -> KdfAlgorithm;

    /// Fill `out` with key material derived from `(password, salt, iterations)`
    fn derive_into(&self, password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8])
        -> Result<()>;
}

/// PBKDF2-HMAC-SHA256
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2Sha256;

impl PasswordKdf for Pbkdf2Sha256 {
    fn algorithm(&self) -> KdfAlgorithm {
        KdfAlgorithm::Pbkdf2Sha256
    }

    fn derive_into(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        out: &mut [u8],
    ) -> Result<()> {
        check_inputs(salt, iterations)?;
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, out);
        Ok(())
    }
}

/// Argon2id with fixed memory cost and lanes; `iterations` is the time cost
#[derive(Debug, Clone, Copy)]
pub struct Argon2id {
    memory_kib: u32,
    lanes: u32,
}

impl Argon2id {
    /// Create with memory cost (KiB) and parallelism
    pub fn new(memory_kib: u32, lanes: u32) -> Self {
        Self { memory_kib, lanes }
    }

    /// Create from configured params
    pub fn from_params(params: &custody_params::KdfParams) -> Self {
        Self::new(params.vault_memory_kib, params.vault_lanes)
    }
}

impl PasswordKdf for Argon2id {
    fn algorithm(&self) -> KdfAlgorithm {
        KdfAlgorithm::Argon2id
    }

    fn derive_into(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        out: &mut [u8],
    ) -> Result<()> {
        check_inputs(salt, iterations)?;
        let params = Params::new(self.memory_kib, iterations, self.lanes, Some(out.len()))
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password, salt, out)
            .map_err(|e| Error::KeyDerivation(e.to_string()))
    }
}

fn check_inputs(salt: &[u8], iterations: u32) -> Result<()> {
    if salt.len() < MIN_SALT_LEN {
        return Err(Error::KeyDerivation("Salt too short".to_string()));
    }
    if iterations == 0 {
        return Err(Error::KeyDerivation("Iteration count must be non-zero".to_string()));
    }
    Ok(())
}

/// Derive `len` keystream bytes from `(password, salt, iterations)`
pub fn derive(
    kdf: &dyn PasswordKdf,
    password: &str,
    salt: &[u8],
    iterations: u32,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if password.is_empty() {
        return Err(Error::EmptyPassword);
    }
    let mut out = Zeroizing::new(vec![0u8; len]);
    kdf.derive_into(password.as_bytes(), salt, iterations, &mut out)?;
    Ok(out)
}

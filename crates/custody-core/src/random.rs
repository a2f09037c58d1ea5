//! Secure random byte source

use rand::RngCore;

/// Cryptographically secure random byte source
///
/// Injected wherever salts, nonces or entropy are generated so that tests can
/// substitute a deterministic generator.
pub trait SecureRandom: Send + Sync {
    /// Fill `dest` with random bytes
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(dest);
    }
}

/// Deterministic generator for tests and simulators
#[cfg(any(test, feature = "test-helpers"))]
pub struct SeededRandom {
    rng: parking_lot::Mutex<rand::rngs::StdRng>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl SeededRandom {
    /// Create from a fixed seed
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            rng: parking_lot::Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl SecureRandom for SeededRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}

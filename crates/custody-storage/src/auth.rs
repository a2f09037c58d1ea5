//! Authentication gateway
//!
//! Wraps the platform biometric/passcode prompt. Mechanisms are probed once
//! when the gateway is resolved; the active one is recorded and a secondary
//! mechanism is kept as fallback for prompts the active one cannot present.
//!
//! Prompts are bounded by a timeout, which is reported as
//! [`AuthError::Cancelled`]. Consecutive hard failures lock the gateway out
//! until [`AuthGateway::reset_lockout`] is called.

use crate::AuthError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Kind of authentication a mechanism presents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricKind {
    /// Fingerprint sensor
    Fingerprint,
    /// Face recognition
    Face,
    /// No biometric (passcode or nothing)
    None,
}

/// Result of probing a mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    /// Whether a prompt can be presented
    pub available: bool,
    /// Biometric kind
    pub kind: BiometricKind,
}

impl Availability {
    /// Nothing available
    pub const fn unavailable() -> Self {
        Self {
            available: false,
            kind: BiometricKind::None,
        }
    }

    /// Available with the given kind
    pub const fn available(kind: BiometricKind) -> Self {
        Self {
            available: true,
            kind,
        }
    }
}

/// Platform authentication mechanism
///
/// Implementations bridge to native prompts (biometric, device passcode).
#[async_trait]
pub trait AuthMechanism: Send + Sync {
    /// Mechanism name, for logs
    fn name(&self) -> &str;

    /// Probe whether the mechanism can present a prompt
    async fn availability(&self) -> Availability;

    /// Present a prompt and await the user
    async fn authenticate(&self, reason: &str) -> Result<(), AuthError>;
}

/// Authentication gateway
pub struct AuthGateway {
    active: Option<Arc<dyn AuthMechanism>>,
    fallback: Option<Arc<dyn AuthMechanism>>,
    availability: Availability,
    timeout: Duration,
    failed_attempts: Mutex<u32>,
}

impl AuthGateway {
    /// Maximum consecutive hard failures before lockout
    pub const MAX_FAILED_ATTEMPTS: u32 = 5;

    /// Probe `primary` then `secondary` and record the active mechanism
    pub async fn resolve(
        primary: Arc<dyn AuthMechanism>,
        secondary: Option<Arc<dyn AuthMechanism>>,
        timeout: Duration,
    ) -> Self {
        let primary_availability = primary.availability().await;
        let (active, fallback, availability) = if primary_availability.available {
            (Some(primary), secondary, primary_availability)
        } else {
            match secondary {
                Some(secondary) => {
                    let secondary_availability = secondary.availability().await;
                    if secondary_availability.available {
                        (Some(secondary), None, secondary_availability)
                    } else {
                        (None, None, Availability::unavailable())
                    }
                }
                None => (None, None, Availability::unavailable()),
            }
        };

        match &active {
            Some(mechanism) => tracing::info!(
                "Authentication gateway resolved to {} ({:?})",
                mechanism.name(),
                availability.kind
            ),
            None => tracing::warn!("No authentication mechanism available"),
        }

        Self {
            active,
            fallback,
            availability,
            timeout,
            failed_attempts: Mutex::new(0),
        }
    }

    /// Gateway with no mechanism; every prompt reports `Unavailable`
    pub fn unavailable() -> Self {
        Self {
            active: None,
            fallback: None,
            availability: Availability::unavailable(),
            timeout: Duration::ZERO,
            failed_attempts: Mutex::new(0),
        }
    }

    /// Availability recorded at resolve time
    pub fn is_available(&self) -> Availability {
        if self.is_locked_out() {
            return Availability::unavailable();
        }
        self.availability
    }

    /// Name of the active mechanism
    pub fn active_mechanism(&self) -> Option<&str> {
        self.active.as_ref().map(|mechanism| mechanism.name())
    }

    /// Prompt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Present a prompt
    ///
    /// Falls back to the secondary mechanism only when the active one reports
    /// `Unavailable`.
    pub async fn prompt(&self, reason: &str) -> Result<(), AuthError> {
        if self.is_locked_out() {
            tracing::warn!("Authentication locked out");
            return Err(AuthError::Unavailable);
        }
        let Some(active) = &self.active else {
            return Err(AuthError::Unavailable);
        };

        let mut result = self.prompt_with(active.as_ref(), reason).await;
        if result == Err(AuthError::Unavailable) {
            if let Some(fallback) = &self.fallback {
                tracing::debug!("Falling back to {}", fallback.name());
                result = self.prompt_with(fallback.as_ref(), reason).await;
            }
        }

        match &result {
            Ok(()) => *self.failed_attempts.lock() = 0,
            Err(AuthError::Cancelled) => tracing::debug!("Authentication cancelled"),
            Err(AuthError::Unavailable) => {}
            Err(error) => {
                let mut attempts = self.failed_attempts.lock();
                *attempts = attempts.saturating_add(1);
                tracing::warn!("Authentication failed ({}): {}", *attempts, error);
            }
        }
        result
    }

    /// Check if locked out
    pub fn is_locked_out(&self) -> bool {
        *self.failed_attempts.lock() >= Self::MAX_FAILED_ATTEMPTS
    }

    /// Reset lockout
    pub fn reset_lockout(&self) {
        *self.failed_attempts.lock() = 0;
    }

    async fn prompt_with(&self, mechanism: &dyn AuthMechanism, reason: &str) -> Result<(), AuthError> {
        match tokio::time::timeout(self.timeout, mechanism.authenticate(reason)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("Authentication prompt timed out");
                Err(AuthError::Cancelled)
            }
        }
    }
}

/// Scripted mechanism for tests and platforms without native integration
///
/// Outcomes are consumed in order; once the script is empty the default
/// outcome is returned.
pub struct MockAuthMechanism {
    name: String,
    availability: Availability,
    script: Mutex<VecDeque<Result<(), AuthError>>>,
    default_outcome: Result<(), AuthError>,
    delay: Duration,
    prompts: AtomicU32,
}

impl MockAuthMechanism {
    /// Available fingerprint mechanism that always succeeds
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            availability: Availability::available(BiometricKind::Fingerprint),
            script: Mutex::new(VecDeque::new()),
            default_outcome: Ok(()),
            delay: Duration::ZERO,
            prompts: AtomicU32::new(0),
        }
    }

    /// Mechanism that is not available on this device
    pub fn absent() -> Self {
        Self::new()
            .with_availability(Availability::unavailable())
            .with_default(Err(AuthError::Unavailable))
    }

    /// Set the name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set probe result
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Set the outcome used once the script is exhausted
    pub fn with_default(mut self, outcome: Result<(), AuthError>) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Delay every prompt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue an outcome for the next prompt
    pub fn push_outcome(&self, outcome: Result<(), AuthError>) {
        self.script.lock().push_back(outcome);
    }

    /// Number of prompts presented
    pub fn prompt_count(&self) -> u32 {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Default for MockAuthMechanism {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthMechanism for MockAuthMechanism {
    fn name(&self) -> &str {
        &self.name
    }

    async fn availability(&self) -> Availability {
        self.availability
    }

    async fn authenticate(&self, _reason: &str) -> Result<(), AuthError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.default_outcome.clone())
    }
}

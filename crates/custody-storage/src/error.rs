//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Vault error
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Mnemonic vault errors
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Authentication tag rejected the derived key
    #[error("Wrong password")]
    WrongPassword,

    /// Record failed integrity or format checks before decryption
    #[error("Corrupt vault record: {0}")]
    CorruptRecord(String),

    /// Key derivation failed
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Cipher failure other than an authentication tag mismatch
    #[error("Encryption error: {0}")]
    Encryption(String),
}

impl VaultError {
    /// Check if the caller may retry with a different password
    pub fn is_wrong_secret(&self) -> bool {
        matches!(self, VaultError::WrongPassword)
    }
}

impl From<custody_core::Error> for VaultError {
    fn from(error: custody_core::Error) -> Self {
        match error {
            custody_core::Error::KeyDerivation(msg) => VaultError::KeyDerivation(msg),
            custody_core::Error::EmptyPassword => {
                VaultError::KeyDerivation("Password must not be empty".to_string())
            }
            other => VaultError::CorruptRecord(other.to_string()),
        }
    }
}

/// Authentication gateway errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No mechanism could present a prompt
    #[error("Authentication unavailable")]
    Unavailable,

    /// User dismissed the prompt, or it timed out
    #[error("Authentication cancelled")]
    Cancelled,

    /// Mechanism present but no credential enrolled
    #[error("No biometric or passcode enrolled")]
    NotEnrolled,

    /// Platform reported a hardware or sensor fault
    #[error("Authentication hardware fault: {0}")]
    HardwareFault(String),
}

impl AuthError {
    /// Cancellation and timeout are normal user actions, not failures
    pub fn is_expected_user_action(&self) -> bool {
        matches!(self, AuthError::Cancelled)
    }

    /// Errors that should push the app onto its full authentication flow
    pub fn should_force_full_auth(&self) -> bool {
        matches!(
            self,
            AuthError::Unavailable | AuthError::HardwareFault(_) | AuthError::NotEnrolled
        )
    }
}

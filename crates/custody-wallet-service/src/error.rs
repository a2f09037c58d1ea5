//! Error types for the wallet service

use custody_storage::{AuthError, VaultError};

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet service errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Phrase, keystream or transform error
    #[error(transparent)]
    Core(#[from] custody_core::Error),

    /// Storage, vault or authentication error
    #[error(transparent)]
    Storage(#[from] custody_storage::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Params(#[from] custody_params::Error),

    /// Amount arithmetic overflowed 64 bits
    #[error("Amount overflow")]
    AmountOverflow,

    /// No wallet has been created or imported
    #[error("Wallet not initialized")]
    NotInitialized,

    /// A wallet already exists under this id
    #[error("Wallet already exists")]
    WalletExists,
}

impl From<VaultError> for Error {
    fn from(error: VaultError) -> Self {
        Error::Storage(custody_storage::Error::Vault(error))
    }
}

impl From<AuthError> for Error {
    fn from(error: AuthError) -> Self {
        Error::Storage(custody_storage::Error::Auth(error))
    }
}

impl Error {
    /// Check if the failure means "wrong secret" rather than an I/O or hardware fault
    pub fn is_wrong_secret(&self) -> bool {
        match self {
            Error::Core(e) => e.is_wrong_password_or_corrupted(),
            Error::Storage(custody_storage::Error::Vault(e)) => e.is_wrong_secret(),
            _ => false,
        }
    }

    /// Authentication error, if this is one
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            Error::Storage(custody_storage::Error::Auth(e)) => Some(e),
            _ => None,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Core(e) => e.user_message(),
            Error::Storage(custody_storage::Error::Vault(VaultError::WrongPassword)) => {
                "Incorrect password.".to_string()
            }
            Error::Storage(custody_storage::Error::Vault(VaultError::CorruptRecord(_))) => {
                "Stored wallet data is corrupted.".to_string()
            }
            Error::Storage(custody_storage::Error::Auth(AuthError::Cancelled)) => {
                "Authentication was cancelled.".to_string()
            }
            Error::Storage(custody_storage::Error::Auth(_)) => {
                "Authentication is unavailable. Please use your password.".to_string()
            }
            Error::NotInitialized => "No wallet found on this device.".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_secret_detection() {
        assert!(Error::from(custody_core::Error::Checksum).is_wrong_secret());
        assert!(Error::from(VaultError::WrongPassword).is_wrong_secret());
        assert!(!Error::from(VaultError::CorruptRecord("x".into())).is_wrong_secret());
        assert!(!Error::from(AuthError::Cancelled).is_wrong_secret());
        assert!(!Error::AmountOverflow.is_wrong_secret());
    }

    #[test]
    fn test_auth_error_access() {
        let error = Error::from(AuthError::Cancelled);
        assert_eq!(error.auth_error(), Some(&AuthError::Cancelled));
        assert!(error.user_message().contains("cancelled"));
        assert_eq!(Error::NotInitialized.auth_error(), None);
    }

    #[test]
    fn test_user_messages() {
        assert!(Error::from(custody_core::Error::Checksum)
            .user_message()
            .contains("Incorrect password or corrupted data"));
        assert_eq!(
            Error::from(VaultError::WrongPassword).user_message(),
            "Incorrect password."
        );
    }
}

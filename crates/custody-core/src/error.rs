//! Error types for Custody Core
//!
//! Error taxonomy for phrase encoding, key derivation and the mnemonic
//! transform.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Custody Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Checksum mismatch (corrupted phrase, or wrong password on restore)
    #[error("Checksum mismatch: incorrect password or corrupted data")]
    Checksum,

    /// Word count does not match any supported layout
    #[error("Word count mismatch: got {actual}, expected one of {expected:?}")]
    LengthMismatch {
        /// Words supplied
        actual: usize,
        /// Accepted word counts
        expected: Vec<usize>,
    },

    /// Word not in the dictionary
    #[error("Unknown word at position {position}: {word}")]
    UnknownWord {
        /// Zero-based position in the phrase
        position: usize,
        /// The offending word
        word: String,
    },

    /// Entropy length not supported
    #[error("Invalid entropy length: {0} bytes")]
    InvalidEntropyLength(usize),

    /// Empty password supplied
    #[error("Password must not be empty")]
    EmptyPassword,

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Parameter error
    #[error("Parameter error: {0}")]
    Params(#[from] custody_params::Error),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Checksum
                | Error::LengthMismatch { .. }
                | Error::UnknownWord { .. }
                | Error::EmptyPassword
        )
    }

    /// Check if the failure means "wrong secret" rather than a fault
    pub fn is_wrong_password_or_corrupted(&self) -> bool {
        matches!(self, Error::Checksum)
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Checksum => "Incorrect password or corrupted data.".to_string(),
            Error::LengthMismatch { .. } => {
                "The phrase has the wrong number of words. Please check and try again.".to_string()
            }
            Error::UnknownWord { position, .. } => format!(
                "Word {} is not a valid recovery word. Please check and try again.",
                position + 1
            ),
            Error::EmptyPassword => "Please enter a password.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Checksum => ErrorCategory::Checksum,
            Error::LengthMismatch { .. } | Error::UnknownWord { .. } => ErrorCategory::Phrase,
            Error::EmptyPassword | Error::KeyDerivation(_) => ErrorCategory::Keys,
            Error::InvalidEntropyLength(_) | Error::Params(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Checksum failures (wrong secret or corruption)
    Checksum,
    /// Malformed phrase input
    Phrase,
    /// Key-related errors
    Keys,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Checksum => write!(f, "Checksum"),
            ErrorCategory::Phrase => write!(f, "Phrase"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

//! Custody wallet parameters and configuration
//!
//! This crate provides the supported entropy sizes, password KDF parameter
//! profiles and the loadable core configuration shared by the other crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod entropy;
pub mod kdf;

pub use config::{CoreConfig, DEFAULT_AUTH_TIMEOUT_MS, DEFAULT_WALLET_ID, MAX_AUTH_TIMEOUT_MS};
pub use entropy::{EntropySize, BITS_PER_WORD, DICTIONARY_SIZE};
pub use kdf::{KdfParams, KdfProfile, MIN_KEYSTREAM_ITERATIONS};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entropy length not in the supported table
    #[error("Unsupported entropy length: {0} bytes")]
    UnsupportedEntropyLength(usize),

    /// Word count not in the supported table
    #[error("Unsupported word count: {0}")]
    UnsupportedWordCount(usize),

    /// KDF parameters rejected
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;

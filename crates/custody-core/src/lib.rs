//! Custody wallet core
//!
//! This crate implements the recovery phrase primitives: the word codec,
//! password keystream derivation and the mnemonic transform engine that binds
//! a recovery phrase to a password as a surrogate phrase.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod keystream;
pub mod random;
pub mod transform;

pub use codec::{decode, decode_unchecked, encode, encode_with_checksum, generate, Phrase};
pub use error::{Error, ErrorCategory, Result};
pub use keystream::{Argon2id, KdfAlgorithm, PasswordKdf, Pbkdf2Sha256, MIN_SALT_LEN};
pub use random::{OsRandom, SecureRandom};
#[cfg(any(test, feature = "test-helpers"))]
pub use random::SeededRandom;
pub use transform::{SurrogatePhrase, TransformEngine};

pub use custody_params::{EntropySize, KdfParams};

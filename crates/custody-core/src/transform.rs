//! Mnemonic transform engine
//!
//! Turns a recovery phrase into a password-bound surrogate phrase and back.
//!
//! ## Surrogate layout
//!
//! ```text
//! [ masked-entropy words (12..24) ][ salt words (12 for a 128-bit salt) ]
//! ```
//!
//! - masked entropy = entropy XOR PBKDF2(password, salt, iterations), encoded
//!   with the checksum of the *original* entropy in the trailing bits, so an
//!   unmask with the wrong keystream fails the checksum on restore;
//! - salt words encode the fresh random salt; their trailing bits carry a
//!   verification tag over `(salt, original entropy)` instead of a salt
//!   checksum. Restore decodes the salt without validation and checks the tag
//!   together with the entropy checksum, both failing as [`Error::Checksum`].
//!
//! A wrong password is accepted only if both the checksum and the tag collide
//! (1 in 2^12 for 256-bit entropy with a 128-bit salt).
//!
//! The split point is fixed by the configured salt size, so the total word
//! count determines the entropy size.

use crate::codec::{self, Phrase};
use crate::keystream::{self, PasswordKdf, Pbkdf2Sha256};
use crate::random::SecureRandom;
use crate::{Error, Result};
use custody_params::{EntropySize, KdfParams};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

const TAG_DOMAIN: &[u8] = b"custody/surrogate-tag/v1";

/// Password-bound surrogate phrase (masked-entropy words followed by salt words)
#[derive(Clone, PartialEq, Eq)]
pub struct SurrogatePhrase(Phrase);

impl SurrogatePhrase {
    /// Wrap parsed words
    pub fn new(words: Phrase) -> Self {
        Self(words)
    }

    /// Parse whitespace-separated words
    pub fn parse(input: &str) -> Result<Self> {
        Phrase::parse(input).map(Self)
    }

    /// Underlying words
    pub fn as_phrase(&self) -> &Phrase {
        &self.0
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Space-separated phrase
    pub fn to_phrase_string(&self) -> Zeroizing<String> {
        self.0.to_phrase_string()
    }
}

impl fmt::Debug for SurrogatePhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurrogatePhrase")
            .field("words", &self.len())
            .finish_non_exhaustive()
    }
}

/// Mnemonic transform engine
pub struct TransformEngine {
    kdf: Arc<dyn PasswordKdf>,
    rng: Arc<dyn SecureRandom>,
    iterations: u32,
    salt_size: EntropySize,
}

impl TransformEngine {
    /// Create with an injected KDF and random source
    pub fn new(
        kdf: Arc<dyn PasswordKdf>,
        rng: Arc<dyn SecureRandom>,
        iterations: u32,
        salt_size: EntropySize,
    ) -> Self {
        Self {
            kdf,
            rng,
            iterations,
            salt_size,
        }
    }

    /// Create with PBKDF2-HMAC-SHA256 and the configured iteration count
    pub fn with_params(params: &KdfParams, salt_size: EntropySize, rng: Arc<dyn SecureRandom>) -> Self {
        Self::new(
            Arc::new(Pbkdf2Sha256),
            rng,
            params.keystream_iterations,
            salt_size,
        )
    }

    /// Keystream iteration count
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Salt size
    pub fn salt_size(&self) -> EntropySize {
        self.salt_size
    }

    /// Surrogate word count for a given entropy size
    pub fn surrogate_word_count(&self, size: EntropySize) -> usize {
        size.word_count() + self.salt_size.word_count()
    }

    /// Accepted surrogate word counts, smallest first
    pub fn accepted_word_counts(&self) -> Vec<usize> {
        EntropySize::ALL
            .iter()
            .map(|&size| self.surrogate_word_count(size))
            .collect()
    }

    /// Transform a recovery phrase into a surrogate bound to `password`
    ///
    /// A fresh salt is drawn on every call.
    pub fn transform(&self, original: &Phrase, password: &str) -> Result<SurrogatePhrase> {
        if password.is_empty() {
            return Err(Error::EmptyPassword);
        }
        let entropy = codec::decode(original)?;
        let checksum = codec::checksum(&entropy)?;

        let mut salt = Zeroizing::new(vec![0u8; self.salt_size.byte_len()]);
        self.rng.fill_bytes(&mut salt);

        let masked = self.mask(&entropy, &salt, password)?;
        let entropy_words = codec::encode_with_checksum(&masked, checksum)?;
        let salt_words = codec::encode_with_checksum(&salt, self.tag(&salt, &entropy))?;

        tracing::debug!(
            words = entropy_words.len() + salt_words.len(),
            "Recovery phrase transformed"
        );
        Ok(SurrogatePhrase(entropy_words.concat(&salt_words)))
    }

    /// Restore the original recovery phrase from a surrogate
    pub fn restore(&self, surrogate: &SurrogatePhrase, password: &str) -> Result<Phrase> {
        if password.is_empty() {
            return Err(Error::EmptyPassword);
        }
        let (entropy_words, salt_words) = self.split(surrogate)?;

        let (salt, carried_tag) = codec::decode_unchecked(&salt_words)?;
        let (masked, carried) = codec::decode_unchecked(&entropy_words)?;
        let candidate = self.mask(&masked, &salt, password)?;

        let checksum_ok = codec::checksum(&candidate)? == carried;
        let tag_ok = self.tag(&salt, &candidate) == carried_tag;
        if !(checksum_ok && tag_ok) {
            tracing::warn!("Surrogate restore failed checksum");
            return Err(Error::Checksum);
        }
        codec::encode(&candidate)
    }

    /// Split a surrogate into masked-entropy words and salt words
    pub fn split(&self, surrogate: &SurrogatePhrase) -> Result<(Phrase, Phrase)> {
        let total = surrogate.len();
        let salt_words = self.salt_size.word_count();
        let fits = total
            .checked_sub(salt_words)
            .map(|words| EntropySize::from_word_count(words).is_ok())
            .unwrap_or(false);
        if !fits {
            return Err(Error::LengthMismatch {
                actual: total,
                expected: self.accepted_word_counts(),
            });
        }
        Ok(surrogate.as_phrase().split_at(total - salt_words))
    }

    fn tag(&self, salt: &[u8], entropy: &[u8]) -> u8 {
        let digest = Sha256::new()
            .chain_update(TAG_DOMAIN)
            .chain_update(salt)
            .chain_update(entropy)
            .finalize();
        digest[0] >> (8 - self.salt_size.checksum_bits())
    }

    fn mask(&self, data: &[u8], salt: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
        let keystream =
            keystream::derive(self.kdf.as_ref(), password, salt, self.iterations, data.len())?;
        let mut out = Zeroizing::new(vec![0u8; data.len()]);
        for ((dst, &byte), &key) in out.iter_mut().zip(data).zip(keystream.iter()) {
            *dst = byte ^ key;
        }
        Ok(out)
    }
}

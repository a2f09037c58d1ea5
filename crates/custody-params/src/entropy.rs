//! Supported entropy sizes for recovery phrases

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bits encoded by a single dictionary word
pub const BITS_PER_WORD: usize = 11;

/// Number of entries in the word dictionary
pub const DICTIONARY_SIZE: usize = 2048;

/// Entropy size enumeration
///
/// Each size maps to a fixed word count: `(bits + bits / 32) / 11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum EntropySize {
    /// 128 bits, 12 words
    Bits128,
    /// 160 bits, 15 words
    Bits160,
    /// 192 bits, 18 words
    Bits192,
    /// 224 bits, 21 words
    Bits224,
    /// 256 bits, 24 words
    Bits256,
}

impl EntropySize {
    /// All supported sizes, smallest first
    pub const ALL: [EntropySize; 5] = [
        EntropySize::Bits128,
        EntropySize::Bits160,
        EntropySize::Bits192,
        EntropySize::Bits224,
        EntropySize::Bits256,
    ];

    /// Entropy length in bytes
    pub const fn byte_len(self) -> usize {
        match self {
            EntropySize::Bits128 => 16,
            EntropySize::Bits160 => 20,
            EntropySize::Bits192 => 24,
            EntropySize::Bits224 => 28,
            EntropySize::Bits256 => 32,
        }
    }

    /// Entropy length in bits
    pub const fn bit_len(self) -> usize {
        self.byte_len() * 8
    }

    /// Checksum length in bits (one bit per 32 bits of entropy)
    pub const fn checksum_bits(self) -> usize {
        self.bit_len() / 32
    }

    /// Number of words in the encoded phrase
    pub const fn word_count(self) -> usize {
        (self.bit_len() + self.checksum_bits()) / BITS_PER_WORD
    }

    /// Look up a size by its byte length
    pub fn from_byte_len(len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.byte_len() == len)
            .ok_or(Error::UnsupportedEntropyLength(len))
    }

    /// Look up a size by the number of words in its phrase
    pub fn from_word_count(words: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.word_count() == words)
            .ok_or(Error::UnsupportedWordCount(words))
    }
}

impl Default for EntropySize {
    fn default() -> Self {
        EntropySize::Bits256
    }
}

impl TryFrom<usize> for EntropySize {
    type Error = Error;

    fn try_from(len: usize) -> Result<Self> {
        Self::from_byte_len(len)
    }
}

impl From<EntropySize> for usize {
    fn from(size: EntropySize) -> usize {
        size.byte_len()
    }
}

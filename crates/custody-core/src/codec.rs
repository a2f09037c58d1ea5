//! Word codec
//!
//! Bijective mapping between entropy plus checksum bits and dictionary words,
//! 11 bits per word. The dictionary is the BIP-39 English list and the checksum
//! is the leading `bits / 32` bits of SHA-256(entropy), so [`encode`] output is
//! a standard BIP-39 phrase.

use crate::random::SecureRandom;
use crate::{Error, Result};
use bip39::Language;
use custody_params::{EntropySize, BITS_PER_WORD, DICTIONARY_SIZE};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

const WORD_MASK: u32 = (1 << BITS_PER_WORD) - 1;

fn dictionary() -> &'static [&'static str; DICTIONARY_SIZE] {
    Language::English.word_list()
}

/// Dictionary word for an 11-bit index
///
/// Indices come from [`Phrase`], which only holds values below 2048.
pub fn word_at(index: u16) -> &'static str {
    dictionary()[usize::from(index) & (DICTIONARY_SIZE - 1)]
}

/// Dictionary index of a word (exact, lowercase match)
pub fn find_word(word: &str) -> Option<u16> {
    // The English list is sorted
    dictionary()
        .binary_search_by(|probe| (*probe).cmp(word))
        .ok()
        .map(|index| index as u16)
}

/// Ordered word sequence held as dictionary indices (zeroized on drop)
#[derive(Clone)]
pub struct Phrase {
    indices: Zeroizing<Vec<u16>>,
}

impl Phrase {
    /// Parse whitespace-separated words
    ///
    /// Case and surrounding whitespace are normalized. The checksum is not
    /// checked here; see [`decode`].
    pub fn parse(input: &str) -> Result<Self> {
        let mut indices = Zeroizing::new(Vec::new());
        for (position, raw) in input.split_whitespace().enumerate() {
            let word = Zeroizing::new(raw.to_lowercase());
            let index = find_word(&word).ok_or_else(|| Error::UnknownWord {
                position,
                word: raw.to_string(),
            })?;
            indices.push(index);
        }
        Ok(Self { indices })
    }

    /// Build from dictionary indices
    pub fn from_indices(indices: Vec<u16>) -> Result<Self> {
        let indices = Zeroizing::new(indices);
        if let Some(position) = indices
            .iter()
            .position(|&index| usize::from(index) >= DICTIONARY_SIZE)
        {
            return Err(Error::UnknownWord {
                position,
                word: format!("#{}", indices[position]),
            });
        }
        Ok(Self { indices })
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Dictionary indices
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Words in order
    pub fn words(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.indices.iter().map(|&index| word_at(index))
    }

    /// Space-separated phrase
    pub fn to_phrase_string(&self) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::new());
        for (i, word) in self.words().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(word);
        }
        out
    }

    /// Split into `[0, mid)` and `[mid, len)`
    pub fn split_at(&self, mid: usize) -> (Phrase, Phrase) {
        let mid = mid.min(self.len());
        let head = Zeroizing::new(self.indices[..mid].to_vec());
        let tail = Zeroizing::new(self.indices[mid..].to_vec());
        (Phrase { indices: head }, Phrase { indices: tail })
    }

    /// Concatenate two phrases
    pub fn concat(&self, other: &Phrase) -> Phrase {
        let mut indices = Zeroizing::new(Vec::with_capacity(self.len() + other.len()));
        indices.extend_from_slice(&self.indices);
        indices.extend_from_slice(&other.indices);
        Phrase { indices }
    }

    /// Entropy size implied by the word count
    pub fn entropy_size(&self) -> Result<EntropySize> {
        size_for_word_count(self.len())
    }
}

impl PartialEq for Phrase {
    fn eq(&self, other: &Self) -> bool {
        self.indices[..] == other.indices[..]
    }
}

impl Eq for Phrase {}

impl fmt::Debug for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phrase")
            .field("words", &self.len())
            .finish_non_exhaustive()
    }
}

fn size_for_entropy(len: usize) -> Result<EntropySize> {
    EntropySize::from_byte_len(len).map_err(|_| Error::InvalidEntropyLength(len))
}

fn size_for_word_count(words: usize) -> Result<EntropySize> {
    EntropySize::from_word_count(words).map_err(|_| Error::LengthMismatch {
        actual: words,
        expected: EntropySize::ALL.iter().map(|s| s.word_count()).collect(),
    })
}

/// Checksum bits of `entropy`, right-aligned
pub fn checksum(entropy: &[u8]) -> Result<u8> {
    let size = size_for_entropy(entropy.len())?;
    let digest = Sha256::digest(entropy);
    Ok(digest[0] >> (8 - size.checksum_bits()))
}

/// Encode entropy as a phrase carrying its own checksum
pub fn encode(entropy: &[u8]) -> Result<Phrase> {
    let checksum = checksum(entropy)?;
    encode_with_checksum(entropy, checksum)
}

/// Encode entropy followed by caller-supplied checksum bits
///
/// Only the low `checksum_bits()` bits of `checksum` are used.
pub fn encode_with_checksum(entropy: &[u8], checksum: u8) -> Result<Phrase> {
    let size = size_for_entropy(entropy.len())?;
    let checksum_bits = size.checksum_bits();
    let trailer = [(u32::from(checksum) & ((1 << checksum_bits) - 1), checksum_bits)];

    let mut indices = Zeroizing::new(Vec::with_capacity(size.word_count()));
    let mut acc: u32 = 0;
    let mut acc_bits = 0usize;
    for (value, bits) in entropy
        .iter()
        .map(|&byte| (u32::from(byte), 8))
        .chain(trailer)
    {
        acc = (acc << bits) | value;
        acc_bits += bits;
        while acc_bits >= BITS_PER_WORD {
            acc_bits -= BITS_PER_WORD;
            indices.push(((acc >> acc_bits) & WORD_MASK) as u16);
        }
        acc &= (1 << acc_bits) - 1;
    }
    debug_assert_eq!(acc_bits, 0);
    acc.zeroize();

    Ok(Phrase { indices })
}

/// Decode a phrase into entropy and the checksum bits it carries
///
/// The carried checksum is returned as-is and not compared against the
/// entropy.
pub fn decode_unchecked(phrase: &Phrase) -> Result<(Zeroizing<Vec<u8>>, u8)> {
    let size = phrase.entropy_size()?;
    let mut entropy = Zeroizing::new(Vec::with_capacity(size.byte_len()));
    let mut acc: u32 = 0;
    let mut acc_bits = 0usize;
    for &index in phrase.indices() {
        acc = (acc << BITS_PER_WORD) | u32::from(index);
        acc_bits += BITS_PER_WORD;
        while acc_bits >= 8 && entropy.len() < size.byte_len() {
            acc_bits -= 8;
            entropy.push((acc >> acc_bits) as u8);
            acc &= (1 << acc_bits) - 1;
        }
    }
    debug_assert_eq!(acc_bits, size.checksum_bits());
    let carried = acc as u8;
    acc.zeroize();

    Ok((entropy, carried))
}

/// Decode a phrase and verify its checksum
pub fn decode(phrase: &Phrase) -> Result<Zeroizing<Vec<u8>>> {
    let (entropy, carried) = decode_unchecked(phrase)?;
    if checksum(&entropy)? != carried {
        return Err(Error::Checksum);
    }
    Ok(entropy)
}

/// Check whether a phrase decodes with a valid checksum
pub fn is_valid(phrase: &Phrase) -> bool {
    decode(phrase).is_ok()
}

/// Generate a fresh random phrase
pub fn generate(size: EntropySize, rng: &dyn SecureRandom) -> Result<Phrase> {
    let mut entropy = Zeroizing::new(vec![0u8; size.byte_len()]);
    rng.fill_bytes(&mut entropy);
    encode(&entropy)
}

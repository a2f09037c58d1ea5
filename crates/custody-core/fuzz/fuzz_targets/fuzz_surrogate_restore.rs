//! Fuzz test for surrogate restore
//!
//! Arbitrary word sequences and passwords must yield a phrase or a typed
//! error, never a panic

#![no_main]

use custody_core::codec::Phrase;
use custody_core::{EntropySize, KdfParams, SeededRandom, SurrogatePhrase, TransformEngine};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let split = (data[0] as usize).min(data.len() - 1).max(1);
    let (password, words) = data[1..].split_at(split - 1);

    let indices: Vec<u16> = words
        .chunks(2)
        .map(|pair| {
            let hi = pair[0] as u16;
            let lo = pair.get(1).copied().unwrap_or(0) as u16;
            ((hi << 8) | lo) & 0x07ff
        })
        .collect();
    let Ok(phrase) = Phrase::from_indices(indices) else {
        return;
    };

    let engine = TransformEngine::with_params(
        &KdfParams::testing(),
        EntropySize::Bits128,
        Arc::new(SeededRandom::new(0)),
    );
    let password = String::from_utf8_lossy(password);
    let _ = engine.restore(&SurrogatePhrase::new(phrase), &password);
});

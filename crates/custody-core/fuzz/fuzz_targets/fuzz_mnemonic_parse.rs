//! Fuzz test for phrase parsing
//!
//! Ensures the word codec handles arbitrary input gracefully

#![no_main]

use custody_core::codec::{self, Phrase};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Should never panic, only return Err for invalid input
        if let Ok(phrase) = Phrase::parse(s) {
            if let Ok(entropy) = codec::decode(&phrase) {
                // A valid phrase must re-encode to itself
                let reencoded = codec::encode(&entropy).expect("decoded entropy re-encodes");
                assert_eq!(reencoded, phrase);
            }
            let _ = codec::decode_unchecked(&phrase);
        }
    }
});

//! Fuzz target for key import and lifecycle
//!
//! # Strategy
//!
//! - Arbitrary byte strings imported as keys (any length)
//! - Interleaved seal, wipe and re-use sequences
//!
//! # Invariants
//!
//! - Import succeeds iff the length equals `key_bytes`
//! - `import_and_scrub` zeroizes the source on every path
//! - After `wipe`, every use is `KeyAlreadyWiped`
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealkit_crypto::{CryptoError, CryptoProvider, KeyMaterial, ProviderConfig, SystemEnv};

#[derive(Debug, Clone, Arbitrary)]
enum KeyOperation {
    Seal { message: Vec<u8> },
    Wipe,
    Borrow,
}

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    bytes: Vec<u8>,
    operations: Vec<KeyOperation>,
}

fuzz_target!(|scenario: Scenario| {
    let provider = CryptoProvider::new(SystemEnv::new(), ProviderConfig::default());
    let Ok(sbox) = provider.secret_box() else {
        return;
    };

    let mut source = scenario.bytes.clone();
    let imported = KeyMaterial::import_and_scrub(&mut source, sbox.key_bytes());
    assert!(source.iter().all(|&b| b == 0), "source not scrubbed");

    let mut key = match imported {
        Ok(key) => {
            assert_eq!(scenario.bytes.len(), sbox.key_bytes());
            key
        }
        Err(error) => {
            assert_eq!(
                error,
                CryptoError::InvalidKeyLength {
                    expected: sbox.key_bytes(),
                    actual: scenario.bytes.len()
                }
            );
            return;
        }
    };

    let mut wiped = false;
    for operation in scenario.operations.into_iter().take(32) {
        match operation {
            KeyOperation::Seal { message } => match sbox.seal(&message, &key, None) {
                Ok(sealed) => {
                    assert!(!wiped);
                    assert_eq!(sbox.open(&sealed, &key, None), Ok(message));
                }
                Err(error) => {
                    assert!(wiped);
                    assert_eq!(error, CryptoError::KeyAlreadyWiped);
                }
            },
            KeyOperation::Wipe => {
                key.wipe();
                wiped = true;
            }
            KeyOperation::Borrow => {
                let result = key.with_borrow(|bytes| bytes == scenario.bytes.as_slice());
                assert_eq!(result, if wiped { Err(CryptoError::KeyAlreadyWiped) } else { Ok(true) });
            }
        }
    }
});

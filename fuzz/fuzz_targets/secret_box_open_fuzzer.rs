//! Fuzz target for secret box opening
//!
//! Feeds adversarial ciphertexts to `open` on both backends.
//!
//! # Strategy
//!
//! - Random bytes: arbitrary input of any length (structural rejection)
//! - Bit flips: a genuine box with one bit flipped
//! - Truncation: a genuine box cut at an arbitrary point
//! - Splicing: nonce from one box, body from another
//! - AAD mismatch: genuine box opened with different associated data
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - Input shorter than the overhead is `InvalidCiphertext`
//! - Any modification of a genuine box is `AuthenticationFailed`
//! - Both backends return the same result for the same input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealkit_crypto::{
    Algorithm, BackendKind, CpuFeatures, CryptoError, CryptoProvider, Environment,
    ProviderConfig, SecretBox, SystemEnv,
};

#[derive(Debug, Clone, Arbitrary)]
enum OpenAttack {
    RandomBytes { bytes: Vec<u8> },
    BitFlip { message: Vec<u8>, position: u16, bit: u8 },
    Truncate { message: Vec<u8>, keep: u16 },
    Splice { first: Vec<u8>, second: Vec<u8> },
    AadMismatch { message: Vec<u8>, aad: Vec<u8>, other: Vec<u8> },
}

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    key: [u8; 32],
    chacha: bool,
    attack: OpenAttack,
}

// System randomness with SIMD reported, so the accelerated backend probes
#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        SystemEnv::new().random_bytes(buffer)
    }

    fn cpu_features(&self) -> CpuFeatures {
        CpuFeatures { sse2: true, ..CpuFeatures::none() }
    }
}

fn secret_box(kind: BackendKind, algorithm: Algorithm) -> SecretBox<FuzzEnv> {
    let config = ProviderConfig { algorithm, backends: vec![kind], ..ProviderConfig::default() };
    match CryptoProvider::new(FuzzEnv, config).secret_box() {
        Ok(sbox) => sbox,
        Err(error) => panic!("{kind} backend unavailable: {error}"),
    }
}

fuzz_target!(|scenario: Scenario| {
    let algorithm = if scenario.chacha {
        Algorithm::ChaCha20Poly1305
    } else {
        Algorithm::XChaCha20Poly1305
    };
    let accelerated = secret_box(BackendKind::Accelerated, algorithm);
    let portable = secret_box(BackendKind::Portable, algorithm);
    let Ok(key) = accelerated.import_key(&scenario.key) else {
        return;
    };

    let open_both = |input: &[u8], aad: Option<&[u8]>| {
        let a = accelerated.open(input, &key, aad);
        let b = portable.open(input, &key, aad);
        assert_eq!(a, b, "backends disagree");
        a
    };

    match scenario.attack {
        OpenAttack::RandomBytes { bytes } => {
            let result = open_both(&bytes, None);
            if bytes.len() < accelerated.aead_bytes() {
                assert!(matches!(result, Err(CryptoError::InvalidCiphertext { .. })));
            } else {
                assert!(result.is_err(), "random input authenticated");
            }
        }

        OpenAttack::BitFlip { message, position, bit } => {
            let Ok(mut sealed) = accelerated.seal(&message, &key, None) else {
                return;
            };
            let index = position as usize % sealed.len();
            sealed[index] ^= 1 << (bit % 8);

            assert_eq!(open_both(&sealed, None), Err(CryptoError::AuthenticationFailed));
        }

        OpenAttack::Truncate { message, keep } => {
            let Ok(sealed) = portable.seal(&message, &key, None) else {
                return;
            };
            let keep = keep as usize % sealed.len();

            assert!(open_both(&sealed[..keep], None).is_err());
        }

        OpenAttack::Splice { first, second } => {
            let (Ok(a), Ok(b)) =
                (accelerated.seal(&first, &key, None), accelerated.seal(&second, &key, None))
            else {
                return;
            };
            let nonce_bytes = accelerated.nonce_bytes();
            let mut spliced = a[..nonce_bytes].to_vec();
            spliced.extend_from_slice(&b[nonce_bytes..]);

            assert_eq!(open_both(&spliced, None), Err(CryptoError::AuthenticationFailed));
        }

        OpenAttack::AadMismatch { message, aad, other } => {
            if aad == other {
                return;
            }
            let Ok(sealed) = portable.seal(&message, &key, Some(aad.as_slice())) else {
                return;
            };

            assert_eq!(
                open_both(&sealed, Some(other.as_slice())),
                Err(CryptoError::AuthenticationFailed)
            );
            assert_eq!(open_both(&sealed, Some(aad.as_slice())), Ok(message));
        }
    }
});

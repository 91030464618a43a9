//! Property-based tests for the secret box
//!
//! These tests verify the sealing contract on every backend and algorithm:
//!
//! 1. **Round-trip**: open(seal(m, k, a), k, a) == m
//! 2. **Length law**: len(seal(m)) == len(m) + aead_bytes
//! 3. **Tamper detection**: flipping any bit fails authentication
//! 4. **Key binding**: a different key fails authentication
//! 5. **AAD binding**: different associated data fails authentication
//! 6. **Compatibility**: each backend opens the other's output

use proptest::prelude::*;
use sealkit_crypto::{
    Algorithm, BackendKind, CpuFeatures, CryptoError, CryptoProvider, Environment,
    ProviderConfig, SecretBox,
};

// Real randomness, configurable CPU probe
#[derive(Clone)]
struct TestEnv {
    simd: bool,
}

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buffer);
        Ok(())
    }

    fn cpu_features(&self) -> CpuFeatures {
        CpuFeatures { sse2: self.simd, ..CpuFeatures::none() }
    }
}

fn secret_box(kind: BackendKind, algorithm: Algorithm) -> SecretBox<TestEnv> {
    let config = ProviderConfig { algorithm, backends: vec![kind], ..ProviderConfig::default() };
    let provider = CryptoProvider::new(TestEnv { simd: true }, config);
    provider.secret_box().unwrap()
}

fn any_algorithm() -> impl Strategy<Value = Algorithm> {
    prop_oneof![Just(Algorithm::XChaCha20Poly1305), Just(Algorithm::ChaCha20Poly1305)]
}

fn any_backend() -> impl Strategy<Value = BackendKind> {
    prop_oneof![Just(BackendKind::Accelerated), Just(BackendKind::Portable)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_seal_open_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..2048),
        aad in prop::option::of(prop::collection::vec(any::<u8>(), 0..64)),
        algorithm in any_algorithm(),
        kind in any_backend(),
    ) {
        let sbox = secret_box(kind, algorithm);
        let key = sbox.generate_key().unwrap();

        let sealed = sbox.seal(&plaintext, &key, aad.as_deref()).unwrap();
        prop_assert_eq!(sealed.len(), plaintext.len() + sbox.aead_bytes());

        let opened = sbox.open(&sealed, &key, aad.as_deref()).unwrap();
        prop_assert_eq!(opened, plaintext);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_any_bit_flip_fails(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
        algorithm in any_algorithm(),
        kind in any_backend(),
    ) {
        let sbox = secret_box(kind, algorithm);
        let key = sbox.generate_key().unwrap();

        let mut sealed = sbox.seal(&plaintext, &key, Some(b"header".as_slice())).unwrap();
        let index = position.index(sealed.len());
        sealed[index] ^= 1 << bit;

        prop_assert_eq!(
            sbox.open(&sealed, &key, Some(b"header".as_slice())),
            Err(CryptoError::AuthenticationFailed),
            "flip at byte {} bit {} was accepted",
            index,
            bit
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_wrong_key_fails(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        algorithm in any_algorithm(),
        kind in any_backend(),
    ) {
        let sbox = secret_box(kind, algorithm);
        let key = sbox.generate_key().unwrap();
        let other = sbox.generate_key().unwrap();

        let sealed = sbox.seal(&plaintext, &key, None).unwrap();
        prop_assert_eq!(sbox.open(&sealed, &other, None), Err(CryptoError::AuthenticationFailed));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_wrong_aad_fails(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        aad in prop::collection::vec(any::<u8>(), 1..64),
        other in prop::collection::vec(any::<u8>(), 0..64),
        kind in any_backend(),
    ) {
        prop_assume!(aad != other);

        let sbox = secret_box(kind, Algorithm::default());
        let key = sbox.generate_key().unwrap();

        let sealed = sbox.seal(&plaintext, &key, Some(aad.as_slice())).unwrap();
        prop_assert_eq!(
            sbox.open(&sealed, &key, Some(other.as_slice())),
            Err(CryptoError::AuthenticationFailed)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_backends_interoperate(
        plaintext in prop::collection::vec(any::<u8>(), 0..1024),
        aad in prop::collection::vec(any::<u8>(), 0..32),
        algorithm in any_algorithm(),
    ) {
        let accelerated = secret_box(BackendKind::Accelerated, algorithm);
        let portable = secret_box(BackendKind::Portable, algorithm);
        let key = accelerated.import_key(&[0x11u8; 32]).unwrap();

        let aad = Some(aad.as_slice());

        let sealed = accelerated.seal(&plaintext, &key, aad).unwrap();
        prop_assert_eq!(portable.open(&sealed, &key, aad).unwrap(), plaintext.clone());

        let sealed = portable.seal(&plaintext, &key, aad).unwrap();
        prop_assert_eq!(accelerated.open(&sealed, &key, aad).unwrap(), plaintext);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_short_input_is_structural_error(
        length in 0usize..40,
        kind in any_backend(),
    ) {
        let sbox = secret_box(kind, Algorithm::XChaCha20Poly1305);
        let key = sbox.generate_key().unwrap();

        prop_assert_eq!(
            sbox.open(&vec![0u8; length], &key, None),
            Err(CryptoError::InvalidCiphertext { minimum: 40, actual: length })
        );
    }
}

#[test]
fn hello_with_zero_key() {
    for kind in BackendKind::PRIORITY {
        let sbox = secret_box(kind, Algorithm::default());
        let key = sbox.import_key(&[0u8; 32]).unwrap();

        let mut sealed = sbox.seal(b"hello", &key, None).unwrap();
        assert_eq!(sealed.len(), 5 + sbox.aead_bytes());
        assert_eq!(sbox.open(&sealed, &key, None).unwrap(), b"hello");

        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(sbox.open(&sealed, &key, None), Err(CryptoError::AuthenticationFailed));
    }
}

#[test]
fn concurrent_seal_and_open_on_shared_key() {
    let sbox = secret_box(BackendKind::Portable, Algorithm::default());
    let key = sbox.generate_key().unwrap();

    std::thread::scope(|scope| {
        for thread in 0u8..8 {
            let sbox = sbox.clone();
            let key = &key;
            scope.spawn(move || {
                for round in 0u8..100 {
                    let message = [thread, round];
                    let aad = [thread];
                    let sealed = sbox.seal(&message, key, Some(&aad[..])).unwrap();
                    assert_eq!(sbox.open(&sealed, key, Some(&aad[..])).unwrap(), message);
                }
            });
        }
    });
}

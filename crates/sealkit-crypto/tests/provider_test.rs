//! Provider integration tests
//!
//! Backend selection through the public API, the permanent `Failed` state,
//! and the sibling primitives handed out by a ready provider.

use sealkit_crypto::{
    Algorithm, BackendKind, CpuFeatures, CryptoError, CryptoProvider, Environment,
    ProviderConfig, ProviderState, SystemEnv, UnavailableReason,
};

#[derive(Clone)]
struct ScalarEnv;

impl Environment for ScalarEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buffer);
        Ok(())
    }

    fn cpu_features(&self) -> CpuFeatures {
        CpuFeatures::none()
    }
}

fn system_provider() -> CryptoProvider<SystemEnv> {
    CryptoProvider::new(SystemEnv::new(), ProviderConfig::default())
}

#[test]
fn system_provider_becomes_ready() {
    let provider = system_provider();
    let capability = provider.initialize().unwrap();

    assert_eq!(provider.state(), ProviderState::Ready(capability.kind));
    assert_eq!(capability.algorithm, Algorithm::XChaCha20Poly1305);
    assert_eq!(capability.aead_bytes(), 40);
}

#[test]
fn scalar_platform_selects_portable() {
    let provider = CryptoProvider::new(ScalarEnv, ProviderConfig::default());
    let sbox = provider.secret_box().unwrap();

    assert_eq!(sbox.backend_kind(), BackendKind::Portable);

    let probes = provider.capabilities().unwrap();
    let accelerated = probes[0].unwrap_err();
    assert_eq!(accelerated.reason, UnavailableReason::MissingCpuSupport);
}

#[test]
fn accelerated_only_on_scalar_platform_fails_permanently() {
    let config =
        ProviderConfig { backends: vec![BackendKind::Accelerated], ..ProviderConfig::default() };
    let provider = CryptoProvider::new(ScalarEnv, config);

    for _ in 0..3 {
        let error = provider.secret_box().unwrap_err();
        assert_eq!(error, CryptoError::NoBackendAvailable { probed: 1 });
        assert!(error.is_fatal());
    }
    assert_eq!(provider.state(), ProviderState::Failed);
}

#[test]
fn boxes_from_separate_providers_interoperate() {
    let accelerated = CryptoProvider::new(
        SystemEnv::new(),
        ProviderConfig { backends: vec![BackendKind::Accelerated], ..ProviderConfig::default() },
    );
    // Some CI hosts have no SIMD; nothing to compare against there
    let Ok(fast) = accelerated.secret_box() else {
        return;
    };
    let portable = CryptoProvider::new(ScalarEnv, ProviderConfig::default());
    let slow = portable.secret_box().unwrap();

    let key = fast.generate_key().unwrap();
    let sealed = fast.seal(b"cross", &key, Some(b"ad".as_slice())).unwrap();
    assert_eq!(slow.open(&sealed, &key, Some(b"ad".as_slice())).unwrap(), b"cross");
}

#[test]
fn keyed_hash_through_provider() {
    let provider = system_provider();
    let keyed = provider.keyed_hash().unwrap();
    let key = keyed.generate_key().unwrap();

    let mac = keyed.hash(b"ledger entry", &key).unwrap();
    assert!(keyed.verify(&mac, b"ledger entry", &key).is_ok());
    assert_eq!(keyed.verify(&mac, b"ledger entrY", &key), Err(CryptoError::AuthenticationFailed));
}

#[test]
fn signatures_through_provider() {
    let provider = system_provider();
    let sign = provider.sign().unwrap();
    let pair = sign.generate_key_pair().unwrap();
    let other = sign.generate_key_pair().unwrap();

    let signature = sign.sign(b"release 1.0", &pair.secret_key).unwrap();
    assert!(sign.verify(&signature, b"release 1.0", &pair.public_key).is_ok());
    assert_eq!(
        sign.verify(&signature, b"release 1.0", &other.public_key),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn public_key_box_through_provider() {
    let provider = system_provider();
    let pbox = provider.public_key_box().unwrap();
    let sender = pbox.generate_key_pair().unwrap();
    let recipient = pbox.generate_key_pair().unwrap();

    let sealed = pbox.seal(b"for you", &recipient.public_key, &sender.secret_key, None).unwrap();
    let opened = pbox.open(&sealed, &sender.public_key, &recipient.secret_key, None).unwrap();
    assert_eq!(opened, b"for you");
}

#[test]
fn debug_output_never_shows_key_bytes() {
    let provider = system_provider();
    let sbox = provider.secret_box().unwrap();
    let key = sbox.import_key(&[0x5Cu8; 32]).unwrap();

    for rendered in [format!("{key:?}"), format!("{sbox:?}"), format!("{provider:?}")] {
        assert!(!rendered.contains("92"), "key byte leaked: {rendered}");
        assert!(!rendered.to_lowercase().contains("5c"), "key byte leaked: {rendered}");
    }

    let pair = provider.sign().unwrap().generate_key_pair().unwrap();
    let rendered = format!("{pair:?}");
    assert!(rendered.contains(r#"secret_key: KeyMaterial { len: 32, wiped: false, bytes: "[REDACTED]" }"#));
}

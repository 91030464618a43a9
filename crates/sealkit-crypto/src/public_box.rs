//! Public-key box: static X25519 agreement feeding a [`SecretBox`].
//!
//! ```text
//! shared  = X25519(our_secret, their_public)
//! info    = LABEL ‖ algorithm ‖ min(pk_a, pk_b) ‖ max(pk_a, pk_b)
//! box_key = HKDF-SHA256(ikm = shared, info)
//! sealed  = SecretBox::seal(plaintext, box_key, aad)
//! ```
//!
//! Both parties derive the same key because the public keys enter the info
//! string in sorted order. There is no handshake and no forward secrecy: the
//! same pair of static keys always yields the same box key.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::{env::Environment, error::CryptoError, key::KeyMaterial, secret_box::SecretBox};

/// X25519 secret key length (32 bytes)
pub const BOX_SECRET_KEY_BYTES: usize = 32;

/// X25519 public key length (32 bytes)
pub const BOX_PUBLIC_KEY_BYTES: usize = 32;

const BOX_KEY_LABEL: &[u8] = b"sealkit public box v1";

/// An X25519 key pair.
#[derive(Debug)]
pub struct BoxKeyPair {
    /// Public key, shared with peers
    pub public_key: [u8; BOX_PUBLIC_KEY_BYTES],
    /// Secret scalar
    pub secret_key: KeyMaterial,
}

/// Authenticated encryption between two static X25519 key pairs.
pub struct PublicKeyBox<E: Environment> {
    env: E,
    secret_box: SecretBox<E>,
}

impl<E: Environment> Clone for PublicKeyBox<E> {
    fn clone(&self) -> Self {
        Self { env: self.env.clone(), secret_box: self.secret_box.clone() }
    }
}

impl<E: Environment> PublicKeyBox<E> {
    pub(crate) fn new(env: E, secret_box: SecretBox<E>) -> Self {
        Self { env, secret_box }
    }

    /// Per-message overhead, identical to the underlying secret box.
    pub fn aead_bytes(&self) -> usize {
        self.secret_box.aead_bytes()
    }

    /// Generate a key pair from fresh randomness.
    pub fn generate_key_pair(&self) -> Result<BoxKeyPair, CryptoError> {
        let secret_key = KeyMaterial::generate(BOX_SECRET_KEY_BYTES, &self.env)?;
        let public_key = self.public_key(&secret_key)?;
        Ok(BoxKeyPair { public_key, secret_key })
    }

    /// Derive the public key for a secret key.
    pub fn public_key(
        &self,
        secret_key: &KeyMaterial,
    ) -> Result<[u8; BOX_PUBLIC_KEY_BYTES], CryptoError> {
        let secret = static_secret(secret_key)?;
        Ok(PublicKey::from(&secret).to_bytes())
    }

    /// Seal `plaintext` from the holder of `sender_secret` to `recipient_public`.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: the agreement is non-contributory (low-order
    ///   recipient key)
    /// - `InvalidKeyLength`, `KeyAlreadyWiped`: bad sender secret
    /// - any error from [`SecretBox::seal`]
    pub fn seal(
        &self,
        plaintext: &[u8],
        recipient_public: &[u8; BOX_PUBLIC_KEY_BYTES],
        sender_secret: &KeyMaterial,
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.box_key(recipient_public, sender_secret)?;
        self.secret_box.seal(plaintext, &key, additional_data)
    }

    /// Open a box sealed by the holder of `sender_public` to `recipient_secret`.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: the agreement is non-contributory
    /// - `InvalidKeyLength`, `KeyAlreadyWiped`: bad recipient secret
    /// - any error from [`SecretBox::open`]
    pub fn open(
        &self,
        ciphertext: &[u8],
        sender_public: &[u8; BOX_PUBLIC_KEY_BYTES],
        recipient_secret: &KeyMaterial,
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.box_key(sender_public, recipient_secret)?;
        self.secret_box.open(ciphertext, &key, additional_data)
    }

    fn box_key(
        &self,
        their_public: &[u8; BOX_PUBLIC_KEY_BYTES],
        our_secret: &KeyMaterial,
    ) -> Result<KeyMaterial, CryptoError> {
        let secret = static_secret(our_secret)?;
        let our_public = PublicKey::from(&secret).to_bytes();

        let shared = secret.diffie_hellman(&PublicKey::from(*their_public));
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidParameter {
                reason: "X25519 agreement with a low-order public key".to_string(),
            });
        }

        let (low, high) = if our_public <= *their_public {
            (our_public, *their_public)
        } else {
            (*their_public, our_public)
        };

        let algorithm = self.secret_box.algorithm().name().as_bytes();
        let mut info = Vec::with_capacity(BOX_KEY_LABEL.len() + algorithm.len() + 64);
        info.extend_from_slice(BOX_KEY_LABEL);
        info.extend_from_slice(algorithm);
        info.extend_from_slice(&low);
        info.extend_from_slice(&high);

        let key_bytes = self.secret_box.key_bytes();
        let mut okm = Zeroizing::new(vec![0u8; key_bytes]);
        Hkdf::<Sha256>::new(None, shared.as_bytes()).expand(&info, &mut okm).map_err(|_| {
            CryptoError::InvalidParameter {
                reason: format!("HKDF-SHA256 cannot produce {key_bytes} bytes"),
            }
        })?;

        KeyMaterial::import(&okm, key_bytes)
    }
}

impl<E: Environment> std::fmt::Debug for PublicKeyBox<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyBox").field("secret_box", &self.secret_box).finish()
    }
}

fn static_secret(secret_key: &KeyMaterial) -> Result<StaticSecret, CryptoError> {
    secret_key
        .with_borrow(|bytes| {
            let mut scalar = <[u8; BOX_SECRET_KEY_BYTES]>::try_from(bytes).ok()?;
            let secret = StaticSecret::from(scalar);
            scalar.zeroize();
            Some(secret)
        })?
        .ok_or(CryptoError::InvalidKeyLength {
            expected: BOX_SECRET_KEY_BYTES,
            actual: secret_key.len(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        backend::{Algorithm, Backend, BackendKind},
        secret_box::Engine,
        system_env::SystemEnv,
    };

    fn public_box() -> PublicKeyBox<SystemEnv> {
        let env = SystemEnv::new();
        let capability =
            Backend::probe(BackendKind::Portable, Algorithm::XChaCha20Poly1305, &env).unwrap();
        let engine = Arc::new(Engine::new(env, capability, 64).unwrap());
        PublicKeyBox::new(env, SecretBox::new(engine))
    }

    #[test]
    fn recipient_opens_what_sender_sealed() {
        let pbox = public_box();
        let alice = pbox.generate_key_pair().unwrap();
        let bob = pbox.generate_key_pair().unwrap();

        let aad = Some(b"ad".as_slice());

        let sealed = pbox.seal(b"to bob", &bob.public_key, &alice.secret_key, aad).unwrap();
        assert_eq!(sealed.len(), 6 + pbox.aead_bytes());

        let opened = pbox.open(&sealed, &alice.public_key, &bob.secret_key, aad).unwrap();
        assert_eq!(opened, b"to bob");
    }

    #[test]
    fn third_party_cannot_open() {
        let pbox = public_box();
        let alice = pbox.generate_key_pair().unwrap();
        let bob = pbox.generate_key_pair().unwrap();
        let eve = pbox.generate_key_pair().unwrap();

        let sealed = pbox.seal(b"to bob", &bob.public_key, &alice.secret_key, None).unwrap();

        assert_eq!(
            pbox.open(&sealed, &alice.public_key, &eve.secret_key, None),
            Err(CryptoError::AuthenticationFailed)
        );
        assert_eq!(
            pbox.open(&sealed, &eve.public_key, &bob.secret_key, None),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn low_order_public_key_is_rejected() {
        let pbox = public_box();
        let alice = pbox.generate_key_pair().unwrap();

        let result = pbox.seal(b"x", &[0u8; 32], &alice.secret_key, None);
        assert!(matches!(result, Err(CryptoError::InvalidParameter { .. })));
    }

    #[test]
    fn rfc7748_public_key() {
        // RFC 7748 section 6.1, Alice
        let pbox = public_box();
        let secret =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a").unwrap();
        let secret = KeyMaterial::import(&secret, 32).unwrap();

        assert_eq!(
            hex::encode(pbox.public_key(&secret).unwrap()),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }

    #[test]
    fn wiped_secret_is_rejected() {
        let pbox = public_box();
        let bob = pbox.generate_key_pair().unwrap();
        let mut alice = pbox.generate_key_pair().unwrap();
        alice.secret_key.wipe();

        assert_eq!(pbox.public_key(&alice.secret_key).unwrap_err(), CryptoError::KeyAlreadyWiped);
        assert_eq!(
            pbox.seal(b"x", &bob.public_key, &alice.secret_key, None).unwrap_err(),
            CryptoError::KeyAlreadyWiped
        );
    }

    #[test]
    fn agreement_is_symmetric() {
        // RFC 7748 section 6.1 key pairs
        let pbox = public_box();
        let alice =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a").unwrap();
        let bob =
            hex::decode("5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb").unwrap();
        let alice = KeyMaterial::import(&alice, 32).unwrap();
        let bob = KeyMaterial::import(&bob, 32).unwrap();
        let alice_public = pbox.public_key(&alice).unwrap();
        let bob_public = pbox.public_key(&bob).unwrap();

        assert_eq!(
            hex::encode(bob_public),
            "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f"
        );

        let sealed = pbox.seal(b"vector", &bob_public, &alice, None).unwrap();
        assert_eq!(pbox.open(&sealed, &alice_public, &bob, None).unwrap(), b"vector");
    }

    #[test]
    fn wrong_secret_length_is_rejected() {
        let pbox = public_box();
        let short = KeyMaterial::import(&[1u8; 16], 16).unwrap();

        assert_eq!(
            pbox.public_key(&short).unwrap_err(),
            CryptoError::InvalidKeyLength { expected: 32, actual: 16 }
        );
    }
}

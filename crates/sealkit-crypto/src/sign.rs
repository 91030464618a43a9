//! Ed25519 signatures.
//!
//! The 32-byte secret seed lives in [`KeyMaterial`]; the expanded signing
//! key only exists for the duration of one `sign` call and zeroizes on drop.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::{env::Environment, error::CryptoError, key::KeyMaterial};

/// Secret seed length (32 bytes)
pub const SIGN_SECRET_KEY_BYTES: usize = 32;

/// Public key length (32 bytes)
pub const SIGN_PUBLIC_KEY_BYTES: usize = 32;

/// Signature length (64 bytes)
pub const SIGNATURE_BYTES: usize = 64;

/// An Ed25519 key pair.
#[derive(Debug)]
pub struct SigningKeyPair {
    /// Public verification key
    pub public_key: [u8; SIGN_PUBLIC_KEY_BYTES],
    /// Secret seed
    pub secret_key: KeyMaterial,
}

/// Ed25519 detached signatures.
#[derive(Debug, Clone)]
pub struct Sign<E: Environment> {
    env: E,
}

impl<E: Environment> Sign<E> {
    pub(crate) fn new(env: E) -> Self {
        Self { env }
    }

    /// Generate a key pair from fresh randomness.
    pub fn generate_key_pair(&self) -> Result<SigningKeyPair, CryptoError> {
        let secret_key = KeyMaterial::generate(SIGN_SECRET_KEY_BYTES, &self.env)?;
        let public_key = self.public_key(&secret_key)?;
        Ok(SigningKeyPair { public_key, secret_key })
    }

    /// Derive the public key for a secret seed.
    pub fn public_key(
        &self,
        secret_key: &KeyMaterial,
    ) -> Result<[u8; SIGN_PUBLIC_KEY_BYTES], CryptoError> {
        let signing_key = signing_key(secret_key)?;
        Ok(signing_key.verifying_key().to_bytes())
    }

    /// Sign `message`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: seed is not 32 bytes
    /// - `KeyAlreadyWiped`: seed was wiped
    pub fn sign(
        &self,
        message: &[u8],
        secret_key: &KeyMaterial,
    ) -> Result<[u8; SIGNATURE_BYTES], CryptoError> {
        let signing_key = signing_key(secret_key)?;
        Ok(signing_key.sign(message).to_bytes())
    }

    /// Verify a detached signature (strict: rejects small-order and
    /// non-canonical encodings).
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: wrong signature length or malformed public key
    /// - `AuthenticationFailed`: signature does not verify
    pub fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        public_key: &[u8; SIGN_PUBLIC_KEY_BYTES],
    ) -> Result<(), CryptoError> {
        let signature: &[u8; SIGNATURE_BYTES] =
            signature.try_into().map_err(|_| CryptoError::InvalidParameter {
                reason: format!(
                    "signature length {} (expected {SIGNATURE_BYTES})",
                    signature.len()
                ),
            })?;

        let verifying_key =
            VerifyingKey::from_bytes(public_key).map_err(|_| CryptoError::InvalidParameter {
                reason: "malformed Ed25519 public key".to_string(),
            })?;

        verifying_key
            .verify_strict(message, &Signature::from_bytes(signature))
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

fn signing_key(secret_key: &KeyMaterial) -> Result<SigningKey, CryptoError> {
    if secret_key.len() != SIGN_SECRET_KEY_BYTES {
        return Err(CryptoError::InvalidKeyLength {
            expected: SIGN_SECRET_KEY_BYTES,
            actual: secret_key.len(),
        });
    }

    secret_key.with_borrow(|seed| SigningKey::try_from(seed))?.map_err(|_| {
        CryptoError::InvalidKeyLength { expected: SIGN_SECRET_KEY_BYTES, actual: secret_key.len() }
    })
}

//! Secret box: symmetric sealing bound to the selected backend.
//!
//! # Format
//!
//! ```text
//! [ nonce (nonce_bytes) ][ ciphertext (N) ][ tag (16) ]
//! ```
//!
//! `len(sealed) == len(plaintext) + aead_bytes()` for every plaintext,
//! including the empty one.
//!
//! # Associated Data
//!
//! `None` and `Some(&[])` are the same input: both backends feed a
//! zero-length AAD into the tag, so a box sealed with one opens with the
//! other.
//!
//! # Security
//!
//! - A fresh nonce is allocated for every seal; callers never supply one
//! - The key is borrowed for the duration of one call and never retained
//! - Open is all-or-nothing: on `AuthenticationFailed` no plaintext exists

use std::sync::Arc;

use crate::{
    backend::{Algorithm, Backend, BackendKind, Capability},
    env::Environment,
    error::CryptoError,
    key::KeyMaterial,
    nonce::{Nonce, NonceAllocator},
};

/// Immutable state shared by every primitive handed out by one provider.
pub(crate) struct Engine<E: Environment> {
    pub(crate) env: E,
    pub(crate) backend: Backend,
    pub(crate) capability: Capability,
    pub(crate) nonces: NonceAllocator<E>,
}

impl<E: Environment> Engine<E> {
    pub(crate) fn new(
        env: E,
        capability: Capability,
        reuse_window: usize,
    ) -> Result<Self, CryptoError> {
        let nonces = NonceAllocator::new(env.clone(), capability.nonce_bytes, reuse_window)?;
        let backend = Backend::new(capability.kind, capability.algorithm);

        Ok(Self { env, backend, capability, nonces })
    }
}

/// Authenticated symmetric encryption.
///
/// Cheap to clone; clones share the provider's backend and nonce allocator.
/// Safe to use from many threads at once.
pub struct SecretBox<E: Environment> {
    engine: Arc<Engine<E>>,
}

impl<E: Environment> Clone for SecretBox<E> {
    fn clone(&self) -> Self {
        Self { engine: Arc::clone(&self.engine) }
    }
}

impl<E: Environment> SecretBox<E> {
    pub(crate) fn new(engine: Arc<Engine<E>>) -> Self {
        Self { engine }
    }

    /// Fixed per-message overhead (nonce plus tag).
    pub fn aead_bytes(&self) -> usize {
        self.engine.capability.aead_bytes()
    }

    /// Required key length.
    pub fn key_bytes(&self) -> usize {
        self.engine.capability.key_bytes
    }

    /// Nonce length of the active algorithm.
    pub fn nonce_bytes(&self) -> usize {
        self.engine.capability.nonce_bytes
    }

    /// Active algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.engine.capability.algorithm
    }

    /// Backend executing the primitive.
    pub fn backend_kind(&self) -> BackendKind {
        self.engine.capability.kind
    }

    /// Allocate a fresh nonce.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: `size` is not [`SecretBox::nonce_bytes`]
    /// - `EntropyUnavailable`, `NonceReuse`: see [`NonceAllocator::allocate`]
    pub fn new_nonce(&self, size: usize) -> Result<Nonce, CryptoError> {
        self.engine.nonces.allocate(size)
    }

    /// Generate a random key of [`SecretBox::key_bytes`] length.
    pub fn generate_key(&self) -> Result<KeyMaterial, CryptoError> {
        KeyMaterial::generate(self.key_bytes(), &self.engine.env)
    }

    /// Import a key, validating its length.
    pub fn import_key(&self, bytes: &[u8]) -> Result<KeyMaterial, CryptoError> {
        KeyMaterial::import(bytes, self.key_bytes())
    }

    /// Encrypt and authenticate `plaintext`, binding `additional_data`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: key is not [`SecretBox::key_bytes`] long
    /// - `KeyAlreadyWiped`: key was wiped
    /// - `EntropyUnavailable`, `NonceReuse`: nonce allocation failed
    pub fn seal(
        &self,
        plaintext: &[u8],
        key: &KeyMaterial,
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        self.check_key(key)?;

        let nonce = self.engine.nonces.allocate(self.nonce_bytes())?;
        let aad = additional_data.unwrap_or_default();

        let sealed = key.with_borrow(|key| {
            self.engine.backend.aead_seal(key, nonce.as_bytes(), plaintext, aad)
        })??;

        let mut output = Vec::with_capacity(nonce.len() + sealed.len());
        output.extend_from_slice(nonce.as_bytes());
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    /// Verify and decrypt a sealed box.
    ///
    /// # Errors
    ///
    /// - `InvalidCiphertext`: shorter than [`SecretBox::aead_bytes`]
    /// - `InvalidKeyLength`: key is not [`SecretBox::key_bytes`] long
    /// - `KeyAlreadyWiped`: key was wiped
    /// - `AuthenticationFailed`: wrong key, wrong associated data, or
    ///   tampered input. Reject the message; do not retry with other keys.
    pub fn open(
        &self,
        ciphertext: &[u8],
        key: &KeyMaterial,
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < self.aead_bytes() {
            return Err(CryptoError::InvalidCiphertext {
                minimum: self.aead_bytes(),
                actual: ciphertext.len(),
            });
        }
        self.check_key(key)?;

        let (nonce, sealed) = ciphertext.split_at(self.nonce_bytes());
        let aad = additional_data.unwrap_or_default();

        key.with_borrow(|key| self.engine.backend.aead_open(key, nonce, sealed, aad))?
    }

    fn check_key(&self, key: &KeyMaterial) -> Result<(), CryptoError> {
        if key.len() != self.key_bytes() {
            return Err(CryptoError::InvalidKeyLength {
                expected: self.key_bytes(),
                actual: key.len(),
            });
        }
        Ok(())
    }
}

impl<E: Environment> std::fmt::Debug for SecretBox<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBox")
            .field("algorithm", &self.algorithm())
            .field("backend", &self.backend_kind())
            .finish()
    }
}

//! Accelerated backend using the `chacha20poly1305` crate.
//!
//! The underlying `chacha20` implementation selects AVX2/SSE2 (or NEON) at
//! runtime. Decryption verifies the tag before touching the ciphertext.

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce, Tag, XChaCha20Poly1305, XNonce,
    aead::{AeadInPlace, KeyInit},
};
use zeroize::Zeroize;

use super::{Algorithm, TAG_BYTES};
use crate::error::CryptoError;

/// SIMD-accelerated AEAD. Lengths are validated by [`super::Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceleratedBackend {
    algorithm: Algorithm,
}

impl AcceleratedBackend {
    /// Backend for `algorithm`.
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    /// Algorithm this backend was built for.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(super) fn seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut buffer = Vec::with_capacity(plaintext.len() + TAG_BYTES);
        buffer.extend_from_slice(plaintext);

        let key = Key::from_slice(key);
        let sealed = match self.algorithm {
            Algorithm::XChaCha20Poly1305 => XChaCha20Poly1305::new(key)
                .encrypt_in_place_detached(XNonce::from_slice(nonce), aad, &mut buffer),
            Algorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(key)
                .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, &mut buffer),
        };

        match sealed {
            Ok(tag) => {
                buffer.extend_from_slice(&tag);
                Ok(buffer)
            },
            Err(_) => {
                buffer.zeroize();
                Err(CryptoError::InvalidParameter {
                    reason: "plaintext exceeds the algorithm's length limit".to_string(),
                })
            },
        }
    }

    pub(super) fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        sealed: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_BYTES);
        let tag = Tag::from_slice(tag);
        let mut buffer = ciphertext.to_vec();

        let key = Key::from_slice(key);
        let opened = match self.algorithm {
            Algorithm::XChaCha20Poly1305 => XChaCha20Poly1305::new(key).decrypt_in_place_detached(
                XNonce::from_slice(nonce),
                aad,
                &mut buffer,
                tag,
            ),
            Algorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(key).decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                aad,
                &mut buffer,
                tag,
            ),
        };

        match opened {
            Ok(()) => Ok(buffer),
            Err(_) => {
                buffer.zeroize();
                Err(CryptoError::AuthenticationFailed)
            },
        }
    }
}

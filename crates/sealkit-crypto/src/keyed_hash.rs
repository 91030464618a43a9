//! Keyed hashing (HMAC-SHA256).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{env::Environment, error::CryptoError, key::KeyMaterial};

type HmacSha256 = Hmac<Sha256>;

/// Key length for keyed hashing (32 bytes)
pub const KEYED_HASH_KEY_BYTES: usize = 32;

/// Output length (32 bytes)
pub const KEYED_HASH_BYTES: usize = 32;

/// HMAC-SHA256 message authentication.
#[derive(Debug, Clone)]
pub struct KeyedHash<E: Environment> {
    env: E,
}

impl<E: Environment> KeyedHash<E> {
    pub(crate) fn new(env: E) -> Self {
        Self { env }
    }

    /// Required key length.
    pub fn key_bytes(&self) -> usize {
        KEYED_HASH_KEY_BYTES
    }

    /// Output length.
    pub fn hash_bytes(&self) -> usize {
        KEYED_HASH_BYTES
    }

    /// Generate a random key.
    pub fn generate_key(&self) -> Result<KeyMaterial, CryptoError> {
        KeyMaterial::generate(KEYED_HASH_KEY_BYTES, &self.env)
    }

    /// Import a key, validating its length.
    pub fn import_key(&self, bytes: &[u8]) -> Result<KeyMaterial, CryptoError> {
        KeyMaterial::import(bytes, KEYED_HASH_KEY_BYTES)
    }

    /// Compute the MAC of `message`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: key is not 32 bytes
    /// - `KeyAlreadyWiped`: key was wiped
    pub fn hash(
        &self,
        message: &[u8],
        key: &KeyMaterial,
    ) -> Result<[u8; KEYED_HASH_BYTES], CryptoError> {
        let mac = self.mac(message, key)?;
        Ok(mac.finalize().into_bytes().into())
    }

    /// Verify `mac` over `message` in constant time.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed`: MAC does not match
    /// - `InvalidKeyLength`, `KeyAlreadyWiped`: see [`KeyedHash::hash`]
    pub fn verify(&self, mac: &[u8], message: &[u8], key: &KeyMaterial) -> Result<(), CryptoError> {
        self.mac(message, key)?.verify_slice(mac).map_err(|_| CryptoError::AuthenticationFailed)
    }

    fn mac(&self, message: &[u8], key: &KeyMaterial) -> Result<HmacSha256, CryptoError> {
        if key.len() != KEYED_HASH_KEY_BYTES {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEYED_HASH_KEY_BYTES,
                actual: key.len(),
            });
        }

        let mac = key.with_borrow(HmacSha256::new_from_slice)?;
        let Ok(mut mac) = mac else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(message);
        Ok(mac)
    }
}

//! Owned, scrub-on-drop key material.
//!
//! # Security Properties
//!
//! - Exclusive ownership: `KeyMaterial` is neither `Clone` nor `Copy`
//! - Scoped access: bytes are only reachable inside [`KeyMaterial::with_borrow`]
//! - Zeroization: the full backing buffer is overwritten on `wipe()` and on drop
//! - Wipe and borrow are mutually exclusive: `wipe` takes `&mut self`

use std::fmt;

use zeroize::Zeroize;

use crate::{env::Environment, error::CryptoError};

/// A secret key of fixed length.
///
/// Consumers receive either the owning handle or a borrowed view that lives
/// for exactly one closure call. Dropping the handle zeroizes the buffer.
pub struct KeyMaterial {
    bytes: Box<[u8]>,
    wiped: bool,
}

impl KeyMaterial {
    /// Generate `key_bytes` random bytes from the environment.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: `key_bytes` is zero
    /// - `EntropyUnavailable`: the random source failed; any partially
    ///   written bytes are scrubbed before returning
    pub fn generate<E: Environment>(key_bytes: usize, env: &E) -> Result<Self, CryptoError> {
        if key_bytes == 0 {
            return Err(CryptoError::InvalidParameter {
                reason: "key length must be non-zero".to_string(),
            });
        }

        // Owned before filling so a failed fill is still scrubbed on drop
        let mut key = Self { bytes: vec![0u8; key_bytes].into_boxed_slice(), wiped: false };
        env.random_bytes(&mut key.bytes)?;
        Ok(key)
    }

    /// Import caller-supplied bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: `bytes.len() != key_bytes`
    pub fn import(bytes: &[u8], key_bytes: usize) -> Result<Self, CryptoError> {
        if bytes.len() != key_bytes {
            return Err(CryptoError::InvalidKeyLength { expected: key_bytes, actual: bytes.len() });
        }

        Ok(Self { bytes: bytes.into(), wiped: false })
    }

    /// Import caller-supplied bytes and zeroize the source buffer.
    ///
    /// The source is zeroized on both the success and the error path.
    pub fn import_and_scrub(source: &mut [u8], key_bytes: usize) -> Result<Self, CryptoError> {
        let result = Self::import(source, key_bytes);
        source.zeroize();
        result
    }

    /// Key length in bytes. Unchanged by `wipe()`.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length key (never produced by the constructors).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True once `wipe()` has been called.
    pub fn is_wiped(&self) -> bool {
        self.wiped
    }

    /// Run `f` with a read-only view of the key bytes.
    ///
    /// The view's lifetime is bound to the call, so it cannot be smuggled
    /// out through the return value.
    ///
    /// # Errors
    ///
    /// - `KeyAlreadyWiped`: `wipe()` was called earlier
    pub fn with_borrow<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, CryptoError> {
        if self.wiped {
            return Err(CryptoError::KeyAlreadyWiped);
        }
        Ok(f(&self.bytes))
    }

    /// Zeroize the key now. Idempotent.
    pub fn wipe(&mut self) {
        self.scrub();
        self.wiped = true;
    }

    fn scrub(&mut self) {
        self.bytes[..].zeroize();
    }

    /// Backing buffer, readable even after `wipe()`.
    #[cfg(test)]
    pub(crate) fn backing_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.scrub();

        #[cfg(test)]
        teardown::record(&self.bytes);
    }
}


impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.bytes.len())
            .field("wiped", &self.wiped)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

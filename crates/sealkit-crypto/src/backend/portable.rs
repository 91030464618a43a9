//! Portable backend: the AEAD construction of RFC 8439 §2.8 assembled from
//! its parts.
//!
//! 1. Keystream block 0 yields the one-time Poly1305 key
//! 2. Keystream from block 1 onwards encrypts the payload
//! 3. The tag covers `aad ‖ pad16 ‖ ciphertext ‖ pad16 ‖ len(aad) ‖ len(ciphertext)`
//!
//! `XChaCha20` only changes step 1's cipher (`HChaCha20` subkey, 24-byte
//! nonce); the composition is the same. Open recomputes the tag over the
//! ciphertext and compares it in constant time before decrypting anything.

use chacha20::{
    ChaCha20, XChaCha20,
    cipher::{KeyIvInit, StreamCipher, StreamCipherSeek},
};
use poly1305::{
    Block, Poly1305,
    universal_hash::{KeyInit, UniversalHash},
};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::{Algorithm, TAG_BYTES};
use crate::error::CryptoError;

/// Offset of keystream block 1, where payload encryption starts.
const PAYLOAD_OFFSET: u64 = 64;

/// Scalar AEAD composed from `chacha20` and `poly1305`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortableBackend {
    algorithm: Algorithm,
}

impl PortableBackend {
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
        match self.algorithm {
            Algorithm::XChaCha20Poly1305 => seal_with::<XChaCha20>(key, nonce, plaintext, aad),
            Algorithm::ChaCha20Poly1305 => seal_with::<ChaCha20>(key, nonce, plaintext, aad),
        }
    }

    pub(super) fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        sealed: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            Algorithm::XChaCha20Poly1305 => open_with::<XChaCha20>(key, nonce, sealed, aad),
            Algorithm::ChaCha20Poly1305 => open_with::<ChaCha20>(key, nonce, sealed, aad),
        }
    }
}

/// Cipher positioned at block 1 plus the one-time MAC key from block 0.
fn keystream<C>(key: &[u8], nonce: &[u8]) -> Result<(C, Zeroizing<[u8; 32]>), CryptoError>
where
    C: KeyIvInit + StreamCipher + StreamCipherSeek,
{
    let mut cipher = C::new_from_slices(key, nonce).map_err(|_| CryptoError::InvalidParameter {
        reason: "key or nonce length rejected by stream cipher".to_string(),
    })?;

    let mut mac_key = Zeroizing::new([0u8; 32]);
    cipher.apply_keystream(&mut mac_key[..]);
    cipher.try_seek(PAYLOAD_OFFSET).map_err(|_| CryptoError::InvalidParameter {
        reason: "keystream seek out of range".to_string(),
    })?;

    Ok((cipher, mac_key))
}

fn seal_with<C>(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError>
where
    C: KeyIvInit + StreamCipher + StreamCipherSeek,
{
    let (mut cipher, mac_key) = keystream::<C>(key, nonce)?;

    let mut buffer = Vec::with_capacity(plaintext.len() + TAG_BYTES);
    buffer.extend_from_slice(plaintext);
    if cipher.try_apply_keystream(&mut buffer).is_err() {
        buffer.zeroize();
        return Err(CryptoError::InvalidParameter {
            reason: "plaintext exceeds the algorithm's length limit".to_string(),
        });
    }

    let tag = compute_tag(&mac_key, aad, &buffer);
    buffer.extend_from_slice(&tag);
    Ok(buffer)
}

fn open_with<C>(
    key: &[u8],
    nonce: &[u8],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError>
where
    C: KeyIvInit + StreamCipher + StreamCipherSeek,
{
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_BYTES);
    let (mut cipher, mac_key) = keystream::<C>(key, nonce)?;

    let expected = compute_tag(&mac_key, aad, ciphertext);
    if !bool::from(expected.as_slice().ct_eq(tag)) {
        return Err(CryptoError::AuthenticationFailed);
    }

    let mut buffer = ciphertext.to_vec();
    if cipher.try_apply_keystream(&mut buffer).is_err() {
        buffer.zeroize();
        return Err(CryptoError::InvalidCiphertext { minimum: TAG_BYTES, actual: sealed.len() });
    }
    Ok(buffer)
}

fn compute_tag(mac_key: &[u8; 32], aad: &[u8], ciphertext: &[u8]) -> Block {
    let mut mac = Poly1305::new(mac_key.into());
    mac.update_padded(aad);
    mac.update_padded(ciphertext);

    let mut lengths = Block::default();
    lengths[..8].copy_from_slice(&(aad.len() as u64).to_le_bytes());
    lengths[8..].copy_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    mac.update(&[lengths]);

    mac.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystream_starts_after_mac_block() {
        let key = [3u8; 32];
        let nonce = [4u8; 12];

        let sealed = seal_with::<ChaCha20>(&key, &nonce, &[0u8; 64], b"").unwrap();

        let mut raw = ChaCha20::new(&key.into(), &nonce.into());
        let mut blocks = [0u8; 128];
        raw.apply_keystream(&mut blocks);

        // Zero plaintext exposes the keystream, which must be block 1
        assert_eq!(&sealed[..64], &blocks[64..]);
    }

    #[test]
    fn mac_state_scrubs_on_drop() {
        fn zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}

        // The one-time key is copied into the MAC state
        zeroize_on_drop::<Poly1305>();
    }

    #[test]
    fn tag_depends_on_aad_length_encoding() {
        let mac_key = [1u8; 32];

        // Same padded bytes, different lengths
        let a = compute_tag(&mac_key, b"x", b"");
        let b = compute_tag(&mac_key, b"x\0", b"");
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_tag_never_decrypts() {
        let key = [5u8; 32];
        let nonce = [6u8; 24];
        let mut sealed = seal_with::<XChaCha20>(&key, &nonce, b"secret", b"ad").unwrap();
        sealed[0] ^= 0x80;

        let result = open_with::<XChaCha20>(&key, &nonce, &sealed, b"ad");
        assert_eq!(result.unwrap_err(), CryptoError::AuthenticationFailed);
    }
}

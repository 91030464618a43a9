//! AEAD backends and capability probing.
//!
//! The set of backends is closed: [`Backend`] is an enum and every call is a
//! `match`, resolved once the provider has committed to a variant.
//!
//! # Compatibility
//!
//! Backends implementing the same [`Algorithm`] are interchangeable. Given
//! the same key, nonce, plaintext and associated data they produce
//! byte-identical output, and each opens the other's ciphertext.
//!
//! ```text
//! aead_seal:  plaintext ──► [ ciphertext (N) ][ tag (16) ]
//! aead_open:  [ ciphertext (N) ][ tag (16) ] ──► plaintext | AuthenticationFailed
//! ```

mod accelerated;
mod portable;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::{accelerated::AcceleratedBackend, portable::PortableBackend};
use crate::{env::Environment, error::CryptoError};

/// Poly1305 tag size (16 bytes)
pub const TAG_BYTES: usize = 16;

/// Key size shared by every supported algorithm (32 bytes)
pub const KEY_BYTES: usize = 32;

/// AEAD algorithm. A configuration choice; backends implement all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// `XChaCha20-Poly1305` with 24-byte nonces
    #[default]
    XChaCha20Poly1305,
    /// `ChaCha20-Poly1305` (RFC 8439) with 12-byte nonces
    ChaCha20Poly1305,
}

impl Algorithm {
    /// Required key length.
    pub fn key_bytes(self) -> usize {
        KEY_BYTES
    }

    /// Required nonce length.
    pub fn nonce_bytes(self) -> usize {
        match self {
            Self::XChaCha20Poly1305 => 24,
            Self::ChaCha20Poly1305 => 12,
        }
    }

    /// Authentication tag length.
    pub fn tag_bytes(self) -> usize {
        TAG_BYTES
    }

    /// Fixed per-message overhead of a sealed box: nonce plus tag.
    pub fn aead_bytes(self) -> usize {
        self.nonce_bytes() + self.tag_bytes()
    }

    /// Canonical algorithm identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::XChaCha20Poly1305 => "xchacha20-poly1305",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Backend variants in the order the provider probes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// SIMD-accelerated implementation; needs vector support on the CPU
    Accelerated,
    /// Scalar implementation composed from the stream cipher and MAC
    Portable,
}

impl BackendKind {
    /// Every variant, highest priority first.
    pub const PRIORITY: [Self; 2] = [Self::Accelerated, Self::Portable];

    /// Canonical backend name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Portable => "portable",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Descriptor of a backend that passed probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Which backend
    pub kind: BackendKind,
    /// Algorithm it was probed for
    pub algorithm: Algorithm,
    /// Required key length
    pub key_bytes: usize,
    /// Required nonce length
    pub nonce_bytes: usize,
    /// Tag length
    pub tag_bytes: usize,
}

impl Capability {
    fn new(kind: BackendKind, algorithm: Algorithm) -> Self {
        Self {
            kind,
            algorithm,
            key_bytes: algorithm.key_bytes(),
            nonce_bytes: algorithm.nonce_bytes(),
            tag_bytes: algorithm.tag_bytes(),
        }
    }

    /// Fixed per-message overhead: nonce plus tag.
    pub fn aead_bytes(&self) -> usize {
        self.nonce_bytes + self.tag_bytes
    }
}

/// Why a backend did not probe successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The platform lacks the CPU support the backend needs
    MissingCpuSupport,
    /// The backend failed its seal/open self-test
    SelfTestFailed,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCpuSupport => f.write_str("missing CPU support"),
            Self::SelfTestFailed => f.write_str("self-test failed"),
        }
    }
}

/// A backend that did not probe successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable {
    /// Which backend
    pub kind: BackendKind,
    /// Why
    pub reason: UnavailableReason,
}

/// Outcome of probing one backend.
pub type ProbeResult = Result<Capability, Unavailable>;

/// A concrete AEAD implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `chacha20poly1305` crate, SIMD autodetected
    Accelerated(AcceleratedBackend),
    /// `chacha20` keystream + `poly1305` MAC
    Portable(PortableBackend),
}

impl Backend {
    /// Construct a backend of the given kind for `algorithm`.
    ///
    /// Construction does not check availability; see [`Backend::probe`].
    pub fn new(kind: BackendKind, algorithm: Algorithm) -> Self {
        match kind {
            BackendKind::Accelerated => Self::Accelerated(AcceleratedBackend::new(algorithm)),
            BackendKind::Portable => Self::Portable(PortableBackend::new(algorithm)),
        }
    }

    /// Check whether `kind` can run here.
    ///
    /// Side-effect free: consults the platform probe and runs a short
    /// seal/open self-test on fixed inputs. Meant for startup only.
    pub fn probe<E: Environment>(kind: BackendKind, algorithm: Algorithm, env: &E) -> ProbeResult {
        let unavailable = |reason| Unavailable { kind, reason };

        if kind == BackendKind::Accelerated && !env.cpu_features().has_simd() {
            return Err(unavailable(UnavailableReason::MissingCpuSupport));
        }

        if !Self::new(kind, algorithm).self_test() {
            return Err(unavailable(UnavailableReason::SelfTestFailed));
        }

        Ok(Capability::new(kind, algorithm))
    }

    /// Which variant this is.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Accelerated(_) => BackendKind::Accelerated,
            Self::Portable(_) => BackendKind::Portable,
        }
    }

    /// Algorithm this backend was built for.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Accelerated(backend) => backend.algorithm(),
            Self::Portable(backend) => backend.algorithm(),
        }
    }

    /// Encrypt and authenticate. Returns `ciphertext ‖ tag`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: wrong key length
    /// - `InvalidParameter`: wrong nonce length, or plaintext beyond the
    ///   algorithm's limit
    pub fn aead_seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.check_lengths(key, nonce)?;

        match self {
            Self::Accelerated(backend) => backend.seal(key, nonce, plaintext, aad),
            Self::Portable(backend) => backend.seal(key, nonce, plaintext, aad),
        }
    }

    /// Verify and decrypt `ciphertext ‖ tag`.
    ///
    /// Returns the plaintext only if the tag verifies; no partial output is
    /// ever produced.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`, `InvalidParameter`: wrong key or nonce length
    /// - `InvalidCiphertext`: input shorter than a tag
    /// - `AuthenticationFailed`: tag mismatch
    pub fn aead_open(
        &self,
        key: &[u8],
        nonce: &[u8],
        sealed: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.check_lengths(key, nonce)?;

        if sealed.len() < TAG_BYTES {
            return Err(CryptoError::InvalidCiphertext { minimum: TAG_BYTES, actual: sealed.len() });
        }

        match self {
            Self::Accelerated(backend) => backend.open(key, nonce, sealed, aad),
            Self::Portable(backend) => backend.open(key, nonce, sealed, aad),
        }
    }

    fn check_lengths(&self, key: &[u8], nonce: &[u8]) -> Result<(), CryptoError> {
        let algorithm = self.algorithm();

        if key.len() != algorithm.key_bytes() {
            return Err(CryptoError::InvalidKeyLength {
                expected: algorithm.key_bytes(),
                actual: key.len(),
            });
        }

        if nonce.len() != algorithm.nonce_bytes() {
            return Err(CryptoError::InvalidParameter {
                reason: format!(
                    "nonce length {} does not match {} ({})",
                    nonce.len(),
                    algorithm,
                    algorithm.nonce_bytes()
                ),
            });
        }

        Ok(())
    }

    /// Round-trip and tamper check on fixed inputs.
    fn self_test(&self) -> bool {
        const PLAINTEXT: &[u8] = b"sealkit backend self-test";
        const AAD: &[u8] = b"probe";

        let algorithm = self.algorithm();
        let key = [0x42u8; KEY_BYTES];
        let nonce = vec![0x24u8; algorithm.nonce_bytes()];

        let Ok(mut sealed) = self.aead_seal(&key, &nonce, PLAINTEXT, AAD) else {
            return false;
        };
        if sealed.len() != PLAINTEXT.len() + TAG_BYTES || sealed.starts_with(PLAINTEXT) {
            return false;
        }

        let roundtrip = self.aead_open(&key, &nonce, &sealed, AAD);
        if roundtrip.as_deref() != Ok(PLAINTEXT) {
            return false;
        }

        if let Some(last) = sealed.last_mut() {
            *last ^= 1;
        }
        self.aead_open(&key, &nonce, &sealed, AAD) == Err(CryptoError::AuthenticationFailed)
    }
}

//! Environment abstraction for randomness and platform probing.
//!
//! Decouples the crypto core from system resources. Production uses
//! [`SystemEnv`](crate::SystemEnv); tests inject environments with fixed
//! bytes, failing entropy, or a platform without SIMD support.

use crate::error::CryptoError;

/// CPU features relevant to backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuFeatures {
    /// x86 AVX2
    pub avx2: bool,
    /// x86 SSE2
    pub sse2: bool,
    /// aarch64 NEON
    pub neon: bool,
}

impl CpuFeatures {
    /// A platform with no vector support.
    pub fn none() -> Self {
        Self::default()
    }

    /// True if any vector unit usable by the accelerated backend is present.
    pub fn has_simd(&self) -> bool {
        self.avx2 || self.sse2 || self.neon
    }
}

/// Abstract environment providing randomness and platform capabilities.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - `random_bytes()` either fills the whole buffer or returns an error
/// - `cpu_features()` is side-effect free and cheap
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Errors
    ///
    /// - `EntropyUnavailable`: the platform cannot supply secure randomness
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError>;

    /// Reports which CPU features the platform supports.
    fn cpu_features(&self) -> CpuFeatures;

    /// Generates a random `u64`.
    fn random_u64(&self) -> Result<u64, CryptoError> {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes)?;
        Ok(u64::from_be_bytes(bytes))
    }
}

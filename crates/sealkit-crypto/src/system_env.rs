//! Production Environment implementation using OS randomness and CPU
//! feature detection.
//!
//! # Capabilities
//!
//! - OS cryptographic RNG (getrandom). Truly random, not reproducible
//! - Runtime CPU feature detection via `std::arch`

use crate::{
    env::{CpuFeatures, Environment},
    error::CryptoError,
};

/// Production environment using the OS RNG and runtime CPU detection.
///
/// # Security
///
/// The RNG uses getrandom which provides OS-level cryptographic randomness
/// (e.g., `getrandom(2)` on Linux, `BCryptGenRandom` on Windows). Failure is
/// reported as `EntropyUnavailable` rather than a panic so the provider can
/// refuse to initialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        getrandom::fill(buffer)
            .map_err(|e| CryptoError::EntropyUnavailable { reason: e.to_string() })
    }

    fn cpu_features(&self) -> CpuFeatures {
        detect_cpu_features()
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect_cpu_features() -> CpuFeatures {
    CpuFeatures {
        avx2: std::arch::is_x86_feature_detected!("avx2"),
        sse2: std::arch::is_x86_feature_detected!("sse2"),
        neon: false,
    }
}

#[cfg(target_arch = "aarch64")]
fn detect_cpu_features() -> CpuFeatures {
    CpuFeatures {
        avx2: false,
        sse2: false,
        neon: std::arch::is_aarch64_feature_detected!("neon"),
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_cpu_features() -> CpuFeatures {
    CpuFeatures::none()
}

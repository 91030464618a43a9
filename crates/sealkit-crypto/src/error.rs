//! Error types for sealing, key handling and provider initialization.
//!
//! Messages carry lengths and reasons only. Key bytes, plaintext and nonce
//! values never appear in an error.

use thiserror::Error;

/// Errors from the crypto subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key length does not match what the algorithm requires
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required key length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A parameter (nonce size, key size request, public key) was rejected
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// What was wrong with the parameter
        reason: String,
    },

    /// Ciphertext is structurally malformed (shorter than the fixed overhead)
    #[error("invalid ciphertext: need at least {minimum} bytes, got {actual}")]
    InvalidCiphertext {
        /// Minimum structural length
        minimum: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Tag mismatch: wrong key, wrong associated data, or tampered input
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A nonce was about to be issued twice
    #[error("nonce reuse detected")]
    NonceReuse,

    /// The secure random source could not supply bytes
    #[error("entropy unavailable: {reason}")]
    EntropyUnavailable {
        /// Reason reported by the random source
        reason: String,
    },

    /// Key material was wiped before this access
    #[error("key material already wiped")]
    KeyAlreadyWiped,

    /// No backend passed probing; the provider is permanently failed
    #[error("no crypto backend available ({probed} probed)")]
    NoBackendAvailable {
        /// Number of backends that were probed
        probed: usize,
    },
}

impl CryptoError {
    /// Returns true if the caller passed structurally invalid input.
    ///
    /// These are surfaced immediately and never worth retrying.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyLength { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidCiphertext { .. }
        )
    }

    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Fatal errors mean the environment or the subsystem itself is broken.
    /// `AuthenticationFailed` is not fatal: it is the expected answer to
    /// tampered or misaddressed input.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NonceReuse => true,
            Self::EntropyUnavailable { .. } => true,
            Self::NoBackendAvailable { .. } => true,

            Self::InvalidKeyLength { .. } => false,
            Self::InvalidParameter { .. } => false,
            Self::InvalidCiphertext { .. } => false,
            Self::AuthenticationFailed => false,
            Self::KeyAlreadyWiped => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_caller_errors() {
        assert!(CryptoError::InvalidKeyLength { expected: 32, actual: 16 }.is_caller_error());
        assert!(CryptoError::InvalidParameter { reason: "nonce".to_string() }.is_caller_error());
        assert!(CryptoError::InvalidCiphertext { minimum: 40, actual: 3 }.is_caller_error());

        assert!(!CryptoError::AuthenticationFailed.is_caller_error());
        assert!(!CryptoError::NonceReuse.is_caller_error());
    }

    #[test]
    fn authentication_failure_is_not_fatal() {
        assert!(!CryptoError::AuthenticationFailed.is_fatal());
        assert!(!CryptoError::KeyAlreadyWiped.is_fatal());
    }

    #[test]
    fn environment_failures_are_fatal() {
        assert!(CryptoError::NoBackendAvailable { probed: 2 }.is_fatal());
        assert!(CryptoError::EntropyUnavailable { reason: "os".to_string() }.is_fatal());
        assert!(CryptoError::NonceReuse.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidCiphertext { minimum: 40, actual: 7 };
        assert_eq!(err.to_string(), "invalid ciphertext: need at least 40 bytes, got 7");
        assert_eq!(CryptoError::AuthenticationFailed.to_string(), "authentication failed");
    }
}

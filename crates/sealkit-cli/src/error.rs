//! CLI error type.

use sealkit_crypto::CryptoError;
use thiserror::Error;

/// Failures surfaced to the operator.
#[derive(Debug, Error)]
pub enum CliError {
    /// The crypto subsystem rejected the operation
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An argument was not valid hex
    #[error("{field} is not valid hex: {source}")]
    Hex {
        /// Which argument
        field: &'static str,
        /// Decoder error
        #[source]
        source: hex::FromHexError,
    },

    /// Writing output failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

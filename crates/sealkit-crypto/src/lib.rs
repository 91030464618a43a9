//! Sealkit Cryptographic Primitives
//!
//! Authenticated encryption that behaves identically whichever backend
//! executes it. A [`CryptoProvider`] probes the available backends once,
//! commits to the best one, and hands out [`SecretBox`] instances (plus
//! keyed hashing, signatures and a public-key box) bound to that choice.
//!
//! # Data Flow
//!
//! ```text
//! CryptoProvider::initialize
//!        │
//!        ▼
//! Backend::probe (accelerated, then portable) → Capability
//!        │
//!        ▼
//! SecretBox ◄── KeyMaterial (generated or imported)
//!        │
//!        ▼
//! seal: NonceAllocator → nonce ‖ ciphertext ‖ tag
//! open: structure check → tag check → plaintext
//! ```
//!
//! # Security
//!
//! Key Material:
//! - Owned, never implicitly copied, zeroized on wipe and on drop
//! - Only reachable through a borrow scoped to one call
//! - Redacted in `Debug` and absent from every error message
//!
//! Nonces:
//! - Allocated internally on every seal; callers cannot supply one
//! - Random prefix plus an atomic counter, so duplicates need a counter
//!   collision rather than just a weak random source
//!
//! Authenticity:
//! - Tags are compared in constant time
//! - Open returns the full plaintext or an error, never partial output
//!
//! # Example
//!
//! ```
//! use sealkit_crypto::{CryptoProvider, ProviderConfig, SystemEnv};
//!
//! let provider = CryptoProvider::new(SystemEnv::new(), ProviderConfig::default());
//! let sbox = provider.secret_box()?;
//! let key = sbox.generate_key()?;
//!
//! let sealed = sbox.seal(b"hello", &key, None)?;
//! assert_eq!(sealed.len(), 5 + sbox.aead_bytes());
//! assert_eq!(sbox.open(&sealed, &key, None)?, b"hello");
//! # Ok::<(), sealkit_crypto::CryptoError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
pub mod env;
pub mod error;
pub mod key;
pub mod keyed_hash;
pub mod nonce;
pub mod provider;
pub mod public_box;
pub mod secret_box;
pub mod sign;
pub mod system_env;

pub use backend::{
    Algorithm, Backend, BackendKind, Capability, ProbeResult, Unavailable, UnavailableReason,
};
pub use env::{CpuFeatures, Environment};
pub use error::CryptoError;
pub use key::KeyMaterial;
pub use keyed_hash::KeyedHash;
pub use nonce::{Nonce, NonceAllocator};
pub use provider::{CryptoProvider, ProviderConfig, ProviderState};
pub use public_box::{BoxKeyPair, PublicKeyBox};
pub use secret_box::SecretBox;
pub use sign::{Sign, SigningKeyPair};
pub use system_env::SystemEnv;

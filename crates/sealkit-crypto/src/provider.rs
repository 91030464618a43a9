//! Provider facade: one-time backend selection and primitive construction.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized ──► Probing ──► Ready(backend)
//!                          └──► Failed
//! ```
//!
//! Probing walks the configured backends in fixed priority order
//! (accelerated before portable) and commits to the first that passes. The
//! outcome is stored in a `OnceLock`: concurrent first callers block on the
//! same probe and all observe the same result. `Ready` never changes backend;
//! `Failed` is permanent and every primitive constructor then returns
//! `NoBackendAvailable`.
//!
//! There is no global instance. Construct a provider at startup and pass it
//! by reference; tests build an isolated provider each.

use std::{
    fmt,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    backend::{Algorithm, Backend, BackendKind, Capability, ProbeResult},
    env::Environment,
    error::CryptoError,
    keyed_hash::KeyedHash,
    nonce::DEFAULT_REUSE_WINDOW,
    public_box::PublicKeyBox,
    secret_box::{Engine, SecretBox},
    sign::Sign,
};

/// Provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// AEAD algorithm for secret boxes
    pub algorithm: Algorithm,
    /// Backends the provider may select. Probed in priority order regardless
    /// of the order listed here.
    pub backends: Vec<BackendKind>,
    /// Number of recently issued nonces checked for duplicates (0 disables).
    /// Values above [`crate::nonce::MAX_REUSE_WINDOW`] leave the provider
    /// `Failed`.
    pub nonce_reuse_window: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            backends: BackendKind::PRIORITY.to_vec(),
            nonce_reuse_window: DEFAULT_REUSE_WINDOW,
        }
    }
}

/// Observable provider lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    /// Nothing has asked for a primitive yet
    Uninitialized,
    /// Backend probing is in progress
    Probing,
    /// Committed to a backend for the provider's lifetime
    Ready(BackendKind),
    /// No backend was viable; permanent
    Failed,
}

/// Committed outcome of probing.
struct Selection<E: Environment> {
    probes: Vec<ProbeResult>,
    engine: Result<Arc<Engine<E>>, CryptoError>,
}

/// Entry point to the crypto subsystem.
pub struct CryptoProvider<E: Environment> {
    env: E,
    config: ProviderConfig,
    probing: AtomicBool,
    selection: OnceLock<Selection<E>>,
}

impl<E: Environment> CryptoProvider<E> {
    /// Create an uninitialized provider. No probing happens until the first
    /// call to [`CryptoProvider::initialize`] or a primitive constructor.
    pub fn new(env: E, config: ProviderConfig) -> Self {
        Self { env, config, probing: AtomicBool::new(false), selection: OnceLock::new() }
    }

    /// Provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProviderState {
        match self.selection.get() {
            Some(Selection { engine: Ok(engine), .. }) => {
                ProviderState::Ready(engine.capability.kind)
            },
            Some(Selection { engine: Err(_), .. }) => ProviderState::Failed,
            None if self.probing.load(Ordering::Acquire) => ProviderState::Probing,
            None => ProviderState::Uninitialized,
        }
    }

    /// Probe backends (once) and return the committed capability.
    ///
    /// Later calls return the stored outcome without probing again.
    ///
    /// # Errors
    ///
    /// - `NoBackendAvailable`: probing failed, now or on an earlier call
    pub fn initialize(&self) -> Result<Capability, CryptoError> {
        self.engine().map(|engine| engine.capability)
    }

    /// Probe results in the order backends were tried, or `None` before
    /// initialization. Probing stops at the first viable backend.
    pub fn capabilities(&self) -> Option<&[ProbeResult]> {
        self.selection.get().map(|selection| selection.probes.as_slice())
    }

    /// A secret box bound to the selected backend.
    pub fn secret_box(&self) -> Result<SecretBox<E>, CryptoError> {
        Ok(SecretBox::new(Arc::clone(self.engine()?)))
    }

    /// Keyed hashing.
    pub fn keyed_hash(&self) -> Result<KeyedHash<E>, CryptoError> {
        self.engine()?;
        Ok(KeyedHash::new(self.env.clone()))
    }

    /// Signatures.
    pub fn sign(&self) -> Result<Sign<E>, CryptoError> {
        self.engine()?;
        Ok(Sign::new(self.env.clone()))
    }

    /// Public-key box sealing through the selected backend.
    pub fn public_key_box(&self) -> Result<PublicKeyBox<E>, CryptoError> {
        Ok(PublicKeyBox::new(self.env.clone(), self.secret_box()?))
    }

    fn engine(&self) -> Result<&Arc<Engine<E>>, CryptoError> {
        self.selection.get_or_init(|| self.select()).engine.as_ref().map_err(Clone::clone)
    }

    fn select(&self) -> Selection<E> {
        self.probing.store(true, Ordering::Release);

        let algorithm = self.config.algorithm;
        let mut probes = Vec::with_capacity(BackendKind::PRIORITY.len());

        let candidates =
            BackendKind::PRIORITY.into_iter().filter(|kind| self.config.backends.contains(kind));
        for kind in candidates {
            let result = Backend::probe(kind, algorithm, &self.env);
            match &result {
                Ok(_) => tracing::debug!(backend = %kind, %algorithm, "backend probe passed"),
                Err(unavailable) => tracing::debug!(
                    backend = %kind,
                    %algorithm,
                    reason = %unavailable.reason,
                    "backend probe failed"
                ),
            }

            let passed = result.is_ok();
            probes.push(result);
            if passed {
                break;
            }
        }

        let probed = probes.len();
        let engine = match probes.iter().find_map(|probe| probe.ok()) {
            Some(capability) => self.commit(capability, probed),
            None => {
                tracing::error!(probed, %algorithm, "no crypto backend available");
                Err(CryptoError::NoBackendAvailable { probed })
            },
        };

        Selection { probes, engine }
    }

    fn commit(
        &self,
        capability: Capability,
        probed: usize,
    ) -> Result<Arc<Engine<E>>, CryptoError> {
        if probed > 1 {
            tracing::warn!(backend = %capability.kind, "falling back to lower-priority backend");
        }

        match Engine::new(self.env.clone(), capability, self.config.nonce_reuse_window) {
            Ok(engine) => {
                tracing::info!(
                    backend = %capability.kind,
                    algorithm = %capability.algorithm,
                    aead_bytes = capability.aead_bytes(),
                    "crypto provider ready"
                );
                Ok(Arc::new(engine))
            },
            Err(error) => {
                tracing::error!(%error, "nonce allocator could not be created");
                Err(CryptoError::NoBackendAvailable { probed })
            },
        }
    }
}

impl<E: Environment> fmt::Debug for CryptoProvider<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoProvider")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

//! Nonce allocation with a process-local uniqueness guarantee.
//!
//! Every nonce is `random prefix ‖ counter`, where the counter is a 64-bit
//! big-endian value `origin + sequence`. The origin is drawn once per
//! allocator; the sequence is taken from an atomic, so two allocations from
//! the same allocator never share a counter even if the random source is
//! broken or adversarial.
//!
//! ```text
//! XChaCha20 (24 bytes):  [ random (16) ][ counter (8) ]
//! ChaCha20  (12 bytes):  [ random (4)  ][ counter (8) ]
//! ```
//!
//! A small window of recently issued nonces is kept to reject an immediate
//! duplicate with `NonceReuse`. Nothing else is retained.

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{env::Environment, error::CryptoError};

/// Largest nonce any supported algorithm uses (`XChaCha20`).
pub const MAX_NONCE_BYTES: usize = 24;

/// Size of the counter suffix.
pub const COUNTER_BYTES: usize = 8;

/// Default number of recently issued nonces checked for duplicates.
pub const DEFAULT_REUSE_WINDOW: usize = 64;

/// Largest accepted reuse window.
pub const MAX_REUSE_WINDOW: usize = 4096;

/// A nonce of the active algorithm's length. Not secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce {
    bytes: [u8; MAX_NONCE_BYTES],
    len: usize,
}

impl Nonce {
    fn zeroed(len: usize) -> Self {
        Self { bytes: [0u8; MAX_NONCE_BYTES], len }
    }

    /// Nonce bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Nonce length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length nonce (never produced by the allocator).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The counter suffix.
    pub fn counter(&self) -> u64 {
        let mut counter = [0u8; COUNTER_BYTES];
        counter.copy_from_slice(&self.as_bytes()[self.len - COUNTER_BYTES..]);
        u64::from_be_bytes(counter)
    }
}

impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Recently issued nonces, oldest first. `lookup` mirrors `order`.
#[derive(Default)]
struct RecentNonces {
    order: VecDeque<Nonce>,
    lookup: HashSet<Nonce>,
}

/// Issues nonces for one algorithm. Internally synchronized; share it by
/// reference or `Arc` across threads.
pub struct NonceAllocator<E: Environment> {
    env: E,
    nonce_bytes: usize,
    origin: u64,
    sequence: AtomicU64,
    recent: Mutex<RecentNonces>,
    window: usize,
}

impl<E: Environment> NonceAllocator<E> {
    /// Create an allocator for nonces of `nonce_bytes` bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: `nonce_bytes` outside `COUNTER_BYTES..=MAX_NONCE_BYTES`,
    ///   or `window` larger than [`MAX_REUSE_WINDOW`]
    /// - `EntropyUnavailable`: the counter origin could not be drawn
    pub fn new(env: E, nonce_bytes: usize, window: usize) -> Result<Self, CryptoError> {
        if !(COUNTER_BYTES..=MAX_NONCE_BYTES).contains(&nonce_bytes) {
            return Err(CryptoError::InvalidParameter {
                reason: format!(
                    "nonce length {nonce_bytes} outside {COUNTER_BYTES}..={MAX_NONCE_BYTES}"
                ),
            });
        }
        if window > MAX_REUSE_WINDOW {
            return Err(CryptoError::InvalidParameter {
                reason: format!("nonce reuse window {window} exceeds {MAX_REUSE_WINDOW}"),
            });
        }

        let origin = env.random_u64()?;

        Ok(Self {
            env,
            nonce_bytes,
            origin,
            sequence: AtomicU64::new(0),
            recent: Mutex::new(RecentNonces::default()),
            window,
        })
    }

    /// Nonce length this allocator issues.
    pub fn nonce_bytes(&self) -> usize {
        self.nonce_bytes
    }

    /// Allocate a fresh nonce.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: `size` differs from the algorithm's nonce length
    /// - `EntropyUnavailable`: the random prefix could not be drawn
    /// - `NonceReuse`: the counter space is exhausted or the nonce matches
    ///   one issued within the reuse window
    pub fn allocate(&self, size: usize) -> Result<Nonce, CryptoError> {
        if size != self.nonce_bytes {
            return Err(CryptoError::InvalidParameter {
                reason: format!("nonce size {size} requested, algorithm uses {}", self.nonce_bytes),
            });
        }

        let sequence = self
            .sequence
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| s.checked_add(1))
            .map_err(|_| CryptoError::NonceReuse)?;
        let counter = self.origin.wrapping_add(sequence);

        let mut nonce = Nonce::zeroed(size);
        let (random, suffix) = nonce.bytes[..size].split_at_mut(size - COUNTER_BYTES);
        self.env.random_bytes(random)?;
        suffix.copy_from_slice(&counter.to_be_bytes());

        self.remember(nonce)?;
        Ok(nonce)
    }

    fn remember(&self, nonce: Nonce) -> Result<(), CryptoError> {
        if self.window == 0 {
            return Ok(());
        }

        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if !recent.lookup.insert(nonce) {
            tracing::error!("nonce allocator produced a duplicate within the reuse window");
            return Err(CryptoError::NonceReuse);
        }
        recent.order.push_back(nonce);
        while recent.order.len() > self.window {
            let Some(oldest) = recent.order.pop_front() else { break };
            recent.lookup.remove(&oldest);
        }
        Ok(())
    }

    /// Moves the sequence back, simulating a broken counter.
    #[cfg(test)]
    pub(crate) fn rewind(&self, sequence: u64) {
        self.sequence.store(sequence, Ordering::Release);
    }
}

impl<E: Environment> std::fmt::Debug for NonceAllocator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceAllocator")
            .field("nonce_bytes", &self.nonce_bytes)
            .field("issued", &self.sequence.load(Ordering::Relaxed))
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

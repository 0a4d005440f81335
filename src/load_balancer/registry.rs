//! Backend registry with round-robin selection.
//!
//! # Responsibilities
//! - Hold the authoritative, append-only list of backends
//! - Serialize appends behind a mutex
//! - Select backends round-robin with a lock-free cursor
//!
//! # Design Decisions
//! - The sequence lives in an `ArcSwap`; appends copy, push and publish
//!   a new snapshot while holding `append_lock`
//! - Selection loads one snapshot and indexes that same snapshot, so the
//!   modulo is always taken against the length actually being indexed
//! - The cursor wraps on overflow; `wrapping % len` is still in range

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::load_balancer::backend::{Backend, BackendId, BackendTarget};

/// Errors raised by the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The administrative address could not be used as a forwarding target.
    #[error("Invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Selection was attempted against an empty registry.
    #[error("No backends configured")]
    NoBackendsAvailable,
}

impl RegistryError {
    pub(crate) fn invalid(address: &str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// Concurrency-safe, append-only set of backends.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: ArcSwap<Vec<Arc<Backend>>>,
    append_lock: Mutex<()>,
    cursor: AtomicUsize,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the given addresses, in order.
    ///
    /// Fails on the first invalid address.
    pub fn from_addresses<I, S>(addresses: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = Self::new();
        for address in addresses {
            registry.register(address.as_ref())?;
        }
        Ok(registry)
    }

    /// Parse `address` and append it to the end of the rotation.
    ///
    /// On failure the registry is left untouched.
    pub fn register(&self, address: &str) -> Result<Arc<Backend>, RegistryError> {
        let target = BackendTarget::parse(address)?;

        let _guard = self
            .append_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.backends.load();
        let backend = Arc::new(Backend::new(BackendId::new(current.len()), target));

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(backend.clone());
        self.backends.store(Arc::new(next));

        tracing::info!(
            id = %backend.id(),
            url = %backend,
            total = backend.id().as_usize() + 1,
            "Backend registered"
        );

        Ok(backend)
    }

    /// Select the next backend in round-robin order.
    pub fn select_next(&self) -> Result<Arc<Backend>, RegistryError> {
        let backends = self.backends.load();
        if backends.is_empty() {
            return Err(RegistryError::NoBackendsAvailable);
        }

        let ticket = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(backends[ticket % backends.len()].clone())
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All backends in rotation order.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Backend>>> {
        self.backends.load_full()
    }

    #[cfg(test)]
    fn with_cursor(start: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(start),
            ..Self::default()
        }
    }
}

//! The shared canonical cart cache.
//!
//! The store is the only shared mutable resource in the library. All writes
//! flow through the coordinator's snapshot / apply / settle sequence;
//! settlements are versioned so a stale rollback cannot clobber a newer
//! settlement (last-settled-wins).

use std::sync::{Arc, Mutex, PoisonError};

use super::state::CartState;

/// An immutable copy of the cart taken before an optimistic mutation.
///
/// Retained only while the mutation is in flight; consumed at settlement.
#[derive(Debug, Clone)]
pub struct MutationSnapshot {
    cart: CartState,
    version: u64,
}

impl MutationSnapshot {
    /// The captured cart state.
    #[must_use]
    pub fn cart(&self) -> &CartState {
        &self.cart
    }
}

/// Shared handle to the canonical cart.
///
/// Cheap to clone; all clones observe the same state. Lock sections are
/// short and never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    cart: CartState,
    /// Bumped on every settlement (commit, effective rollback, reset).
    version: u64,
}

impl CartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current canonical state.
    #[must_use]
    pub fn current(&self) -> CartState {
        self.lock().cart.clone()
    }

    /// Capture a snapshot for a mutation about to be issued.
    ///
    /// A second mutation issued while another is in flight snapshots the
    /// already-optimistically-updated state, so rapid sequential mutations
    /// compose.
    #[must_use]
    pub fn snapshot(&self) -> MutationSnapshot {
        let inner = self.lock();
        MutationSnapshot {
            cart: inner.cart.clone(),
            version: inner.version,
        }
    }

    /// Apply a locally computed next state (optimistic, not a settlement).
    pub fn apply(&self, mutate: impl FnOnce(&mut CartState)) {
        mutate(&mut self.lock().cart);
    }

    /// Settle with the server-confirmed state.
    pub fn commit(&self, cart: CartState) {
        let mut inner = self.lock();
        inner.cart = cart;
        inner.version += 1;
    }

    /// Settle a failed mutation by restoring its snapshot.
    ///
    /// Returns `false` without writing when another settlement landed after
    /// the snapshot was taken; the newer settlement wins and the stale
    /// restore becomes a no-op.
    pub fn rollback(&self, snapshot: MutationSnapshot) -> bool {
        let mut inner = self.lock();
        if inner.version != snapshot.version {
            return false;
        }
        inner.cart = snapshot.cart;
        inner.version += 1;
        true
    }

    /// Discard all local state (logout or explicit local reset).
    ///
    /// Counts as a settlement so in-flight rollbacks against the old state
    /// become stale.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.cart = CartState::empty();
        inner.version += 1;
    }
}

//! Optimistic mutation coordination.
//!
//! Every cart write follows the same sequence: snapshot the canonical
//! state, apply a locally computed next state, issue the remote call, then
//! reconcile with the server-confirmed cart or restore the snapshot. One
//! generic helper ([`CartCoordinator::run_optimistic`]) implements the
//! sequence; the four operations only supply the optimistic apply and the
//! remote call.
//!
//! The coordinator is the single point that decides rollback vs.
//! reconciliation; no other component writes canonical state.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

use pasar_core::{LineItemId, Price, ProductId};

use crate::api::{ApiError, CartApi};

use super::state::{CartLineItem, CartState};
use super::store::CartStore;

/// Errors surfaced by cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The remote call failed; the cache was rolled back.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A mutation was asked to produce a quantity of 0.
    ///
    /// Reducing a line item to zero is a removal by convention; call sites
    /// must invoke [`CartCoordinator::remove_item`] instead. The
    /// coordinator does not silently redirect.
    #[error("quantity must be at least 1; remove the line item instead")]
    QuantityZero,
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A discrete, dismissable message for the UI notification channel.
///
/// The core only reports; rendering is the UI's job.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// In-flight mutation registry, queried by the UI to disable controls.
///
/// Keyed by line-item ID so unrelated line items stay interactable; a
/// whole-cart entry covers `clear`.
#[derive(Debug, Clone, Default)]
pub struct BusyRegistry {
    inner: Arc<Mutex<BusyInner>>,
}

#[derive(Debug, Default)]
struct BusyInner {
    lines: HashSet<LineItemId>,
    cart_wide: usize,
}

impl BusyRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, BusyInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a mutation touching this line item is in flight.
    #[must_use]
    pub fn is_line_busy(&self, id: &LineItemId) -> bool {
        let inner = self.lock();
        inner.cart_wide > 0 || inner.lines.contains(id)
    }

    /// Whether any mutation is in flight.
    #[must_use]
    pub fn is_cart_busy(&self) -> bool {
        let inner = self.lock();
        inner.cart_wide > 0 || !inner.lines.is_empty()
    }

    fn mark_line(&self, id: LineItemId) -> BusyGuard {
        self.lock().lines.insert(id.clone());
        BusyGuard {
            registry: self.clone(),
            key: BusyKey::Line(id),
        }
    }

    fn mark_cart(&self) -> BusyGuard {
        self.lock().cart_wide += 1;
        BusyGuard {
            registry: self.clone(),
            key: BusyKey::Cart,
        }
    }
}

#[derive(Debug)]
enum BusyKey {
    Line(LineItemId),
    Cart,
}

/// Clears the busy entry at settlement, on success and error paths alike.
#[must_use]
struct BusyGuard {
    registry: BusyRegistry,
    key: BusyKey,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut inner = self.registry.lock();
        match &self.key {
            BusyKey::Line(id) => {
                inner.lines.remove(id);
            }
            BusyKey::Cart => {
                inner.cart_wide = inner.cart_wide.saturating_sub(1);
            }
        }
    }
}

/// Orchestrates optimistic cart mutations against the canonical store.
#[derive(Debug, Clone)]
pub struct CartCoordinator<A> {
    api: A,
    store: CartStore,
    busy: BusyRegistry,
    events: mpsc::UnboundedSender<Notification>,
}

impl<A: CartApi> CartCoordinator<A> {
    /// Create a coordinator and the receiving end of its notification
    /// channel.
    pub fn new(api: A, store: CartStore) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                api,
                store,
                busy: BusyRegistry::default(),
                events,
            },
            receiver,
        )
    }

    /// The canonical store this coordinator writes.
    #[must_use]
    pub fn store(&self) -> &CartStore {
        &self.store
    }

    /// The in-flight registry for disabling UI controls.
    #[must_use]
    pub fn busy(&self) -> &BusyRegistry {
        &self.busy
    }

    /// Fetch the server cart and commit it as canonical state.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Api`] on transport or server failure. No
    /// rollback is involved; the previous canonical state is untouched.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartState, CartError> {
        let cart = self.api.fetch_cart().await?;
        self.store.commit(cart.clone());
        Ok(cart)
    }

    /// Discard local state (logout).
    pub fn reset(&self) {
        self.store.reset();
    }

    /// Add `quantity` of a product.
    ///
    /// If a line item for the product already exists its quantity is
    /// optimistically incremented; otherwise a provisional item with a
    /// temporary ID and zero price is appended. Either way the
    /// server-confirmed cart replaces local state on success.
    ///
    /// # Errors
    ///
    /// [`CartError::QuantityZero`] for a zero quantity (before any state
    /// change), [`CartError::Api`] when the remote call fails (after
    /// rollback).
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartState, CartError> {
        if quantity == 0 {
            return Err(CartError::QuantityZero);
        }

        let line_id = self
            .store
            .current()
            .line_for_product(product_id)
            .map_or_else(LineItemId::provisional, |line| line.id.clone());
        let _guard = self.busy.mark_line(line_id.clone());

        let provisional_id = line_id;
        self.run_optimistic(
            move |cart| {
                if let Some(line) = cart
                    .items
                    .iter_mut()
                    .find(|line| line.product_id == product_id)
                {
                    line.quantity += quantity;
                } else {
                    cart.items.push(CartLineItem {
                        id: provisional_id,
                        product_id,
                        quantity,
                        unit_price: Price::zero(),
                        detail: None,
                    });
                }
            },
            self.api.add_item(product_id, quantity),
            "Added to cart",
        )
        .await
    }

    /// Set the quantity of a line item.
    ///
    /// # Errors
    ///
    /// [`CartError::QuantityZero`] when `quantity` is 0 — removal on zero
    /// is the documented convention and belongs to the caller.
    /// [`CartError::Api`] when the remote call fails (after rollback).
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_item(
        &self,
        line_id: LineItemId,
        quantity: u32,
    ) -> Result<CartState, CartError> {
        if quantity == 0 {
            return Err(CartError::QuantityZero);
        }

        let _guard = self.busy.mark_line(line_id.clone());

        let target = line_id.clone();
        self.run_optimistic(
            move |cart| {
                if let Some(line) = cart.line_mut(&target) {
                    line.quantity = quantity;
                }
            },
            self.api.update_item(&line_id, quantity),
            "Cart updated",
        )
        .await
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// [`CartError::Api`] when the remote call fails (after rollback).
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: LineItemId) -> Result<CartState, CartError> {
        let _guard = self.busy.mark_line(line_id.clone());

        let target = line_id.clone();
        self.run_optimistic(
            move |cart| cart.items.retain(|line| line.id != target),
            self.api.remove_item(&line_id),
            "Removed from cart",
        )
        .await
    }

    /// Remove every line item.
    ///
    /// # Errors
    ///
    /// [`CartError::Api`] when the remote call fails (after rollback).
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<CartState, CartError> {
        let _guard = self.busy.mark_cart();

        self.run_optimistic(
            |cart| *cart = CartState::empty(),
            self.api.clear_cart(),
            "Cart cleared",
        )
        .await
    }

    /// Snapshot, optimistically apply, issue, then reconcile or restore.
    async fn run_optimistic<Fut>(
        &self,
        apply: impl FnOnce(&mut CartState),
        issue: Fut,
        success_message: &str,
    ) -> Result<CartState, CartError>
    where
        Fut: Future<Output = Result<CartState, ApiError>>,
    {
        let snapshot = self.store.snapshot();
        self.store.apply(apply);

        match issue.await {
            Ok(server_cart) => {
                self.store.commit(server_cart.clone());
                self.notify(NotificationLevel::Success, success_message.to_string());
                Ok(server_cart)
            }
            Err(err) => {
                error!(error = %err, "cart mutation failed; rolling back");
                if !self.store.rollback(snapshot) {
                    debug!("rollback skipped: a newer settlement already landed");
                }
                self.notify(NotificationLevel::Error, err.user_message());
                Err(err.into())
            }
        }
    }

    /// Report to the UI notification channel.
    ///
    /// A dropped receiver means the consumer went away mid-flight; the
    /// settlement still completes and the send becomes a no-op.
    fn notify(&self, level: NotificationLevel, message: String) {
        let _ = self.events.send(Notification {
            level,
            message,
            at: Utc::now(),
        });
    }
}

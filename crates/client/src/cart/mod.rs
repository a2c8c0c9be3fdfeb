//! The cart consistency core.
//!
//! # Architecture
//!
//! - [`state`] - canonical cart representation all components share
//! - [`normalize`] - the single boundary where raw backend shapes become
//!   canonical state
//! - [`store`] - the shared canonical cache with versioned settlements
//! - [`coordinator`] - optimistic mutations: snapshot, apply, issue,
//!   reconcile or roll back
//! - [`hydrate`] - lazy product-detail enrichment with per-product request
//!   coalescing
//! - [`view`] - pure derivation of display rows and totals

pub mod coordinator;
pub mod hydrate;
pub mod normalize;
pub mod state;
pub mod store;
pub mod view;

pub use coordinator::{BusyRegistry, CartCoordinator, CartError, Notification, NotificationLevel};
pub use hydrate::ProductHydrator;
pub use state::{CartLineItem, CartState, ProductDetail};
pub use store::{CartStore, MutationSnapshot};
pub use view::{CartRowView, CartView};

//! Pasar cart client library.
//!
//! Maintains a locally cached shopping cart against the Pasar REST backend:
//! optimistic mutations with rollback, normalization of divergent backend
//! payload shapes into one canonical [`CartState`], lazy product-detail
//! hydration with per-product request coalescing, and pure view derivation.
//!
//! # Architecture
//!
//! - The backend is the source of truth; every successful mutation replaces
//!   local state with the server-confirmed cart
//! - All payload parsing lives behind one normalization boundary
//!   ([`cart::normalize`]); nothing else sees raw shapes
//! - The canonical cart cache ([`cart::CartStore`]) is written only by the
//!   [`cart::CartCoordinator`]; the hydrator produces derived copies
//! - Product detail is cached and coalesced via `moka` (per-product TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use pasar_client::api::CartGateway;
//! use pasar_client::cart::{CartCoordinator, CartStore, CartView, ProductHydrator};
//!
//! let config = pasar_client::config::ClientConfig::from_env()?;
//! let gateway = CartGateway::new(&config)?;
//! let store = CartStore::new();
//! let (coordinator, mut notifications) = CartCoordinator::new(gateway.clone(), store.clone());
//!
//! coordinator.refresh().await?;
//! coordinator.add_item(ProductId::new(42), 2).await?;
//!
//! let hydrator = ProductHydrator::new(gateway, config.detail_ttl);
//! let hydrated = hydrator.hydrate(&store.current()).await;
//! let view = CartView::derive(&hydrated);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;

pub use api::{ApiError, CartApi, CartGateway};
pub use cart::{
    CartCoordinator, CartError, CartLineItem, CartState, CartStore, CartView, Notification,
    NotificationLevel, ProductDetail, ProductHydrator,
};
pub use config::{ClientConfig, ConfigError};

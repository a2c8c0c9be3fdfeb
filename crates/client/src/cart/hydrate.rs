//! Lazy product-detail enrichment.
//!
//! The cart payload often lacks presentation data (images, shop name, live
//! price). The hydrator fills the gaps: one detail fetch per distinct
//! product, coalesced across concurrent passes, isolated per product on
//! failure. It writes only a derived copy — canonical price and quantity
//! are never touched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use moka::future::Cache;
use tracing::{debug, warn};

use pasar_core::ProductId;

use crate::api::{ApiError, CartApi};

use super::state::{CartState, ProductDetail};

const DETAIL_CACHE_CAPACITY: u64 = 1024;

/// Fetches and caches product presentation detail.
///
/// The `moka` cache provides both the TTL and the request coalescing:
/// concurrent lookups for the same product share a single in-flight fetch.
pub struct ProductHydrator<A> {
    api: A,
    cache: Cache<ProductId, ProductDetail>,
}

impl<A: CartApi> ProductHydrator<A> {
    /// Create a hydrator with the given detail cache TTL.
    #[must_use]
    pub fn new(api: A, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DETAIL_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { api, cache }
    }

    /// Return a copy of the cart with missing product detail filled in.
    ///
    /// Issues one fetch per distinct product lacking detail, never one per
    /// line item. A product whose fetch fails keeps its detail absent (the
    /// UI shows a placeholder); other products still hydrate.
    pub async fn hydrate(&self, cart: &CartState) -> CartState {
        let mut seen = HashSet::new();
        let missing: Vec<ProductId> = cart
            .items
            .iter()
            .filter(|item| item.detail.is_none())
            .map(|item| item.product_id)
            .filter(|id| seen.insert(*id))
            .collect();

        if missing.is_empty() {
            return cart.clone();
        }
        debug!(products = missing.len(), "hydrating missing product detail");

        let fetches = missing.iter().map(|&product_id| async move {
            match self.detail(product_id).await {
                Ok(detail) => Some((product_id, detail)),
                Err(err) => {
                    warn!(
                        product_id = %product_id,
                        error = %err,
                        "product detail fetch failed; leaving placeholder"
                    );
                    None
                }
            }
        });
        let resolved: HashMap<ProductId, ProductDetail> =
            join_all(fetches).await.into_iter().flatten().collect();

        let mut hydrated = cart.clone();
        for item in &mut hydrated.items {
            if item.detail.is_none()
                && let Some(detail) = resolved.get(&item.product_id)
            {
                item.detail = Some(detail.clone());
            }
        }
        hydrated
    }

    /// Fetch one product's detail through the coalescing cache.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] (shared among coalesced
    /// callers). Errors are not cached; the next pass retries.
    pub async fn detail(&self, product_id: ProductId) -> Result<ProductDetail, Arc<ApiError>> {
        self.cache
            .try_get_with(product_id, self.api.product_detail(product_id))
            .await
    }

    /// Drop one product's cached detail (e.g. after a seller edit).
    pub async fn invalidate(&self, product_id: ProductId) {
        self.cache.invalidate(&product_id).await;
    }

    /// Drop all cached detail (logout).
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use pasar_core::{LineItemId, Price};

    use crate::cart::state::CartLineItem;

    /// Counts detail fetches per product; optionally gates the first call.
    #[derive(Clone, Default)]
    struct DetailApi {
        calls: Arc<AtomicUsize>,
        failing: Arc<Mutex<HashSet<ProductId>>>,
        gate: Arc<Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>>,
    }

    impl DetailApi {
        fn fail_for(&self, product_id: ProductId) {
            self.failing.lock().expect("lock").insert(product_id);
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CartApi for DetailApi {
        async fn fetch_cart(&self) -> Result<CartState, ApiError> {
            Ok(CartState::empty())
        }

        async fn add_item(&self, _: ProductId, _: u32) -> Result<CartState, ApiError> {
            Ok(CartState::empty())
        }

        async fn update_item(&self, _: &LineItemId, _: u32) -> Result<CartState, ApiError> {
            Ok(CartState::empty())
        }

        async fn remove_item(&self, _: &LineItemId) -> Result<CartState, ApiError> {
            Ok(CartState::empty())
        }

        async fn clear_cart(&self) -> Result<CartState, ApiError> {
            Ok(CartState::empty())
        }

        async fn product_detail(&self, product_id: ProductId) -> Result<ProductDetail, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let gate = self.gate.lock().expect("lock").take();
            if let Some((started, release)) = gate {
                started.send(()).ok();
                release.await.ok();
            }

            if self.failing.lock().expect("lock").contains(&product_id) {
                return Err(ApiError::Server {
                    status: 404,
                    message: "Product not found".to_string(),
                });
            }
            Ok(ProductDetail {
                title: format!("Product {product_id}"),
                image_url: Some(format!("https://cdn.pasar.dev/{product_id}.jpg")),
                shop_id: None,
                shop_name: Some("Toko".to_string()),
                shop_slug: None,
                live_price: Some(Price::from_units(52_000)),
            })
        }
    }

    fn bare_item(id: &str, product: i64, quantity: u32) -> CartLineItem {
        CartLineItem {
            id: LineItemId::from(id),
            product_id: ProductId::new(product),
            quantity,
            unit_price: Price::from_units(50_000),
            detail: None,
        }
    }

    fn hydrator(api: DetailApi) -> ProductHydrator<DetailApi> {
        ProductHydrator::new(api, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn issues_one_fetch_per_distinct_product() {
        let api = DetailApi::default();
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![
                bare_item("1", 42, 1),
                bare_item("2", 42, 2),
                bare_item("3", 9, 1),
                bare_item("4", 9, 1),
                bare_item("5", 9, 3),
            ],
            grand_total: None,
        };

        let hydrated = hydrator.hydrate(&cart).await;

        assert_eq!(api.call_count(), 2);
        assert!(hydrated.items.iter().all(|item| item.detail.is_some()));
    }

    #[tokio::test]
    async fn repeated_product_shares_one_detail() {
        let api = DetailApi::default();
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![bare_item("1", 9, 1), bare_item("2", 9, 2), bare_item("3", 9, 3)],
            grand_total: None,
        };

        let hydrated = hydrator.hydrate(&cart).await;

        assert_eq!(api.call_count(), 1);
        let first = hydrated.items[0].detail.as_ref().expect("detail");
        for item in &hydrated.items {
            assert_eq!(item.detail.as_ref(), Some(first));
        }
    }

    #[tokio::test]
    async fn one_failing_product_does_not_abort_the_others() {
        let api = DetailApi::default();
        api.fail_for(ProductId::new(42));
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![bare_item("1", 42, 1), bare_item("2", 9, 1)],
            grand_total: None,
        };

        let hydrated = hydrator.hydrate(&cart).await;

        assert!(hydrated.items[0].detail.is_none());
        assert!(hydrated.items[1].detail.is_some());
    }

    #[tokio::test]
    async fn hydration_never_touches_price_or_quantity() {
        let api = DetailApi::default();
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![bare_item("1", 42, 2)],
            grand_total: Some(Price::from_units(100_000)),
        };

        let hydrated = hydrator.hydrate(&cart).await;

        // Live price lands in detail; the snapshot stays authoritative.
        assert_eq!(hydrated.items[0].unit_price, Price::from_units(50_000));
        assert_eq!(hydrated.items[0].quantity, 2);
        assert_eq!(hydrated.grand_total, Some(Price::from_units(100_000)));
        assert_eq!(
            hydrated.items[0]
                .detail
                .as_ref()
                .expect("detail")
                .live_price,
            Some(Price::from_units(52_000))
        );

        // The input cart is untouched.
        assert!(cart.items[0].detail.is_none());
    }

    #[tokio::test]
    async fn second_pass_hits_the_cache() {
        let api = DetailApi::default();
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![bare_item("1", 42, 1)],
            grand_total: None,
        };

        hydrator.hydrate(&cart).await;
        hydrator.hydrate(&cart).await;

        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_fetches_are_retried_on_the_next_pass() {
        let api = DetailApi::default();
        api.fail_for(ProductId::new(42));
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![bare_item("1", 42, 1)],
            grand_total: None,
        };

        let first = hydrator.hydrate(&cart).await;
        assert!(first.items[0].detail.is_none());

        // Product comes back; the error was not cached.
        api.failing.lock().expect("lock").clear();
        let second = hydrator.hydrate(&cart).await;
        assert!(second.items[0].detail.is_some());
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_passes_share_one_in_flight_fetch() {
        let api = DetailApi::default();
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *api.gate.lock().expect("lock") = Some((started_tx, release_rx));

        let hydrator = Arc::new(hydrator(api.clone()));
        let cart = CartState {
            items: vec![bare_item("1", 9, 1)],
            grand_total: None,
        };

        let first = tokio::spawn({
            let hydrator = Arc::clone(&hydrator);
            let cart = cart.clone();
            async move { hydrator.hydrate(&cart).await }
        });
        started_rx.await.expect("fetch should start");

        // Second pass begins while the first fetch is still in flight.
        let second = tokio::spawn({
            let hydrator = Arc::clone(&hydrator);
            let cart = cart.clone();
            async move { hydrator.hydrate(&cart).await }
        });
        tokio::task::yield_now().await;
        release_tx.send(()).expect("release");

        let first = first.await.expect("join");
        let second = second.await.expect("join");
        assert!(first.items[0].detail.is_some());
        assert!(second.items[0].detail.is_some());
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_refetch() {
        let api = DetailApi::default();
        let hydrator = hydrator(api.clone());
        let cart = CartState {
            items: vec![bare_item("1", 42, 1)],
            grand_total: None,
        };

        hydrator.hydrate(&cart).await;
        hydrator.invalidate(ProductId::new(42)).await;
        hydrator.hydrate(&cart).await;

        assert_eq!(api.call_count(), 2);
    }
}

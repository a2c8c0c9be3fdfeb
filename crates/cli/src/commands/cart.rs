//! Cart commands.
//!
//! Each command wires the full stack (config, gateway, store, coordinator,
//! hydrator) against the configured backend, runs one operation, and logs
//! the resulting view along with any notifications the coordinator
//! emitted.
//!
//! # Environment Variables
//!
//! - `PASAR_API_URL` - Base URL of the Pasar REST backend
//! - `PASAR_API_TOKEN` - Bearer token for authenticated calls

use thiserror::Error;
use tokio::sync::mpsc;

use pasar_client::api::{ApiError, CartGateway};
use pasar_client::cart::{
    CartCoordinator, CartError, CartState, CartStore, CartView, Notification, NotificationLevel,
    ProductHydrator,
};
use pasar_client::config::{ClientConfig, ConfigError};
use pasar_core::{LineItemId, ProductId};

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] ApiError),

    /// A cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

/// The wired-up client stack for one command invocation.
struct Context {
    coordinator: CartCoordinator<CartGateway>,
    hydrator: ProductHydrator<CartGateway>,
    notifications: mpsc::UnboundedReceiver<Notification>,
}

impl Context {
    fn build() -> Result<Self, CliError> {
        dotenvy::dotenv().ok();

        let config = ClientConfig::from_env()?;
        let gateway = CartGateway::new(&config)?;
        let store = CartStore::new();
        let (coordinator, notifications) = CartCoordinator::new(gateway.clone(), store);
        let hydrator = ProductHydrator::new(gateway, config.detail_ttl);

        Ok(Self {
            coordinator,
            hydrator,
            notifications,
        })
    }

    /// Hydrate, derive, and log the cart view.
    async fn render(&self, cart: &CartState) {
        let hydrated = self.hydrator.hydrate(cart).await;
        let view = CartView::derive(&hydrated);

        if view.rows.is_empty() {
            tracing::info!("Cart is empty");
            return;
        }

        for row in &view.rows {
            tracing::info!(
                "[{}] {} x{} @ {} = {} ({})",
                row.line_id,
                row.title,
                row.quantity,
                row.unit_price,
                row.line_total,
                row.shop_name.as_deref().unwrap_or("-"),
            );
        }
        tracing::info!(
            "Total: {} ({} items)",
            view.grand_total,
            view.item_count
        );
    }

    /// Log everything the coordinator reported.
    fn drain_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            match notification.level {
                NotificationLevel::Success => tracing::info!("{}", notification.message),
                NotificationLevel::Error => tracing::warn!("{}", notification.message),
            }
        }
    }
}

/// Fetch and display the cart.
pub async fn show() -> Result<(), CliError> {
    let ctx = Context::build()?;
    let cart = ctx.coordinator.refresh().await?;
    ctx.render(&cart).await;
    Ok(())
}

/// Add a product to the cart.
pub async fn add(product_id: i64, quantity: u32) -> Result<(), CliError> {
    let mut ctx = Context::build()?;
    let result = ctx.coordinator.add_item(ProductId::new(product_id), quantity).await;
    ctx.drain_notifications();
    ctx.render(&result?).await;
    Ok(())
}

/// Set a line item's quantity.
pub async fn update(line_id: &str, quantity: u32) -> Result<(), CliError> {
    let mut ctx = Context::build()?;

    // Populate local state first so the optimistic path mirrors the UI.
    ctx.coordinator.refresh().await?;

    let result = ctx
        .coordinator
        .update_item(LineItemId::from(line_id), quantity)
        .await;
    ctx.drain_notifications();
    ctx.render(&result?).await;
    Ok(())
}

/// Remove a line item.
pub async fn remove(line_id: &str) -> Result<(), CliError> {
    let mut ctx = Context::build()?;
    ctx.coordinator.refresh().await?;

    let result = ctx.coordinator.remove_item(LineItemId::from(line_id)).await;
    ctx.drain_notifications();
    ctx.render(&result?).await;
    Ok(())
}

/// Clear the cart.
pub async fn clear() -> Result<(), CliError> {
    let mut ctx = Context::build()?;
    let result = ctx.coordinator.clear().await;
    ctx.drain_notifications();
    ctx.render(&result?).await;
    Ok(())
}

//! Display-ready cart derivation.
//!
//! Pure and synchronous; re-derivable from canonical state at any time.

use rust_decimal::Decimal;

use pasar_core::{LineItemId, Price, ProductId};

use super::state::CartState;

/// One display row of the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartRowView {
    pub line_id: LineItemId,
    pub product_id: ProductId,
    pub title: String,
    pub image_url: Option<String>,
    pub shop_name: Option<String>,
    pub shop_slug: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// Display data for the whole cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub rows: Vec<CartRowView>,
    /// Server-supplied total when the canonical state carries one, else
    /// the derived total. Authoritative for display.
    pub grand_total: Price,
    /// Always the locally derived sum of line totals; the value for any
    /// client-side arithmetic before the next server round-trip.
    pub computed_total: Price,
    /// Total units across all rows (the cart badge).
    pub item_count: u32,
}

impl CartView {
    /// An empty view.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            grand_total: Price::zero(),
            computed_total: Price::zero(),
            item_count: 0,
        }
    }

    /// Derive display rows and totals from canonical state.
    #[must_use]
    pub fn derive(cart: &CartState) -> Self {
        let rows = cart
            .items
            .iter()
            .map(|item| {
                let line_total = item.line_total();
                // Guard against a divide-by-zero if a zero-quantity row
                // ever reaches derivation.
                let unit_price =
                    Price::new(line_total.amount() / Decimal::from(item.quantity.max(1)));
                let detail = item.detail.as_ref();
                CartRowView {
                    line_id: item.id.clone(),
                    product_id: item.product_id,
                    title: detail.map_or_else(|| "Product".to_string(), |d| d.title.clone()),
                    image_url: detail.and_then(|d| d.image_url.clone()),
                    shop_name: detail.and_then(|d| d.shop_name.clone()),
                    shop_slug: detail.and_then(|d| d.shop_slug.clone()),
                    quantity: item.quantity,
                    unit_price,
                    line_total,
                }
            })
            .collect();

        let computed_total = cart.computed_total();
        Self {
            rows,
            grand_total: cart.grand_total.unwrap_or(computed_total),
            computed_total,
            item_count: cart.item_count(),
        }
    }
}

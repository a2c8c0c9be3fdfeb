//! Canonical cart state.
//!
//! Every component reads and writes this one representation; raw backend
//! shapes never leave the normalization boundary.

use serde::{Deserialize, Serialize};

use pasar_core::{LineItemId, Price, ProductId, ShopId};

/// Presentation detail for a product referenced by a line item.
///
/// Transient enrichment: rebuilt from server truth on each hydration pass,
/// never authoritative cart data. `live_price` is the product's current
/// price for display only; it never overwrites the line item's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub title: String,
    pub image_url: Option<String>,
    pub shop_id: Option<ShopId>,
    pub shop_name: Option<String>,
    pub shop_slug: Option<String>,
    pub live_price: Option<Price>,
}

/// One product+quantity entry within the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Server-assigned ID, or a provisional `temp-` ID while an optimistic
    /// add is in flight.
    pub id: LineItemId,
    pub product_id: ProductId,
    /// Always >= 1 in canonical state; 0 means removal, never a stored row.
    pub quantity: u32,
    /// Price captured when the item entered the cart or was last refreshed.
    pub unit_price: Price,
    /// Absent until normalization finds embedded product data or the
    /// hydrator fills it.
    pub detail: Option<ProductDetail>,
}

impl CartLineItem {
    /// Snapshot price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// The normalized in-memory cart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartState {
    /// Ordered line items; IDs are unique within the cart.
    pub items: Vec<CartLineItem>,
    /// Server-supplied total, when the payload carried one. The derived
    /// total ([`Self::computed_total`]) is the fallback source of truth.
    pub grand_total: Option<Price>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line totals, always recomputable from the items.
    #[must_use]
    pub fn computed_total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Total number of units across all line items (the cart badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Look up a line item by ID.
    #[must_use]
    pub fn line(&self, id: &LineItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Mutable lookup by ID.
    pub fn line_mut(&mut self, id: &LineItemId) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Find the line item referencing a product, if any.
    #[must_use]
    pub fn line_for_product(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }
}

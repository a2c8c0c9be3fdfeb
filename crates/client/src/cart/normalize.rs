//! The single normalization boundary for raw backend payloads.
//!
//! The cart endpoint has shipped three payload generations: a flat item
//! array with embedded product sub-objects, a shop-grouped structure with
//! per-group subtotals, and a legacy flat shape with divergent field names
//! (`qty` / `quantity`, `price` / `priceSnapshot`). All shape-specific
//! parsing lives here; every other component consumes only [`CartState`].
//!
//! Coercion is deliberately lenient: a priced-wrong row is less harmful
//! than a crashed cart. Quantities default to 1 when present but
//! unparsable and drop the row when absent or zero; prices default to
//! zero; titles fall back `title -> name -> "Product"`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use pasar_core::{LineItemId, Price, ProductId, ShopId};

use super::state::{CartLineItem, CartState, ProductDetail};

// =============================================================================
// Raw shapes
// =============================================================================

/// A cart payload in any recognized backend shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawCart {
    /// Shop-grouped shape: `{ groups: [...], grandTotal }`.
    Grouped(RawGroupedCart),
    /// Flat shapes, current and legacy: `{ items: [...], grandTotal? }`.
    Flat(RawFlatCart),
}

#[derive(Debug, Deserialize)]
pub struct RawGroupedCart {
    pub groups: Vec<RawShopGroup>,
    #[serde(default, rename = "grandTotal")]
    pub grand_total: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawFlatCart {
    pub items: Vec<RawLineItem>,
    #[serde(default, rename = "grandTotal")]
    pub grand_total: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawShopGroup {
    #[serde(default)]
    pub shop: Option<RawShop>,
    #[serde(default)]
    pub items: Vec<RawLineItem>,
}

#[derive(Debug, Deserialize)]
pub struct RawShop {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A line item in any recognized shape.
///
/// Grouped and current-flat items embed a `product` sub-object; the legacy
/// shape inlines `productId`, `title`, `price`, and `image` on the item.
#[derive(Debug, Deserialize)]
pub struct RawLineItem {
    pub id: Value,
    #[serde(default, alias = "qty")]
    pub quantity: Option<Value>,
    #[serde(default, rename = "productId")]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub product: Option<RawProduct>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "priceSnapshot")]
    pub price: Option<Value>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "priceSnapshot")]
    pub price: Option<Value>,
    #[serde(default, rename = "imageUrl", alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub shop: Option<RawShop>,
}

/// The product detail endpoint's payload.
///
/// Newer backends send flat `shopId`/`shopName`/`shopSlug` fields; older
/// ones nest a `shop` object.
#[derive(Debug, Deserialize)]
pub struct RawProductDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "imageUrl", alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default, rename = "shopId")]
    pub shop_id: Option<Value>,
    #[serde(default, rename = "shopName")]
    pub shop_name: Option<String>,
    #[serde(default, rename = "shopSlug")]
    pub shop_slug: Option<String>,
    #[serde(default)]
    pub shop: Option<RawShop>,
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize a raw cart payload into canonical state.
///
/// Pure except for dropped-row warnings. Item order is preserved; grouped
/// payloads are flattened group by group.
#[must_use]
pub fn normalize(raw: RawCart) -> CartState {
    match raw {
        RawCart::Grouped(grouped) => {
            let mut items = Vec::new();
            for group in grouped.groups {
                let shop = group.shop;
                for raw_item in group.items {
                    if let Some(item) = normalize_item(raw_item, shop.as_ref()) {
                        items.push(item);
                    }
                }
            }
            CartState {
                items,
                grand_total: coerce_total(grouped.grand_total.as_ref()),
            }
        }
        RawCart::Flat(flat) => CartState {
            grand_total: coerce_total(flat.grand_total.as_ref()),
            items: flat
                .items
                .into_iter()
                .filter_map(|raw_item| normalize_item(raw_item, None))
                .collect(),
        },
    }
}

/// Normalize a product detail payload.
#[must_use]
pub fn normalize_product_detail(raw: RawProductDetail) -> ProductDetail {
    let shop = raw.shop.as_ref();
    ProductDetail {
        shop_id: raw
            .shop_id
            .as_ref()
            .and_then(coerce_i64)
            .or_else(|| shop.and_then(|s| s.id.as_ref()).and_then(coerce_i64))
            .map(ShopId::new),
        shop_name: raw
            .shop_name
            .clone()
            .or_else(|| shop.and_then(|s| s.name.clone())),
        shop_slug: raw
            .shop_slug
            .clone()
            .or_else(|| shop.and_then(|s| s.slug.clone())),
        live_price: raw.price.as_ref().and_then(coerce_decimal).map(Price::new),
        title: raw
            .title
            .or(raw.name)
            .unwrap_or_else(|| "Product".to_string()),
        image_url: raw
            .image_url
            .or_else(|| raw.images.and_then(|images| images.into_iter().next())),
    }
}

fn normalize_item(raw: RawLineItem, group_shop: Option<&RawShop>) -> Option<CartLineItem> {
    let Some(id) = coerce_line_id(&raw.id) else {
        warn!("line item without a usable id dropped");
        return None;
    };

    // Absent quantity coerces to 0, which means the row must not exist.
    let quantity = raw.quantity.as_ref().map_or(0, coerce_quantity);
    if quantity == 0 {
        return None;
    }

    let product = raw.product.as_ref();
    let product_ref = product.and_then(|p| p.id.as_ref()).or(raw.product_id.as_ref());
    let Some(product_id) = product_ref.and_then(coerce_i64).map(ProductId::new) else {
        warn!(line_id = %id, "line item without a product reference dropped");
        return None;
    };

    let unit_price = product
        .and_then(|p| p.price.as_ref())
        .or(raw.price.as_ref())
        .and_then(coerce_decimal)
        .map_or_else(Price::zero, Price::new);

    let detail = embedded_detail(&raw, group_shop);

    Some(CartLineItem {
        id,
        product_id,
        quantity,
        unit_price,
        detail,
    })
}

/// Build presentation detail from data embedded in the cart payload.
///
/// Returns `None` when the payload carries no presentation signal at all
/// (e.g. a minimal mutation echo), leaving the item for the hydrator.
fn embedded_detail(raw: &RawLineItem, group_shop: Option<&RawShop>) -> Option<ProductDetail> {
    let product = raw.product.as_ref();
    let shop = group_shop.or_else(|| product.and_then(|p| p.shop.as_ref()));

    let title = product
        .and_then(|p| p.title.clone().or_else(|| p.name.clone()))
        .or_else(|| raw.title.clone())
        .or_else(|| raw.name.clone());

    let image_url = product
        .and_then(|p| {
            p.image_url
                .clone()
                .or_else(|| p.images.as_ref().and_then(|images| images.first().cloned()))
        })
        .or_else(|| raw.image.clone())
        .or_else(|| raw.images.as_ref().and_then(|images| images.first().cloned()));

    if title.is_none() && image_url.is_none() && product.is_none() && shop.is_none() {
        return None;
    }

    Some(ProductDetail {
        title: title.unwrap_or_else(|| "Product".to_string()),
        image_url,
        shop_id: shop
            .and_then(|s| s.id.as_ref())
            .and_then(coerce_i64)
            .map(ShopId::new),
        shop_name: shop.and_then(|s| s.name.clone()),
        shop_slug: shop.and_then(|s| s.slug.clone()),
        live_price: None,
    })
}

// =============================================================================
// Coercion helpers
// =============================================================================

/// Parse a JSON number or numeric string into an exact decimal.
fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Quantity coercion: present-but-unparsable defaults to 1; negative and
/// fractional values truncate toward zero.
fn coerce_quantity(value: &Value) -> u32 {
    coerce_decimal(value).map_or(1, |d| {
        if d <= Decimal::ZERO {
            0
        } else {
            d.trunc().to_u32().unwrap_or(u32::MAX)
        }
    })
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_line_id(value: &Value) -> Option<LineItemId> {
    match value {
        Value::Number(n) => Some(LineItemId::new(n.to_string())),
        Value::String(s) if !s.is_empty() => Some(LineItemId::new(s.clone())),
        _ => None,
    }
}

/// A grand total is only trusted when it is present and numeric.
fn coerce_total(value: Option<&Value>) -> Option<Price> {
    value.and_then(coerce_decimal).map(Price::new)
}

//! REST gateway for the Pasar cart backend.
//!
//! Wraps `reqwest` with bearer authentication, envelope peeling, and
//! error-message extraction. Read operations degrade to an empty cart on
//! unrecognizable payloads; mutations treat the same condition as a hard
//! failure, because an unparsable success cannot be trusted to reflect
//! server state.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{instrument, warn};
use url::Url;

use pasar_core::{LineItemId, ProductId};

use crate::cart::normalize::{self, RawCart, RawProductDetail};
use crate::cart::{CartState, ProductDetail};
use crate::config::ClientConfig;

use super::{ApiError, CartApi};

/// Client for the Pasar cart and product REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct CartGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: Url,
    token: secrecy::SecretString,
}

impl CartGateway {
    /// Create a new gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("pasar-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.api_url.clone(),
                token: config.api_token.clone(),
            }),
        })
    }

    /// Build a request URL by appending path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut parts) = url.path_segments_mut() {
            parts.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and return the peeled JSON payload.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] on transport failure
    /// - [`ApiError::Server`] on a non-2xx status, with the message
    ///   extracted from the body when present
    /// - [`ApiError::Malformed`] if the body is not valid JSON
    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(self.inner.token.expose_secret());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "backend returned non-success status"
            );
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: extract_message(&text, status.as_u16()),
            });
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::Malformed(format!("invalid JSON body: {e}")))?;
        Ok(peel_envelope(value))
    }

    /// Strictly parse a mutation response into canonical state.
    fn parse_cart(value: Value, context: &str) -> Result<CartState, ApiError> {
        let raw: RawCart = serde_json::from_value(value)
            .map_err(|e| ApiError::Malformed(format!("{context}: {e}")))?;
        Ok(normalize::normalize(raw))
    }
}

impl CartApi for CartGateway {
    /// Fetch the current cart.
    ///
    /// An unrecognizable payload is logged and treated as an empty cart;
    /// an empty cart is always a safe fallback for display purposes.
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<CartState, ApiError> {
        let url = self.endpoint(&["cart"]);
        match self.request(Method::GET, url, None).await {
            Ok(value) => match serde_json::from_value::<RawCart>(value) {
                Ok(raw) => Ok(normalize::normalize(raw)),
                Err(err) => {
                    warn!(error = %err, "unrecognized cart payload; falling back to empty cart");
                    Ok(CartState::default())
                }
            },
            Err(ApiError::Malformed(err)) => {
                warn!(error = %err, "unparsable cart body; falling back to empty cart");
                Ok(CartState::default())
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<CartState, ApiError> {
        let url = self.endpoint(&["cart", "items"]);
        let body = serde_json::json!({ "productId": product_id, "quantity": quantity });
        let value = self.request(Method::POST, url, Some(&body)).await?;
        Self::parse_cart(value, "add item response")
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn update_item(&self, line_id: &LineItemId, quantity: u32) -> Result<CartState, ApiError> {
        let url = self.endpoint(&["cart", "items", line_id.as_str()]);
        let body = serde_json::json!({ "quantity": quantity });
        let value = self.request(Method::PATCH, url, Some(&body)).await?;
        Self::parse_cart(value, "update item response")
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_item(&self, line_id: &LineItemId) -> Result<CartState, ApiError> {
        let url = self.endpoint(&["cart", "items", line_id.as_str()]);
        let value = self.request(Method::DELETE, url, None).await?;
        Self::parse_cart(value, "remove item response")
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<CartState, ApiError> {
        let url = self.endpoint(&["cart"]);
        let value = self.request(Method::DELETE, url, None).await?;
        Self::parse_cart(value, "clear cart response")
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn product_detail(&self, product_id: ProductId) -> Result<ProductDetail, ApiError> {
        let url = self.endpoint(&["products", &product_id.to_string()]);
        let value = self.request(Method::GET, url, None).await?;
        let raw: RawProductDetail = serde_json::from_value(value)
            .map_err(|e| ApiError::Malformed(format!("product detail response: {e}")))?;
        Ok(normalize::normalize_product_detail(raw))
    }
}

/// Peel the backend's `{ success, message, data }` envelope.
///
/// Some backend versions double-wrap (`data.data`); peel at most two
/// levels, and never peel an object that already looks like a cart.
fn peel_envelope(value: Value) -> Value {
    let mut value = value;
    for _ in 0..2 {
        let is_envelope = value.as_object().is_some_and(|obj| {
            obj.contains_key("data") && !obj.contains_key("items") && !obj.contains_key("groups")
        });
        if !is_envelope {
            break;
        }
        let Value::Object(mut obj) = value else {
            break;
        };
        value = obj.remove("data").unwrap_or(Value::Null);
    }
    value
}

/// Extract a human-readable message from an error body.
///
/// Looks for `message` then `error` string fields; falls back to a generic
/// message carrying the status code.
fn extract_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str)
                && !msg.is_empty()
            {
                return msg.to_string();
            }
        }
    }
    format!("request failed: {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gateway(base: &str) -> CartGateway {
        let config = ClientConfig::new(
            Url::parse(base).expect("valid test url"),
            secrecy::SecretString::from("test-token".to_string()),
        );
        CartGateway::new(&config).expect("client construction should not fail")
    }

    #[test]
    fn endpoint_appends_segments() {
        let gateway = test_gateway("https://api.pasar.dev");
        assert_eq!(
            gateway.endpoint(&["cart", "items", "7"]).as_str(),
            "https://api.pasar.dev/cart/items/7"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_and_path_prefix() {
        let gateway = test_gateway("https://api.pasar.dev/v1/");
        assert_eq!(
            gateway.endpoint(&["cart"]).as_str(),
            "https://api.pasar.dev/v1/cart"
        );
    }

    #[test]
    fn peels_single_envelope() {
        let value = serde_json::json!({
            "success": true,
            "message": "OK",
            "data": { "items": [] }
        });
        assert_eq!(peel_envelope(value), serde_json::json!({ "items": [] }));
    }

    #[test]
    fn peels_double_envelope() {
        let value = serde_json::json!({
            "success": true,
            "message": "OK",
            "data": { "data": { "groups": [], "grandTotal": 0 } }
        });
        assert_eq!(
            peel_envelope(value),
            serde_json::json!({ "groups": [], "grandTotal": 0 })
        );
    }

    #[test]
    fn does_not_peel_a_bare_cart() {
        let value = serde_json::json!({ "items": [], "grandTotal": 10 });
        assert_eq!(peel_envelope(value.clone()), value);
    }

    #[test]
    fn extracts_message_field() {
        assert_eq!(
            extract_message(r#"{"success":false,"message":"Out of stock"}"#, 409),
            "Out of stock"
        );
    }

    #[test]
    fn extracts_error_field_when_message_is_absent() {
        assert_eq!(
            extract_message(r#"{"error":"Cart not found"}"#, 404),
            "Cart not found"
        );
    }

    #[test]
    fn falls_back_to_generic_message() {
        assert_eq!(extract_message("<html>oops</html>", 502), "request failed: 502");
        assert_eq!(extract_message(r#"{"message":""}"#, 500), "request failed: 500");
    }
}

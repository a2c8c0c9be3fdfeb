//! Remote cart API: the gateway and its error taxonomy.
//!
//! # Architecture
//!
//! - [`CartApi`] is the narrow seam the rest of the library consumes; tests
//!   implement it with in-memory fakes
//! - [`CartGateway`] implements it over the Pasar REST backend with
//!   `reqwest`
//! - Response shapes vary across backend versions; the gateway peels the
//!   `{ success, message, data }` envelope and hands raw payloads to the
//!   normalizer, never to callers

mod gateway;

pub use gateway::CartGateway;

use std::future::Future;

use thiserror::Error;

use pasar_core::{LineItemId, ProductId};

use crate::cart::{CartState, ProductDetail};

/// Errors that can occur when talking to the Pasar backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never completed (DNS, connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status.
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, or a generic fallback.
        message: String,
    },

    /// Response body did not match any recognized shape.
    ///
    /// Only mutations surface this; reads fall back to an empty cart.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// The message shown to the user when this error settles a mutation.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Request failed. Check your connection and try again.".to_string(),
            Self::Server { message, .. } => message.clone(),
            Self::Malformed(_) => "The server returned an unexpected response.".to_string(),
        }
    }
}

/// The remote cart operations the consistency core is built on.
///
/// Implemented by [`CartGateway`] for the real backend and by in-memory
/// fakes in tests. Every cart operation returns the server's current view
/// of the cart, already normalized.
pub trait CartApi: Send + Sync {
    /// Fetch the current cart.
    fn fetch_cart(&self) -> impl Future<Output = Result<CartState, ApiError>> + Send;

    /// Add `quantity` of a product to the cart.
    fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartState, ApiError>> + Send;

    /// Set the quantity of an existing line item.
    fn update_item(
        &self,
        line_id: &LineItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartState, ApiError>> + Send;

    /// Remove a line item.
    fn remove_item(
        &self,
        line_id: &LineItemId,
    ) -> impl Future<Output = Result<CartState, ApiError>> + Send;

    /// Remove every line item.
    fn clear_cart(&self) -> impl Future<Output = Result<CartState, ApiError>> + Send;

    /// Fetch presentation detail for a product.
    fn product_detail(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<ProductDetail, ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_its_message() {
        let err = ApiError::Server {
            status: 409,
            message: "Insufficient stock".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient stock");
        assert_eq!(err.user_message(), "Insufficient stock");
    }

    #[test]
    fn malformed_error_keeps_detail_out_of_the_user_message() {
        let err = ApiError::Malformed("missing field `items`".to_string());
        assert_eq!(err.to_string(), "Malformed response: missing field `items`");
        assert_eq!(
            err.user_message(),
            "The server returned an unexpected response."
        );
    }
}

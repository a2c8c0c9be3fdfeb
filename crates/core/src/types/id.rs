//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Line-item IDs are
//! string-backed because the backend assigns them opaquely and the client
//! mints provisional IDs for optimistic inserts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use pasar_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new(1);
/// let order_id = OrderId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(ShopId);

/// Identifier of a single line item within a cart.
///
/// Server-assigned IDs are opaque strings (some backend versions send
/// numbers, which are stringified at the normalization boundary).
/// Provisional IDs are minted client-side for optimistic inserts and carry
/// a `temp-` prefix; they are discarded when the server-confirmed cart
/// replaces the optimistic state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(String);

impl LineItemId {
    /// Create an ID from a server-assigned value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a provisional ID for an optimistically inserted line item.
    ///
    /// The uuid suffix keeps two concurrent optimistic adds from colliding.
    #[must_use]
    pub fn provisional() -> Self {
        Self(format!("temp-{}", Uuid::new_v4()))
    }

    /// Whether this ID was minted client-side and not yet server-confirmed.
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with("temp-")
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ::core::fmt::Display for LineItemId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LineItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for LineItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for LineItemId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_round_trips_through_i64() {
        let id = ProductId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(ProductId::from(42), id);
    }

    #[test]
    fn line_item_id_stringifies_numeric_server_ids() {
        let id = LineItemId::from(7);
        assert_eq!(id.as_str(), "7");
        assert!(!id.is_provisional());
    }

    #[test]
    fn provisional_ids_are_unique_and_flagged() {
        let a = LineItemId::provisional();
        let b = LineItemId::provisional();
        assert!(a.is_provisional());
        assert!(b.is_provisional());
        assert_ne!(a, b);
    }

    #[test]
    fn ids_serialize_transparently() {
        let product = serde_json::to_string(&ProductId::new(9)).expect("serialize");
        assert_eq!(product, "9");

        let line = serde_json::to_string(&LineItemId::from("7")).expect("serialize");
        assert_eq!(line, "\"7\"");
    }
}

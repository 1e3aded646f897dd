//! Newtype identifiers for fitting room lookups.
//!
//! Use the `define_id!` macro to create type-safe string wrappers that prevent
//! accidentally passing an EAN where a product id is expected.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe string identifier.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use fitting_room_core::define_id;
/// define_id!(ProductId);
/// define_id!(Ean);
///
/// let product = ProductId::new("42");
/// let ean = Ean::new("42");
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = ean;
/// assert_eq!(product.as_str(), ean.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Product id assigned by the fitting room service (from the `product_id`
// query parameter of a resolved fitting room URL).
define_id!(ProductId);

// European Article Number used to look up the fitting room URL.
define_id!(Ean);

/// Kind of fitting room button a URL is resolved for.
///
/// The remote service keys its button URLs by a small numeric type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonTypeId(u32);

impl ButtonTypeId {
    /// The "view in fitting room" button type.
    pub const VIEW: Self = Self(1);

    /// Create a new button type id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl Default for ButtonTypeId {
    fn default() -> Self {
        Self::VIEW
    }
}

impl fmt::Display for ButtonTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ButtonTypeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

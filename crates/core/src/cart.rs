//! Server-reported fitting room membership.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Cached copy of the remote fitting room cart.
///
/// The cache is only ever replaced wholesale from a fetched product list; there
/// is no insert or remove. An add or remove is reflected here only once the
/// follow-up fetch reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    members: BTreeSet<ProductId>,
}

impl CartState {
    /// Build the cache from the product ids returned by the cart endpoint.
    #[must_use]
    pub fn from_fetched(products: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            members: products.into_iter().collect(),
        }
    }

    /// Whether the given product is in the fitting room.
    ///
    /// An unresolved product (`None`) is never a member.
    #[must_use]
    pub fn contains(&self, product: Option<&ProductId>) -> bool {
        product.is_some_and(|id| self.members.contains(id))
    }
}

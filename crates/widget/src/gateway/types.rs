//! Request and response bodies for the fitting room API.

use fitting_room_core::ProductId;
use serde::{Deserialize, Serialize};
use url::Url;

use super::GatewayError;

/// Query parameter carrying the product id in a fitting room URL.
const PRODUCT_ID_PARAM: &str = "product_id";

/// `POST /login` body. The API calls the email field `username`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreditsCheckResponse {
    #[serde(default)]
    pub credits_check: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RetrieveUrlResponse {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartResponse {
    #[serde(default)]
    pub products: Option<Vec<ProductId>>,
}

/// Body of both cart mutations.
#[derive(Debug, Serialize)]
pub(crate) struct CartMutationRequest<'a> {
    pub products: &'a [ProductId],
}

/// A resolved fitting room URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittingRoomLink {
    /// URL exactly as returned by the API.
    pub url: String,
    /// The `product_id` query parameter of the URL, if present.
    pub product_id: Option<ProductId>,
}

impl FittingRoomLink {
    /// Parse a URL returned by `/retrieve-url-button`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Parse` if the URL is not absolute.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let parsed = Url::parse(raw)
            .map_err(|e| GatewayError::Parse(format!("invalid fitting room url: {e}")))?;

        let product_id = parsed
            .query_pairs()
            .find(|(key, _)| key == PRODUCT_ID_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .map(ProductId::from);

        Ok(Self {
            url: raw.to_owned(),
            product_id,
        })
    }
}

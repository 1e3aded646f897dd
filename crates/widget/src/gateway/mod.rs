//! Remote fitting room API.
//!
//! # Operations
//!
//! ```text
//! POST   /login               - Exchange email/password for a bearer token
//! GET    /credits_check       - Domain-level entitlement check
//! GET    /retrieve-url-button - Resolve the fitting room URL for an EAN
//! GET    /fitting_room_cart   - Product ids in the shopper's fitting room (bearer)
//! POST   /add-to-cart         - Add product ids (bearer)
//! DELETE /remove-from-cart    - Remove product ids (bearer)
//! ```
//!
//! Every call is a single attempt. A call either succeeds, reports
//! [`GatewayError::AuthRequired`] (HTTP 401), or fails with one of the other
//! [`GatewayError`] variants. Nothing here retries.

mod client;
pub mod types;

use std::future::Future;

use fitting_room_core::{AuthToken, ButtonTypeId, Ean, Email, ProductId};
use secrecy::SecretString;
use thiserror::Error;

pub use client::HttpGateway;
pub use types::FittingRoomLink;

/// Errors that can occur when calling the fitting room API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The API rejected the bearer token (HTTP 401).
    #[error("Authentication required")]
    AuthRequired,

    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a status the operation does not accept.
    #[error("Unexpected status {status} from {operation}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },

    /// The response body could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An endpoint URL could not be built from the base endpoint.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

impl GatewayError {
    /// Whether the caller should prompt for login.
    #[must_use]
    pub const fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

/// The operations the session controller needs from the fitting room API.
///
/// Implemented over HTTP by [`HttpGateway`]; tests substitute in-memory fakes.
/// Authenticated operations take the token explicitly so the gateway never
/// reads ambient session state.
pub trait FittingRoomApi: Send + Sync {
    /// Log in. `Ok(None)` means the response carried no token.
    fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<Option<AuthToken>, GatewayError>> + Send;

    /// Whether the domain has fitting room credits available.
    fn credits_check(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<bool, GatewayError>> + Send;

    /// Resolve the fitting room URL for a product. `Ok(None)` when the
    /// response has no URL.
    fn resolve_fitting_room_url(
        &self,
        ean: &Ean,
        button_type: ButtonTypeId,
    ) -> impl Future<Output = Result<Option<FittingRoomLink>, GatewayError>> + Send;

    /// Product ids in the fitting room. `Ok(None)` when the response has no
    /// product list.
    fn fetch_cart(
        &self,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Option<Vec<ProductId>>, GatewayError>> + Send;

    /// Add products, optionally attributing the request to an origin page.
    fn add_to_cart(
        &self,
        token: &AuthToken,
        products: &[ProductId],
        origin: Option<&str>,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Remove products.
    fn remove_from_cart(
        &self,
        token: &AuthToken,
        products: &[ProductId],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

//! HTTP implementation of the fitting room API.

use std::sync::Arc;

use fitting_room_core::{AuthToken, ButtonTypeId, Ean, Email, ProductId};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::types::{
    CartMutationRequest, CartResponse, CreditsCheckResponse, FittingRoomLink, LoginRequest,
    LoginResponse, RetrieveUrlResponse,
};
use super::{FittingRoomApi, GatewayError};
use crate::config::ApiConfig;

/// Client for the fitting room API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    /// Base endpoint without a trailing slash.
    base: String,
}

impl HttpGateway {
    /// Create a new fitting room API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpGatewayInner {
                client,
                base: config
                    .base_endpoint
                    .as_str()
                    .trim_end_matches('/')
                    .to_owned(),
            }),
        })
    }

    /// Build an absolute URL for an API path.
    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(Url::parse(&format!("{}/{path}", self.inner.base))?)
    }

    /// Map 401 and non-success statuses to errors.
    fn check_status(operation: &'static str, status: StatusCode) -> Result<(), GatewayError> {
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::AuthRequired);
        }
        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Read a JSON body, reporting malformed bodies as parse errors.
    async fn read_json<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(
                operation,
                body = %text.chars().take(200).collect::<String>(),
                "Fitting room API returned an unreadable body"
            );
            GatewayError::Parse(format!("{operation}: {e}"))
        })
    }
}

impl FittingRoomApi for HttpGateway {
    #[instrument(skip_all, fields(email = %email))]
    async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Option<AuthToken>, GatewayError> {
        let body = LoginRequest {
            username: email.as_str(),
            password: password.expose_secret(),
        };

        let response = self
            .inner
            .client
            .post(self.endpoint("login")?)
            .json(&body)
            .send()
            .await?;

        // A rejected login is reported in the body (no token), whatever the status.
        let status = response.status();
        let body: LoginResponse = Self::read_json("login", response).await?;
        let token = body.access_token.and_then(AuthToken::new);
        if token.is_none() {
            tracing::info!(status = %status, "Login response carried no access token");
        }
        Ok(token)
    }

    #[instrument(skip(self))]
    async fn credits_check(&self, domain: &str) -> Result<bool, GatewayError> {
        let mut url = self.endpoint("credits_check")?;
        url.query_pairs_mut().append_pair("domain", domain);

        let response = self.inner.client.get(url).send().await?;
        Self::check_status("credits_check", response.status())?;

        let body: CreditsCheckResponse = Self::read_json("credits_check", response).await?;
        Ok(body.credits_check.unwrap_or(false))
    }

    #[instrument(skip_all, fields(ean = %ean, button_type = %button_type))]
    async fn resolve_fitting_room_url(
        &self,
        ean: &Ean,
        button_type: ButtonTypeId,
    ) -> Result<Option<FittingRoomLink>, GatewayError> {
        let mut url = self.endpoint("retrieve-url-button")?;
        url.query_pairs_mut()
            .append_pair("ean", ean.as_str())
            .append_pair("button_type_id", &button_type.to_string());

        let response = self.inner.client.get(url).send().await?;
        Self::check_status("retrieve_url_button", response.status())?;

        let body: RetrieveUrlResponse = Self::read_json("retrieve_url_button", response).await?;
        match body.url.filter(|url| !url.is_empty()) {
            Some(url) => FittingRoomLink::parse(&url).map(Some),
            None => {
                tracing::info!("No fitting room url for product");
                Ok(None)
            }
        }
    }

    #[instrument(skip_all)]
    async fn fetch_cart(&self, token: &AuthToken) -> Result<Option<Vec<ProductId>>, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("fitting_room_cart")?)
            .header(AUTHORIZATION, token.bearer_header())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::check_status("fitting_room_cart", response.status())?;

        let body: CartResponse = Self::read_json("fitting_room_cart", response).await?;
        Ok(body.products)
    }

    #[instrument(skip_all, fields(products = products.len(), with_origin = origin.is_some()))]
    async fn add_to_cart(
        &self,
        token: &AuthToken,
        products: &[ProductId],
        origin: Option<&str>,
    ) -> Result<(), GatewayError> {
        let url = match origin {
            // Encoded by hand to keep `encodeURIComponent` semantics (`%20`, not `+`).
            Some(origin) => Url::parse(&format!(
                "{}?origin={}",
                self.endpoint("add-to-cart")?,
                urlencoding::encode(origin)
            ))?,
            None => self.endpoint("add-to-cart")?,
        };

        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, token.bearer_header())
            .json(&CartMutationRequest { products })
            .send()
            .await?;

        let status = response.status();
        Self::check_status("add_to_cart", status)?;
        // Only a plain 200 counts as added.
        if status != StatusCode::OK {
            return Err(GatewayError::UnexpectedStatus {
                operation: "add_to_cart",
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    #[instrument(skip_all, fields(products = products.len()))]
    async fn remove_from_cart(
        &self,
        token: &AuthToken,
        products: &[ProductId],
    ) -> Result<(), GatewayError> {
        let response = self
            .inner
            .client
            .delete(self.endpoint("remove-from-cart")?)
            .header(AUTHORIZATION, token.bearer_header())
            .json(&CartMutationRequest { products })
            .send()
            .await?;

        Self::check_status("remove_from_cart", response.status())
    }
}

//! Integration tests for the fitting room widget.
//!
//! Every test runs against an in-process mock of the fitting room API
//! (`httpmock`), so no external services are needed:
//!
//! ```bash
//! cargo test -p fitting-room-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `gateway` - HTTP gateway requests and response mapping
//! - `controller_flow` - session and cart flows through the real gateway
//! - `widget_http` - the served widget driven by a browser-like client

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;

use fitting_room_core::{ButtonTypeId, Ean};
use fitting_room_widget::config::{ApiConfig, ProductConfig, WidgetConfig};
use fitting_room_widget::controller::{FittingRoomController, WidgetSettings};
use fitting_room_widget::gateway::HttpGateway;
use fitting_room_widget::state::AppState;
use fitting_room_widget::token_store::MemoryTokenStore;
use httpmock::MockServer;

/// Page URL the widget reports as `origin`.
pub const PAGE_URL: &str = "http://shop.example.com/products/shirt";

/// EAN the widget looks up.
pub const EAN: &str = "210000013798";

/// Domain sent to the credits check.
pub const CREDITS_DOMAIN: &str = "shop.example.com";

/// API configuration pointing at a mock server.
///
/// # Panics
///
/// Panics if the mock server URL is not a valid endpoint.
#[must_use]
pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig::new(&server.base_url()).expect("mock server url is a valid endpoint")
}

/// Gateway talking to a mock server.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn gateway(server: &MockServer) -> HttpGateway {
    HttpGateway::new(&api_config(server)).expect("http client builds")
}

/// Lookup parameters used by every test widget.
#[must_use]
pub fn settings() -> WidgetSettings {
    WidgetSettings {
        ean: Ean::new(EAN),
        button_type: ButtonTypeId::VIEW,
        credits_domain: CREDITS_DOMAIN.to_string(),
        page_url: PAGE_URL.to_string(),
    }
}

/// Controller over the real gateway with an in-memory token store.
#[must_use]
pub fn controller(
    server: &MockServer,
    tokens: MemoryTokenStore,
) -> FittingRoomController<HttpGateway, MemoryTokenStore> {
    FittingRoomController::new(gateway(server), tokens, settings())
}

/// Serve the widget on an ephemeral port and return its base URL.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn_widget(server: &MockServer) -> String {
    let config = WidgetConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: PAGE_URL.to_string(),
        api: api_config(server),
        product: ProductConfig {
            credits_domain: CREDITS_DOMAIN.to_string(),
            ..ProductConfig::default()
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    let state = AppState::new(config).expect("application state builds");

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(listener, fitting_room_widget::app(state))
            .await
            .expect("widget server runs");
    });

    format!("http://{addr}")
}

//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::config::WidgetConfig;
use crate::controller::{FittingRoomController, WidgetSettings};
use crate::gateway::{GatewayError, HttpGateway};
use crate::token_store::CookieTokenStore;

/// Controller type served by the HTTP shell.
pub type WidgetController = FittingRoomController<HttpGateway, CookieTokenStore>;

/// How long an idle widget session keeps its controller.
const CONTROLLER_IDLE: Duration = Duration::from_secs(30 * 60);

/// Upper bound on live widget sessions.
const MAX_CONTROLLERS: u64 = 10_000;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the shared API client and one
/// controller per browser session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WidgetConfig,
    gateway: HttpGateway,
    controllers: Cache<Uuid, Arc<WidgetController>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: WidgetConfig) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&config.api)?;
        let controllers = Cache::builder()
            .max_capacity(MAX_CONTROLLERS)
            .time_to_idle(CONTROLLER_IDLE)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                controllers,
            }),
        })
    }

    /// Get a reference to the widget configuration.
    #[must_use]
    pub fn config(&self) -> &WidgetConfig {
        &self.inner.config
    }

    /// Get the controller for a widget session, starting one if needed.
    ///
    /// A new controller reads its token from `cookie_header` and loads the
    /// cart before it is returned.
    pub async fn controller(
        &self,
        widget_id: Uuid,
        cookie_header: Option<&str>,
    ) -> Arc<WidgetController> {
        let init = async {
            tracing::debug!(%widget_id, "Starting widget session");
            let tokens =
                CookieTokenStore::from_cookie_header(cookie_header, self.config().is_secure());
            let controller =
                FittingRoomController::new(self.inner.gateway.clone(), tokens, self.settings());
            controller.start().await;
            Arc::new(controller)
        };
        self.inner.controllers.get_with(widget_id, init).await
    }

    fn settings(&self) -> WidgetSettings {
        let config = self.config();
        WidgetSettings {
            ean: config.product.ean.clone(),
            button_type: config.product.button_type,
            credits_domain: config.product.credits_domain.clone(),
            page_url: config.base_url.clone(),
        }
    }
}

//! Session and fitting room cart controller.
//!
//! One controller backs one shopper's widget. It owns the in-memory session
//! (token presence, login prompt), the resolved product id, the cached cart,
//! the toggle configuration and the credit gate, and it drives every remote
//! call through a [`FittingRoomApi`].
//!
//! # Session states
//!
//! ```text
//!   Anonymous ── start() with stored token ─────▶ Authenticated
//!   Anonymous ── add/remove ────────────────────▶ AwaitingLogin
//!   AwaitingLogin ── cancel_login() ────────────▶ Anonymous
//!   AwaitingLogin ── submit_login() ok ─────────▶ Authenticated
//!   Authenticated ── 401 on add/remove ─────────▶ AwaitingLogin
//!   Authenticated ── logout() ──────────────────▶ Anonymous
//! ```
//!
//! A 401 while refreshing the cart at startup drops straight to `Anonymous`
//! without opening the login prompt; only add/remove open it.
//!
//! # Ordering
//!
//! Cart fetches and credit checks may overlap. Each request takes a sequence
//! number before it is sent, and a response is applied only if its number is
//! newer than the last one applied, so the newest request wins regardless of
//! arrival order. Logout and disabling the credit gate advance the applied
//! number to invalidate whatever is still in flight.

use std::sync::atomic::{AtomicU64, Ordering};

use fitting_room_core::{
    AuthToken, ButtonTypeId, CartState, CreditGate, Ean, Email, ProductId, Toggle,
    VisibilityConfig, VisibleActions, resolve_visible_actions,
};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::gateway::{FittingRoomApi, GatewayError};
use crate::navigation::{Navigation, NavigationTarget, append_origin};
use crate::token_store::TokenStore;

/// Alert shown when add/remove is attempted before the product is resolved.
pub const PRODUCT_UNRESOLVED_ALERT: &str =
    "No product id found yet. Click \"View in Fitting Room\" first, then add it.";

/// Alert shown when the login response carries no token.
pub const LOGIN_FAILED_ALERT: &str = "Login failed!";

/// Errors surfaced by controller actions.
///
/// A 401 is not an error here: it moves the session to
/// [`SessionState::AwaitingLogin`] and the action reports
/// [`CartActionOutcome::LoginRequired`].
#[derive(Debug, Error)]
pub enum WidgetError {
    /// The remote call failed; already logged.
    #[error("Network failure: {0}")]
    Network(#[from] GatewayError),

    /// The action cannot run yet; no request was made.
    #[error("Precondition unmet: {0}")]
    PreconditionUnmet(&'static str),

    /// Login did not produce a token.
    #[error("Login rejected")]
    LoginRejected,
}

/// The action that opened the login prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Add,
    Remove,
}

/// Authentication state of the widget session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(AuthToken),
    /// Login prompt open. The pending action is informational only; it is
    /// not resumed after login.
    AwaitingLogin(PendingAction),
}

impl SessionState {
    #[must_use]
    pub const fn token(&self) -> Option<&AuthToken> {
        match self {
            Self::Authenticated(token) => Some(token),
            Self::Anonymous | Self::AwaitingLogin(_) => None,
        }
    }

    #[must_use]
    pub const fn is_awaiting_login(&self) -> bool {
        matches!(self, Self::AwaitingLogin(_))
    }
}

/// Result of an add or remove click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartActionOutcome {
    /// The mutation succeeded and the cart was re-fetched.
    Refreshed { in_cart: bool },
    /// The login prompt is open.
    LoginRequired,
}

/// Per-widget lookup parameters.
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub ean: Ean,
    pub button_type: ButtonTypeId,
    pub credits_domain: String,
    /// URL of the embedding page, sent as the `origin` parameter.
    pub page_url: String,
}

/// Everything the shell needs to render the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub config: VisibilityConfig,
    pub credit_gate: CreditGate,
    pub actions: VisibleActions,
    pub product_id: Option<ProductId>,
    /// Whether the resolved product is in the fitting room ("Remove" vs "Add").
    pub in_cart: bool,
    pub authenticated: bool,
    pub login_open: bool,
    pub alert: Option<String>,
}

impl WidgetView {
    #[must_use]
    pub const fn can_show_view(&self) -> bool {
        self.actions.show_view
    }

    #[must_use]
    pub const fn can_show_add(&self) -> bool {
        self.actions.show_add
    }
}

#[derive(Debug)]
struct ControllerState {
    session: SessionState,
    product: Option<ProductId>,
    cart: CartState,
    cart_applied: u64,
    config: VisibilityConfig,
    credit_gate: CreditGate,
    credit_applied: u64,
    alert: Option<String>,
}

/// Drives one widget session.
pub struct FittingRoomController<G, S> {
    gateway: G,
    tokens: S,
    settings: WidgetSettings,
    state: RwLock<ControllerState>,
    cart_requests: AtomicU64,
    credit_requests: AtomicU64,
}

impl<G, S> FittingRoomController<G, S>
where
    G: FittingRoomApi,
    S: TokenStore,
{
    /// Create a controller in the `Anonymous` state with default toggles.
    ///
    /// Call [`Self::start`] to pick up a stored token.
    #[must_use]
    pub fn new(gateway: G, tokens: S, settings: WidgetSettings) -> Self {
        Self {
            gateway,
            tokens,
            settings,
            state: RwLock::new(ControllerState {
                session: SessionState::Anonymous,
                product: None,
                cart: CartState::default(),
                cart_applied: 0,
                config: VisibilityConfig::default(),
                credit_gate: CreditGate::unchecked(),
                credit_applied: 0,
                alert: None,
            }),
            cart_requests: AtomicU64::new(0),
            credit_requests: AtomicU64::new(0),
        }
    }

    /// The token store this controller persists to.
    pub const fn token_store(&self) -> &S {
        &self.tokens
    }

    /// Read the stored token and, if present, load the cart.
    ///
    /// A 401 on that first fetch leaves the session `Anonymous` without
    /// opening the login prompt. Other failures are logged and keep the
    /// session authenticated.
    #[instrument(skip_all)]
    pub async fn start(&self) {
        let Some(token) = self.tokens.load() else {
            tracing::debug!("No stored token, starting anonymous");
            return;
        };

        self.state.write().await.session = SessionState::Authenticated(token.clone());
        tracing::debug!("Stored token found, loading fitting room cart");

        match self.refresh_cart(&token).await {
            Ok(()) => {}
            Err(e) if e.is_auth_required() => {
                tracing::info!("Stored token rejected, continuing anonymous");
                let mut state = self.state.write().await;
                if state.session.token() == Some(&token) {
                    state.session = SessionState::Anonymous;
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load fitting room cart"),
        }
    }

    /// Current session state.
    pub async fn session(&self) -> SessionState {
        self.state.read().await.session.clone()
    }

    /// Snapshot of the render-facing state. Does not consume the alert.
    pub async fn view(&self) -> WidgetView {
        let state = self.state.read().await;
        Self::view_of(&state)
    }

    /// Snapshot of the render-facing state, consuming the transient alert.
    pub async fn render(&self) -> WidgetView {
        let mut state = self.state.write().await;
        let view = Self::view_of(&state);
        state.alert = None;
        view
    }

    fn view_of(state: &ControllerState) -> WidgetView {
        WidgetView {
            config: state.config,
            credit_gate: state.credit_gate,
            actions: resolve_visible_actions(&state.config, &state.credit_gate),
            product_id: state.product.clone(),
            in_cart: state.cart.contains(state.product.as_ref()),
            authenticated: state.session.token().is_some(),
            login_open: state.session.is_awaiting_login(),
            alert: state.alert.clone(),
        }
    }

    /// Flip a toggle and return the new configuration.
    ///
    /// Enabling the credit gate runs a credits check before returning;
    /// disabling it marks the previous result stale.
    #[instrument(skip(self))]
    pub async fn apply_toggle(&self, toggle: Toggle) -> VisibilityConfig {
        let (before, after) = {
            let mut state = self.state.write().await;
            let before = state.config;
            state.config = before.apply(toggle);
            (before, state.config)
        };

        match (before.credit_gate_enabled(), after.credit_gate_enabled()) {
            (false, true) => self.check_credits().await,
            (true, false) => {
                let seq = self.credit_requests.fetch_add(1, Ordering::SeqCst) + 1;
                let mut state = self.state.write().await;
                state.credit_applied = seq;
                state.credit_gate = CreditGate::unchecked();
            }
            _ => {}
        }

        after
    }

    /// Run the credits check for the configured domain.
    ///
    /// Any failure counts as "no credits".
    async fn check_credits(&self) {
        let seq = self.credit_requests.fetch_add(1, Ordering::SeqCst) + 1;
        let available = match self
            .gateway
            .credits_check(&self.settings.credits_domain)
            .await
        {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(error = %e, "Credits check failed, treating as unavailable");
                false
            }
        };
        self.apply_credit(seq, available).await;
    }

    async fn apply_credit(&self, seq: u64, available: bool) {
        let mut state = self.state.write().await;
        if seq <= state.credit_applied || !state.config.credit_gate_enabled() {
            tracing::debug!(
                seq,
                applied = state.credit_applied,
                "Discarding stale credits check"
            );
            return;
        }
        state.credit_applied = seq;
        state.credit_gate = CreditGate::checked(available);
    }

    /// Resolve the fitting room URL and return where to navigate.
    ///
    /// Records the product id carried by the URL. `Ok(None)` when the API has
    /// no URL for the product.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Network` if the lookup fails.
    #[instrument(skip(self))]
    pub async fn view_in_fitting_room(&self) -> Result<Option<Navigation>, WidgetError> {
        let config = self.state.read().await.config;

        let link = self
            .gateway
            .resolve_fitting_room_url(&self.settings.ean, self.settings.button_type)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to resolve fitting room url"))?;
        let Some(link) = link else {
            return Ok(None);
        };

        if let Some(product_id) = link.product_id {
            tracing::debug!(product_id = %product_id, "Resolved fitting room product");
            self.state.write().await.product = Some(product_id);
        }

        let url = if config.view_includes_origin() {
            append_origin(&link.url, &self.settings.page_url)
        } else {
            link.url
        };

        Ok(Some(Navigation {
            url,
            target: NavigationTarget::from_new_tab(config.view_opens_new_tab()),
        }))
    }

    /// "Add to Fitting Room".
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::PreconditionUnmet` if no product is resolved,
    /// or `WidgetError::Network` if the add or the follow-up fetch fails.
    #[instrument(skip(self))]
    pub async fn add_to_fitting_room(&self) -> Result<CartActionOutcome, WidgetError> {
        self.mutate_cart(PendingAction::Add).await
    }

    /// "Remove from Fitting Room".
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_to_fitting_room`].
    #[instrument(skip(self))]
    pub async fn remove_from_fitting_room(&self) -> Result<CartActionOutcome, WidgetError> {
        self.mutate_cart(PendingAction::Remove).await
    }

    async fn mutate_cart(&self, action: PendingAction) -> Result<CartActionOutcome, WidgetError> {
        let (token, product, config) = {
            let mut state = self.state.write().await;
            let Some(token) = state.session.token().cloned() else {
                state.session = SessionState::AwaitingLogin(action);
                tracing::debug!(?action, "No token, opening login prompt");
                return Ok(CartActionOutcome::LoginRequired);
            };
            let Some(product) = state.product.clone() else {
                state.alert = Some(PRODUCT_UNRESOLVED_ALERT.to_string());
                return Err(WidgetError::PreconditionUnmet(PRODUCT_UNRESOLVED_ALERT));
            };
            (token, product, state.config)
        };

        let products = [product];
        let result = match action {
            PendingAction::Add => {
                let origin = config
                    .add_includes_origin()
                    .then_some(self.settings.page_url.as_str());
                self.gateway.add_to_cart(&token, &products, origin).await
            }
            PendingAction::Remove => self.gateway.remove_from_cart(&token, &products).await,
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_auth_required() => {
                self.prompt_login(&token, action).await;
                return Ok(CartActionOutcome::LoginRequired);
            }
            Err(e) => {
                tracing::error!(error = %e, ?action, "Fitting room update failed");
                return Err(e.into());
            }
        }

        match self.refresh_cart(&token).await {
            Ok(()) => {}
            Err(e) if e.is_auth_required() => {
                self.prompt_login(&token, action).await;
                return Ok(CartActionOutcome::LoginRequired);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh fitting room cart");
                return Err(e.into());
            }
        }

        let state = self.state.read().await;
        Ok(CartActionOutcome::Refreshed {
            in_cart: state.cart.contains(state.product.as_ref()),
        })
    }

    /// Open the login prompt after the API rejected `token`.
    ///
    /// Ignored if the session has moved on to a different token meanwhile.
    async fn prompt_login(&self, token: &AuthToken, action: PendingAction) {
        let mut state = self.state.write().await;
        if state.session.token() == Some(token) {
            tracing::info!(?action, "Token rejected, opening login prompt");
            state.session = SessionState::AwaitingLogin(action);
        }
    }

    /// Fetch the cart and apply it if no newer fetch has been applied.
    async fn refresh_cart(&self, token: &AuthToken) -> Result<(), GatewayError> {
        let seq = self.cart_requests.fetch_add(1, Ordering::SeqCst) + 1;
        let products = self.gateway.fetch_cart(token).await?;
        self.apply_cart(seq, products).await;
        Ok(())
    }

    async fn apply_cart(&self, seq: u64, products: Option<Vec<ProductId>>) {
        let mut state = self.state.write().await;
        if seq <= state.cart_applied {
            tracing::debug!(seq, applied = state.cart_applied, "Discarding stale cart");
            return;
        }
        state.cart_applied = seq;
        match products {
            Some(products) => state.cart = CartState::from_fetched(products),
            None => tracing::debug!("Cart response without products, keeping cached cart"),
        }
    }

    /// Submit the login form.
    ///
    /// On success the token is persisted, the prompt closes and the cart is
    /// loaded. The action that opened the prompt is not retried.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::LoginRejected` for an invalid email or a
    /// response without a token, and `WidgetError::Network` if the request
    /// fails. The prompt stays open in every error case.
    #[instrument(skip(self, password))]
    pub async fn submit_login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), WidgetError> {
        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(e) => {
                tracing::info!(error = %e, "Login form email rejected");
                return Err(self.reject_login().await);
            }
        };

        let token = self
            .gateway
            .login(&email, password)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Login request failed"))?;
        let Some(token) = token else {
            return Err(self.reject_login().await);
        };

        self.tokens.save(&token);
        self.state.write().await.session = SessionState::Authenticated(token.clone());
        tracing::info!("Logged in to fitting room");

        if let Err(e) = self.refresh_cart(&token).await {
            tracing::warn!(error = %e, "Failed to load fitting room cart after login");
        }
        Ok(())
    }

    async fn reject_login(&self) -> WidgetError {
        self.state.write().await.alert = Some(LOGIN_FAILED_ALERT.to_string());
        WidgetError::LoginRejected
    }

    /// Close the login prompt without logging in.
    pub async fn cancel_login(&self) {
        let mut state = self.state.write().await;
        if state.session.is_awaiting_login() {
            state.session = SessionState::Anonymous;
        }
    }

    /// Forget the token and the cached cart.
    ///
    /// Cart responses still in flight are discarded when they arrive.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.tokens.clear();
        let seq = self.cart_requests.fetch_add(1, Ordering::SeqCst) + 1;

        let mut state = self.state.write().await;
        state.session = SessionState::Anonymous;
        state.cart = CartState::default();
        state.cart_applied = seq;
        tracing::info!("Logged out of fitting room");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;

    use super::*;
    use crate::gateway::FittingRoomLink;
    use crate::token_store::MemoryTokenStore;

    /// Scripted gateway: each operation pops its next canned result.
    #[derive(Default)]
    struct FakeGateway {
        logins: Mutex<VecDeque<Result<Option<AuthToken>, GatewayError>>>,
        credits: Mutex<VecDeque<Result<bool, GatewayError>>>,
        links: Mutex<VecDeque<Result<Option<FittingRoomLink>, GatewayError>>>,
        carts: Mutex<VecDeque<Result<Option<Vec<ProductId>>, GatewayError>>>,
        mutations: Mutex<VecDeque<Result<(), GatewayError>>>,
        fetch_calls: AtomicUsize,
        mutation_calls: AtomicUsize,
        login_calls: AtomicUsize,
        last_origin: Mutex<Option<String>>,
        held_fetch: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl FakeGateway {
        fn total_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
                + self.mutation_calls.load(Ordering::SeqCst)
                + self.login_calls.load(Ordering::SeqCst)
        }

        fn push_cart(&self, products: &[&str]) {
            self.carts.lock().unwrap().push_back(Ok(Some(
                products.iter().copied().map(ProductId::from).collect(),
            )));
        }

        fn push_link(&self, url: &str) {
            self.links
                .lock()
                .unwrap()
                .push_back(Ok(Some(FittingRoomLink::parse(url).unwrap())));
        }
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T, GatewayError>>>) -> Result<T, GatewayError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Parse("unscripted call".to_string())))
    }

    impl FittingRoomApi for FakeGateway {
        async fn login(
            &self,
            _email: &Email,
            _password: &SecretString,
        ) -> Result<Option<AuthToken>, GatewayError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.logins)
        }

        async fn credits_check(&self, _domain: &str) -> Result<bool, GatewayError> {
            pop(&self.credits)
        }

        async fn resolve_fitting_room_url(
            &self,
            _ean: &Ean,
            _button_type: ButtonTypeId,
        ) -> Result<Option<FittingRoomLink>, GatewayError> {
            pop(&self.links)
        }

        async fn fetch_cart(
            &self,
            _token: &AuthToken,
        ) -> Result<Option<Vec<ProductId>>, GatewayError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let result = pop(&self.carts);
            let held = self.held_fetch.lock().unwrap().take();
            if let Some(held) = held {
                let _ = held.await;
            }
            result
        }

        async fn add_to_cart(
            &self,
            _token: &AuthToken,
            _products: &[ProductId],
            origin: Option<&str>,
        ) -> Result<(), GatewayError> {
            self.mutation_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_origin.lock().unwrap() = origin.map(String::from);
            pop(&self.mutations)
        }

        async fn remove_from_cart(
            &self,
            _token: &AuthToken,
            _products: &[ProductId],
        ) -> Result<(), GatewayError> {
            self.mutation_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.mutations)
        }
    }

    type TestController = FittingRoomController<FakeGateway, MemoryTokenStore>;

    fn settings() -> WidgetSettings {
        WidgetSettings {
            ean: Ean::new("210000013798"),
            button_type: ButtonTypeId::VIEW,
            credits_domain: "shop.example.com".to_string(),
            page_url: "https://shop.example.com/p/1".to_string(),
        }
    }

    fn anonymous() -> TestController {
        FittingRoomController::new(FakeGateway::default(), MemoryTokenStore::new(), settings())
    }

    fn with_stored_token() -> TestController {
        FittingRoomController::new(
            FakeGateway::default(),
            MemoryTokenStore::with_token(AuthToken::new("tok").unwrap()),
            settings(),
        )
    }

    async fn resolved(controller: &TestController, product: &str) {
        controller
            .gateway
            .push_link(&format!("https://fit.example.com/room?product_id={product}"));
        controller.view_in_fitting_room().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_without_token_stays_anonymous() {
        let controller = anonymous();
        controller.start().await;
        assert_eq!(controller.session().await, SessionState::Anonymous);
        assert_eq!(controller.gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_start_with_token_loads_cart() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&["p-1"]);
        controller.start().await;

        assert!(controller.session().await.token().is_some());
        assert_eq!(controller.gateway.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_with_rejected_token_goes_anonymous_without_prompt() {
        let controller = with_stored_token();
        controller
            .gateway
            .carts
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::AuthRequired));
        controller.start().await;

        assert_eq!(controller.session().await, SessionState::Anonymous);
        assert!(!controller.view().await.login_open);
    }

    #[tokio::test]
    async fn test_add_without_token_opens_login_without_network() {
        let controller = anonymous();
        let outcome = controller.add_to_fitting_room().await.unwrap();

        assert_eq!(outcome, CartActionOutcome::LoginRequired);
        assert_eq!(
            controller.session().await,
            SessionState::AwaitingLogin(PendingAction::Add)
        );
        assert_eq!(controller.gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_without_product_alerts_without_network() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&[]);
        controller.start().await;

        let err = controller.add_to_fitting_room().await.unwrap_err();
        assert!(matches!(err, WidgetError::PreconditionUnmet(_)));
        assert_eq!(controller.gateway.mutation_calls.load(Ordering::SeqCst), 0);

        let view = controller.render().await;
        assert_eq!(view.alert.as_deref(), Some(PRODUCT_UNRESOLVED_ALERT));
        // Alerts are transient.
        assert!(controller.render().await.alert.is_none());
    }

    #[tokio::test]
    async fn test_add_refreshes_cart_once_and_flips_button() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&[]);
        controller.start().await;
        resolved(&controller, "p-1").await;
        assert!(!controller.view().await.in_cart);

        controller.gateway.mutations.lock().unwrap().push_back(Ok(()));
        controller.gateway.push_cart(&["p-1"]);
        let outcome = controller.add_to_fitting_room().await.unwrap();

        assert_eq!(outcome, CartActionOutcome::Refreshed { in_cart: true });
        assert_eq!(controller.gateway.fetch_calls.load(Ordering::SeqCst), 2);
        assert!(controller.view().await.in_cart);
    }

    #[tokio::test]
    async fn test_add_trusts_server_cart_over_success() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&[]);
        controller.start().await;
        resolved(&controller, "p-1").await;

        controller.gateway.mutations.lock().unwrap().push_back(Ok(()));
        controller.gateway.push_cart(&["other"]);
        let outcome = controller.add_to_fitting_room().await.unwrap();

        assert_eq!(outcome, CartActionOutcome::Refreshed { in_cart: false });
    }

    #[tokio::test]
    async fn test_unauthorized_add_and_remove_open_login() {
        for action in [PendingAction::Add, PendingAction::Remove] {
            let controller = with_stored_token();
            controller.gateway.push_cart(&[]);
            controller.start().await;
            resolved(&controller, "p-1").await;

            controller
                .gateway
                .mutations
                .lock()
                .unwrap()
                .push_back(Err(GatewayError::AuthRequired));
            let outcome = match action {
                PendingAction::Add => controller.add_to_fitting_room().await,
                PendingAction::Remove => controller.remove_from_fitting_room().await,
            }
            .unwrap();

            assert_eq!(outcome, CartActionOutcome::LoginRequired);
            let view = controller.render().await;
            assert!(view.login_open);
            assert!(view.alert.is_none());
        }
    }

    #[tokio::test]
    async fn test_failed_add_does_not_refresh() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&[]);
        controller.start().await;
        resolved(&controller, "p-1").await;

        controller
            .gateway
            .mutations
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::UnexpectedStatus {
                operation: "add_to_cart",
                status: 500,
            }));
        let err = controller.add_to_fitting_room().await.unwrap_err();

        assert!(matches!(err, WidgetError::Network(_)));
        assert_eq!(controller.gateway.fetch_calls.load(Ordering::SeqCst), 1);
        assert!(controller.render().await.alert.is_none());
    }

    #[tokio::test]
    async fn test_add_sends_origin_when_enabled() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&[]);
        controller.start().await;
        resolved(&controller, "p-1").await;
        controller.apply_toggle(Toggle::AddOrigin).await;

        controller.gateway.mutations.lock().unwrap().push_back(Ok(()));
        controller.gateway.push_cart(&["p-1"]);
        controller.add_to_fitting_room().await.unwrap();

        assert_eq!(
            controller.gateway.last_origin.lock().unwrap().as_deref(),
            Some("https://shop.example.com/p/1")
        );
    }

    #[tokio::test]
    async fn test_anonymous_login_closes_prompt_without_retrying_add() {
        let controller = anonymous();
        controller.add_to_fitting_room().await.unwrap();
        assert!(controller.view().await.login_open);

        controller
            .gateway
            .logins
            .lock()
            .unwrap()
            .push_back(Ok(AuthToken::new("new-token")));
        controller.gateway.push_cart(&[]);
        controller
            .submit_login("shopper@example.com", &SecretString::from("pw"))
            .await
            .unwrap();

        let view = controller.view().await;
        assert!(!view.login_open);
        assert!(view.authenticated);
        assert_eq!(controller.gateway.mutation_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            controller.token_store().load().unwrap().expose(),
            "new-token"
        );
    }

    #[tokio::test]
    async fn test_login_without_token_is_rejected() {
        let controller = anonymous();
        controller.add_to_fitting_room().await.unwrap();
        controller.gateway.logins.lock().unwrap().push_back(Ok(None));

        let err = controller
            .submit_login("shopper@example.com", &SecretString::from("pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, WidgetError::LoginRejected));
        let view = controller.render().await;
        assert!(view.login_open);
        assert_eq!(view.alert.as_deref(), Some(LOGIN_FAILED_ALERT));
        assert!(controller.token_store().load().is_none());
    }

    #[tokio::test]
    async fn test_login_with_invalid_email_skips_network() {
        let controller = anonymous();
        let err = controller
            .submit_login("not-an-email", &SecretString::from("pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, WidgetError::LoginRejected));
        assert_eq!(controller.gateway.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_login_returns_to_anonymous() {
        let controller = anonymous();
        controller.remove_from_fitting_room().await.unwrap();
        controller.cancel_login().await;

        assert_eq!(controller.session().await, SessionState::Anonymous);
        assert!(controller.token_store().load().is_none());
    }

    #[tokio::test]
    async fn test_view_records_product_and_builds_navigation() {
        let controller = anonymous();
        controller.apply_toggle(Toggle::ViewOrigin).await;
        controller.apply_toggle(Toggle::ViewNewTab).await;
        controller
            .gateway
            .push_link("https://fit.example.com/room?product_id=p-9");

        let nav = controller.view_in_fitting_room().await.unwrap().unwrap();

        assert_eq!(nav.target, NavigationTarget::NewTab);
        assert_eq!(
            nav.url,
            "https://fit.example.com/room?product_id=p-9&origin=https%3A%2F%2Fshop.example.com%2Fp%2F1"
        );
        assert_eq!(
            controller.view().await.product_id,
            Some(ProductId::new("p-9"))
        );
    }

    #[tokio::test]
    async fn test_view_without_url_is_noop() {
        let controller = anonymous();
        controller.gateway.links.lock().unwrap().push_back(Ok(None));

        assert!(controller.view_in_fitting_room().await.unwrap().is_none());
        assert!(controller.view().await.product_id.is_none());
    }

    #[tokio::test]
    async fn test_credit_gate_hides_buttons_until_credits_confirmed() {
        let controller = anonymous();
        controller.gateway.credits.lock().unwrap().push_back(Ok(false));
        controller.apply_toggle(Toggle::CreditGate).await;

        let view = controller.view().await;
        assert_eq!(view.credit_gate, CreditGate::checked(false));
        assert_eq!(view.actions, VisibleActions::NONE);

        controller.apply_toggle(Toggle::CreditGate).await;
        assert_eq!(controller.view().await.credit_gate, CreditGate::unchecked());

        controller.gateway.credits.lock().unwrap().push_back(Ok(true));
        controller.apply_toggle(Toggle::CreditGate).await;
        assert_eq!(controller.view().await.actions, VisibleActions::ALL);
    }

    #[tokio::test]
    async fn test_credit_check_failure_means_unavailable() {
        let controller = anonymous();
        controller
            .gateway
            .credits
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::Parse("bad body".to_string())));
        controller.apply_toggle(Toggle::CreditGate).await;

        assert_eq!(
            controller.view().await.credit_gate,
            CreditGate::checked(false)
        );
    }

    #[tokio::test]
    async fn test_credit_result_from_before_regate_is_discarded() {
        let controller = anonymous();
        controller.gateway.credits.lock().unwrap().push_back(Ok(true));
        controller.apply_toggle(Toggle::CreditGate).await;

        let in_flight = controller.credit_requests.fetch_add(1, Ordering::SeqCst) + 1;
        controller.apply_toggle(Toggle::CreditGate).await;
        controller.apply_credit(in_flight, false).await;
        assert_eq!(controller.view().await.credit_gate, CreditGate::unchecked());

        controller.gateway.credits.lock().unwrap().push_back(Ok(true));
        controller.apply_toggle(Toggle::CreditGate).await;
        controller.apply_credit(in_flight, false).await;

        let view = controller.view().await;
        assert_eq!(view.credit_gate, CreditGate::checked(true));
        assert_eq!(view.actions, VisibleActions::ALL);
    }

    #[tokio::test]
    async fn test_disabling_add_keeps_view_button() {
        let controller = anonymous();
        let config = controller.apply_toggle(Toggle::Add).await;
        assert!(!config.global());

        let view = controller.view().await;
        assert!(view.can_show_view());
        assert!(!view.can_show_add());
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_cart() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&["p-1"]);
        controller.start().await;
        resolved(&controller, "p-1").await;
        assert!(controller.view().await.in_cart);

        controller.logout().await;

        let view = controller.view().await;
        assert!(!view.authenticated);
        assert!(!view.in_cart);
        assert!(controller.token_store().load().is_none());
    }

    #[tokio::test]
    async fn test_stale_cart_response_is_discarded() {
        let controller = anonymous();
        controller.state.write().await.product = Some(ProductId::new("p-1"));

        controller.apply_cart(2, Some(vec![ProductId::new("p-1")])).await;
        controller.apply_cart(1, Some(Vec::new())).await;
        assert!(controller.view().await.in_cart);

        controller.apply_cart(3, None).await;
        assert!(controller.view().await.in_cart);
    }

    #[tokio::test]
    async fn test_overlapping_cart_fetches_keep_newest() {
        let controller = anonymous();
        controller.state.write().await.product = Some(ProductId::new("p-1"));
        let token = AuthToken::new("tok").unwrap();

        let (release, held) = oneshot::channel();
        *controller.gateway.held_fetch.lock().unwrap() = Some(held);
        controller.gateway.push_cart(&[]);
        controller.gateway.push_cart(&["p-1"]);

        let older = controller.refresh_cart(&token);
        let newer = async {
            controller.refresh_cart(&token).await.unwrap();
            release.send(()).unwrap();
        };
        let (older, ()) = tokio::join!(older, newer);
        older.unwrap();

        assert_eq!(controller.gateway.fetch_calls.load(Ordering::SeqCst), 2);
        assert!(controller.view().await.in_cart);
    }

    #[tokio::test]
    async fn test_cart_response_after_logout_is_discarded() {
        let controller = with_stored_token();
        controller.gateway.push_cart(&[]);
        controller.start().await;
        resolved(&controller, "p-1").await;

        let in_flight = controller.cart_requests.fetch_add(1, Ordering::SeqCst) + 1;
        controller.logout().await;
        controller
            .apply_cart(in_flight, Some(vec![ProductId::new("p-1")]))
            .await;

        assert!(!controller.view().await.in_cart);
    }
}

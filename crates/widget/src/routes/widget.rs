//! Widget page and button handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use fitting_room_core::Toggle;
use tracing::instrument;

use super::{back_to_widget, redirect_with_cookies, token_cookies};
use crate::controller::{CartActionOutcome, WidgetError, WidgetView};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::ActiveWidget;
use crate::navigation::NavigationTarget;
use crate::state::AppState;

/// One row of the toggle panel.
pub struct ToggleRow {
    pub slug: &'static str,
    pub label: &'static str,
    pub enabled: bool,
}

/// Widget page template.
#[derive(Template, WebTemplate)]
#[template(path = "widget.html")]
pub struct WidgetTemplate {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub toggles: Vec<ToggleRow>,
    pub show_view: bool,
    pub show_add: bool,
    pub in_cart: bool,
    pub view_target: &'static str,
    pub add_target: &'static str,
    pub authenticated: bool,
    pub login_open: bool,
    pub credits_unavailable: bool,
    pub alert: Option<String>,
}

impl WidgetTemplate {
    fn new(state: &AppState, view: WidgetView) -> Self {
        let product = &state.config().product;
        let config = view.config;

        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            toggles: Toggle::ALL
                .into_iter()
                .map(|toggle| ToggleRow {
                    slug: toggle.slug(),
                    label: toggle.label(),
                    enabled: config.get(toggle),
                })
                .collect(),
            show_view: view.can_show_view(),
            show_add: view.can_show_add(),
            in_cart: view.in_cart,
            view_target: NavigationTarget::from_new_tab(config.view_opens_new_tab())
                .as_html_target(),
            add_target: NavigationTarget::from_new_tab(config.add_opens_new_tab())
                .as_html_target(),
            authenticated: view.authenticated,
            login_open: view.login_open,
            credits_unavailable: config.credit_gate_enabled() && !view.credit_gate.available,
            alert: view.alert,
        }
    }
}

/// Render the widget.
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn show(State(state): State<AppState>, widget: ActiveWidget) -> Response {
    let view = widget.controller.render().await;
    (token_cookies(&widget), WidgetTemplate::new(&state, view)).into_response()
}

/// Flip one toggle.
#[instrument(skip_all, fields(widget_id = %widget.id, toggle = %toggle))]
pub async fn toggle(widget: ActiveWidget, Path(toggle): Path<String>) -> Result<Response> {
    let toggle = toggle
        .parse::<Toggle>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    add_breadcrumb("widget", "Toggled setting", Some(&[("toggle", toggle.slug())]));
    widget.controller.apply_toggle(toggle).await;
    Ok(back_to_widget(&widget))
}

/// "View in Fitting Room": redirect to the resolved URL.
///
/// The form's `target` decides whether this opens in a new tab.
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn view(widget: ActiveWidget) -> Response {
    add_breadcrumb("widget", "View in fitting room", None);
    match widget.controller.view_in_fitting_room().await {
        Ok(Some(navigation)) => redirect_with_cookies(&widget, &navigation.url),
        Ok(None) | Err(_) => back_to_widget(&widget),
    }
}

/// "Add to Fitting Room".
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn add(widget: ActiveWidget) -> Response {
    add_breadcrumb("widget", "Add to fitting room", None);
    let outcome = widget.controller.add_to_fitting_room().await;
    log_outcome(&outcome);
    back_to_widget(&widget)
}

/// "Remove from Fitting Room".
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn remove(widget: ActiveWidget) -> Response {
    add_breadcrumb("widget", "Remove from fitting room", None);
    let outcome = widget.controller.remove_from_fitting_room().await;
    log_outcome(&outcome);
    back_to_widget(&widget)
}

fn log_outcome(outcome: &std::result::Result<CartActionOutcome, WidgetError>) {
    match outcome {
        Ok(CartActionOutcome::Refreshed { in_cart }) => {
            tracing::debug!(in_cart, "Fitting room updated");
        }
        Ok(CartActionOutcome::LoginRequired) => tracing::debug!("Login required"),
        Err(e) => tracing::debug!(error = %e, "Fitting room action not completed"),
    }
}

//! Login modal handlers.

use axum::{Form, response::Response};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use super::back_to_widget;
use crate::error::add_breadcrumb;
use crate::middleware::ActiveWidget;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Submit the login modal.
///
/// On failure the modal stays open and the next render shows the alert.
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn login(widget: ActiveWidget, Form(form): Form<LoginForm>) -> Response {
    add_breadcrumb("auth", "Login submitted", None);
    let password = SecretString::from(form.password);

    if let Err(e) = widget.controller.submit_login(&form.email, &password).await {
        tracing::debug!(error = %e, "Login not completed");
    }
    back_to_widget(&widget)
}

/// Close the login modal.
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn cancel(widget: ActiveWidget) -> Response {
    widget.controller.cancel_login().await;
    back_to_widget(&widget)
}

/// Forget the token and the cached fitting room.
#[instrument(skip_all, fields(widget_id = %widget.id))]
pub async fn logout(widget: ActiveWidget) -> Response {
    add_breadcrumb("auth", "Logged out", None);
    widget.controller.logout().await;
    back_to_widget(&widget)
}

//! HTTP route handlers for the widget.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                    - Render the widget
//!
//! # Widget actions (form posts, redirect back to /)
//! POST /toggles/{toggle}    - Flip one visibility toggle
//! POST /view                - Redirect to the resolved fitting room URL
//! POST /add                 - Add the product to the fitting room
//! POST /remove              - Remove the product from the fitting room
//!
//! # Login modal
//! POST /login               - Submit credentials
//! POST /login/cancel        - Close the modal
//! POST /logout              - Forget the token
//! ```

pub mod auth;
pub mod widget;

use axum::{
    Router,
    http::{HeaderName, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::middleware::ActiveWidget;
use crate::state::AppState;

/// Create the widget routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(widget::show))
        .route("/toggles/{toggle}", post(widget::toggle))
        .route("/view", post(widget::view))
        .route("/add", post(widget::add))
        .route("/remove", post(widget::remove))
        .route("/login", post(auth::login))
        .route("/login/cancel", post(auth::cancel))
        .route("/logout", post(auth::logout))
}

/// `Set-Cookie` headers for token changes the controller has queued.
fn token_cookies(widget: &ActiveWidget) -> AppendHeaders<Vec<(HeaderName, String)>> {
    AppendHeaders(
        widget
            .controller
            .token_store()
            .take_set_cookies()
            .into_iter()
            .map(|cookie| (SET_COOKIE, cookie))
            .collect(),
    )
}

/// Redirect to `location`, sending any token cookie the controller wrote.
fn redirect_with_cookies(widget: &ActiveWidget, location: &str) -> Response {
    (token_cookies(widget), Redirect::to(location)).into_response()
}

/// Send the shopper back to the widget.
fn back_to_widget(widget: &ActiveWidget) -> Response {
    redirect_with_cookies(widget, "/")
}

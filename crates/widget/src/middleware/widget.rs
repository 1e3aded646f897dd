//! Extractor resolving the shopper's widget controller.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, WidgetController};

/// Session key holding the widget id.
pub const WIDGET_ID_KEY: &str = "widget_id";

/// The controller for the current browser session.
///
/// The first request of a session allocates a widget id and starts a
/// controller seeded from the request's cookies.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ActiveWidget { controller, .. }: ActiveWidget) -> impl IntoResponse {
///     controller.render().await
/// }
/// ```
pub struct ActiveWidget {
    pub id: Uuid,
    pub controller: Arc<WidgetController>,
}

impl FromRequestParts<AppState> for ActiveWidget {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let id = if let Some(id) = session.get::<Uuid>(WIDGET_ID_KEY).await? {
            id
        } else {
            let id = Uuid::new_v4();
            session.insert(WIDGET_ID_KEY, id).await?;
            id
        };

        let cookies = parts
            .headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok());
        let controller = state.controller(id, cookies).await;

        Ok(Self { id, controller })
    }
}

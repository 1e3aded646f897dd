//! Session middleware configuration.
//!
//! The session only carries the widget id that keys the shopper's
//! controller, so an in-memory store is enough.

use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::WidgetConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "fitting_room_widget";

/// Session expiry after inactivity, in seconds (30 minutes).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &WidgetConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

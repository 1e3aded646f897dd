//! HTTP middleware stack for the widget.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//!
//! Handlers reach their widget controller through the [`ActiveWidget`]
//! extractor.

pub mod request_id;
pub mod session;
pub mod widget;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::create_session_layer;
pub use widget::ActiveWidget;

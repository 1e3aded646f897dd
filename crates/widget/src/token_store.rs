//! Bearer token persistence.
//!
//! The widget keeps the fitting room token in a session cookie named
//! [`TOKEN_COOKIE_NAME`]. The controller reads the store at startup and writes
//! it after login and logout; nothing else touches it.

use std::sync::{PoisonError, RwLock};

use fitting_room_core::AuthToken;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

/// Cookie holding the fitting room bearer token.
pub const TOKEN_COOKIE_NAME: &str = "access_token_3rd_party";

/// Where the session token lives between page loads.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    fn load(&self) -> Option<AuthToken>;

    /// Persist a token, replacing any previous one.
    fn save(&self, token: &AuthToken);

    /// Forget the stored token.
    fn clear(&self);
}

/// Find a cookie value in a `Cookie` header (or `document.cookie`) string.
///
/// Returns the value of the first `name=value` pair whose name matches,
/// up to the next `;`. An empty value counts as absent.
#[must_use]
pub fn find_cookie<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .map(str::trim_start)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .filter(|value| !value.is_empty())
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AuthToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a token.
    #[must_use]
    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<AuthToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, token: &AuthToken) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Token store backed by the browser's session cookie.
///
/// Seeded from the request's `Cookie` header when the widget session starts.
/// Writes are queued as `Set-Cookie` values for the HTTP layer to send with
/// the next response (see [`CookieTokenStore::take_set_cookies`]). The cookie
/// has no expiry, so it lasts for the browser session.
#[derive(Debug)]
pub struct CookieTokenStore {
    secure: bool,
    jar: RwLock<CookieJar>,
}

#[derive(Debug, Default)]
struct CookieJar {
    token: Option<AuthToken>,
    pending: Vec<String>,
}

impl CookieTokenStore {
    /// Seed the store from a `Cookie` header value.
    #[must_use]
    pub fn from_cookie_header(header: Option<&str>, secure: bool) -> Self {
        let token = header
            .and_then(|cookies| find_cookie(cookies, TOKEN_COOKIE_NAME))
            .and_then(AuthToken::new);

        Self {
            secure,
            jar: RwLock::new(CookieJar {
                token,
                pending: Vec::new(),
            }),
        }
    }

    /// Drain the `Set-Cookie` values queued by `save`/`clear`.
    pub fn take_set_cookies(&self) -> Vec<String> {
        std::mem::take(
            &mut self
                .jar
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .pending,
        )
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((TOKEN_COOKIE_NAME, value))
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }
}

impl TokenStore for CookieTokenStore {
    fn load(&self) -> Option<AuthToken> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn save(&self, token: &AuthToken) {
        let cookie = self.cookie(token.expose().to_owned()).to_string();
        let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);
        jar.token = Some(token.clone());
        jar.pending.push(cookie);
    }

    fn clear(&self) {
        let mut cookie = self.cookie(String::new());
        cookie.set_max_age(Duration::ZERO);
        let cookie = cookie.to_string();

        let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);
        jar.token = None;
        jar.pending.push(cookie);
    }
}

//! Bearer token issued by the fitting room login endpoint.

use core::fmt;

/// Opaque bearer token for authenticated fitting room calls.
///
/// The token never appears in `Debug` output so it cannot leak into logs.
/// It does not implement `Display` or `Serialize`; use
/// [`AuthToken::expose`] at the points that must send or store it.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token value.
    ///
    /// Returns `None` for an empty (or whitespace-only) value, which the
    /// cookie store and the login response both treat as "no token".
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

//! Browser navigation produced by "View in Fitting Room".

use serde::Serialize;

/// Where a navigation opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavigationTarget {
    NewTab,
    SameTab,
}

impl NavigationTarget {
    #[must_use]
    pub const fn from_new_tab(new_tab: bool) -> Self {
        if new_tab { Self::NewTab } else { Self::SameTab }
    }

    /// HTML `target` attribute value.
    #[must_use]
    pub const fn as_html_target(self) -> &'static str {
        match self {
            Self::NewTab => "_blank",
            Self::SameTab => "_self",
        }
    }
}

/// A navigation the shell should perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub url: String,
    pub target: NavigationTarget,
}

/// Append `origin=<percent-encoded page url>` to a URL.
///
/// Uses `&` when the URL already has a query string and `?` otherwise. The
/// parameter goes before any `#fragment`.
#[must_use]
pub fn append_origin(url: &str, page_url: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut out = format!("{base}{separator}origin={}", urlencoding::encode(page_url));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

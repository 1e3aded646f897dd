//! Toggle configuration and the CTA visibility policy.
//!
//! The widget exposes eight switches. Two of them are coupled: the global
//! "show fitting room buttons" switch is derived from the view and add
//! switches, and flipping the global switch drives both of them. All of that
//! lives in [`VisibilityConfig::apply`], a pure reducer that returns a new
//! configuration per event.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single switch in the widget's toggle panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Toggle {
    /// Show fitting room buttons (drives view and add together).
    Global,
    /// Show the "View in Fitting Room" button.
    View,
    /// Show the "Add to / Remove from Fitting Room" button.
    Add,
    /// Open the fitting room view in a new tab.
    ViewNewTab,
    /// Open add/remove results in a new tab.
    AddNewTab,
    /// Append the page origin to the fitting room view URL.
    ViewOrigin,
    /// Append the page origin to add-to-cart requests.
    AddOrigin,
    /// Hide the buttons unless the credits check passes.
    CreditGate,
}

impl Toggle {
    /// Every toggle, in panel order.
    pub const ALL: [Self; 8] = [
        Self::Global,
        Self::View,
        Self::ViewNewTab,
        Self::ViewOrigin,
        Self::Add,
        Self::AddNewTab,
        Self::AddOrigin,
        Self::CreditGate,
    ];

    /// Stable slug used in URLs and form fields.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::View => "view",
            Self::Add => "add",
            Self::ViewNewTab => "view-new-tab",
            Self::AddNewTab => "add-new-tab",
            Self::ViewOrigin => "view-origin",
            Self::AddOrigin => "add-origin",
            Self::CreditGate => "credit-gate",
        }
    }

    /// Human-readable label for the toggle panel.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Global => "Show Fitting Room buttons",
            Self::View => "View Fitting Room button",
            Self::Add => "Add to Fitting Room button",
            Self::ViewNewTab | Self::AddNewTab => "Open in a new tab",
            Self::ViewOrigin | Self::AddOrigin => "Enable Origin",
            Self::CreditGate => "Check Credits",
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error returned when a toggle slug is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown toggle: {0}")]
pub struct UnknownToggle(pub String);

impl FromStr for Toggle {
    type Err = UnknownToggle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|toggle| toggle.slug() == s)
            .ok_or_else(|| UnknownToggle(s.to_owned()))
    }
}

/// The widget's toggle state.
///
/// Fields are private so the derived global switch cannot drift from the
/// view/add switches: the only way to change a value is [`Self::apply`] or
/// [`Self::set`], which both return a new configuration. For the same reason
/// there is no `Deserialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityConfig {
    global: bool,
    view_enabled: bool,
    add_enabled: bool,
    view_opens_new_tab: bool,
    add_opens_new_tab: bool,
    view_includes_origin: bool,
    add_includes_origin: bool,
    credit_gate_enabled: bool,
}

impl Default for VisibilityConfig {
    /// Both buttons shown, same-tab navigation, no origin, no credit gate.
    fn default() -> Self {
        Self {
            global: true,
            view_enabled: true,
            add_enabled: true,
            view_opens_new_tab: false,
            add_opens_new_tab: false,
            view_includes_origin: false,
            add_includes_origin: false,
            credit_gate_enabled: false,
        }
    }
}

impl VisibilityConfig {
    /// Flip one toggle.
    #[must_use]
    pub fn apply(self, toggle: Toggle) -> Self {
        let current = self.get(toggle);
        self.set(toggle, !current)
    }

    /// Set one toggle to an explicit value, re-deriving the global switch.
    #[must_use]
    pub fn set(mut self, toggle: Toggle, value: bool) -> Self {
        match toggle {
            Toggle::Global => {
                self.view_enabled = value;
                self.add_enabled = value;
            }
            Toggle::View => self.view_enabled = value,
            Toggle::Add => self.add_enabled = value,
            Toggle::ViewNewTab => self.view_opens_new_tab = value,
            Toggle::AddNewTab => self.add_opens_new_tab = value,
            Toggle::ViewOrigin => self.view_includes_origin = value,
            Toggle::AddOrigin => self.add_includes_origin = value,
            Toggle::CreditGate => self.credit_gate_enabled = value,
        }
        self.global = self.view_enabled && self.add_enabled;
        self
    }

    /// Current value of one toggle.
    #[must_use]
    pub const fn get(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::Global => self.global,
            Toggle::View => self.view_enabled,
            Toggle::Add => self.add_enabled,
            Toggle::ViewNewTab => self.view_opens_new_tab,
            Toggle::AddNewTab => self.add_opens_new_tab,
            Toggle::ViewOrigin => self.view_includes_origin,
            Toggle::AddOrigin => self.add_includes_origin,
            Toggle::CreditGate => self.credit_gate_enabled,
        }
    }

    #[must_use]
    pub const fn global(&self) -> bool {
        self.global
    }

    #[must_use]
    pub const fn view_enabled(&self) -> bool {
        self.view_enabled
    }

    #[must_use]
    pub const fn add_enabled(&self) -> bool {
        self.add_enabled
    }

    #[must_use]
    pub const fn view_opens_new_tab(&self) -> bool {
        self.view_opens_new_tab
    }

    #[must_use]
    pub const fn add_opens_new_tab(&self) -> bool {
        self.add_opens_new_tab
    }

    #[must_use]
    pub const fn view_includes_origin(&self) -> bool {
        self.view_includes_origin
    }

    #[must_use]
    pub const fn add_includes_origin(&self) -> bool {
        self.add_includes_origin
    }

    #[must_use]
    pub const fn credit_gate_enabled(&self) -> bool {
        self.credit_gate_enabled
    }
}

/// Result of the remote credits check.
///
/// `checked` is false until a check completes for the current enablement of
/// the gate; disabling the gate marks the result stale again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditGate {
    pub available: bool,
    pub checked: bool,
}

impl CreditGate {
    /// A completed check.
    #[must_use]
    pub const fn checked(available: bool) -> Self {
        Self {
            available,
            checked: true,
        }
    }

    /// Not yet checked (or stale).
    #[must_use]
    pub const fn unchecked() -> Self {
        Self {
            available: false,
            checked: false,
        }
    }
}

/// Which CTA buttons to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleActions {
    pub show_view: bool,
    pub show_add: bool,
}

impl VisibleActions {
    /// Neither button.
    pub const NONE: Self = Self {
        show_view: false,
        show_add: false,
    };

    /// Both buttons.
    pub const ALL: Self = Self {
        show_view: true,
        show_add: true,
    };
}

/// Decide which CTA buttons are visible.
///
/// An enabled credit gate without available credits hides everything. Past
/// the gate, the global switch shows both buttons; otherwise each button
/// follows its own switch.
#[must_use]
pub const fn resolve_visible_actions(
    config: &VisibilityConfig,
    credit_gate: &CreditGate,
) -> VisibleActions {
    if config.credit_gate_enabled && !credit_gate.available {
        return VisibleActions::NONE;
    }
    if config.global {
        return VisibleActions::ALL;
    }
    VisibleActions {
        show_view: config.view_enabled,
        show_add: config.add_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> impl Iterator<Item = VisibilityConfig> {
        // Every combination of the eight switches, reached via the reducer.
        (0u16..128).map(|bits| {
            Toggle::ALL
                .into_iter()
                .filter(|t| *t != Toggle::Global)
                .enumerate()
                .fold(VisibilityConfig::default(), |config, (i, toggle)| {
                    config.set(toggle, bits & (1 << i) != 0)
                })
        })
    }

    #[test]
    fn test_default_shows_both_buttons() {
        let config = VisibilityConfig::default();
        assert!(config.global());
        assert_eq!(
            resolve_visible_actions(&config, &CreditGate::default()),
            VisibleActions::ALL
        );
    }

    #[test]
    fn test_global_is_derived_for_every_config() {
        for config in configs() {
            assert_eq!(
                config.global(),
                config.view_enabled() && config.add_enabled(),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_global_toggle_drives_both_sub_toggles() {
        let off = VisibilityConfig::default().apply(Toggle::Global);
        assert!(!off.global());
        assert!(!off.view_enabled());
        assert!(!off.add_enabled());

        let on = off.apply(Toggle::Global);
        assert!(on.global());
        assert!(on.view_enabled());
        assert!(on.add_enabled());
    }

    #[test]
    fn test_global_toggle_from_partial_state_turns_both_on() {
        let partial = VisibilityConfig::default().apply(Toggle::Add);
        assert!(!partial.global());

        let on = partial.apply(Toggle::Global);
        assert!(on.view_enabled());
        assert!(on.add_enabled());
        assert!(on.global());
    }

    #[test]
    fn test_setting_both_sub_toggles_restores_global() {
        let config = VisibilityConfig::default()
            .set(Toggle::View, false)
            .set(Toggle::Add, false);
        assert!(!config.global());

        let config = config.set(Toggle::View, true).set(Toggle::Add, true);
        assert!(config.global());
    }

    #[test]
    fn test_disabling_add_keeps_view_visible() {
        let config = VisibilityConfig::default().apply(Toggle::Add);
        assert!(!config.global());
        assert!(config.view_enabled());

        let actions = resolve_visible_actions(&config, &CreditGate::default());
        assert_eq!(
            actions,
            VisibleActions {
                show_view: true,
                show_add: false,
            }
        );
    }

    #[test]
    fn test_credit_gate_without_credits_hides_everything() {
        for config in configs().filter(VisibilityConfig::credit_gate_enabled) {
            for gate in [CreditGate::unchecked(), CreditGate::checked(false)] {
                assert_eq!(
                    resolve_visible_actions(&config, &gate),
                    VisibleActions::NONE
                );
            }
        }
    }

    #[test]
    fn test_credit_gate_with_credits_falls_through() {
        let config = VisibilityConfig::default().apply(Toggle::CreditGate);
        assert_eq!(
            resolve_visible_actions(&config, &CreditGate::checked(true)),
            VisibleActions::ALL
        );
    }

    #[test]
    fn test_unavailable_credits_ignored_when_gate_disabled() {
        let config = VisibilityConfig::default();
        assert_eq!(
            resolve_visible_actions(&config, &CreditGate::checked(false)),
            VisibleActions::ALL
        );
    }

    #[test]
    fn test_unrelated_toggles_do_not_touch_global() {
        for toggle in [
            Toggle::ViewNewTab,
            Toggle::AddNewTab,
            Toggle::ViewOrigin,
            Toggle::AddOrigin,
            Toggle::CreditGate,
        ] {
            let config = VisibilityConfig::default().apply(toggle);
            assert!(config.global(), "{toggle}");
            assert!(config.get(toggle), "{toggle}");
        }
    }

    #[test]
    fn test_toggle_slug_round_trips() {
        for toggle in Toggle::ALL {
            assert_eq!(toggle.slug().parse::<Toggle>(), Ok(toggle));
        }
        assert!("nope".parse::<Toggle>().is_err());
    }

    #[test]
    fn test_toggle_deserializes_from_slug() {
        let toggle: Toggle = serde_json::from_str("\"view-new-tab\"").expect("toggle");
        assert_eq!(toggle, Toggle::ViewNewTab);
    }
}

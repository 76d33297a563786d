//! Typed settings shared by every context
//!
//! The persistent store is the single logical owner; each context holds a
//! cached, eventually-consistent copy kept current through change
//! notifications. Wire names are camelCase to match the persisted schema.

pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::constants::limits;
use crate::rules::DomainRule;

/// Storage key names, shared by the store, the change listeners, and the
/// partial writes issued from the sidebar.
pub mod keys {
    pub const HEADING_LEVELS: &str = "headingLevels";
    pub const THEME: &str = "theme";
    pub const FONT_SIZE: &str = "fontSize";
    pub const DOMAIN_RULES: &str = "domainRules";
    pub const AUTO_COLLAPSE: &str = "autoCollapse";
    pub const SHOW_NUMBERS: &str = "showNumbers";
    pub const SMOOTH_SCROLL: &str = "smoothScroll";
}

/// One enabled heading tag, `h1` through `h6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    pub fn all() -> [HeadingLevel; 6] {
        [
            HeadingLevel::H1,
            HeadingLevel::H2,
            HeadingLevel::H3,
            HeadingLevel::H4,
            HeadingLevel::H5,
            HeadingLevel::H6,
        ]
    }

    /// Numeric level taken from the tag suffix.
    pub fn level(self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
            HeadingLevel::H4 => 4,
            HeadingLevel::H5 => 5,
            HeadingLevel::H6 => 6,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        }
    }

    pub fn from_tag(tag: &str) -> Option<HeadingLevel> {
        match tag {
            "h1" => Some(HeadingLevel::H1),
            "h2" => Some(HeadingLevel::H2),
            "h3" => Some(HeadingLevel::H3),
            "h4" => Some(HeadingLevel::H4),
            "h5" => Some(HeadingLevel::H5),
            "h6" => Some(HeadingLevel::H6),
            _ => None,
        }
    }
}

/// Sidebar color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Wire value as stored under the `theme` key.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Which part of the UI a changed key affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Changes the sidebar contents or presentation; re-render when shown.
    Sidebar,
    /// Changes the per-site enablement rules only.
    Rules,
    /// Not a key this context tracks.
    Unknown,
}

/// Full user preferences, one value per storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_heading_levels")]
    pub heading_levels: Vec<HeadingLevel>,
    #[serde(default = "default_theme")]
    pub theme: Theme,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub domain_rules: Vec<DomainRule>,
    #[serde(default)]
    pub auto_collapse: bool,
    #[serde(default)]
    pub show_numbers: bool,
    #[serde(default = "default_smooth_scroll")]
    pub smooth_scroll: bool,
}

fn default_heading_levels() -> Vec<HeadingLevel> {
    HeadingLevel::all().to_vec()
}

fn default_theme() -> Theme {
    Theme::Light
}

fn default_font_size() -> u32 {
    16
}

fn default_smooth_scroll() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            heading_levels: default_heading_levels(),
            theme: default_theme(),
            font_size: default_font_size(),
            domain_rules: Vec::new(),
            auto_collapse: false,
            show_numbers: false,
            smooth_scroll: default_smooth_scroll(),
        }
    }
}

impl Settings {
    /// Build settings from stored values, falling back to the default for
    /// every missing key (first-run semantics: keys may not exist yet).
    pub fn from_values(values: &Map<String, Value>) -> Self {
        let mut settings = Settings::default();
        for (key, value) in values {
            settings.apply_change(key, value);
        }
        settings.validate_and_clamp();
        settings
    }

    /// Serialize to one JSON value per storage key.
    pub fn to_values(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Serializing a plain struct with no fallible fields cannot fail
            _ => Map::new(),
        }
    }

    /// Apply a single changed key to this cached copy. A value of the wrong
    /// shape is logged and skipped, keeping the previous value; the returned
    /// kind still classifies the key so the caller can decide what to
    /// refresh.
    pub fn apply_change(&mut self, key: &str, value: &Value) -> SettingKind {
        match key {
            keys::HEADING_LEVELS => {
                self.set_or_warn(value, |s, v| s.heading_levels = v, key);
                SettingKind::Sidebar
            }
            keys::THEME => {
                self.set_or_warn(value, |s, v| s.theme = v, key);
                SettingKind::Sidebar
            }
            keys::FONT_SIZE => {
                self.set_or_warn(value, |s, v| s.font_size = v, key);
                SettingKind::Sidebar
            }
            keys::AUTO_COLLAPSE => {
                self.set_or_warn(value, |s, v| s.auto_collapse = v, key);
                SettingKind::Sidebar
            }
            keys::SHOW_NUMBERS => {
                self.set_or_warn(value, |s, v| s.show_numbers = v, key);
                SettingKind::Sidebar
            }
            keys::SMOOTH_SCROLL => {
                self.set_or_warn(value, |s, v| s.smooth_scroll = v, key);
                SettingKind::Sidebar
            }
            keys::DOMAIN_RULES => {
                self.set_or_warn(value, |s, v| s.domain_rules = v, key);
                SettingKind::Rules
            }
            _ => SettingKind::Unknown,
        }
    }

    fn set_or_warn<T: serde::de::DeserializeOwned>(
        &mut self,
        value: &Value,
        assign: impl FnOnce(&mut Self, T),
        key: &str,
    ) {
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => assign(self, parsed),
            Err(e) => warn!(key = %key, error = %e, "Ignoring malformed settings value"),
        }
    }

    /// Clamp values to safe ranges. Called after loading stored values.
    pub fn validate_and_clamp(&mut self) {
        if self.font_size < limits::MIN_FONT_SIZE {
            warn!(font_size = self.font_size, min = limits::MIN_FONT_SIZE, "fontSize below minimum, clamping");
            self.font_size = limits::MIN_FONT_SIZE;
        } else if self.font_size > limits::MAX_FONT_SIZE {
            warn!(font_size = self.font_size, max = limits::MAX_FONT_SIZE, "fontSize exceeds maximum, clamping");
            self.font_size = limits::MAX_FONT_SIZE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleAction;
    use serde_json::json;

    #[test]
    fn test_defaults_match_first_install() {
        let settings = Settings::default();
        assert_eq!(settings.heading_levels.len(), 6);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.font_size, 16);
        assert!(settings.domain_rules.is_empty());
        assert!(!settings.show_numbers);
        assert!(settings.smooth_scroll);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let values = Settings::default().to_values();
        for key in [
            keys::HEADING_LEVELS,
            keys::THEME,
            keys::FONT_SIZE,
            keys::DOMAIN_RULES,
            keys::AUTO_COLLAPSE,
            keys::SHOW_NUMBERS,
            keys::SMOOTH_SCROLL,
        ] {
            assert!(values.contains_key(key), "missing key {key}");
        }
        assert_eq!(values[keys::HEADING_LEVELS], json!(["h1", "h2", "h3", "h4", "h5", "h6"]));
    }

    #[test]
    fn test_from_values_fills_missing_keys_with_defaults() {
        let mut stored = Map::new();
        stored.insert(keys::THEME.to_string(), json!("dark"));

        let settings = Settings::from_values(&stored);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.font_size, 16);
        assert_eq!(settings.heading_levels.len(), 6);
    }

    #[test]
    fn test_apply_change_classifies_keys() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.apply_change(keys::SHOW_NUMBERS, &json!(true)),
            SettingKind::Sidebar
        );
        assert!(settings.show_numbers);

        assert_eq!(
            settings.apply_change(keys::DOMAIN_RULES, &json!([{"domain": "a.com", "action": "disable"}])),
            SettingKind::Rules
        );
        assert_eq!(settings.domain_rules[0].action, RuleAction::Disable);

        assert_eq!(
            settings.apply_change("somethingElse", &json!(1)),
            SettingKind::Unknown
        );
    }

    #[test]
    fn test_apply_change_keeps_previous_value_on_bad_shape() {
        let mut settings = Settings::default();
        let kind = settings.apply_change(keys::FONT_SIZE, &json!("huge"));
        assert_eq!(kind, SettingKind::Sidebar);
        assert_eq!(settings.font_size, 16);
    }

    #[test]
    fn test_clamp_font_size() {
        let mut stored = Map::new();
        stored.insert(keys::FONT_SIZE.to_string(), json!(500));
        let settings = Settings::from_values(&stored);
        assert_eq!(settings.font_size, limits::MAX_FONT_SIZE);
    }

    #[test]
    fn test_heading_level_tag_round_trip() {
        for level in HeadingLevel::all() {
            assert_eq!(HeadingLevel::from_tag(level.tag()), Some(level));
        }
        assert_eq!(HeadingLevel::from_tag("div"), None);
    }
}

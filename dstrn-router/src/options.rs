//! Per-call navigation and resolution options

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ResolveStrategy, RouterConfig};

/// Which history API call records a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HistoryMethod {
    #[default]
    #[serde(rename = "pushState")]
    Push,
    #[serde(rename = "replaceState")]
    Replace,
}

impl HistoryMethod {
    /// Parse `pushState` / `replaceState`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pushState" => Some(Self::Push),
            "replaceState" => Some(Self::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "pushState",
            Self::Replace => "replaceState",
        }
    }
}

/// Overrides of the router-wide resolution settings for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    pub strategy: Option<ResolveStrategy>,
    pub hash: Option<bool>,
    pub no_match_warning: Option<bool>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn with_hash(mut self, hash: bool) -> Self {
        self.hash = Some(hash);
        self
    }

    #[must_use]
    pub fn with_no_match_warning(mut self, enabled: bool) -> Self {
        self.no_match_warning = Some(enabled);
        self
    }
}

/// Effective resolution settings: config values with call overrides applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSettings {
    pub strategy: ResolveStrategy,
    pub hash: bool,
    pub no_match_warning: bool,
}

impl ResolveSettings {
    pub fn merge(config: &RouterConfig, overrides: Option<&ResolveOptions>) -> Self {
        let overrides = overrides.cloned().unwrap_or_default();
        Self {
            strategy: overrides.strategy.unwrap_or(config.strategy),
            hash: overrides.hash.unwrap_or(config.hash),
            no_match_warning: overrides.no_match_warning.unwrap_or(config.no_match_warning),
        }
    }
}

/// Options accepted by `navigate`.
///
/// Flags default to `true` except `force`.
///
/// # Example
/// ```rust,ignore
/// let options = NavigateOptions::new()
///     .with_title("Profile")
///     .with_history_method(HistoryMethod::Replace)
///     .with_call_hooks(false);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigateOptions {
    /// Title handed to the history backend
    pub title: Option<String>,
    /// State object handed to the history backend
    pub state_obj: Option<Value>,
    #[serde(rename = "historyAPIMethod")]
    pub history_api_method: HistoryMethod,
    #[serde(rename = "updateBrowserURL")]
    pub update_browser_url: bool,
    pub call_handler: bool,
    pub call_hooks: bool,
    pub update_state: bool,
    /// Commit the target as the resolved state without running routes
    pub force: bool,
    pub resolve_options: Option<ResolveOptions>,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            title: None,
            state_obj: None,
            history_api_method: HistoryMethod::Push,
            update_browser_url: true,
            call_handler: true,
            call_hooks: true,
            update_state: true,
            force: false,
            resolve_options: None,
        }
    }
}

impl NavigateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: Value) -> Self {
        self.state_obj = Some(state);
        self
    }

    #[must_use]
    pub fn with_history_method(mut self, method: HistoryMethod) -> Self {
        self.history_api_method = method;
        self
    }

    #[must_use]
    pub fn with_update_browser_url(mut self, enabled: bool) -> Self {
        self.update_browser_url = enabled;
        self
    }

    #[must_use]
    pub fn with_call_handler(mut self, enabled: bool) -> Self {
        self.call_handler = enabled;
        self
    }

    #[must_use]
    pub fn with_call_hooks(mut self, enabled: bool) -> Self {
        self.call_hooks = enabled;
        self
    }

    #[must_use]
    pub fn with_update_state(mut self, enabled: bool) -> Self {
        self.update_state = enabled;
        self
    }

    #[must_use]
    pub fn with_force(mut self, enabled: bool) -> Self {
        self.force = enabled;
        self
    }

    #[must_use]
    pub fn with_resolve_options(mut self, options: ResolveOptions) -> Self {
        self.resolve_options = Some(options);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_navigate_defaults() {
        let options = NavigateOptions::default();
        assert!(options.update_browser_url);
        assert!(options.call_handler);
        assert!(options.call_hooks);
        assert!(options.update_state);
        assert!(!options.force);
        assert_eq!(options.history_api_method, HistoryMethod::Push);
    }

    #[test]
    fn test_navigate_options_wire_names() {
        let options: NavigateOptions = serde_json::from_value(json!({
            "historyAPIMethod": "replaceState",
            "updateBrowserURL": false,
            "stateObj": { "step": 2 },
            "resolveOptions": { "strategy": "ALL", "noMatchWarning": false }
        }))
        .unwrap();
        assert_eq!(options.history_api_method, HistoryMethod::Replace);
        assert!(!options.update_browser_url);
        assert!(options.call_handler);
        assert_eq!(options.state_obj, Some(json!({ "step": 2 })));
        let resolve = options.resolve_options.unwrap();
        assert_eq!(resolve.strategy, Some(ResolveStrategy::All));
        assert_eq!(resolve.no_match_warning, Some(false));
        assert_eq!(resolve.hash, None);
    }

    #[test]
    fn test_settings_merge_prefers_overrides() {
        let config = RouterConfig::new().with_hash(true);
        let merged = ResolveSettings::merge(
            &config,
            Some(&ResolveOptions::new().with_strategy(ResolveStrategy::All)),
        );
        assert_eq!(merged.strategy, ResolveStrategy::All);
        assert!(merged.hash);
        assert!(merged.no_match_warning);

        let plain = ResolveSettings::merge(&config, None);
        assert_eq!(plain.strategy, ResolveStrategy::One);
    }

    #[test]
    fn test_history_method_parse() {
        assert_eq!(HistoryMethod::parse("replaceState"), Some(HistoryMethod::Replace));
        assert_eq!(HistoryMethod::parse("bogus"), None);
        assert_eq!(HistoryMethod::Push.as_str(), "pushState");
    }
}

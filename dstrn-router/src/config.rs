//! Configuration module for the router.
//!
//! This module provides the [`RouterConfig`] struct for customizing router
//! behavior. A config can be built in code or read from the `router` section
//! of the persisted project configuration document.
//!
//! # Example
//! ```rust,ignore
//! use dstrn_router::{RouterConfig, ResolveStrategy};
//!
//! let config = RouterConfig::new()
//!     .with_root("/app")
//!     .with_strategy(ResolveStrategy::All)
//!     .with_hash(true);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default selector used to find interceptable links.
pub const DEFAULT_LINKS_SELECTOR: &str = "[data-drouter]";

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// links_selector must not be empty
    EmptyLinksSelector,
    /// pattern_cache_size must be greater than 0
    InvalidPatternCacheSize,
    /// root must not carry a query or fragment
    InvalidRoot(String),
    /// The configuration document could not be decoded
    InvalidDocument(String),
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLinksSelector => write!(f, "links_selector must not be empty"),
            Self::InvalidPatternCacheSize => {
                write!(f, "pattern_cache_size must be greater than 0")
            }
            Self::InvalidRoot(root) => {
                write!(f, "root '{}' must not contain '?' or '#'", root)
            }
            Self::InvalidDocument(msg) => write!(f, "invalid router config document: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Policy governing how many routes a single location resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResolveStrategy {
    /// Stop at the first structural match.
    #[default]
    #[serde(rename = "ONE")]
    One,
    /// Collect every structural match, in registration order.
    #[serde(rename = "ALL")]
    All,
}

impl ResolveStrategy {
    /// Parse the wire spelling used by link options (`ONE` / `ALL`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ONE" => Some(Self::One),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for ResolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "ONE"),
            Self::All => write!(f, "ALL"),
        }
    }
}

/// Router configuration.
///
/// All fields have defaults that give a working path-mode router mounted at
/// `/`.
///
/// # Fields
///
/// * `root` - Prefix every route pattern and navigation target is mounted
///   under. Default: `"/"`.
///
/// * `strategy` - Resolution strategy used when a call does not override it.
///   Default: [`ResolveStrategy::One`].
///
/// * `hash` - Route on the URL fragment instead of the path. Default: false.
///
/// * `no_match_warning` - Emit a diagnostic when nothing matches and no
///   fallback route is installed. Default: true.
///
/// * `links_selector` - Selector used to find interceptable links.
///   Default: `[data-drouter]`.
///
/// * `pattern_cache_size` - Capacity of the cache holding ad-hoc patterns
///   compiled by `match_location`. Default: 64.
///
/// * `debug_logging` - Log every pipeline stage at debug level. Default: false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterConfig {
    /// Mount prefix (default: "/")
    pub root: String,
    /// Default resolution strategy (default: ONE)
    pub strategy: ResolveStrategy,
    /// Fragment routing (default: false)
    pub hash: bool,
    /// Emit a diagnostic for unmatched locations (default: true)
    pub no_match_warning: bool,
    /// Selector for interceptable links (default: "[data-drouter]")
    pub links_selector: String,
    /// Ad-hoc pattern cache capacity (default: 64)
    pub pattern_cache_size: usize,
    /// Verbose stage logging (default: false)
    pub debug_logging: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            strategy: ResolveStrategy::default(),
            hash: false,
            no_match_warning: true,
            links_selector: DEFAULT_LINKS_SELECTOR.to_string(),
            pattern_cache_size: 64,
            debug_logging: false,
        }
    }
}

impl RouterConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `router` section of a project configuration document.
    ///
    /// The document is treated as an opaque key-value object; a missing
    /// section yields the defaults. The decoded config is validated.
    ///
    /// # Example
    /// ```rust,ignore
    /// let doc = serde_json::json!({ "router": { "root": "/app", "hash": true } });
    /// let config = RouterConfig::from_document(&doc)?;
    /// ```
    pub fn from_document(document: &serde_json::Value) -> Result<Self, ConfigValidationError> {
        let config = match document.get("router") {
            Some(section) => serde_json::from_value::<Self>(section.clone())
                .map_err(|e| ConfigValidationError::InvalidDocument(e.to_string()))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.links_selector.trim().is_empty() {
            return Err(ConfigValidationError::EmptyLinksSelector);
        }
        if self.pattern_cache_size == 0 {
            return Err(ConfigValidationError::InvalidPatternCacheSize);
        }
        if self.root.contains('?') || self.root.contains('#') {
            return Err(ConfigValidationError::InvalidRoot(self.root.clone()));
        }
        Ok(())
    }

    /// Set the mount prefix.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the default resolution strategy.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable fragment routing.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_hash(mut self, enabled: bool) -> Self {
        self.hash = enabled;
        self
    }

    /// Enable or disable the no-match diagnostic.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_no_match_warning(mut self, enabled: bool) -> Self {
        self.no_match_warning = enabled;
        self
    }

    /// Set the selector used to find interceptable links.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_links_selector(mut self, selector: impl Into<String>) -> Self {
        self.links_selector = selector.into();
        self
    }

    /// Set the capacity of the ad-hoc pattern cache.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_pattern_cache_size(mut self, size: usize) -> Self {
        self.pattern_cache_size = size;
        self
    }

    /// Enable or disable verbose stage logging.
    #[must_use = "This method returns a new RouterConfig and does not modify self"]
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }
}

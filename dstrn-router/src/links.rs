//! Link interception
//!
//! Finds navigation links in a [`Document`] and turns their activation into
//! router navigations instead of full page loads.
//!
//! A link is eligible when it has an `href`, its `data-drouter` attribute is
//! not `"false"` and its `target` is not `_blank`. Scanning is idempotent: an
//! element is wired at most once, and an element that lost its eligibility
//! is unwired on the next scan.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use url::Url;

use crate::config::ResolveStrategy;
use crate::matcher::clean;
use crate::options::{HistoryMethod, NavigateOptions, ResolveOptions};

/// Attribute that opts a link out when set to `"false"`.
pub const ROUTER_ATTRIBUTE: &str = "data-drouter";

/// Attribute carrying per-link navigation options.
pub const OPTIONS_ATTRIBUTE: &str = "data-drouter-options";

/// Identity of a listener attached to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A click (or equivalent) on a link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    pub ctrl_key: bool,
    pub meta_key: bool,
    /// Tag of the element the activation originated on
    pub target_tag: String,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Activation {
    pub fn new(target_tag: &str) -> Self {
        Self {
            target_tag: target_tag.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    #[must_use]
    pub fn with_meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Listener invoked on activation.
pub type ActivationListener = Arc<dyn Fn(&mut Activation) + Send + Sync>;

/// An element that may act as a navigation link.
pub trait LinkElement: Send + Sync {
    /// Stable identity of the element within its document.
    fn key(&self) -> u64;

    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn add_activation_listener(&self, listener: ActivationListener) -> ListenerId;

    fn remove_activation_listener(&self, id: ListenerId);
}

/// Source of link elements.
pub trait Document: Send + Sync {
    fn query_selector_all(&self, selector: &str) -> Vec<Arc<dyn LinkElement>>;
}

/// Receives navigations triggered by links.
pub trait Navigator: Send + Sync {
    /// True once the target router accepts no more navigations.
    fn is_destroyed(&self) -> bool;

    /// Start a navigation without waiting for it.
    fn dispatch(&self, path: String, options: NavigateOptions);
}

/// Navigation derived from a link activation.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkNavigation {
    pub path: String,
    pub options: NavigateOptions,
}

/// Whether an element should be wired.
pub fn is_eligible(element: &dyn LinkElement) -> bool {
    element.attribute("href").is_some()
        && element.attribute(ROUTER_ATTRIBUTE).as_deref() != Some("false")
        && element.attribute("target").as_deref() != Some("_blank")
}

/// Reduce an absolute `http(s)` href to its path and query.
pub fn link_path(href: &str) -> String {
    if !href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(href) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => href.to_string(),
    }
}

/// Decide what an activation of `element` should do.
///
/// Returns `None` when the browser should handle it (modifier-click on an
/// anchor, or no `href`).
pub fn intercept(element: &dyn LinkElement, activation: &Activation) -> Option<LinkNavigation> {
    if (activation.ctrl_key || activation.meta_key) && activation.target_tag.eq_ignore_ascii_case("a") {
        return None;
    }
    let href = element.attribute("href")?;
    let options = element
        .attribute(OPTIONS_ATTRIBUTE)
        .map(|raw| parse_link_options(&raw))
        .unwrap_or_default();
    Some(LinkNavigation {
        path: clean(&link_path(&href)),
        options,
    })
}

/// Parse `key:value,key:value` link options.
///
/// Unknown keys and unparseable values are ignored; flags are true only for
/// the literal `true`.
pub fn parse_link_options(raw: &str) -> NavigateOptions {
    let mut options = NavigateOptions::default();
    let mut resolve: Option<ResolveOptions> = None;

    for pair in raw.split(',') {
        let mut parts = pair.split(':').map(str::trim);
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        let flag = value == "true";

        match key {
            "historyAPIMethod" => {
                if let Some(method) = HistoryMethod::parse(value) {
                    options.history_api_method = method;
                }
            }
            "resolveOptionsStrategy" => {
                if let Some(strategy) = ResolveStrategy::parse(value) {
                    resolve.get_or_insert_with(ResolveOptions::default).strategy = Some(strategy);
                }
            }
            "resolveOptionsHash" => {
                resolve.get_or_insert_with(ResolveOptions::default).hash = Some(flag);
            }
            "updateBrowserURL" => options.update_browser_url = flag,
            "callHandler" => options.call_handler = flag,
            "callHooks" => options.call_hooks = flag,
            "updateState" => options.update_state = flag,
            "force" => options.force = flag,
            _ => {}
        }
    }

    options.resolve_options = resolve;
    options
}

struct WiredLink {
    element: Arc<dyn LinkElement>,
    listener: ListenerId,
}

/// Tracks which elements carry a router listener.
pub struct LinkInterceptor {
    selector: String,
    wired: Mutex<HashMap<u64, WiredLink>>,
}

impl fmt::Debug for LinkInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkInterceptor")
            .field("selector", &self.selector)
            .field("wired", &self.wired_count())
            .finish()
    }
}

impl LinkInterceptor {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            wired: Mutex::new(HashMap::new()),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn wired(&self) -> MutexGuard<'_, HashMap<u64, WiredLink>> {
        self.wired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wire every eligible element not yet wired; unwire elements that are
    /// no longer eligible. Returns the number of newly wired elements.
    pub fn scan(&self, document: &dyn Document, navigator: Arc<dyn Navigator>) -> usize {
        let mut wired = self.wired();
        let mut added = 0;

        for element in document.query_selector_all(&self.selector) {
            let key = element.key();
            if is_eligible(element.as_ref()) {
                if wired.contains_key(&key) {
                    continue;
                }
                let listener = activation_listener(Arc::downgrade(&element), navigator.clone());
                let listener = element.add_activation_listener(listener);
                wired.insert(key, WiredLink { element, listener });
                added += 1;
            } else if let Some(link) = wired.remove(&key) {
                link.element.remove_activation_listener(link.listener);
            }
        }

        added
    }

    pub fn wired_count(&self) -> usize {
        self.wired().len()
    }

    /// Remove every listener this interceptor attached.
    pub fn detach_all(&self) {
        for (_, link) in self.wired().drain() {
            link.element.remove_activation_listener(link.listener);
        }
    }
}

fn activation_listener(element: Weak<dyn LinkElement>, navigator: Arc<dyn Navigator>) -> ActivationListener {
    Arc::new(move |activation: &mut Activation| {
        let Some(element) = element.upgrade() else {
            return;
        };
        if navigator.is_destroyed() {
            return;
        }
        let Some(navigation) = intercept(element.as_ref(), activation) else {
            return;
        };
        activation.prevent_default();
        activation.stop_propagation();
        navigator.dispatch(navigation.path, navigation.options);
    })
}

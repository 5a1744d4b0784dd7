//! Route registry
//!
//! Holds the ordered route list, the optional fallback route and the generic
//! hooks merged into every route registered after they are set. Registration
//! order is matching order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use regex::Regex;

use crate::hooks::{AnyHook, HookId, HookKind, HookSet, Hooks};
use crate::matcher::{clean, strip_root, CompiledPattern, Match, PathParams, PathPattern};
use crate::RouterResult;

/// Name of the fallback route.
pub const NOT_FOUND_ROUTE_NAME: &str = "__NOT_FOUND__";

/// Callback invoked when a route is entered.
pub type RouteHandler = Arc<dyn Fn(&Match) + Send + Sync>;

/// Shared reference to a registered route.
pub type RouteHandle = Arc<Route>;

/// Unique route identity, stable for the route's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl RouteId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A registered route.
pub struct Route {
    id: RouteId,
    name: String,
    pattern: CompiledPattern,
    handler: RouteHandler,
    hooks: Mutex<HookSet>,
    fallback: bool,
}

impl Route {
    pub(crate) fn new(
        name: String,
        pattern: CompiledPattern,
        handler: RouteHandler,
        hooks: HookSet,
        fallback: bool,
    ) -> Self {
        Self {
            id: RouteId::next(),
            name,
            pattern,
            handler,
            hooks: Mutex::new(hooks),
            fallback,
        }
    }

    /// Route for an exact path that is not part of the registry, used for
    /// forced navigations and location snapshots.
    pub(crate) fn synthetic(path: &str, hooks: HookSet) -> Self {
        let handler: RouteHandler = Arc::new(|_: &Match| {});
        Self::new(clean(path), CompiledPattern::literal(path), handler, hooks, false)
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    /// True for the route installed with `not_found`.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Snapshot of the route's hooks.
    pub fn hooks(&self) -> HookSet {
        self.lock_hooks().clone()
    }

    pub(crate) fn add_hook(&self, hook: AnyHook) -> HookId {
        self.lock_hooks().add(hook)
    }

    pub(crate) fn remove_hook(&self, kind: HookKind, id: HookId) -> bool {
        self.lock_hooks().remove(kind, id)
    }

    fn lock_hooks(&self) -> MutexGuard<'_, HookSet> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("fallback", &self.fallback)
            .field("hooks", &*self.lock_hooks())
            .finish()
    }
}

/// A route to register.
///
/// # Example
/// ```rust,ignore
/// let def = RouteDef::new("users/:id", |m: &Match| show_user(m.param("id")))
///     .name("user")
///     .hooks(Hooks::new().after(|_: &Match| track()));
/// ```
pub struct RouteDef {
    pattern: PathPattern,
    handler: RouteHandler,
    name: Option<String>,
    hooks: Option<Hooks>,
}

impl RouteDef {
    pub fn new<P, H>(pattern: P, handler: H) -> Self
    where
        P: Into<PathPattern>,
        H: Fn(&Match) + Send + Sync + 'static,
    {
        Self::with_handler(pattern, Arc::new(handler))
    }

    /// Use an existing handler, keeping its identity for later lookups.
    pub fn with_handler<P: Into<PathPattern>>(pattern: P, handler: RouteHandler) -> Self {
        Self {
            pattern: pattern.into(),
            handler,
            name: None,
            hooks: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// How a caller refers to a registered route.
#[derive(Clone)]
pub enum RouteIdentifier {
    /// Route name, or the path it was registered with
    Name(String),
    /// Handler identity
    Handler(RouteHandler),
    /// Pattern identity
    Pattern(PathPattern),
}

impl fmt::Debug for RouteIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteIdentifier({})", self)
    }
}

impl fmt::Display for RouteIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name:{}", name),
            Self::Handler(handler) => write!(f, "handler:{:p}", Arc::as_ptr(handler)),
            Self::Pattern(pattern) => write!(f, "pattern:{}", pattern),
        }
    }
}

impl From<&str> for RouteIdentifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for RouteIdentifier {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<RouteHandler> for RouteIdentifier {
    fn from(handler: RouteHandler) -> Self {
        Self::Handler(handler)
    }
}

impl From<&RouteHandler> for RouteIdentifier {
    fn from(handler: &RouteHandler) -> Self {
        Self::Handler(handler.clone())
    }
}

impl From<Regex> for RouteIdentifier {
    fn from(regex: Regex) -> Self {
        Self::Pattern(PathPattern::Regex(regex))
    }
}

impl From<PathPattern> for RouteIdentifier {
    fn from(pattern: PathPattern) -> Self {
        Self::Pattern(pattern)
    }
}

/// Options for [`RouteRegistry::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Keep the root prefix in the generated path (default: true)
    pub include_root: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { include_root: true }
    }
}

/// Ordered routes plus fallback and generic hooks.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    root: String,
    routes: Vec<RouteHandle>,
    not_found: Option<RouteHandle>,
    generic_hooks: Option<Hooks>,
}

impl RouteRegistry {
    pub fn new(root: &str) -> Self {
        Self {
            root: clean(root),
            ..Self::default()
        }
    }

    /// Cleaned mount prefix.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// `path` mounted under the root, cleaned.
    pub fn full_path(&self, path: &str) -> String {
        mount(&self.root, path)
    }

    /// Register a route at the end of the matching order.
    pub fn register(&mut self, def: RouteDef) -> RouterResult<RouteHandle> {
        let pattern = match def.pattern {
            PathPattern::Path(path) => PathPattern::Path(self.full_path(&path)),
            raw @ PathPattern::Regex(_) => raw,
        };
        let compiled = CompiledPattern::compile(pattern)?;
        let name = def.name.unwrap_or_else(|| clean(compiled.as_str()));
        let hooks = self.merged_hooks(def.hooks.as_ref());

        let route = Arc::new(Route::new(name, compiled, def.handler, hooks, false));
        self.routes.push(route.clone());
        Ok(route)
    }

    /// Remove every route the identifier refers to. Returns how many were
    /// removed.
    pub fn deregister(&mut self, identifier: &RouteIdentifier) -> usize {
        let before = self.routes.len();
        let root = &self.root;
        self.routes.retain(|route| !identifies(root, route, identifier));
        before - self.routes.len()
    }

    /// First route the identifier refers to.
    ///
    /// Names are tried exactly first, then mounted under the root, then as
    /// the path a route was registered with.
    pub fn find(&self, identifier: &RouteIdentifier) -> Option<RouteHandle> {
        if let RouteIdentifier::Name(name) = identifier {
            let mounted = self.full_path(name);
            return self
                .routes
                .iter()
                .find(|route| route.name == *name)
                .or_else(|| self.routes.iter().find(|route| route.name == mounted))
                .or_else(|| {
                    self.routes
                        .iter()
                        .find(|route| identifies(&self.root, route, identifier))
                })
                .cloned();
        }
        self.routes
            .iter()
            .find(|route| identifies(&self.root, route, identifier))
            .cloned()
    }

    /// Install the fallback route, replacing any previous one.
    pub fn set_not_found(&mut self, handler: RouteHandler, hooks: Option<&Hooks>) -> RouteHandle {
        let route = Arc::new(Route::new(
            NOT_FOUND_ROUTE_NAME.to_string(),
            CompiledPattern::wildcard(),
            handler,
            self.merged_hooks(hooks),
            true,
        ));
        self.not_found = Some(route.clone());
        route
    }

    pub fn not_found(&self) -> Option<RouteHandle> {
        self.not_found.clone()
    }

    /// Hooks merged into routes registered from now on.
    pub fn set_generic_hooks(&mut self, hooks: Hooks) {
        self.generic_hooks = Some(hooks);
    }

    /// Generic hooks only, for routes built outside the registry.
    pub fn generic_hook_set(&self) -> HookSet {
        self.merged_hooks(None)
    }

    fn merged_hooks(&self, route_hooks: Option<&Hooks>) -> HookSet {
        HookSet::collect(self.generic_hooks.iter().chain(route_hooks))
    }

    /// Routes in matching order.
    pub fn routes(&self) -> &[RouteHandle] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build a path for a named route.
    ///
    /// Each `:key` token is replaced at its first occurrence; unknown keys are
    /// ignored and tokens without a value stay in place. Routes with a raw
    /// expression yield `None`.
    pub fn generate(&self, name: &str, params: &PathParams, options: GenerateOptions) -> Option<String> {
        let route = self.routes.iter().find(|route| route.name == name)?;
        if route.pattern.is_raw() {
            return None;
        }

        let mut path = route.pattern.as_str().to_string();
        for (key, value) in params {
            path = path.replacen(&format!(":{}", key), value, 1);
        }
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !options.include_root {
            path = strip_root(&path[1..], &self.root).to_string();
            if !path.starts_with('/') {
                path.insert(0, '/');
            }
        }
        Some(path)
    }

    /// Drop every route, the fallback and the generic hooks.
    pub fn clear(&mut self) {
        self.routes.clear();
        self.not_found = None;
        self.generic_hooks = None;
    }
}

fn mount(root: &str, path: &str) -> String {
    clean(&format!("{}/{}", root, clean(path)))
}

/// Names also match the path a route was registered with.
fn identifies(root: &str, route: &Route, identifier: &RouteIdentifier) -> bool {
    match identifier {
        RouteIdentifier::Name(name) => {
            route.name == *name || (!route.pattern.is_raw() && route.pattern.as_str() == mount(root, name))
        }
        RouteIdentifier::Handler(handler) => Arc::ptr_eq(&route.handler, handler),
        RouteIdentifier::Pattern(PathPattern::Path(path)) => {
            !route.pattern.is_raw() && route.pattern.as_str() == mount(root, path)
        }
        RouteIdentifier::Pattern(PathPattern::Regex(regex)) => {
            route.pattern.is_raw() && route.pattern.as_str() == regex.as_str()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Flow;

    fn noop() -> impl Fn(&Match) + Send + Sync + 'static {
        |_: &Match| {}
    }

    #[test]
    fn test_register_mounts_under_root_and_names_by_path() {
        let mut registry = RouteRegistry::new("/app/");
        let route = registry.register(RouteDef::new("/users/:id/", noop())).unwrap();
        assert_eq!(route.pattern().as_str(), "app/users/:id");
        assert_eq!(route.name(), "app/users/:id");
    }

    #[test]
    fn test_explicit_name_wins() {
        let mut registry = RouteRegistry::new("/");
        let route = registry
            .register(RouteDef::new("users/:id", noop()).name("user"))
            .unwrap();
        assert_eq!(route.name(), "user");
        assert!(registry.find(&"user".into()).is_some());
    }

    #[test]
    fn test_find_tries_root_prefixed_name() {
        let mut registry = RouteRegistry::new("app");
        registry.register(RouteDef::new("about", noop())).unwrap();
        let found = registry.find(&"about".into()).unwrap();
        assert_eq!(found.name(), "app/about");
    }

    #[test]
    fn test_deregister_by_handler_identity() {
        let mut registry = RouteRegistry::new("/");
        let handler: RouteHandler = Arc::new(|_: &Match| {});
        registry.register(RouteDef::with_handler("a", handler.clone())).unwrap();
        registry.register(RouteDef::with_handler("b", handler.clone())).unwrap();
        registry.register(RouteDef::new("c", noop())).unwrap();

        assert_eq!(registry.deregister(&handler.into()), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.routes()[0].name(), "c");
    }

    #[test]
    fn test_deregister_by_path_and_by_regex() {
        let mut registry = RouteRegistry::new("/");
        let route = registry
            .register(RouteDef::new("users/:id", noop()).name("user"))
            .unwrap();
        registry
            .register(RouteDef::new(Regex::new(r"^files/(\d+)$").unwrap(), noop()))
            .unwrap();

        assert_eq!(registry.deregister(&"/users/:id/".into()), 1);
        assert!(registry.find(&RouteIdentifier::Name(route.name().to_string())).is_none());
        assert_eq!(
            registry.deregister(&Regex::new(r"^files/(\d+)$").unwrap().into()),
            1
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_deregister_unknown_is_noop() {
        let mut registry = RouteRegistry::new("/");
        registry.register(RouteDef::new("a", noop())).unwrap();
        assert_eq!(registry.deregister(&"zzz".into()), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_generate_substitutes_first_occurrence() {
        let mut registry = RouteRegistry::new("/");
        registry
            .register(RouteDef::new("users/:id/save/:action", noop()).name("user"))
            .unwrap();
        let params = PathParams::from([
            ("id".to_string(), "xxx".to_string()),
            ("action".to_string(), "delete".to_string()),
            ("unused".to_string(), "1".to_string()),
        ]);
        assert_eq!(
            registry.generate("user", &params, GenerateOptions::default()),
            Some("/users/xxx/save/delete".to_string())
        );
        assert_eq!(registry.generate("missing", &params, GenerateOptions::default()), None);
    }

    #[test]
    fn test_generate_keeps_missing_tokens_and_strips_root() {
        let mut registry = RouteRegistry::new("/app");
        registry
            .register(RouteDef::new("users/:id", noop()).name("user"))
            .unwrap();
        assert_eq!(
            registry.generate("user", &PathParams::new(), GenerateOptions::default()),
            Some("/app/users/:id".to_string())
        );
        let params = PathParams::from([("id".to_string(), "7".to_string())]);
        assert_eq!(
            registry.generate("user", &params, GenerateOptions { include_root: false }),
            Some("/users/7".to_string())
        );
    }

    #[test]
    fn test_generate_raw_route_is_none() {
        let mut registry = RouteRegistry::new("/");
        registry
            .register(RouteDef::new(Regex::new("^x$").unwrap(), noop()).name("raw"))
            .unwrap();
        assert_eq!(registry.generate("raw", &PathParams::new(), GenerateOptions::default()), None);
    }

    #[test]
    fn test_generic_hooks_merge_into_later_routes() {
        let mut registry = RouteRegistry::new("/");
        let early = registry.register(RouteDef::new("early", noop())).unwrap();
        registry.set_generic_hooks(Hooks::new().before(|_| async { Flow::Continue }));
        let late = registry
            .register(RouteDef::new("late", noop()).hooks(Hooks::new().before(|_| async { Flow::Continue })))
            .unwrap();

        assert_eq!(early.hooks().count(HookKind::Before), 0);
        assert_eq!(late.hooks().count(HookKind::Before), 2);
    }

    #[test]
    fn test_not_found_route_shape() {
        let mut registry = RouteRegistry::new("/");
        let route = registry.set_not_found(Arc::new(|_: &Match| {}), None);
        assert!(route.is_fallback());
        assert_eq!(route.name(), NOT_FOUND_ROUTE_NAME);
        assert_eq!(route.pattern().as_str(), "*");
        assert!(registry.not_found().is_some());

        registry.clear();
        assert!(registry.not_found().is_none());
    }

    #[test]
    fn test_group_characters_in_template_are_literal() {
        let mut registry = RouteRegistry::new("/");
        let route = registry.register(RouteDef::new("a(b", noop())).unwrap();
        assert!(route.pattern().captures("a(b").is_some());
        assert!(route.pattern().captures("ab").is_none());
    }
}

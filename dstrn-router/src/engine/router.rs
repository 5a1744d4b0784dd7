//! Router handle and shared engine state

use lru::LruCache;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::sync::watch;

use super::context::{MatchRun, NavigationContext};
use super::queue::{Admission, RunQueue};
use super::stages::{collect_matches, match_pipeline, navigate_pipeline, resolve_pipeline};
use super::types::{
    NavigationId, NavigationOutcome, NavigationRequest, RequestKind, ResolvedState, RouterStatus,
};
use crate::config::RouterConfig;
use crate::history::{HistoryAdapter, HistoryBackend};
use crate::hooks::{before_hook, leave_hook, AnyHook, HookHandle, HookSet, Hooks};
use crate::links::{Document, LinkInterceptor, Navigator};
use crate::logging::{
    log_navigation_event, log_pattern_cache, log_route_registered, log_router_destroyed,
    log_router_init, log_routes_removed, Diagnostic, DiagnosticSink, NavigationLogEvent,
    PatternCacheLogEvent, TracingDiagnostics,
};
use crate::matcher::{
    check_for_hash, clean, extract_get_params, extract_hash, match_route, parse_query, strip_root,
    CompiledPattern, Match, PathParams, PathPattern,
};
use crate::memory::MemoryHistory;
use crate::options::{NavigateOptions, ResolveOptions, ResolveSettings};
use crate::pipeline::{Flow, Pipeline};
use crate::registry::{
    GenerateOptions, Route, RouteDef, RouteHandle, RouteHandler, RouteIdentifier, RouteRegistry,
};
use crate::{RouterError, RouterResult};

/// State shared by every clone of a [`Router`].
pub(crate) struct RouterInner {
    pub(crate) config: RouterConfig,
    /// Cleaned root
    pub(crate) root: String,
    registry: RwLock<RouteRegistry>,
    state: watch::Sender<ResolvedState>,
    queue: Mutex<RunQueue>,
    pub(crate) history: HistoryAdapter,
    links: LinkInterceptor,
    document: RwLock<Option<Arc<dyn Document>>>,
    pub(crate) diagnostics: Arc<dyn DiagnosticSink>,
    pattern_cache: Mutex<LruCache<String, CompiledPattern>>,
    destroyed: AtomicBool,
    resolve_pipeline: Pipeline<NavigationContext>,
    navigate_pipeline: Pipeline<NavigationContext>,
    pub(crate) match_pipeline: Pipeline<MatchRun>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl RouterInner {
    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn current(&self) -> ResolvedState {
        self.state.borrow().clone()
    }

    pub(crate) fn set_current(&self, state: ResolvedState) {
        self.state.send_replace(state);
    }

    pub(crate) fn routes(&self) -> Vec<RouteHandle> {
        read(&self.registry).routes().to_vec()
    }

    pub(crate) fn not_found_route(&self) -> Option<RouteHandle> {
        read(&self.registry).not_found()
    }

    /// Match for an exact path on a synthetic route carrying the generic
    /// hooks.
    pub(crate) fn path_to_match(&self, path: &str) -> Match {
        let (url, query_string) = extract_get_params(&clean(path));
        let hooks = read(&self.registry).generic_hook_set();
        let route = Arc::new(Route::synthetic(&url, hooks));
        Match {
            query_params: parse_query(&query_string),
            hash_string: extract_hash(path),
            url,
            query_string,
            route,
            path_params: PathParams::new(),
        }
    }

    /// Wire links in the attached document.
    pub(crate) fn update_page_links(self: &Arc<Self>) {
        if self.is_destroyed() {
            return;
        }
        let Some(document) = read(&self.document).clone() else {
            return;
        };
        let navigator: Arc<dyn Navigator> = Arc::new(RouterNavigator {
            inner: Arc::downgrade(self),
        });
        self.links.scan(document.as_ref(), navigator);
    }

    fn settings(&self, overrides: Option<&ResolveOptions>) -> ResolveSettings {
        ResolveSettings::merge(&self.config, overrides)
    }

    async fn run_pipeline(self: &Arc<Self>, request: NavigationRequest) -> NavigationOutcome {
        let settings = self.settings(request.options.resolve_options.as_ref());
        let kind = request.kind;
        let mut ctx = NavigationContext::new(self.clone(), request, settings);
        log_navigation_event(ctx.id, ctx.label(), NavigationLogEvent::Started { kind: kind.as_str() });

        let pipeline = match kind {
            RequestKind::Resolve => &self.resolve_pipeline,
            RequestKind::Navigate => &self.navigate_pipeline,
        };
        let completion = pipeline.run(&mut ctx).await;

        let id = ctx.id;
        let label = ctx.label().to_string();
        let outcome = ctx.into_outcome(completion);
        log_navigation_event(
            id,
            &label,
            NavigationLogEvent::Completed {
                outcome: outcome.as_str(),
                matches: outcome.matches().len(),
            },
        );
        outcome
    }
}

/// Releases a request's turn or queue slot when its call ends, including
/// when the caller drops the future.
struct TurnGuard {
    inner: Arc<RouterInner>,
    id: NavigationId,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        lock(&self.inner.queue).release(self.id);
    }
}

/// A request's place in the run queue.
struct Ticket {
    admission: Admission,
    _turn: TurnGuard,
}

/// Wait for the ticket's turn, then run the request's pipeline.
async fn run_admitted(
    inner: &Arc<RouterInner>,
    request: NavigationRequest,
    ticket: Ticket,
) -> NavigationOutcome {
    let Ticket { admission, _turn } = ticket;
    if let Admission::Wait { turn, position } = admission {
        log_navigation_event(request.id, request.target_label(), NavigationLogEvent::Queued { position });
        if turn.await.is_err() || inner.is_destroyed() {
            log_navigation_event(request.id, request.target_label(), NavigationLogEvent::Dropped);
            return NavigationOutcome::Dropped;
        }
    }
    inner.run_pipeline(request).await
}

/// [`Navigator`] handed to the link interceptor. Holds the router weakly so
/// wired elements never keep it alive.
struct RouterNavigator {
    inner: Weak<RouterInner>,
}

impl Navigator for RouterNavigator {
    fn is_destroyed(&self) -> bool {
        self.inner.upgrade().is_none_or(|inner| inner.is_destroyed())
    }

    fn dispatch(&self, path: String, options: NavigateOptions) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let router = Router { inner };
        if let Err(err) = router.navigate_detached(&path, options) {
            tracing::warn!(path = %path, error = %err, "Link navigation skipped");
        }
    }
}

/// Client-side navigation engine.
///
/// Cloning is cheap; every clone drives the same routes and state.
///
/// # Example
/// ```rust,ignore
/// let router = Router::builder()
///     .config(RouterConfig::new().with_root("/app"))
///     .history(Arc::new(MemoryHistory::new("/app")))
///     .build()?;
///
/// router.on("users/:id", |m: &Match| println!("user {}", m.param("id").unwrap_or("?")))?;
/// router.navigate("users/42", NavigateOptions::default()).await?;
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("root", &self.inner.root)
            .field("routes", &read(&self.inner.registry).len())
            .field("status", &self.status())
            .finish()
    }
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    config: RouterConfig,
    history: Option<Arc<dyn HistoryBackend>>,
    document: Option<Arc<dyn Document>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl RouterBuilder {
    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// History backend. Defaults to an in-memory history at `/`.
    #[must_use]
    pub fn history(mut self, history: Arc<dyn HistoryBackend>) -> Self {
        self.history = Some(history);
        self
    }

    /// Document whose links are intercepted.
    #[must_use]
    pub fn document(mut self, document: Arc<dyn Document>) -> Self {
        self.document = Some(document);
        self
    }

    /// Diagnostic sink. Defaults to [`TracingDiagnostics`].
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn build(self) -> RouterResult<Router> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| RouterError::invalid_config(e.to_string()))?;
        let cache_size = NonZeroUsize::new(config.pattern_cache_size)
            .ok_or_else(|| RouterError::invalid_config("pattern_cache_size must be greater than 0"))?;

        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(TracingDiagnostics));
        if config.root.is_empty() {
            diagnostics.emit(&Diagnostic::MissingRoot);
        }
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(MemoryHistory::new("/")));
        let root = clean(&config.root);
        let (state, _) = watch::channel(None);

        let inner = Arc::new(RouterInner {
            registry: RwLock::new(RouteRegistry::new(&root)),
            state,
            queue: Mutex::new(RunQueue::new()),
            history: HistoryAdapter::new(history),
            links: LinkInterceptor::new(config.links_selector.clone()),
            document: RwLock::new(self.document),
            diagnostics,
            pattern_cache: Mutex::new(LruCache::new(cache_size)),
            destroyed: AtomicBool::new(false),
            resolve_pipeline: resolve_pipeline(),
            navigate_pipeline: navigate_pipeline(),
            match_pipeline: match_pipeline(),
            root,
            config,
        });

        inner.history.attach();
        log_router_init(&inner.root, &inner.config.strategy.to_string(), inner.config.hash);
        inner.update_page_links();
        Ok(Router { inner })
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Router with the given config and history backend.
    pub fn new(config: RouterConfig, history: Arc<dyn HistoryBackend>) -> RouterResult<Self> {
        Self::builder().config(config).history(history).build()
    }

    fn ensure_alive(&self) -> RouterResult<()> {
        if self.inner.is_destroyed() {
            Err(RouterError::destroyed())
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a handler for a pattern.
    pub fn on<P, H>(&self, pattern: P, handler: H) -> RouterResult<RouteHandle>
    where
        P: Into<PathPattern>,
        H: Fn(&Match) + Send + Sync + 'static,
    {
        self.register(RouteDef::new(pattern, handler))
    }

    /// Register a route definition.
    pub fn register(&self, def: RouteDef) -> RouterResult<RouteHandle> {
        self.ensure_alive()?;
        let route = write(&self.inner.registry).register(def)?;
        log_route_registered(route.name(), route.pattern().as_str());
        self.inner.update_page_links();
        Ok(route)
    }

    /// Remove routes by name or path, handler or pattern. Returns how many
    /// were removed.
    pub fn off(&self, identifier: impl Into<RouteIdentifier>) -> RouterResult<usize> {
        self.ensure_alive()?;
        let identifier = identifier.into();
        let removed = write(&self.inner.registry).deregister(&identifier);
        log_routes_removed(&identifier.to_string(), removed);
        Ok(removed)
    }

    /// Install the fallback route run when nothing matches.
    pub fn not_found<H>(&self, handler: H, hooks: Option<Hooks>) -> RouterResult<RouteHandle>
    where
        H: Fn(&Match) + Send + Sync + 'static,
    {
        self.ensure_alive()?;
        let handler: RouteHandler = Arc::new(handler);
        Ok(write(&self.inner.registry).set_not_found(handler, hooks.as_ref()))
    }

    /// Hooks merged into every route registered afterwards.
    pub fn hooks(&self, hooks: Hooks) -> RouterResult<()> {
        self.ensure_alive()?;
        write(&self.inner.registry).set_generic_hooks(hooks);
        Ok(())
    }

    pub fn add_before_hook<F, Fut>(&self, route: impl Into<RouteIdentifier>, hook: F) -> Option<HookHandle>
    where
        F: Fn(Match) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Flow> + Send + 'static,
    {
        self.add_hook(route.into(), AnyHook::Before(before_hook(hook)))
    }

    pub fn add_after_hook<F>(&self, route: impl Into<RouteIdentifier>, hook: F) -> Option<HookHandle>
    where
        F: Fn(&Match) + Send + Sync + 'static,
    {
        self.add_hook(route.into(), AnyHook::After(Arc::new(hook)))
    }

    pub fn add_already_hook<F>(&self, route: impl Into<RouteIdentifier>, hook: F) -> Option<HookHandle>
    where
        F: Fn(&Match) + Send + Sync + 'static,
    {
        self.add_hook(route.into(), AnyHook::Already(Arc::new(hook)))
    }

    pub fn add_leave_hook<F, Fut>(&self, route: impl Into<RouteIdentifier>, hook: F) -> Option<HookHandle>
    where
        F: Fn(Vec<Match>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Flow> + Send + 'static,
    {
        self.add_hook(route.into(), AnyHook::Leave(leave_hook(hook)))
    }

    /// Attach a hook to a registered route. Unknown routes produce a
    /// diagnostic and no handle.
    pub fn add_hook(&self, route: RouteIdentifier, hook: AnyHook) -> Option<HookHandle> {
        if self.inner.is_destroyed() {
            return None;
        }
        let Some(target) = read(&self.inner.registry).find(&route) else {
            self.inner.diagnostics.emit(&Diagnostic::UnknownRoute {
                identifier: route.to_string(),
            });
            return None;
        };
        let kind = hook.kind();
        let id = target.add_hook(hook);
        Some(HookHandle::new(&target, kind, id))
    }

    /// Look up a registered route.
    pub fn get_route(&self, route: impl Into<RouteIdentifier>) -> Option<RouteHandle> {
        read(&self.inner.registry).find(&route.into())
    }

    /// Registered routes in matching order.
    pub fn routes(&self) -> Vec<RouteHandle> {
        self.inner.routes()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Resolve `path`, or the current location when `None`, without touching
    /// history.
    pub async fn resolve(
        &self,
        path: Option<&str>,
        options: Option<ResolveOptions>,
    ) -> RouterResult<NavigationOutcome> {
        self.ensure_alive()?;
        let target = path.map(|p| self.target(p));
        let options = NavigateOptions {
            resolve_options: options,
            ..NavigateOptions::default()
        };
        self.run_serialized(NavigationRequest::new(RequestKind::Resolve, target, options))
            .await
    }

    /// Navigate to `path` relative to the root, updating history.
    pub async fn navigate(&self, path: &str, options: NavigateOptions) -> RouterResult<NavigationOutcome> {
        self.ensure_alive()?;
        let target = self.target(path);
        self.run_serialized(NavigationRequest::new(RequestKind::Navigate, Some(target), options))
            .await
    }

    /// Navigate to a named route. `Ok(None)` when the name is unknown.
    pub async fn navigate_by_name(
        &self,
        name: &str,
        params: &PathParams,
        options: NavigateOptions,
    ) -> RouterResult<Option<NavigationOutcome>> {
        self.ensure_alive()?;
        let Some(path) = self.generate(name, params, GenerateOptions::default()) else {
            return Ok(None);
        };
        let relative = strip_root(path.strip_prefix('/').unwrap_or(&path), &self.inner.root);
        self.navigate(relative, options).await.map(Some)
    }

    /// React to a back/forward notification. `Ok(None)` when it must be
    /// ignored.
    pub async fn on_popstate(&self) -> RouterResult<Option<NavigationOutcome>> {
        self.ensure_alive()?;
        if self.inner.history.should_ignore_popstate() {
            return Ok(None);
        }
        self.resolve(None, None).await.map(Some)
    }

    fn target(&self, path: &str) -> String {
        format!("{}/{}", self.inner.root, clean(path))
    }

    /// Queue a navigation to `path` and return its id without waiting for
    /// it to run.
    ///
    /// Hooks redirect with this: a hook awaiting [`Router::navigate`] waits
    /// behind the very run that is executing it. The request takes its place
    /// in the queue before this returns and runs on the current Tokio
    /// runtime once the active run finishes.
    pub fn navigate_detached(&self, path: &str, options: NavigateOptions) -> RouterResult<NavigationId> {
        self.ensure_alive()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            RouterError::internal("Detached navigation needs a Tokio runtime").with_cause(e.to_string())
        })?;
        let request = NavigationRequest::new(RequestKind::Navigate, Some(self.target(path)), options);
        let id = request.id;
        let ticket = self.admit(&request)?;
        let inner = self.inner.clone();
        runtime.spawn(async move { run_admitted(&inner, request, ticket).await });
        Ok(id)
    }

    async fn run_serialized(&self, request: NavigationRequest) -> RouterResult<NavigationOutcome> {
        let ticket = self.admit(&request)?;
        Ok(run_admitted(&self.inner, request, ticket).await)
    }

    fn admit(&self, request: &NavigationRequest) -> RouterResult<Ticket> {
        let admission = {
            let mut queue = lock(&self.inner.queue);
            if self.inner.is_destroyed() {
                return Err(RouterError::destroyed());
            }
            queue.admit(request)
        };
        Ok(Ticket {
            admission,
            _turn: TurnGuard {
                inner: self.inner.clone(),
                id: request.id,
            },
        })
    }

    /// Requests waiting for their turn, oldest first.
    pub fn pending_requests(&self) -> Vec<NavigationRequest> {
        lock(&self.inner.queue).pending()
    }

    /// Cancel a waiting request. Its caller receives
    /// [`NavigationOutcome::Dropped`].
    pub fn cancel_pending(&self, id: NavigationId) -> bool {
        lock(&self.inner.queue).cancel(id)
    }

    pub fn status(&self) -> RouterStatus {
        if self.inner.is_destroyed() {
            return RouterStatus::Destroyed;
        }
        lock(&self.inner.queue).status()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Build the path of a named route. `None` for unknown names and raw
    /// expression routes.
    pub fn generate(&self, name: &str, params: &PathParams, options: GenerateOptions) -> Option<String> {
        read(&self.inner.registry).generate(name, params, options)
    }

    /// Matches for `path` without running anything. `None` when nothing
    /// matches.
    pub fn match_path(&self, path: &str) -> Option<Vec<Match>> {
        let routes = self.inner.routes();
        let matches = collect_matches(&routes, path, path, &self.inner.root, self.inner.config.strategy);
        (!matches.is_empty()).then_some(matches)
    }

    /// Match an ad-hoc pattern against `path`, both mounted under the root.
    pub fn match_location(&self, pattern: impl Into<PathPattern>, path: &str) -> RouterResult<Option<Match>> {
        let registry = read(&self.inner.registry);
        let pattern = match pattern.into() {
            PathPattern::Path(p) => PathPattern::Path(registry.full_path(&p)),
            raw => raw,
        };
        let location = check_for_hash(&registry.full_path(path), self.inner.config.hash);
        drop(registry);

        let compiled = self.compile_cached(pattern)?;
        let route = Arc::new(Route::new(
            clean(compiled.as_str()),
            compiled,
            Arc::new(|_: &Match| {}),
            HookSet::default(),
            false,
        ));
        Ok(match_route(&location, &location, &route, &self.inner.root))
    }

    fn compile_cached(&self, pattern: PathPattern) -> RouterResult<CompiledPattern> {
        let key = match &pattern {
            PathPattern::Path(p) => format!("path:{}", p),
            PathPattern::Regex(r) => format!("regex:{}", r.as_str()),
        };
        let mut cache = lock(&self.inner.pattern_cache);
        if let Some(compiled) = cache.get(&key) {
            log_pattern_cache(&key, PatternCacheLogEvent::Hit);
            return Ok(compiled.clone());
        }
        log_pattern_cache(&key, PatternCacheLogEvent::Miss);
        let compiled = CompiledPattern::compile(pattern)?;
        cache.put(key, compiled.clone());
        Ok(compiled)
    }

    /// Resolved State of the last committed navigation.
    pub fn current(&self) -> ResolvedState {
        self.inner.current()
    }

    /// Receive every change of the Resolved State.
    pub fn subscribe(&self) -> watch::Receiver<ResolvedState> {
        self.inner.state.subscribe()
    }

    /// Match describing the host's current location relative to the root.
    pub fn current_location(&self) -> Match {
        let location = clean(&self.inner.history.current_path(&self.inner.root));
        self.inner.path_to_match(strip_root(&location, &self.inner.root))
    }

    /// Split a URL into path and query string.
    pub fn extract_get_parameters(&self, url: &str) -> (String, String) {
        extract_get_params(url)
    }

    /// Absolute href for `path` under the root.
    pub fn link(&self, path: &str) -> String {
        if self.inner.root.is_empty() {
            format!("/{}", clean(path))
        } else {
            format!("/{}/{}", self.inner.root, clean(path))
        }
    }

    /// Cleaned root.
    pub fn root(&self) -> &str {
        &self.inner.root
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn history(&self) -> &HistoryAdapter {
        &self.inner.history
    }

    // =========================================================================
    // Links and teardown
    // =========================================================================

    /// Wire newly added links in the attached document.
    pub fn update_page_links(&self) {
        self.inner.update_page_links();
    }

    /// Attach or replace the document whose links are intercepted.
    pub fn set_document(&self, document: Arc<dyn Document>) {
        self.inner.links.detach_all();
        *write(&self.inner.document) = Some(document);
        self.inner.update_page_links();
    }

    /// Number of links currently wired.
    pub fn wired_links(&self) -> usize {
        self.inner.links.wired_count()
    }

    /// Tear down: drop queued navigations, clear routes, stop listening to
    /// history and links. Idempotent.
    pub fn destroy(&self) {
        let dropped = {
            let mut queue = lock(&self.inner.queue);
            if self.inner.destroyed.swap(true, Ordering::SeqCst) {
                return;
            }
            queue.drain()
        };
        write(&self.inner.registry).clear();
        self.inner.history.detach();
        self.inner.links.detach_all();
        log_router_destroyed(dropped);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }
}

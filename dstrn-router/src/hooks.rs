//! Lifecycle hooks
//!
//! Four hook kinds surround a route's handler:
//!
//! - `before` runs ahead of the handler and may cancel the navigation
//! - `after` runs once the handler returned
//! - `already` runs instead of everything else when the location is already
//!   resolved to the same match
//! - `leave` runs on the previously resolved route when the location moves
//!   away from it, and may cancel the navigation
//!
//! Cancellable hooks are async and resolve to a [`Flow`]; `after` and
//! `already` are plain callbacks.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::matcher::Match;
use crate::pipeline::{Flow, Pipeline, Step};
use crate::registry::Route;

/// Hook run before the handler. Resolving to [`Flow::Abort`] cancels the run.
pub type BeforeHook = Arc<dyn Fn(Match) -> BoxFuture<'static, Flow> + Send + Sync>;

/// Hook run when leaving a route. Receives the new matches (empty when the
/// new location matched nothing).
pub type LeaveHook = Arc<dyn Fn(Vec<Match>) -> BoxFuture<'static, Flow> + Send + Sync>;

/// Hook run after the handler.
pub type AfterHook = Arc<dyn Fn(&Match) + Send + Sync>;

/// Hook run when the location is already resolved.
pub type AlreadyHook = Arc<dyn Fn(&Match) + Send + Sync>;

/// Hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
    Already,
    Leave,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
            Self::Already => write!(f, "already"),
            Self::Leave => write!(f, "leave"),
        }
    }
}

/// Identity of one attached hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl HookId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Wrap an async closure as a [`BeforeHook`].
pub fn before_hook<F, Fut>(hook: F) -> BeforeHook
where
    F: Fn(Match) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    Arc::new(move |m| Box::pin(hook(m)))
}

/// Wrap an async closure as a [`LeaveHook`].
pub fn leave_hook<F, Fut>(hook: F) -> LeaveHook
where
    F: Fn(Vec<Match>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    Arc::new(move |matches| Box::pin(hook(matches)))
}

/// A hook of any kind, used when attaching hooks one at a time.
#[derive(Clone)]
pub enum AnyHook {
    Before(BeforeHook),
    After(AfterHook),
    Already(AlreadyHook),
    Leave(LeaveHook),
}

impl AnyHook {
    /// Kind of the wrapped hook.
    pub fn kind(&self) -> HookKind {
        match self {
            Self::Before(_) => HookKind::Before,
            Self::After(_) => HookKind::After,
            Self::Already(_) => HookKind::Already,
            Self::Leave(_) => HookKind::Leave,
        }
    }
}

/// At most one hook per kind, as supplied with a route or as generic hooks.
///
/// # Example
/// ```rust,ignore
/// let hooks = Hooks::new()
///     .before(|m: Match| async move { Flow::from(m.param("id").is_some()) })
///     .after(|m: &Match| tracing::info!(url = %m.url, "entered"));
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
    already: Option<AlreadyHook>,
    leave: Option<LeaveHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `before` hook.
    #[must_use]
    pub fn before<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Match) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Flow> + Send + 'static,
    {
        self.before = Some(before_hook(hook));
        self
    }

    /// Set the `after` hook.
    #[must_use]
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Match) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Set the `already` hook.
    #[must_use]
    pub fn already<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Match) + Send + Sync + 'static,
    {
        self.already = Some(Arc::new(hook));
        self
    }

    /// Set the `leave` hook.
    #[must_use]
    pub fn leave<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Match>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Flow> + Send + 'static,
    {
        self.leave = Some(leave_hook(hook));
        self
    }

    /// True when no hook is set.
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none() && self.already.is_none() && self.leave.is_none()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("already", &self.already.is_some())
            .field("leave", &self.leave.is_some())
            .finish()
    }
}

/// Ordered hooks of a route, per kind.
#[derive(Clone, Default)]
pub struct HookSet {
    before: Vec<(HookId, BeforeHook)>,
    after: Vec<(HookId, AfterHook)>,
    already: Vec<(HookId, AlreadyHook)>,
    leave: Vec<(HookId, LeaveHook)>,
}

impl HookSet {
    /// Concatenate hook bundles in order. Generic hooks go first.
    pub fn collect<'a>(sources: impl IntoIterator<Item = &'a Hooks>) -> Self {
        let mut set = Self::default();
        for hooks in sources {
            if let Some(hook) = &hooks.before {
                set.add(AnyHook::Before(hook.clone()));
            }
            if let Some(hook) = &hooks.after {
                set.add(AnyHook::After(hook.clone()));
            }
            if let Some(hook) = &hooks.already {
                set.add(AnyHook::Already(hook.clone()));
            }
            if let Some(hook) = &hooks.leave {
                set.add(AnyHook::Leave(hook.clone()));
            }
        }
        set
    }

    /// Append a hook at the end of its kind's list.
    pub fn add(&mut self, hook: AnyHook) -> HookId {
        let id = HookId::next();
        match hook {
            AnyHook::Before(h) => self.before.push((id, h)),
            AnyHook::After(h) => self.after.push((id, h)),
            AnyHook::Already(h) => self.already.push((id, h)),
            AnyHook::Leave(h) => self.leave.push((id, h)),
        }
        id
    }

    /// Remove one hook. Returns false when it was already gone.
    pub fn remove(&mut self, kind: HookKind, id: HookId) -> bool {
        fn drop_id<T>(list: &mut Vec<(HookId, T)>, id: HookId) -> bool {
            let len = list.len();
            list.retain(|(hook_id, _)| *hook_id != id);
            list.len() != len
        }
        match kind {
            HookKind::Before => drop_id(&mut self.before, id),
            HookKind::After => drop_id(&mut self.after, id),
            HookKind::Already => drop_id(&mut self.already, id),
            HookKind::Leave => drop_id(&mut self.leave, id),
        }
    }

    pub fn before(&self) -> Vec<BeforeHook> {
        self.before.iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn after(&self) -> Vec<AfterHook> {
        self.after.iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn already(&self) -> Vec<AlreadyHook> {
        self.already.iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn leave(&self) -> Vec<LeaveHook> {
        self.leave.iter().map(|(_, h)| h.clone()).collect()
    }

    /// Number of hooks of one kind.
    pub fn count(&self, kind: HookKind) -> usize {
        match kind {
            HookKind::Before => self.before.len(),
            HookKind::After => self.after.len(),
            HookKind::Already => self.already.len(),
            HookKind::Leave => self.leave.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty() && self.already.is_empty() && self.leave.is_empty()
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("already", &self.already.len())
            .field("leave", &self.leave.len())
            .finish()
    }
}

/// Detaches a hook previously attached to a route.
#[derive(Debug, Clone)]
pub struct HookHandle {
    route: Weak<Route>,
    kind: HookKind,
    id: HookId,
}

impl HookHandle {
    pub(crate) fn new(route: &Arc<Route>, kind: HookKind, id: HookId) -> Self {
        Self {
            route: Arc::downgrade(route),
            kind,
            id,
        }
    }

    pub fn id(&self) -> HookId {
        self.id
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    /// Detach the hook. Returns false if the route is gone or the hook was
    /// already removed.
    pub fn remove(&self) -> bool {
        self.route
            .upgrade()
            .is_some_and(|route| route.remove_hook(self.kind, self.id))
    }
}

/// Chain of `before` hooks run against one match.
pub(crate) fn before_chain(hooks: Vec<BeforeHook>) -> Pipeline<Match> {
    hooks
        .into_iter()
        .map(|hook| {
            Step::task(move |m: &mut Match| hook(m.clone()))
        })
        .collect()
}

/// Chain of `leave` hooks run against the new matches.
pub(crate) fn leave_chain(hooks: Vec<LeaveHook>) -> Pipeline<Vec<Match>> {
    hooks
        .into_iter()
        .map(|hook| {
            Step::task(move |matches: &mut Vec<Match>| hook(matches.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_puts_generic_hooks_first() {
        let generic = Hooks::new().after(|_: &Match| {});
        let route = Hooks::new().after(|_: &Match| {}).before(|_| async { Flow::Continue });
        let set = HookSet::collect([&generic, &route]);
        assert_eq!(set.count(HookKind::After), 2);
        assert_eq!(set.count(HookKind::Before), 1);
        assert_eq!(set.count(HookKind::Leave), 0);
    }

    #[test]
    fn test_remove_detaches_only_that_hook() {
        let mut set = HookSet::default();
        let first = set.add(AnyHook::After(Arc::new(|_: &Match| {})));
        let second = set.add(AnyHook::After(Arc::new(|_: &Match| {})));
        assert!(set.remove(HookKind::After, first));
        assert!(!set.remove(HookKind::After, first));
        assert_eq!(set.count(HookKind::After), 1);
        assert!(set.remove(HookKind::After, second));
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_with_wrong_kind_is_noop() {
        let mut set = HookSet::default();
        let id = set.add(AnyHook::Already(Arc::new(|_: &Match| {})));
        assert!(!set.remove(HookKind::After, id));
        assert_eq!(set.count(HookKind::Already), 1);
    }

    #[test]
    fn test_hooks_debug_lists_set_kinds() {
        let hooks = Hooks::new().already(|_: &Match| {});
        assert!(!hooks.is_empty());
        assert!(format!("{:?}", hooks).contains("already: true"));
    }
}

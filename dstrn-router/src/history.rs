//! Browser history integration
//!
//! [`HistoryBackend`] abstracts the host's location and history API.
//! [`HistoryAdapter`] writes navigations through it, degrades to a full page
//! load when the history API is unusable, and tracks the short window in
//! which back/forward notifications caused by its own fragment updates must
//! be ignored.

use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::logging::{log_history_update, Diagnostic, DiagnosticSink};
use crate::options::{HistoryMethod, NavigateOptions};
use crate::RouterResult;

/// Host location and history API.
pub trait HistoryBackend: Send + Sync {
    /// Current full location (path, query and fragment), or `None` when the
    /// host has no location.
    fn location(&self) -> Option<String>;

    /// Current fragment without `#`; empty when there is none.
    fn hash(&self) -> String;

    /// Whether `push_state`/`replace_state` are available.
    fn supports_push_state(&self) -> bool;

    fn push_state(&self, state: &Value, title: &str, url: &str) -> RouterResult<()>;

    fn replace_state(&self, state: &Value, title: &str, url: &str) -> RouterResult<()>;

    /// Replace the fragment. An empty string clears it.
    fn set_hash(&self, hash: &str);

    /// Full page load of `url`.
    fn assign(&self, url: &str);
}

/// What to record for one history update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushOptions {
    pub title: String,
    pub state: Value,
    pub method: HistoryMethod,
}

impl From<&NavigateOptions> for PushOptions {
    fn from(options: &NavigateOptions) -> Self {
        Self {
            title: options.title.clone().unwrap_or_default(),
            state: options.state_obj.clone().unwrap_or(Value::Object(Default::default())),
            method: options.history_api_method,
        }
    }
}

/// Writes navigations to a [`HistoryBackend`].
pub struct HistoryAdapter {
    backend: Arc<dyn HistoryBackend>,
    ignore_popstate: AtomicBool,
    listening: AtomicBool,
}

impl fmt::Debug for HistoryAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryAdapter")
            .field("ignore_popstate", &self.ignore_popstate.load(Ordering::SeqCst))
            .field("listening", &self.listening.load(Ordering::SeqCst))
            .finish()
    }
}

impl HistoryAdapter {
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            backend,
            ignore_popstate: AtomicBool::new(false),
            listening: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<dyn HistoryBackend> {
        &self.backend
    }

    /// Current location, or `fallback` when the host has none.
    pub fn current_path(&self, fallback: &str) -> String {
        self.backend
            .location()
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Record a navigation to `path`.
    ///
    /// In hash mode the entry is written as `#/path`. When the location
    /// carries a fragment, popstate notifications are ignored while the
    /// fragment is re-applied so the browser scrolls to its anchor.
    pub async fn push(
        &self,
        path: &str,
        options: &PushOptions,
        hash_mode: bool,
        diagnostics: &dyn DiagnosticSink,
    ) {
        if !self.backend.supports_push_state() {
            self.fall_back(path, "history API not supported", diagnostics);
            return;
        }

        let normalized = format!("/{}", path).replace("//", "/");
        let url = if hash_mode {
            format!("#{}", normalized)
        } else {
            normalized
        };

        let written = match options.method {
            HistoryMethod::Push => self.backend.push_state(&options.state, &options.title, &url),
            HistoryMethod::Replace => self.backend.replace_state(&options.state, &options.title, &url),
        };
        if let Err(err) = written {
            self.fall_back(path, &err.message, diagnostics);
            return;
        }
        log_history_update(&url, options.method.as_str());

        let hash = self.backend.hash();
        if !hash.is_empty() {
            self.ignore_popstate.store(true, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if !hash_mode {
                self.backend.set_hash("");
                self.backend.set_hash(&hash);
            }
            self.ignore_popstate.store(false, Ordering::SeqCst);
        }
    }

    fn fall_back(&self, path: &str, reason: &str, diagnostics: &dyn DiagnosticSink) {
        diagnostics.emit(&Diagnostic::HistoryFallback {
            url: path.to_string(),
            reason: reason.to_string(),
        });
        self.backend.assign(path);
    }

    /// True while a popstate notification must not trigger resolution.
    pub fn should_ignore_popstate(&self) -> bool {
        self.ignore_popstate.load(Ordering::SeqCst) || !self.listening.load(Ordering::SeqCst)
    }

    /// True inside the fragment re-apply window.
    pub fn is_ignoring_popstate(&self) -> bool {
        self.ignore_popstate.load(Ordering::SeqCst)
    }

    /// Start reacting to popstate. Only hosts with a history API emit it.
    pub(crate) fn attach(&self) {
        self.listening
            .store(self.backend.supports_push_state(), Ordering::SeqCst);
    }

    /// Stop reacting to popstate.
    pub fn detach(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDiagnostics, MemoryHistory};
    use crate::RouterError;

    struct RejectingHistory {
        inner: MemoryHistory,
    }

    impl HistoryBackend for RejectingHistory {
        fn location(&self) -> Option<String> {
            self.inner.location()
        }
        fn hash(&self) -> String {
            self.inner.hash()
        }
        fn supports_push_state(&self) -> bool {
            true
        }
        fn push_state(&self, _: &Value, _: &str, _: &str) -> RouterResult<()> {
            Err(RouterError::history("quota exceeded"))
        }
        fn replace_state(&self, _: &Value, _: &str, _: &str) -> RouterResult<()> {
            Err(RouterError::history("quota exceeded"))
        }
        fn set_hash(&self, hash: &str) {
            self.inner.set_hash(hash)
        }
        fn assign(&self, url: &str) {
            self.inner.assign(url)
        }
    }

    #[tokio::test]
    async fn test_push_normalizes_path() {
        let backend = Arc::new(MemoryHistory::new("/"));
        let adapter = HistoryAdapter::new(backend.clone());
        let sink = MemoryDiagnostics::new();

        adapter.push("/users/42", &PushOptions::default(), false, &sink).await;
        assert_eq!(backend.location().as_deref(), Some("/users/42"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_push_in_hash_mode_writes_fragment() {
        let backend = Arc::new(MemoryHistory::new("/"));
        let adapter = HistoryAdapter::new(backend.clone());
        let sink = MemoryDiagnostics::new();

        adapter.push("users", &PushOptions::default(), true, &sink).await;
        assert_eq!(backend.location().as_deref(), Some("/#/users"));
    }

    #[tokio::test]
    async fn test_replace_does_not_grow_history() {
        let backend = Arc::new(MemoryHistory::new("/start"));
        let adapter = HistoryAdapter::new(backend.clone());
        let sink = MemoryDiagnostics::new();
        let options = PushOptions {
            method: HistoryMethod::Replace,
            ..PushOptions::default()
        };

        adapter.push("/next", &options, false, &sink).await;
        assert_eq!(backend.entries().len(), 1);
        assert_eq!(backend.location().as_deref(), Some("/next"));
    }

    #[tokio::test]
    async fn test_unsupported_history_falls_back_to_assign() {
        let backend = Arc::new(MemoryHistory::without_push_state("/"));
        let adapter = HistoryAdapter::new(backend.clone());
        let sink = MemoryDiagnostics::new();

        adapter.push("/about", &PushOptions::default(), false, &sink).await;
        assert_eq!(backend.assigned(), vec!["/about".to_string()]);
        assert_eq!(sink.kinds(), vec!["history_fallback"]);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_assign() {
        let backend = Arc::new(RejectingHistory {
            inner: MemoryHistory::new("/"),
        });
        let adapter = HistoryAdapter::new(backend.clone());
        let sink = MemoryDiagnostics::new();

        adapter.push("/about", &PushOptions::default(), false, &sink).await;
        assert_eq!(backend.inner.assigned(), vec!["/about".to_string()]);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_fragment_is_reapplied_in_path_mode() {
        let backend = Arc::new(MemoryHistory::new("/"));
        let adapter = HistoryAdapter::new(backend.clone());
        let sink = MemoryDiagnostics::new();

        adapter.push("/docs#install", &PushOptions::default(), false, &sink).await;
        assert_eq!(backend.hash_writes(), vec![String::new(), "install".to_string()]);
        assert!(!adapter.is_ignoring_popstate());
    }

    #[test]
    fn test_attach_requires_history_api() {
        let adapter = HistoryAdapter::new(Arc::new(MemoryHistory::without_push_state("/")));
        adapter.attach();
        assert!(!adapter.is_listening());
        assert!(adapter.should_ignore_popstate());

        let adapter = HistoryAdapter::new(Arc::new(MemoryHistory::new("/")));
        adapter.attach();
        assert!(!adapter.should_ignore_popstate());
        adapter.detach();
        assert!(adapter.should_ignore_popstate());
    }

    #[test]
    fn test_push_options_from_navigate_options() {
        let options = NavigateOptions::new()
            .with_title("T")
            .with_history_method(HistoryMethod::Replace);
        let push = PushOptions::from(&options);
        assert_eq!(push.title, "T");
        assert_eq!(push.method, HistoryMethod::Replace);
        assert_eq!(push.state, Value::Object(Default::default()));
    }
}

//! In-memory host implementations
//!
//! Headless stand-ins for the browser: a history stack, a document holding
//! link elements, and a diagnostic sink that records what it receives. They
//! back the test suite and work for hosts without a real browser.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::history::HistoryBackend;
use crate::links::{Activation, ActivationListener, Document, LinkElement, ListenerId};
use crate::logging::{Diagnostic, DiagnosticSink};
use crate::RouterResult;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// History
// =============================================================================

/// One recorded history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub state: Value,
}

impl HistoryEntry {
    fn at(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            state: Value::Null,
        }
    }
}

#[derive(Debug)]
struct HistoryStack {
    entries: Vec<HistoryEntry>,
    index: usize,
    assigned: Vec<String>,
    hash_writes: Vec<String>,
}

impl HistoryStack {
    fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with('#') {
            let base = self.current().url.split('#').next().unwrap_or_default();
            format!("{}{}", base, url)
        } else {
            url.to_string()
        }
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }
}

type HashListener = Arc<dyn Fn(&str) + Send + Sync>;

/// History stack kept in memory.
///
/// # Example
/// ```rust,ignore
/// let history = Arc::new(MemoryHistory::new("/"));
/// let router = Router::builder().history(history.clone()).build()?;
/// router.navigate("users/1", NavigateOptions::default()).await?;
/// assert_eq!(history.location().as_deref(), Some("/users/1"));
/// ```
pub struct MemoryHistory {
    stack: Mutex<HistoryStack>,
    push_state_supported: bool,
    hash_listener: Mutex<Option<HashListener>>,
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("stack", &*lock(&self.stack))
            .field("push_state_supported", &self.push_state_supported)
            .finish()
    }
}

impl MemoryHistory {
    /// History positioned at `initial`, with a history API.
    pub fn new(initial: &str) -> Self {
        Self::build(initial, true)
    }

    /// History without a history API; every navigation becomes a full load.
    pub fn without_push_state(initial: &str) -> Self {
        Self::build(initial, false)
    }

    fn build(initial: &str, push_state_supported: bool) -> Self {
        Self {
            stack: Mutex::new(HistoryStack {
                entries: vec![HistoryEntry::at(initial)],
                index: 0,
                assigned: Vec::new(),
                hash_writes: Vec::new(),
            }),
            push_state_supported,
            hash_listener: Mutex::new(None),
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        lock(&self.stack).entries.clone()
    }

    pub fn current_entry(&self) -> HistoryEntry {
        lock(&self.stack).current().clone()
    }

    /// URLs requested as full page loads.
    pub fn assigned(&self) -> Vec<String> {
        lock(&self.stack).assigned.clone()
    }

    /// Every fragment written with `set_hash`, in order.
    pub fn hash_writes(&self) -> Vec<String> {
        lock(&self.stack).hash_writes.clone()
    }

    /// Step back one entry. Returns false at the start of the stack.
    pub fn back(&self) -> bool {
        let mut stack = lock(&self.stack);
        if stack.index == 0 {
            return false;
        }
        stack.index -= 1;
        true
    }

    /// Step forward one entry. Returns false at the end of the stack.
    pub fn forward(&self) -> bool {
        let mut stack = lock(&self.stack);
        if stack.index + 1 >= stack.entries.len() {
            return false;
        }
        stack.index += 1;
        true
    }

    /// Replace the current location as if the user edited the address bar.
    pub fn set_location(&self, url: &str) {
        let mut stack = lock(&self.stack);
        let index = stack.index;
        stack.entries[index] = HistoryEntry::at(url);
    }

    /// Call `listener` with the new fragment on every `set_hash`.
    pub fn on_hash_change<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *lock(&self.hash_listener) = Some(Arc::new(listener));
    }
}

impl HistoryBackend for MemoryHistory {
    fn location(&self) -> Option<String> {
        Some(lock(&self.stack).current().url.clone())
    }

    fn hash(&self) -> String {
        let stack = lock(&self.stack);
        stack
            .current()
            .url
            .split_once('#')
            .map(|(_, hash)| hash.to_string())
            .unwrap_or_default()
    }

    fn supports_push_state(&self) -> bool {
        self.push_state_supported
    }

    fn push_state(&self, state: &Value, title: &str, url: &str) -> RouterResult<()> {
        let mut stack = lock(&self.stack);
        let entry = HistoryEntry {
            url: stack.resolve(url),
            title: title.to_string(),
            state: state.clone(),
        };
        stack.push(entry);
        Ok(())
    }

    fn replace_state(&self, state: &Value, title: &str, url: &str) -> RouterResult<()> {
        let mut stack = lock(&self.stack);
        let entry = HistoryEntry {
            url: stack.resolve(url),
            title: title.to_string(),
            state: state.clone(),
        };
        let index = stack.index;
        stack.entries[index] = entry;
        Ok(())
    }

    fn set_hash(&self, hash: &str) {
        {
            let mut stack = lock(&self.stack);
            let index = stack.index;
            let base = stack.entries[index]
                .url
                .split('#')
                .next()
                .unwrap_or_default()
                .to_string();
            stack.entries[index].url = if hash.is_empty() {
                base
            } else {
                format!("{}#{}", base, hash)
            };
            stack.hash_writes.push(hash.to_string());
        }
        let listener = lock(&self.hash_listener).clone();
        if let Some(listener) = listener {
            listener(hash);
        }
    }

    fn assign(&self, url: &str) {
        let mut stack = lock(&self.stack);
        stack.assigned.push(url.to_string());
        stack.push(HistoryEntry::at(url));
    }
}

// =============================================================================
// Document
// =============================================================================

/// Link element kept in memory.
pub struct MemoryLink {
    key: u64,
    tag: String,
    attributes: Mutex<HashMap<String, String>>,
    listeners: Mutex<Vec<(ListenerId, ActivationListener)>>,
}

impl fmt::Debug for MemoryLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLink")
            .field("key", &self.key)
            .field("tag", &self.tag)
            .field("attributes", &*lock(&self.attributes))
            .field("listeners", &lock(&self.listeners).len())
            .finish()
    }
}

impl MemoryLink {
    /// Element with the given tag and no attributes.
    pub fn new(tag: &str) -> Arc<Self> {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
        Arc::new(Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            tag: tag.to_string(),
            attributes: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// `<a href=".." data-drouter>` element.
    pub fn anchor(href: &str) -> Arc<Self> {
        let link = Self::new("a");
        link.set_attribute("href", href);
        link.set_attribute("data-drouter", "");
        link
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        lock(&self.attributes).insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) {
        lock(&self.attributes).remove(name);
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Deliver an activation to every listener and return it.
    pub fn activate(&self, mut activation: Activation) -> Activation {
        let listeners: Vec<ActivationListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&mut activation);
        }
        activation
    }

    /// Plain click on this element.
    pub fn click(&self) -> Activation {
        self.activate(Activation::new(&self.tag))
    }
}

impl LinkElement for MemoryLink {
    fn key(&self) -> u64 {
        self.key
    }

    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        lock(&self.attributes).get(name).cloned()
    }

    fn add_activation_listener(&self, listener: ActivationListener) -> ListenerId {
        let id = ListenerId::next();
        lock(&self.listeners).push((id, listener));
        id
    }

    fn remove_activation_listener(&self, id: ListenerId) {
        lock(&self.listeners).retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Document holding [`MemoryLink`]s.
///
/// Selectors of the form `[attr]` select elements carrying `attr`; any other
/// selector selects every element.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    links: Mutex<Vec<Arc<MemoryLink>>>,
}

impl MemoryDocument {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, link: Arc<MemoryLink>) {
        lock(&self.links).push(link);
    }

    pub fn remove(&self, key: u64) {
        lock(&self.links).retain(|link| link.key != key);
    }
}

impl Document for MemoryDocument {
    fn query_selector_all(&self, selector: &str) -> Vec<Arc<dyn LinkElement>> {
        let attribute = selector
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'));
        lock(&self.links)
            .iter()
            .filter(|link| attribute.is_none_or(|name| link.attribute(name).is_some()))
            .map(|link| link.clone() as Arc<dyn LinkElement>)
            .collect()
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Sink that records every diagnostic.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    emitted: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<Diagnostic> {
        lock(&self.emitted).clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        lock(&self.emitted).iter().map(Diagnostic::kind).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.emitted).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.emitted).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.emitted).clear();
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn emit(&self, diagnostic: &Diagnostic) {
        lock(&self.emitted).push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_truncates_forward_entries() {
        let history = MemoryHistory::new("/a");
        history.push_state(&Value::Null, "", "/b").unwrap();
        history.push_state(&Value::Null, "", "/c").unwrap();
        assert!(history.back());
        history.push_state(&Value::Null, "", "/d").unwrap();

        let urls: Vec<String> = history.entries().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, ["/a", "/b", "/d"]);
        assert!(!history.forward());
    }

    #[test]
    fn test_set_hash_rewrites_fragment_and_notifies() {
        let history = MemoryHistory::new("/page#old");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        history.on_hash_change(move |hash| sink.lock().unwrap().push(hash.to_string()));

        history.set_hash("new");
        assert_eq!(history.location().as_deref(), Some("/page#new"));
        history.set_hash("");
        assert_eq!(history.location().as_deref(), Some("/page"));
        assert_eq!(*seen.lock().unwrap(), ["new", ""]);
    }

    #[test]
    fn test_document_attribute_selector() {
        let document = MemoryDocument::new();
        document.add(MemoryLink::anchor("/a"));
        let plain = MemoryLink::new("a");
        plain.set_attribute("href", "/b");
        document.add(plain);

        assert_eq!(document.query_selector_all("[data-drouter]").len(), 1);
        assert_eq!(document.query_selector_all("a").len(), 2);
    }
}

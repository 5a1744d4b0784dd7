//! Structured logging and diagnostics.
//!
//! Lifecycle events go straight to `tracing`. Non-fatal problems a host may
//! want to surface (an unmatched location, a hook attached to an unknown
//! route, a degraded history update) are [`Diagnostic`]s delivered to a
//! [`DiagnosticSink`]; the default sink logs them at warn level.

use std::fmt;

use crate::engine::NavigationId;

// =============================================================================
// Diagnostics
// =============================================================================

/// Non-fatal condition reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Nothing matched and no fallback route is installed.
    NoMatch {
        /// The routable location that failed to match.
        location: String,
    },
    /// A hook was attached to a route that does not exist.
    UnknownRoute {
        /// How the caller referred to the route.
        identifier: String,
    },
    /// The history API was unusable; a full page load was requested instead.
    HistoryFallback {
        /// Target of the full page load.
        url: String,
        /// Why the history API was not used.
        reason: String,
    },
    /// The router was created with an empty root.
    MissingRoot,
}

impl Diagnostic {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoMatch { .. } => "no_match",
            Self::UnknownRoute { .. } => "unknown_route",
            Self::HistoryFallback { .. } => "history_fallback",
            Self::MissingRoot => "missing_root",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch { location } => {
                write!(f, "There is no path matching '{}'", location)
            }
            Self::UnknownRoute { identifier } => {
                write!(f, "Route not found for {}; hook not attached", identifier)
            }
            Self::HistoryFallback { url, reason } => {
                write!(f, "History API unusable ({}); loading '{}'", reason, url)
            }
            Self::MissingRoot => write!(f, "Router created without a root path"),
        }
    }
}

/// Receiver of [`Diagnostic`]s.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Default sink: one `warn` event per diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&self, diagnostic: &Diagnostic) {
        tracing::warn!(kind = %diagnostic.kind(), "{}", diagnostic);
    }
}

// =============================================================================
// Lifecycle Logging
// =============================================================================

/// Log router initialization. Logged at Info level.
pub fn log_router_init(root: &str, strategy: &str, hash: bool) {
    tracing::info!(
        root = %root,
        strategy = %strategy,
        hash = %hash,
        "Router initialized"
    );
}

/// Log router teardown with the number of queued navigations dropped.
/// Logged at Info level.
pub fn log_router_destroyed(dropped_requests: usize) {
    tracing::info!(
        dropped_requests = %dropped_requests,
        "Router destroyed"
    );
}

/// Log route registration. Logged at Trace level.
pub fn log_route_registered(name: &str, pattern: &str) {
    tracing::trace!(
        name = %name,
        pattern = %pattern,
        "Route registered"
    );
}

/// Log route removal. Logged at Debug level.
pub fn log_routes_removed(identifier: &str, removed: usize) {
    tracing::debug!(
        identifier = %identifier,
        removed = %removed,
        "Routes removed"
    );
}

// =============================================================================
// Navigation Events
// =============================================================================

/// Navigation lifecycle events for logging.
#[derive(Debug, Clone)]
pub enum NavigationLogEvent {
    /// The run started.
    Started {
        /// `resolve` or `navigate`.
        kind: &'static str,
    },
    /// Another run was in flight; this one waits.
    Queued {
        /// Requests waiting ahead of and including this one.
        position: usize,
    },
    /// A pipeline stage ran.
    Stage {
        /// Stage name.
        stage: &'static str,
    },
    /// The run finished.
    Completed {
        /// Outcome kind.
        outcome: &'static str,
        /// Number of matches committed.
        matches: usize,
    },
    /// A hook cancelled the run.
    Aborted,
    /// The request was cancelled before its turn.
    Dropped,
}

/// Log a navigation event.
///
/// - Started/Completed/Queued: Debug level
/// - Stage: Trace level
/// - Aborted/Dropped: Info level
pub fn log_navigation_event(id: NavigationId, target: &str, event: NavigationLogEvent) {
    match event {
        NavigationLogEvent::Started { kind } => {
            tracing::debug!(
                navigation_id = %id,
                target = %target,
                kind = %kind,
                "Navigation started"
            );
        }
        NavigationLogEvent::Queued { position } => {
            tracing::debug!(
                navigation_id = %id,
                target = %target,
                position = %position,
                "Navigation queued"
            );
        }
        NavigationLogEvent::Stage { stage } => {
            tracing::trace!(
                navigation_id = %id,
                target = %target,
                stage = %stage,
                "Navigation stage"
            );
        }
        NavigationLogEvent::Completed { outcome, matches } => {
            tracing::debug!(
                navigation_id = %id,
                target = %target,
                outcome = %outcome,
                matches = %matches,
                "Navigation completed"
            );
        }
        NavigationLogEvent::Aborted => {
            tracing::info!(
                navigation_id = %id,
                target = %target,
                "Navigation aborted by hook"
            );
        }
        NavigationLogEvent::Dropped => {
            tracing::info!(
                navigation_id = %id,
                target = %target,
                "Navigation dropped before its turn"
            );
        }
    }
}

// =============================================================================
// History Logging
// =============================================================================

/// Log a history entry written through the history API. Logged at Debug level.
pub fn log_history_update(url: &str, method: &str) {
    tracing::debug!(
        url = %url,
        method = %method,
        "History updated"
    );
}

// =============================================================================
// Cache Events
// =============================================================================

/// Pattern cache events for logging.
#[derive(Debug, Clone, Copy)]
pub enum PatternCacheLogEvent {
    Hit,
    Miss,
}

/// Log a pattern cache lookup. Logged at Trace level.
pub fn log_pattern_cache(pattern: &str, event: PatternCacheLogEvent) {
    match event {
        PatternCacheLogEvent::Hit => {
            tracing::trace!(pattern = %pattern, "Pattern cache hit");
        }
        PatternCacheLogEvent::Miss => {
            tracing::trace!(pattern = %pattern, "Pattern cache miss");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::NoMatch {
            location: "/missing".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "There is no path matching '/missing'");
        assert_eq!(diagnostic.kind(), "no_match");
    }

    #[test]
    fn test_logging_functions_do_not_panic_without_subscriber() {
        let id = NavigationId::new();
        log_router_init("", "ONE", false);
        log_route_registered("user", "users/:id");
        log_routes_removed("name:user", 1);
        log_navigation_event(id, "/a", NavigationLogEvent::Started { kind: "navigate" });
        log_navigation_event(id, "/a", NavigationLogEvent::Queued { position: 1 });
        log_navigation_event(id, "/a", NavigationLogEvent::Stage { stage: "find_matches" });
        log_navigation_event(
            id,
            "/a",
            NavigationLogEvent::Completed {
                outcome: "matched",
                matches: 1,
            },
        );
        log_navigation_event(id, "/a", NavigationLogEvent::Aborted);
        log_navigation_event(id, "/a", NavigationLogEvent::Dropped);
        log_history_update("/a", "pushState");
        log_pattern_cache("a/:b", PatternCacheLogEvent::Miss);
        log_router_destroyed(0);
        TracingDiagnostics.emit(&Diagnostic::MissingRoot);
    }
}

//! Mutable state threaded through a navigation pipeline

use std::sync::Arc;

use super::router::RouterInner;
use super::types::{NavigationId, NavigationOutcome, NavigationRequest, RequestKind, ResolvedState};
use crate::matcher::{check_for_hash, Match};
use crate::options::{NavigateOptions, ResolveSettings};
use crate::pipeline::Completion;

/// Per-run context for the resolve and navigate pipelines.
pub(crate) struct NavigationContext {
    pub(crate) id: NavigationId,
    pub(crate) router: Arc<RouterInner>,
    /// Root-prefixed target, hash included
    pub(crate) to: Option<String>,
    /// Routable part of `to`
    pub(crate) location: Option<String>,
    pub(crate) settings: ResolveSettings,
    pub(crate) options: NavigateOptions,
    pub(crate) matches: Vec<Match>,
    pub(crate) not_found_handled: bool,
    pub(crate) forced: Option<Match>,
}

impl NavigationContext {
    pub(crate) fn new(router: Arc<RouterInner>, request: NavigationRequest, settings: ResolveSettings) -> Self {
        // A navigate target is routable right away; resolve normalises its
        // location in the first stage.
        let location = match request.kind {
            RequestKind::Navigate => request
                .target
                .as_deref()
                .map(|to| check_for_hash(to, settings.hash)),
            RequestKind::Resolve => request.target.clone(),
        };
        Self {
            id: request.id,
            router,
            to: request.target,
            location,
            settings,
            options: request.options,
            matches: Vec::new(),
            not_found_handled: false,
            forced: None,
        }
    }

    pub(crate) fn to(&self) -> &str {
        self.to.as_deref().unwrap_or_default()
    }

    pub(crate) fn location(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }

    pub(crate) fn label(&self) -> &str {
        self.to.as_deref().unwrap_or("<current>")
    }

    pub(crate) fn into_outcome(mut self, completion: Completion) -> NavigationOutcome {
        match completion {
            Completion::Aborted => match self.forced {
                Some(m) => NavigationOutcome::Forced(m),
                None => NavigationOutcome::Aborted,
            },
            Completion::Finished if self.matches.is_empty() => NavigationOutcome::NotFound,
            Completion::Finished if self.not_found_handled => {
                NavigationOutcome::Fallback(self.matches.remove(0))
            }
            Completion::Finished => NavigationOutcome::Matched(self.matches),
        }
    }
}

/// Context of the per-match sequence: already check, before hooks, handler,
/// after hooks.
pub(crate) struct MatchRun {
    pub(crate) router: Arc<RouterInner>,
    pub(crate) route_match: Match,
    pub(crate) options: NavigateOptions,
    /// Resolved State when the navigation started this match
    pub(crate) current: ResolvedState,
}

//! Navigation request and outcome types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::matcher::Match;
use crate::options::NavigateOptions;

/// Resolved State: the matches of the last committed navigation.
pub type ResolvedState = Option<Vec<Match>>;

/// Identity of one navigation run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationId(Uuid);

impl NavigationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NavigationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nav_{}", self.0)
    }
}

/// Which pipeline a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Resolve,
    Navigate,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Navigate => "navigate",
        }
    }
}

/// A navigation waiting for, or holding, its turn.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationRequest {
    pub id: NavigationId,
    pub kind: RequestKind,
    /// Root-prefixed target; `None` resolves the current location
    pub target: Option<String>,
    pub options: NavigateOptions,
}

impl NavigationRequest {
    pub fn new(kind: RequestKind, target: Option<String>, options: NavigateOptions) -> Self {
        Self {
            id: NavigationId::new(),
            kind,
            target,
            options,
        }
    }

    /// Target for log lines.
    pub fn target_label(&self) -> &str {
        self.target.as_deref().unwrap_or("<current>")
    }
}

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// Routes matched and ran
    Matched(Vec<Match>),
    /// Nothing matched; the fallback route ran
    Fallback(Match),
    /// Nothing matched and no fallback is installed
    NotFound,
    /// A before or leave hook cancelled the run
    Aborted,
    /// `force` committed the target without running routes
    Forced(Match),
    /// The request was cancelled before its turn came
    Dropped,
}

impl NavigationOutcome {
    /// Matches produced by the run.
    pub fn matches(&self) -> &[Match] {
        match self {
            Self::Matched(matches) => matches,
            Self::Fallback(m) | Self::Forced(m) => std::slice::from_ref(m),
            Self::NotFound | Self::Aborted | Self::Dropped => &[],
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched(_) => "matched",
            Self::Fallback(_) => "fallback",
            Self::NotFound => "not_found",
            Self::Aborted => "aborted",
            Self::Forced(_) => "forced",
            Self::Dropped => "dropped",
        }
    }
}

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStatus {
    /// Nothing running
    Idle,
    /// One run in flight, nobody waiting
    Resolving,
    /// One run in flight and at least one waiting
    Queued,
    /// Torn down
    Destroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_id_display_prefix() {
        let id = NavigationId::new();
        assert!(id.to_string().starts_with("nav_"));
        assert_ne!(id, NavigationId::new());
    }

    #[test]
    fn test_outcome_without_matches() {
        assert!(NavigationOutcome::NotFound.matches().is_empty());
        assert_eq!(NavigationOutcome::Dropped.as_str(), "dropped");
    }
}

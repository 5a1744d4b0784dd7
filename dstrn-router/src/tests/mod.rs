//! Test module for dstrn-router
//!
//! Property-based tests (proptest) for matching, registry and errors, plus
//! async scenario tests driving a [`Router`] over the in-memory host.

#[cfg(test)]
pub mod matcher_tests;

#[cfg(test)]
pub mod registry_tests;

#[cfg(test)]
pub mod error_tests;





use std::sync::Arc;

use crate::memory::{MemoryDiagnostics, MemoryHistory};
use crate::{Router, RouterConfig};

/// Router over an in-memory history starting at `/`, with recorded
/// diagnostics.
pub(crate) struct Harness {
    pub router: Router,
    pub history: Arc<MemoryHistory>,
    pub diagnostics: Arc<MemoryDiagnostics>,
}

pub(crate) fn harness() -> Harness {
    harness_with(RouterConfig::new())
}

pub(crate) fn harness_with(config: RouterConfig) -> Harness {
    let history = Arc::new(MemoryHistory::new("/"));
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let router = Router::builder()
        .config(config)
        .history(history.clone())
        .diagnostics(diagnostics.clone())
        .build()
        .expect("valid router config");
    Harness {
        router,
        history,
        diagnostics,
    }
}

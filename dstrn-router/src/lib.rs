//! # dstrn-router
//!
//! Client-side navigation engine for single-page applications.
//!
//! ## Overview
//!
//! - **Path matching** of `:param`, `*` and `/?` templates or raw regexes,
//!   with percent-decoded path and query parameters
//! - **Hook pipeline** (`before`, `after`, `already`, `leave`) where `before`
//!   and `leave` hooks can cancel a navigation
//! - **Serialized navigations**: one run at a time, FIFO, so later
//!   navigations observe the state earlier ones committed
//! - **History integration** through a [`HistoryBackend`], in path or
//!   fragment mode, with full-page-load fallback
//! - **Link interception** of `[data-drouter]` elements in a [`Document`]
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Host (browser bindings or the in-memory doubles of `memory`) │
//! │   HistoryBackend        Document / LinkElement                │
//! └──────────┬───────────────────────┬────────────────────────────┘
//!            │                       │ activation
//!            ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Router                                                        │
//! │   RouteRegistry ── matcher          LinkInterceptor           │
//! │   RunQueue ──► Pipeline<NavigationContext> ──► Resolved State │
//! │                   └─► Pipeline<MatchRun> (hooks, handler)     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dstrn_router::prelude::*;
//! use std::sync::Arc;
//!
//! let history = Arc::new(MemoryHistory::new("/"));
//! let router = Router::builder()
//!     .config(RouterConfig::new().with_root("/"))
//!     .history(history.clone())
//!     .build()?;
//!
//! router.register(
//!     RouteDef::new("users/:id", |m: &Match| println!("user {:?}", m.param("id")))
//!         .name("user")
//!         .hooks(Hooks::new().before(|m: Match| async move {
//!             Flow::from(m.param("id") != Some("0"))
//!         })),
//! )?;
//!
//! let outcome = router.navigate("users/42", NavigateOptions::default()).await?;
//! assert!(outcome.is_matched());
//! assert_eq!(history.location().as_deref(), Some("/users/42"));
//! ```
//!
//! ## Errors
//!
//! Only caller mistakes (an invalid configuration or pattern) and calls on a
//! destroyed router return [`RouterError`]. Unmatched locations, cancelled
//! navigations and history fallbacks are reported through
//! [`NavigationOutcome`] and the [`DiagnosticSink`].

mod config;
pub mod engine;
mod error;
pub mod history;
pub mod hooks;
pub mod links;
pub mod logging;
pub mod matcher;
pub mod memory;
pub mod options;
pub mod pipeline;
pub mod registry;

#[cfg(test)]
mod tests;

pub use config::{ConfigValidationError, DEFAULT_LINKS_SELECTOR, ResolveStrategy, RouterConfig};
pub use engine::{
    NavigationId, NavigationOutcome, NavigationRequest, RequestKind, ResolvedState, Router,
    RouterBuilder, RouterStatus,
};
pub use error::{RouterError, RouterErrorCode, RouterResult};
pub use history::{HistoryAdapter, HistoryBackend, PushOptions};
pub use hooks::{HookHandle, HookKind, Hooks};
pub use links::{Activation, Document, LinkElement, LinkInterceptor, Navigator, parse_link_options};
pub use logging::{Diagnostic, DiagnosticSink, TracingDiagnostics};
pub use matcher::{Match, PathParams, PathPattern, QueryParams};
pub use options::{HistoryMethod, NavigateOptions, ResolveOptions};
pub use pipeline::{Completion, Flow, Pipeline, Step};
pub use registry::{GenerateOptions, Route, RouteDef, RouteHandle, RouteHandler, RouteIdentifier};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use dstrn_router::prelude::*;
/// ```
pub mod prelude {
    pub use crate::memory::{MemoryDiagnostics, MemoryDocument, MemoryHistory, MemoryLink};
    pub use crate::{
        Flow, GenerateOptions, HistoryBackend, HistoryMethod, Hooks, Match, NavigateOptions,
        NavigationOutcome, PathParams, ResolveOptions, ResolveStrategy, RouteDef, Router,
        RouterConfig, RouterError, RouterResult,
    };
}

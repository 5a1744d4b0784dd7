//! Navigation engine
//!
//! [`Router`] owns the route registry, the Resolved State and a FIFO run
//! queue. Every `resolve`/`navigate` call becomes a [`NavigationRequest`];
//! requests run one at a time through a [`Pipeline`](crate::pipeline::Pipeline)
//! of stages, so a navigation issued while another is in flight observes the
//! state the earlier one committed.
//!
//! ```text
//! navigate(path) ──► run queue ──► check_force ─► find_matches ─┬─ matched ──► leave hooks ─► per match ─┐
//!                     (FIFO)                                     └─ no match ─► leave hooks ─► fallback? ──┤
//!                                                                                                           ▼
//!                                                               update_state ◄── update_browser_url ◄───────┘
//! ```

mod context;
mod router;
mod queue;
mod stages;
mod types;

pub(crate) use stages::collect_matches;
pub use router::{Router, RouterBuilder};
pub use types::{
    NavigationId, NavigationOutcome, NavigationRequest, RequestKind, ResolvedState, RouterStatus,
};

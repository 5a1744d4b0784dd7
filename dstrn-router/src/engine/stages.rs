//! Pipeline stages
//!
//! resolve:  set_location → find_matches → route branch → update_state
//! navigate: check_force → find_matches → route branch → update_browser_url
//!           → update_state
//!
//! The route branch runs leave hooks then every match when something
//! matched; otherwise leave hooks, fallback substitution, and either the
//! fallback match or the not-found diagnostic.

use futures::future::BoxFuture;
use std::sync::Arc;

use super::context::{MatchRun, NavigationContext};
use crate::config::ResolveStrategy;
use crate::history::PushOptions;
use crate::hooks::{before_chain, leave_chain};
use crate::logging::{log_navigation_event, Diagnostic, NavigationLogEvent};
use crate::matcher::{check_for_hash, extract_get_params, match_route, Match};
use crate::pipeline::{Completion, Flow, Pipeline, Step};
use crate::registry::RouteHandle;

pub(crate) fn resolve_pipeline() -> Pipeline<NavigationContext> {
    Pipeline::new()
        .then(Step::sync(set_location))
        .then(Step::sync(find_matches))
        .then(route_branch())
        .then(Step::sync(update_state))
}

pub(crate) fn navigate_pipeline() -> Pipeline<NavigationContext> {
    Pipeline::new()
        .then(Step::sync(check_force))
        .then(Step::sync(find_matches))
        .then(route_branch())
        .then(Step::task(update_browser_url))
        .then(Step::sync(update_state))
}

pub(crate) fn match_pipeline() -> Pipeline<MatchRun> {
    Pipeline::new().then(Step::branch(
        is_already_resolved,
        vec![Step::sync(call_already_hooks)],
        vec![
            Step::task(call_before_hooks),
            Step::sync(call_handler),
            Step::sync(call_after_hooks),
        ],
    ))
}

fn route_branch() -> Step<NavigationContext> {
    Step::branch(
        |ctx: &NavigationContext| !ctx.matches.is_empty(),
        vec![Step::task(process_leave_hooks), Step::task(run_matches)],
        vec![
            Step::task(process_leave_hooks),
            Step::sync(check_not_found),
            Step::branch(
                |ctx: &NavigationContext| ctx.not_found_handled,
                vec![Step::task(run_matches)],
                vec![Step::sync(warn_not_found)],
            ),
        ],
    )
}

fn trace_stage(ctx: &NavigationContext, stage: &'static str) {
    if ctx.router.config.debug_logging {
        log_navigation_event(ctx.id, ctx.label(), NavigationLogEvent::Stage { stage });
    }
}

/// Collect the routes matching `location`, in registration order.
pub(crate) fn collect_matches(
    routes: &[RouteHandle],
    location: &str,
    to: &str,
    root: &str,
    strategy: ResolveStrategy,
) -> Vec<Match> {
    let mut found = Vec::new();
    for route in routes {
        if let Some(m) = match_route(location, to, route, root) {
            found.push(m);
            if strategy == ResolveStrategy::One {
                break;
            }
        }
    }
    found
}

// =============================================================================
// Navigation stages
// =============================================================================

fn set_location(ctx: &mut NavigationContext) -> Flow {
    trace_stage(ctx, "set_location");
    if ctx.location.is_none() {
        let current = ctx.router.history.current_path(&ctx.router.root);
        ctx.to = Some(current.clone());
        ctx.location = Some(current);
    }
    ctx.location = Some(check_for_hash(ctx.location(), ctx.settings.hash));
    Flow::Continue
}

fn check_force(ctx: &mut NavigationContext) -> Flow {
    trace_stage(ctx, "check_force");
    if !ctx.options.force {
        return Flow::Continue;
    }
    let forced = ctx.router.path_to_match(ctx.to());
    ctx.router.set_current(Some(vec![forced.clone()]));
    ctx.forced = Some(forced);
    Flow::Abort
}

fn find_matches(ctx: &mut NavigationContext) -> Flow {
    trace_stage(ctx, "find_matches");
    let routes = ctx.router.routes();
    ctx.matches = collect_matches(
        &routes,
        ctx.location(),
        ctx.to(),
        &ctx.router.root,
        ctx.settings.strategy,
    );
    Flow::Continue
}

/// Leave hooks of every previously resolved route the new location no
/// longer matches. The fallback route is left once the path it served
/// changes. Any abort cancels the navigation.
fn process_leave_hooks(ctx: &mut NavigationContext) -> BoxFuture<'_, Flow> {
    Box::pin(async move {
        trace_stage(ctx, "process_leave_hooks");
        if !ctx.options.call_hooks {
            return Flow::Continue;
        }
        let Some(previous) = ctx.router.current() else {
            return Flow::Continue;
        };

        for resolved in previous {
            let hooks = resolved.route.hooks().leave();
            if hooks.is_empty() {
                continue;
            }
            let left = if resolved.route.is_fallback() {
                extract_get_params(ctx.location()).0 != resolved.url
            } else {
                match_route(ctx.location(), ctx.location(), &resolved.route, "").is_none()
            };
            if !left {
                continue;
            }

            let mut arriving = ctx.matches.clone();
            if leave_chain(hooks).run(&mut arriving).await == Completion::Aborted {
                log_navigation_event(ctx.id, ctx.label(), NavigationLogEvent::Aborted);
                return Flow::Abort;
            }
        }
        Flow::Continue
    })
}

fn run_matches(ctx: &mut NavigationContext) -> BoxFuture<'_, Flow> {
    Box::pin(async move {
        trace_stage(ctx, "run_matches");
        let router = ctx.router.clone();
        let current = router.current();

        for route_match in ctx.matches.clone() {
            let mut run = MatchRun {
                router: router.clone(),
                route_match,
                options: ctx.options.clone(),
                current: current.clone(),
            };
            if router.match_pipeline.run(&mut run).await == Completion::Aborted {
                log_navigation_event(ctx.id, ctx.label(), NavigationLogEvent::Aborted);
                return Flow::Abort;
            }
        }
        Flow::Continue
    })
}

fn check_not_found(ctx: &mut NavigationContext) -> Flow {
    trace_stage(ctx, "check_not_found");
    if let Some(route) = ctx.router.not_found_route() {
        ctx.not_found_handled = true;
        ctx.matches = vec![Match::for_location(ctx.location(), ctx.to(), route)];
    }
    Flow::Continue
}

fn warn_not_found(ctx: &mut NavigationContext) -> Flow {
    if ctx.settings.no_match_warning {
        ctx.router.diagnostics.emit(&Diagnostic::NoMatch {
            location: ctx.location().to_string(),
        });
    }
    Flow::Continue
}

fn update_browser_url(ctx: &mut NavigationContext) -> BoxFuture<'_, Flow> {
    Box::pin(async move {
        trace_stage(ctx, "update_browser_url");
        if ctx.options.update_browser_url {
            let options = PushOptions::from(&ctx.options);
            let router = ctx.router.clone();
            router
                .history
                .push(ctx.to(), &options, ctx.settings.hash, router.diagnostics.as_ref())
                .await;
        }
        Flow::Continue
    })
}

/// Commit the Resolved State. An empty result always clears it.
fn update_state(ctx: &mut NavigationContext) -> Flow {
    trace_stage(ctx, "update_state");
    if ctx.matches.is_empty() {
        ctx.router.set_current(None);
    } else if ctx.options.update_state {
        ctx.router.set_current(Some(ctx.matches.clone()));
    }
    Flow::Continue
}

// =============================================================================
// Per-match stages
// =============================================================================

/// Compared against the first currently resolved match only.
fn is_already_resolved(run: &MatchRun) -> bool {
    run.current
        .as_ref()
        .and_then(|current| current.first())
        .is_some_and(|first| first.is_same_location(&run.route_match))
}

fn call_already_hooks(run: &mut MatchRun) -> Flow {
    if !run.options.call_hooks {
        return Flow::Continue;
    }
    for resolved in run.current.iter().flatten() {
        for hook in resolved.route.hooks().already() {
            hook(&run.route_match);
        }
    }
    Flow::Continue
}

fn call_before_hooks(run: &mut MatchRun) -> BoxFuture<'_, Flow> {
    Box::pin(async move {
        if !run.options.call_hooks {
            return Flow::Continue;
        }
        let hooks = run.route_match.route.hooks().before();
        if hooks.is_empty() {
            return Flow::Continue;
        }
        let mut target = run.route_match.clone();
        match before_chain(hooks).run(&mut target).await {
            Completion::Finished => Flow::Continue,
            Completion::Aborted => Flow::Abort,
        }
    })
}

fn call_handler(run: &mut MatchRun) -> Flow {
    if run.options.call_handler {
        let handler = Arc::clone(run.route_match.route.handler());
        handler(&run.route_match);
    }
    run.router.update_page_links();
    Flow::Continue
}

fn call_after_hooks(run: &mut MatchRun) -> Flow {
    if run.options.call_hooks {
        for hook in run.route_match.route.hooks().after() {
            hook(&run.route_match);
        }
    }
    Flow::Continue
}

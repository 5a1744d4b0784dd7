//! Property-based tests for the route registry
//!
//! Generated paths match back to the parameters they were built from, and
//! registration order is matching order.

use proptest::prelude::*;

use crate::config::ResolveStrategy;
use crate::engine::collect_matches;
use crate::matcher::{clean, match_route, Match, PathParams};
use crate::registry::{GenerateOptions, RouteDef, RouteRegistry};
use crate::RouterConfig;

use super::harness_with;

fn noop(_: &Match) {}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(150))]

    /// generate() followed by matching the result yields the same parameters.
    #[test]
    fn prop_generate_then_match_round_trips(
        root in prop_oneof![Just(String::new()), "[a-z]{1,6}"],
        id in "[a-z0-9]{1,10}",
        post in "[a-z0-9]{1,10}",
    ) {
        let mut registry = RouteRegistry::new(&root);
        let route = registry
            .register(RouteDef::new("users/:id/posts/:post", noop).name("post"))
            .unwrap();
        let params = PathParams::from([
            ("id".to_string(), id.clone()),
            ("post".to_string(), post.clone()),
        ]);

        let path = registry.generate("post", &params, GenerateOptions::default()).unwrap();
        prop_assert!(path.starts_with('/'));

        let location = clean(&path);
        let matched = match_route(&location, &location, &route, registry.root()).unwrap();
        prop_assert_eq!(matched.path_params, params);
        prop_assert_eq!(matched.url, format!("users/{}/posts/{}", id, post));
    }

    /// A path generated by the router resolves back to the named route it
    /// came from, with the same parameters and a root-relative url.
    #[test]
    fn prop_router_generate_then_match_path(
        root in prop_oneof![Just(String::new()), "[a-z]{1,6}"],
        id in "[a-z0-9]{1,10}",
        post in "[0-9]{1,5}",
    ) {
        let h = harness_with(RouterConfig::new().with_root(root.as_str()));
        h.router.on("about", noop).unwrap();
        h.router
            .register(RouteDef::new("users/:id/posts/:post", noop).name("post"))
            .unwrap();
        let params = PathParams::from([
            ("id".to_string(), id.clone()),
            ("post".to_string(), post.clone()),
        ]);

        let path = h.router.generate("post", &params, GenerateOptions::default()).unwrap();
        let matches = h.router.match_path(&path).unwrap();

        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(matches[0].route.name(), "post");
        prop_assert_eq!(&matches[0].path_params, &params);
        prop_assert_eq!(&matches[0].url, &format!("users/{}/posts/{}", id, post));
    }

    /// Without the root the generated path is the route's own part.
    #[test]
    fn prop_generate_without_root(root in "[a-z]{1,6}", id in "[0-9]{1,5}") {
        let mut registry = RouteRegistry::new(&root);
        registry.register(RouteDef::new("item/:id", noop).name("item")).unwrap();
        let params = PathParams::from([("id".to_string(), id.clone())]);
        let path = registry
            .generate("item", &params, GenerateOptions { include_root: false })
            .unwrap();
        prop_assert_eq!(path, format!("/item/{}", id));
    }

    /// The first registered matching route wins under the ONE strategy.
    #[test]
    fn prop_registration_order_is_matching_order(segment in "[a-z]{1,8}") {
        let mut registry = RouteRegistry::new("/");
        let first = registry.register(RouteDef::new(":any", noop)).unwrap();
        registry.register(RouteDef::new(segment.as_str(), noop)).unwrap();

        let matches = collect_matches(registry.routes(), &segment, &segment, "", ResolveStrategy::One);
        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(matches[0].route.id(), first.id());

        let all = collect_matches(registry.routes(), &segment, &segment, "", ResolveStrategy::All);
        prop_assert_eq!(all.len(), 2);
    }
}

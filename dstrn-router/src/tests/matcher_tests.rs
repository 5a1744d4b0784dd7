//! Property-based tests for path matching
//!
//! Literal templates match exactly their own path, parameters capture whole
//! segments, and query parsing keeps every repeated value.

use proptest::prelude::*;
use std::sync::Arc;

use crate::hooks::HookSet;
use crate::matcher::{
    clean, extract_get_params, match_route, parse_query, CompiledPattern, Match, PathPattern,
};
use crate::registry::Route;

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

fn literal_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..5).prop_map(|parts| parts.join("/"))
}

fn route_for(pattern: &str) -> Arc<Route> {
    let compiled = CompiledPattern::compile(PathPattern::from(pattern)).unwrap();
    Arc::new(Route::new(
        clean(pattern),
        compiled,
        Arc::new(|_: &Match| {}),
        HookSet::default(),
        false,
    ))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A template without tokens matches exactly its own cleaned path.
    #[test]
    fn prop_literal_matches_only_itself(path in literal_path(), extra in segment()) {
        let route = route_for(&path);
        let padded = format!("/{}/", path);
        let matched = match_route(&padded, &padded, &route, "");
        prop_assert!(matched.is_some());
        prop_assert_eq!(matched.unwrap().url, path.clone());

        let longer = format!("{}/{}", path, extra);
        prop_assert!(match_route(&longer, &longer, &route, "").is_none());
        let glued = format!("{}{}", path, extra);
        prop_assert!(match_route(&glued, &glued, &route, "").is_none());
    }

    /// `a/:x/b` captures any single segment and nothing spanning a `/`.
    #[test]
    fn prop_param_captures_single_segment(value in "[a-zA-Z0-9_.~-]{1,12}", other in segment()) {
        let route = route_for("a/:x/b");
        let location = format!("a/{}/b", value);
        let matched = match_route(&location, &location, &route, "").unwrap();
        prop_assert_eq!(matched.param("x"), Some(value.as_str()));

        let nested = format!("a/{}/{}/b", value, other);
        prop_assert!(match_route(&nested, &nested, &route, "").is_none());
    }

    /// The root prefix is removed from the url but parameters are unaffected.
    #[test]
    fn prop_root_is_stripped_from_url(root in segment(), id in segment()) {
        let route = route_for(&format!("{}/users/:id", root));
        let location = format!("{}/users/{}", root, id);
        let matched = match_route(&location, &location, &route, &root).unwrap();
        prop_assert_eq!(matched.param("id"), Some(id.as_str()));
        prop_assert_eq!(&matched.url, &format!("users/{}", id));
    }

    /// Repeated keys keep every value in order.
    #[test]
    fn prop_query_accumulates_values(values in prop::collection::vec("[a-z0-9]{1,6}", 1..6)) {
        let query = values
            .iter()
            .map(|v| format!("k={}", v))
            .collect::<Vec<_>>()
            .join("&");
        let params = parse_query(&query);
        prop_assert_eq!(params.get_all("k"), values.as_slice());
        prop_assert_eq!(params.get("k"), Some(values[0].as_str()));
    }

    /// Percent-encoded values decode to the original text.
    #[test]
    fn prop_query_values_are_decoded(value in "[a-z ]{1,10}") {
        let encoded = value.replace(' ', "%20");
        let params = parse_query(&format!("q={}", encoded));
        prop_assert_eq!(params.get("q"), Some(value.as_str()));
    }

    /// Cleaning is idempotent and never leaves a boundary slash.
    #[test]
    fn prop_clean_is_idempotent(path in "[a-z/]{0,16}") {
        let once = clean(&path);
        prop_assert_eq!(clean(&once), once.clone());
        prop_assert!(!once.starts_with('/') && !once.ends_with('/'));
    }

    /// The query string is everything after the first `?`.
    #[test]
    fn prop_get_params_split(path in literal_path(), query in "[a-z=&?]{0,12}") {
        let url = format!("/{}?{}", path, query);
        let (p, q) = extract_get_params(&url);
        prop_assert_eq!(p, path);
        prop_assert_eq!(q, query);
    }
}

#[test]
fn test_match_carries_hash_from_target() {
    let route = route_for("docs");
    let matched = match_route("docs", "/docs#intro", &route, "").unwrap();
    assert_eq!(matched.hash_string, "intro");
}

#[test]
fn test_match_query_params() {
    let route = route_for("search");
    let matched = match_route("search?q=rust&tag=a&tag=b", "search", &route, "").unwrap();
    assert_eq!(matched.url, "search");
    assert_eq!(matched.query_string, "q=rust&tag=a&tag=b");
    assert_eq!(matched.query("q"), Some("rust"));
    assert_eq!(matched.query_params.get_all("tag").len(), 2);
}

#[test]
fn test_root_route_keeps_empty_url() {
    let route = route_for("/");
    let matched = match_route("/", "/", &route, "").unwrap();
    assert_eq!(matched.url, "");
    assert!(match_route("about", "about", &route, "").is_none());
}

#[test]
fn test_same_location_ignores_hash() {
    let route = route_for("users/:id");
    let a = match_route("users/1", "users/1#a", &route, "").unwrap();
    let b = match_route("users/1", "users/1#b", &route, "").unwrap();
    let c = match_route("users/2", "users/2", &route, "").unwrap();
    assert!(a.is_same_location(&b));
    assert!(!a.is_same_location(&c));
}

//! Path matching
//!
//! Compiles route patterns into anchored regular expressions and turns a
//! candidate location into a [`Match`].
//!
//! # Pattern syntax
//!
//! | Token    | Meaning                                                     |
//! |----------|-------------------------------------------------------------|
//! | `""`     | root route, matches only the empty path                     |
//! | `:name`  | one segment (no `/`), percent-decoded into `path_params`    |
//! | `*`      | any suffix; a `/` right before it becomes optional          |
//! | `*name`  | one segment captured into `path_params[name]`, like `:name` |
//! | `/?`     | optional trailing segment, separator not required           |
//!
//! Everything else is matched literally. Raw [`Regex`] patterns bypass this
//! syntax entirely.

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::registry::{Route, RouteHandle};
use crate::{RouterError, RouterResult};

/// Path parameters extracted from a matched location.
///
/// Raw expressions without named groups use positional keys `"0"`, `"1"`, …
pub type PathParams = BTreeMap<String, String>;

/// Decoded query parameters. Repeated keys keep every value in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// Every value recorded for `key`, in order of appearance.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `key` was present with at least one value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no key was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate keys with all their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub(crate) fn push(&mut self, key: String, value: String) {
        self.0.entry(key).or_default().push(value);
    }
}

// =============================================================================
// Location helpers
// =============================================================================

/// Strip leading and trailing slashes.
pub fn clean(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// `path` with a leading `root` removed. The root only counts when it ends
/// on a segment boundary, so root `app` leaves `application/x` alone.
pub(crate) fn strip_root<'a>(path: &'a str, root: &str) -> &'a str {
    if root.is_empty() {
        return path;
    }
    match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '?', '#']) => rest,
        _ => path,
    }
}

/// Split a URL into its cleaned path and its query string (without `?`).
pub fn extract_get_params(url: &str) -> (String, String) {
    let cleaned = clean(url);
    match cleaned.split_once('?') {
        Some((path, query)) => (clean(path), query.to_string()),
        None => (cleaned, String::new()),
    }
}

/// Text after the last `#`, or an empty string.
pub fn extract_hash(url: &str) -> String {
    if url.contains('#') {
        url.rsplit('#').next().unwrap_or_default().to_string()
    } else {
        String::new()
    }
}

/// Decide which part of a location is routable.
///
/// In hash mode the first fragment is the route (`/` when it is empty);
/// otherwise the fragment is a real anchor and is dropped.
pub fn check_for_hash(path: &str, hash_mode: bool) -> String {
    match path.split_once('#') {
        None => path.to_string(),
        Some((_, after)) if hash_mode => {
            let fragment = after.split('#').next().unwrap_or_default();
            if fragment.is_empty() {
                "/".to_string()
            } else {
                fragment.to_string()
            }
        }
        Some((before, _)) => before.to_string(),
    }
}

/// Parse a query string into [`QueryParams`].
///
/// Empty keys and keys without a value are skipped; keys and values are
/// percent-decoded.
pub fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        params.push(decode(key), decode(value));
    }
    params
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

// =============================================================================
// Patterns
// =============================================================================

/// A route pattern: a path template or a raw expression.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Path template using the syntax described in the module docs
    Path(String),
    /// Precompiled expression used as-is
    Regex(Regex),
}

impl PathPattern {
    /// Textual form of the pattern.
    pub fn source(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Regex(regex) => regex.as_str(),
        }
    }

    /// True for raw expressions.
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Path(a), Self::Path(b)) => clean(a) == clean(b),
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

impl From<&str> for PathPattern {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for PathPattern {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Regex> for PathPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

#[derive(Debug, Clone)]
enum PatternMatcher {
    /// The empty pattern: matches the empty path only
    Root,
    /// Exact cleaned path, used by synthetic routes
    Literal(String),
    /// Matches every path, used by the fallback route
    Any,
    /// Translated path template
    Template { regex: Regex, names: Vec<String> },
    /// Caller-supplied expression
    Raw(Regex),
}

/// A pattern compiled once at registration time.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: PathPattern,
    matcher: PatternMatcher,
}

impl CompiledPattern {
    /// Compile a pattern.
    ///
    /// Path templates are cleaned first; a cleaned empty template becomes the
    /// root rule.
    pub fn compile(pattern: PathPattern) -> RouterResult<Self> {
        let matcher = match &pattern {
            PathPattern::Regex(regex) => PatternMatcher::Raw(regex.clone()),
            PathPattern::Path(path) => {
                let cleaned = clean(path);
                if cleaned.is_empty() {
                    PatternMatcher::Root
                } else {
                    let (expr, names) = translate(&cleaned);
                    let regex = Regex::new(&expr).map_err(|e| {
                        RouterError::invalid_pattern(&cleaned).with_cause(e.to_string())
                    })?;
                    PatternMatcher::Template { regex, names }
                }
            }
        };
        Ok(Self {
            source: pattern,
            matcher,
        })
    }

    /// Pattern matching exactly one cleaned path, without parameters.
    pub fn literal(path: &str) -> Self {
        Self {
            source: PathPattern::Path(path.to_string()),
            matcher: PatternMatcher::Literal(clean(path)),
        }
    }

    /// The `*` pattern of the fallback route.
    pub fn wildcard() -> Self {
        Self {
            source: PathPattern::Path("*".to_string()),
            matcher: PatternMatcher::Any,
        }
    }

    /// The pattern this was compiled from.
    pub fn source(&self) -> &PathPattern {
        &self.source
    }

    /// Textual form of the pattern.
    pub fn as_str(&self) -> &str {
        self.source.source()
    }

    /// True when compiled from a raw expression.
    pub fn is_raw(&self) -> bool {
        matches!(self.matcher, PatternMatcher::Raw(_))
    }

    /// True for the root rule.
    pub fn is_root(&self) -> bool {
        matches!(self.matcher, PatternMatcher::Root)
    }

    /// Test a cleaned pathname and extract its parameters.
    pub fn captures(&self, pathname: &str) -> Option<PathParams> {
        match &self.matcher {
            PatternMatcher::Root => clean(pathname).is_empty().then(PathParams::new),
            PatternMatcher::Literal(path) => (clean(pathname) == *path).then(PathParams::new),
            PatternMatcher::Any => Some(PathParams::new()),
            PatternMatcher::Template { regex, names } => {
                let caps = regex.captures(pathname)?;
                let mut params = PathParams::new();
                for (index, name) in names.iter().enumerate() {
                    if let Some(value) = caps.get(index + 1) {
                        params.insert(name.clone(), decode(value.as_str()));
                    }
                }
                Some(params)
            }
            PatternMatcher::Raw(regex) => {
                let caps = regex.captures(pathname)?;
                let mut params = PathParams::new();
                let named: Vec<&str> = regex.capture_names().flatten().collect();
                if named.is_empty() {
                    for index in 1..caps.len() {
                        if let Some(value) = caps.get(index) {
                            params.insert((index - 1).to_string(), value.as_str().to_string());
                        }
                    }
                } else {
                    for name in named {
                        if let Some(value) = caps.name(name) {
                            params.insert(name.to_string(), value.as_str().to_string());
                        }
                    }
                }
                Some(params)
            }
        }
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Translate a cleaned path template into an anchored expression plus the
/// names of its capture groups, in group order.
fn translate(template: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = template.chars().collect();
    let mut expr = String::from("^");
    let mut names = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ':' | '*' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_word(chars[end]) {
                    end += 1;
                }
                if end > start {
                    names.push(chars[start..end].iter().collect());
                    expr.push_str("([^/]+)");
                    i = end;
                    continue;
                }
                if c == '*' {
                    if expr.ends_with('/') {
                        expr.pop();
                        expr.push_str("(?:/.*?)?");
                    } else {
                        expr.push_str(".*?");
                    }
                } else {
                    expr.push(':');
                }
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'?') => {
                expr.push_str("/?(?:[^/]*)");
                i += 2;
            }
            _ => {
                expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                i += 1;
            }
        }
    }

    expr.push('$');
    (expr, names)
}

// =============================================================================
// Match
// =============================================================================

/// Result of a route matching a location. Built once per resolution.
#[derive(Debug, Clone)]
pub struct Match {
    /// Cleaned path with the root prefix removed
    pub url: String,
    /// Raw query string, without `?`
    pub query_string: String,
    /// Text after the last `#` of the requested target
    pub hash_string: String,
    /// The matched route
    pub route: RouteHandle,
    /// Decoded path parameters
    pub path_params: PathParams,
    /// Decoded query parameters
    pub query_params: QueryParams,
}

impl Match {
    /// Path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// First query value for `key`.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_params.get(key)
    }

    /// Same route, same url and same query string.
    pub fn is_same_location(&self, other: &Match) -> bool {
        self.route.id() == other.route.id()
            && self.url == other.url
            && self.query_string == other.query_string
    }

    /// Parameterless match of `route` for a location.
    pub(crate) fn for_location(location: &str, to: &str, route: RouteHandle) -> Self {
        let (pathname, query_string) = extract_get_params(location);
        let query_params = parse_query(&query_string);
        Self {
            url: clean(&pathname),
            query_string,
            hash_string: extract_hash(to),
            route,
            path_params: PathParams::new(),
            query_params,
        }
    }
}

impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_location(other)
            && self.hash_string == other.hash_string
            && self.path_params == other.path_params
            && self.query_params == other.query_params
    }
}

/// Match `route` against a location.
///
/// `location` is the routable path (already hash-normalised), `to` is the
/// raw target the hash string is taken from, `root` is the cleaned mount
/// prefix removed from the resulting url.
pub fn match_route(location: &str, to: &str, route: &Arc<Route>, root: &str) -> Option<Match> {
    let (pathname, query_string) = extract_get_params(location);
    let path_params = route.pattern().captures(&pathname)?;

    let url = if route.pattern().is_root() {
        pathname
    } else {
        clean(strip_root(&pathname, root))
    };

    let query_params = parse_query(&query_string);
    Some(Match {
        url,
        query_string,
        hash_string: extract_hash(to),
        route: route.clone(),
        path_params,
        query_params,
    })
}

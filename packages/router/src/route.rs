use std::rc::Rc;

use serde_json::{Map, Value};

use crate::{
    navigation::Location,
    params::{ParamValue, Params},
    query::{query_includes, stringify_query, Query},
    route_definition::{PropsSpec, RouteRecord},
};

/// An immutable snapshot of a resolved navigation target.
#[derive(Clone, Debug)]
pub struct Route {
    name: Option<String>,
    meta: Value,
    path: String,
    hash: String,
    query: Query,
    params: Params,
    full_path: String,
    matched: Vec<Rc<RouteRecord>>,
    redirected_from: Option<Location>,
    start: bool,
}

impl Route {
    /// Create a route for the record chain `matched` (outermost first) and a normalized
    /// `location`. An empty chain produces an unmatched route.
    pub fn new(
        matched: Vec<Rc<RouteRecord>>,
        location: &Location,
        redirected_from: Option<Location>,
    ) -> Self {
        let record = matched.last();
        let path = location.path.clone().unwrap_or_else(|| String::from("/"));
        let path = match path.is_empty() {
            true => String::from("/"),
            false => path,
        };
        let hash = location.hash.clone().unwrap_or_default();
        let query = location.query.clone().unwrap_or_default();

        Self {
            name: location
                .name
                .clone()
                .or_else(|| record.and_then(|record| record.name.clone())),
            meta: record
                .map(|record| record.meta.clone())
                .unwrap_or_else(|| Value::Object(Map::new())),
            full_path: full_path(&path, &query, &hash),
            path,
            hash,
            query,
            params: location.params.clone().unwrap_or_default(),
            matched,
            redirected_from,
            start: false,
        }
    }

    /// The route the router is at before its first navigation completes.
    pub fn start() -> Self {
        Self {
            start: true,
            ..Self::new(Vec::new(), &Location::path("/"), None)
        }
    }

    pub fn is_start(&self) -> bool {
        self.start
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The meta data of the leaf record.
    pub fn meta(&self) -> &Value {
        &self.meta
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The fragment, including its `#`, or the empty string.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Path, serialized query and fragment.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// The matched records, outermost ancestor first. Empty when nothing matched.
    pub fn matched(&self) -> &[Rc<RouteRecord>] {
        &self.matched
    }

    /// The location that was redirected to this route, if any.
    pub fn redirected_from(&self) -> Option<&Location> {
        self.redirected_from.as_ref()
    }

    /// The full path of [`Route::redirected_from`].
    pub fn redirected_from_full_path(&self) -> Option<String> {
        self.redirected_from.as_ref().map(|location| {
            full_path(
                location.path.as_deref().unwrap_or("/"),
                &location.query.clone().unwrap_or_default(),
                location.hash.as_deref().unwrap_or_default(),
            )
        })
    }
}

pub(crate) fn full_path(path: &str, query: &Query, hash: &str) -> String {
    let path = match path.is_empty() {
        true => "/",
        false => path,
    };
    format!("{path}{}{hash}", stringify_query(query))
}

fn trim_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Check whether two routes describe the same location.
///
/// The start route only equals itself. Otherwise routes are compared by path (ignoring a
/// trailing slash), fragment and query, or, when either has no path, by name, fragment, query
/// and params.
pub fn is_same_route(a: &Route, b: &Route) -> bool {
    if a.start || b.start {
        return a.start && b.start;
    }

    if !a.path.is_empty() && !b.path.is_empty() {
        return trim_trailing_slash(&a.path) == trim_trailing_slash(&b.path)
            && a.hash == b.hash
            && a.query == b.query;
    }

    match (&a.name, &b.name) {
        (Some(left), Some(right)) => {
            left == right && a.hash == b.hash && a.query == b.query && a.params == b.params
        }
        _ => false,
    }
}

/// Check whether `target` is part of `current`: the path of `current` starts with the path of
/// `target`, fragments agree when `target` has one, and every query key of `target` is present.
///
/// Used for "active link" checks.
pub fn is_included_route(current: &Route, target: &Route) -> bool {
    let with_slash = |path: &str| format!("{}/", trim_trailing_slash(path));

    with_slash(&current.path).starts_with(&with_slash(&target.path))
        && (target.hash.is_empty() || current.hash == target.hash)
        && query_includes(&current.query, &target.query)
}

/// Compute the input data for the view in `slot` of `record` on `route`.
pub fn resolve_props(route: &Route, record: &RouteRecord, slot: &str) -> Option<Map<String, Value>> {
    match record.props(slot)? {
        PropsSpec::Params(false) => None,
        PropsSpec::Params(true) => Some(
            route
                .params
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        ParamValue::One(value) => Value::String(value.clone()),
                        ParamValue::Many(values) => {
                            Value::Array(values.iter().cloned().map(Value::String).collect())
                        }
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        PropsSpec::Object(object) => Some(object.clone()),
        PropsSpec::Function(props) => Some(props(route)),
    }
}

//! Types relating to navigation.

use crate::{
    params::{ParamValue, Params},
    query::{Query, QueryValue},
};

/// A structured navigation target.
///
/// Every field is optional: a location with only `params` changes the params of the current
/// route, one with only a `query` keeps the current path.
///
/// ```rust
/// # use waypoint_router::prelude::*;
/// let by_name = Location::named("user").param("id", "42").query_value("tab", "posts");
/// let by_path = Location::path("../settings").append(true);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Location {
    pub name: Option<String>,
    pub path: Option<String>,
    /// With or without the leading `#`.
    pub hash: Option<String>,
    pub query: Option<Query>,
    pub params: Option<Params>,
    /// Resolve a relative path below the current path instead of next to it.
    pub append: bool,
    /// Replace the current history entry when this location is the target of a guard redirect.
    pub replace: bool,
    pub(crate) normalized: bool,
}

impl Location {
    /// Create a [`Location`] for `path`, which may include a query and a fragment.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Create a [`Location`] for the route named `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Create a [`Location`] that only changes params.
    pub fn with_params(params: Params) -> Self {
        Self {
            params: Some(params),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn query_value(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query
            .get_or_insert_with(Query::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Whether this location was produced by the normalizer.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }
}

/// A navigation target as given by callers: a location string or a structured [`Location`].
#[derive(Clone, Debug, PartialEq)]
pub enum RawLocation {
    Path(String),
    Location(Location),
}

impl RawLocation {
    /// Whether a guard redirect to this target should replace the current history entry.
    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Location(location) if location.replace)
    }

    /// Whether this target names a destination: a path or a route name. A [`Location`] with
    /// neither only carries query, hash or params.
    pub fn has_destination(&self) -> bool {
        match self {
            Self::Path(_) => true,
            Self::Location(location) => location.path.is_some() || location.name.is_some(),
        }
    }

    /// View this target as a [`Location`].
    pub fn into_location(self) -> Location {
        match self {
            Self::Path(path) => Location::path(path),
            Self::Location(location) => location,
        }
    }
}

impl From<&str> for RawLocation {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for RawLocation {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<&String> for RawLocation {
    fn from(path: &String) -> Self {
        Self::Path(path.clone())
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

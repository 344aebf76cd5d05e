//! Parsing, merging and serializing query strings.

use std::{borrow::Cow, collections::BTreeMap, string::FromUtf8Error};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Characters kept verbatim in query keys and values. Stricter than `encodeURIComponent`: `!'()*`
/// are escaped, `,` is kept.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

/// A single query entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// The key is present without a value (`?flag`).
    Null,
    /// `?key=value`
    Value(String),
    /// The key was repeated; values in encounter order.
    List(Vec<Option<String>>),
}

/// Query data of a location, keyed by name.
pub type Query = BTreeMap<String, QueryValue>;

impl QueryValue {
    /// The value if this is a single value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    fn push(&mut self, value: Option<String>) {
        let previous = std::mem::replace(self, Self::Null);
        let mut list = match previous {
            Self::Null => vec![None],
            Self::Value(value) => vec![Some(value)],
            Self::List(list) => list,
        };
        list.push(value);
        *self = Self::List(list);
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<Option<String>> for QueryValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<T: Into<String>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(|value| Some(value.into())).collect())
    }
}

fn decode(input: &str) -> Result<String, FromUtf8Error> {
    urlencoding::decode(input).map(Cow::into_owned)
}

fn encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY).to_string()
}

/// Parse a query string.
///
/// A leading `?`, `#` or `&` is ignored, `+` means space and keys without `=` map to
/// [`QueryValue::Null`]. Repeated keys collect into a [`QueryValue::List`].
///
/// ```rust
/// # use waypoint_router::query::{parse_query, QueryValue};
/// let query = parse_query("?tag=a&tag=b&open").unwrap();
/// assert_eq!(
///     query["tag"],
///     QueryValue::List(vec![Some("a".into()), Some("b".into())])
/// );
/// assert_eq!(query["open"], QueryValue::Null);
/// ```
pub fn parse_query(query: &str) -> Result<Query, FromUtf8Error> {
    let mut parsed = Query::new();

    let query = query.trim();
    let query = query
        .strip_prefix(['?', '#', '&'])
        .unwrap_or(query);

    for param in query.split('&').filter(|param| !param.is_empty()) {
        let param = param.replace('+', " ");
        let (key, value) = match param.split_once('=') {
            Some((key, value)) => (decode(key)?, Some(decode(value)?)),
            None => (decode(&param)?, None),
        };

        match parsed.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                parsed.insert(key, value.into());
            }
        }
    }

    Ok(parsed)
}

/// Merge the query parsed from a location string with explicitly given query data. Explicit keys
/// win.
pub fn resolve_query(query: &str, extra: Option<&Query>) -> Query {
    let mut parsed = parse_query(query).unwrap_or_else(|error| {
        warn!(%error, query, "query string could not be decoded, ignoring it");
        Query::new()
    });

    if let Some(extra) = extra {
        parsed.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    parsed
}

/// Serialize query data. Returns the empty string for an empty query, otherwise the result starts
/// with `?`.
///
/// ```rust
/// # use waypoint_router::query::{stringify_query, Query, QueryValue};
/// let mut query = Query::new();
/// query.insert("q".into(), "a b".into());
/// query.insert("flag".into(), QueryValue::Null);
/// assert_eq!(stringify_query(&query), "?flag&q=a%20b");
/// ```
pub fn stringify_query(query: &Query) -> String {
    let parts: Vec<String> = query
        .iter()
        .map(|(key, value)| match value {
            QueryValue::Null => encode(key),
            QueryValue::Value(value) => format!("{}={}", encode(key), encode(value)),
            QueryValue::List(values) => values
                .iter()
                .map(|value| match value {
                    Some(value) => format!("{}={}", encode(key), encode(value)),
                    None => encode(key),
                })
                .collect::<Vec<_>>()
                .join("&"),
        })
        .filter(|part| !part.is_empty())
        .collect();

    match parts.is_empty() {
        true => String::new(),
        false => format!("?{}", parts.join("&")),
    }
}

/// Check whether every key of `target` is present in `current`.
pub(crate) fn query_includes(current: &Query, target: &Query) -> bool {
    target.keys().all(|key| current.contains_key(key))
}

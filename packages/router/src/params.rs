use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The value of a dynamic path segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    /// Only accepted by repeating segments (`:name+`, `:name*`) when filling a path.
    Many(Vec<String>),
}

/// Route parameters, keyed by segment name.
pub type Params = BTreeMap<String, ParamValue>;

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl<T: Into<String>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

/// Build [`Params`] from `(name, value)` pairs.
///
/// ```rust
/// # use waypoint_router::params::{params, ParamValue};
/// let params = params([("id", "42")]);
/// assert_eq!(params["id"], ParamValue::from("42"));
/// ```
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

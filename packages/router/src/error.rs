//! Errors produced while compiling paths, filling parameters and running navigations.

use thiserror::Error;

/// A path template could not be turned into a matcher.
#[derive(Debug, Error)]
pub enum PathCompileError {
    /// The template (usually a custom parameter pattern) produced an invalid regular expression.
    #[error("invalid pattern in path template {template:?}")]
    InvalidPattern {
        /// The offending template.
        template: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Parameters could not be filled into a path template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamFillError {
    #[error("expected \"{name}\" to be defined")]
    Missing { name: String },

    #[error("expected \"{name}\" to not repeat, but received {value:?}")]
    Repeated { name: String, value: Vec<String> },

    #[error("expected \"{name}\" to not be empty")]
    Empty { name: String },

    #[error("expected \"{name}\" to match \"{pattern}\", but received {value:?}")]
    Mismatch {
        name: String,
        pattern: String,
        value: String,
    },

    #[error("path template {template:?} does not compile")]
    Compile { template: String },
}

/// An error reported by a navigation guard or while loading lazy components.
///
/// Aborts the transition it occurs in and is delivered to the router's error observers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// A guard reported an error, either through `next` or by returning `Err`.
    #[error("navigation guard failed: {0}")]
    Guard(String),

    /// A lazy component rejected.
    #[error("failed to resolve async component {slot}: {reason}")]
    AsyncComponent { slot: String, reason: String },
}

impl NavigationError {
    /// Create a [`NavigationError::Guard`] from anything printable.
    pub fn guard(message: impl std::fmt::Display) -> Self {
        Self::Guard(message.to_string())
    }
}

/// The reason a transition did not commit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationFailure {
    /// The target is the current route; only the visible location was resynchronized.
    #[error("avoided redundant navigation to current location: {0:?}")]
    Duplicated(String),

    /// A guard called `next(false)`.
    #[error("navigation cancelled from {from:?} to {to:?} with a navigation guard")]
    Cancelled { from: String, to: String },

    /// A guard redirected to another location; a new transition was started for it.
    #[error("redirected when going from {from:?} to {to:?} via a navigation guard")]
    Redirected { from: String, to: String },

    /// A newer transition became pending before this one finished.
    #[error("navigation to {to:?} was superseded by a newer navigation")]
    Superseded { to: String },

    /// A guard or a lazy component failed.
    #[error(transparent)]
    Error(#[from] NavigationError),
}

impl NavigationFailure {
    /// The underlying error, if the failure was caused by one.
    pub fn error(&self) -> Option<&NavigationError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

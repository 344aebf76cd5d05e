use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use waypoint_history::{HashHistory, History, WebHistory};

/// Where the router keeps the route location within the address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// After the `#` of the address.
    Hash,
    /// As the address path, below the configured base.
    History,
    /// Directly in the address-level history, usually an in-memory one.
    #[default]
    Abstract,
}

/// Global configuration options for the router.
///
/// This implements [`Default`] and follows the builder pattern, so you can use it like this:
/// ```rust
/// # use waypoint_router::prelude::*;
/// let cfg = RouterConfig::default()
///     .mode(HistoryMode::History)
///     .base("/app/")
///     .initial_location("/app/users");
/// ```
///
/// It can also be deserialized:
/// ```rust
/// # use waypoint_router::prelude::*;
/// let cfg: RouterConfig = serde_json::from_str(r#"{ "mode": "hash", "base": "/app" }"#).unwrap();
/// assert_eq!(cfg.mode, HistoryMode::Hash);
/// assert!(cfg.fallback);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub mode: HistoryMode,
    /// The prefix of every address in [`HistoryMode::History`] mode. Also used by the hash
    /// fallback.
    pub base: String,
    /// Fall back to [`HistoryMode::Hash`] when native history entries are not supported.
    pub fallback: bool,
    /// Whether the platform can create native history entries.
    pub supports_push_state: bool,
    /// The address the in-memory history [`Router::new`](crate::service::Router::new) creates
    /// starts at.
    pub initial_location: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: HistoryMode::default(),
            base: String::new(),
            fallback: true,
            supports_push_state: true,
            initial_location: String::from("/"),
        }
    }
}

impl RouterConfig {
    /// Defaults to [`HistoryMode::Abstract`].
    pub fn mode(self, mode: HistoryMode) -> Self {
        Self { mode, ..self }
    }

    /// Defaults to no base.
    pub fn base(self, base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..self
        }
    }

    /// Defaults to `true`.
    pub fn fallback(self, fallback: bool) -> Self {
        Self { fallback, ..self }
    }

    /// Defaults to `true`.
    pub fn supports_push_state(self, supports_push_state: bool) -> Self {
        Self {
            supports_push_state,
            ..self
        }
    }

    /// Defaults to `/`.
    pub fn initial_location(self, location: impl Into<String>) -> Self {
        Self {
            initial_location: location.into(),
            ..self
        }
    }

    /// The mode actually used, after applying the fallback.
    pub fn effective_mode(&self) -> HistoryMode {
        match self.mode {
            HistoryMode::History if !self.supports_push_state && self.fallback => {
                HistoryMode::Hash
            }
            mode => mode,
        }
    }

    /// Wrap the address-level `address` history in the strategy this configuration selects.
    pub fn build_history(&self, address: Rc<dyn History>) -> Rc<dyn History> {
        let mode = self.effective_mode();
        debug!(?mode, base = %self.base, "creating history");

        match (self.mode, mode) {
            (_, HistoryMode::Abstract) => address,
            (HistoryMode::History, HistoryMode::Hash) => {
                Rc::new(HashHistory::with_fallback(address, &self.base))
            }
            (_, HistoryMode::Hash) => Rc::new(HashHistory::new(address)),
            (_, HistoryMode::History) => Rc::new(WebHistory::new(address, &self.base)),
        }
    }
}

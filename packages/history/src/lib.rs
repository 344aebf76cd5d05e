//! Location sources for the waypoint router.
//!
//! The router never talks to an address bar directly. It reads and persists the visible location
//! through a [`History`], which lets the same transition pipeline run against an in-memory
//! session stack, a fragment-based address (`/app/#/users/1`) or a native-history address
//! (`/app/users/1`).
//!
//! [`HashHistory`] and [`WebHistory`] do not own any storage themselves. They wrap an
//! address-level [`History`] (usually a [`MemoryHistory`] in tests, or a platform binding in an
//! application) and translate between route locations and full addresses.

use std::rc::Rc;

mod hash;
mod memory;
mod web;

pub use hash::*;
pub use memory::*;
pub use web::*;

/// An integration with some kind of navigation history.
///
/// All methods take `&self`; implementations keep their state behind interior mutability so a
/// single history can be shared between the router and the code driving it.
pub trait History {
    /// Get the current location as the router sees it: path, query and fragment.
    ///
    /// **Must start** with `/` for route locations. Address-level histories wrapped by
    /// [`HashHistory`] or [`WebHistory`] return the full address instead.
    ///
    /// ```rust
    /// # use waypoint_history::{History, MemoryHistory};
    /// let history = MemoryHistory::default();
    /// assert_eq!(history.current_location(), "/");
    ///
    /// history.push(String::from("/path"));
    /// assert_eq!(history.current_location(), "/path");
    /// ```
    #[must_use]
    fn current_location(&self) -> String;

    /// Get the prefix every address produced by this history starts with, if any.
    fn current_prefix(&self) -> Option<String> {
        None
    }

    /// Create a navigable entry for `location`. The previous location stays reachable through
    /// [`History::go_back`].
    fn push(&self, location: String);

    /// Swap the current entry for `location` without creating a new one.
    fn replace(&self, location: String);

    /// Move `delta` entries through the session history. Negative values go back.
    ///
    /// Out of range moves do nothing. A successful move is an external navigation from the
    /// router's point of view and must be reported through the [`History::updater`] callback.
    fn go(&self, delta: isize);

    /// Check whether there is a previous entry to navigate back to.
    ///
    /// If a [`History`] cannot know this, it should return [`true`].
    #[must_use]
    fn can_go_back(&self) -> bool {
        true
    }

    /// Go back one entry.
    fn go_back(&self) {
        self.go(-1)
    }

    /// Check whether there is a future entry to navigate forward to.
    ///
    /// If a [`History`] cannot know this, it should return [`true`].
    #[must_use]
    fn can_go_forward(&self) -> bool {
        true
    }

    /// Go forward one entry.
    fn go_forward(&self) {
        self.go(1)
    }

    /// Render a route location as an address usable in a link.
    fn href(&self, location: &str) -> String {
        location.to_string()
    }

    /// Provide the [`History`] with an update callback.
    ///
    /// Some histories receive location changes from outside the router (back/forward buttons,
    /// manual edits of the address). When that happens they call `callback`, which makes the
    /// router transition to the new [`History::current_location`].
    #[allow(unused_variables)]
    fn updater(&self, callback: Rc<dyn Fn()>) {}
}

/// Normalize a base prefix: ensure a leading `/`, drop a trailing `/`. An empty base stays empty.
///
/// ```rust
/// # use waypoint_history::normalize_base;
/// assert_eq!(normalize_base("app/"), "/app");
/// assert_eq!(normalize_base("/"), "");
/// assert_eq!(normalize_base(""), "");
/// ```
pub fn normalize_base(base: &str) -> String {
    if base.is_empty() {
        return String::new();
    }

    let mut base = match base.starts_with('/') {
        true => base.to_string(),
        false => format!("/{base}"),
    };
    if base.ends_with('/') {
        base.pop();
    }
    base
}

/// Collapse `//` into `/`.
pub(crate) fn clean_path(path: &str) -> String {
    path.replace("//", "/")
}

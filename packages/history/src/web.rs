use std::rc::Rc;

use crate::{clean_path, normalize_base, History};

/// A [`History`] that keeps route locations in the path of the address, below a base prefix.
///
/// The address itself lives in the wrapped `parent_provider`. Every address this history writes
/// starts with the base, and every route location it reads has the base stripped.
///
/// ```rust
/// # use std::rc::Rc;
/// # use waypoint_history::{History, MemoryHistory, WebHistory};
/// let address = Rc::new(MemoryHistory::with_initial_path("/app/users/1?tab=posts"));
/// let history = WebHistory::new(address.clone(), "app/");
///
/// assert_eq!(history.current_location(), "/users/1?tab=posts");
///
/// history.push(String::from("/settings"));
/// assert_eq!(address.current_location(), "/app/settings");
/// ```
pub struct WebHistory {
    parent_provider: Rc<dyn History>,
    base: String,
}

impl WebHistory {
    pub fn new(parent_provider: Rc<dyn History>, base: &str) -> Self {
        Self {
            parent_provider,
            base: normalize_base(base),
        }
    }

    /// The normalized base prefix, empty when the router is mounted at the root.
    pub fn base(&self) -> &str {
        &self.base
    }
}

impl History for WebHistory {
    fn current_location(&self) -> String {
        strip_base(&self.parent_provider.current_location(), &self.base)
    }

    fn current_prefix(&self) -> Option<String> {
        match self.base.is_empty() {
            true => None,
            false => Some(self.base.clone()),
        }
    }

    fn push(&self, location: String) {
        self.parent_provider.push(clean_path(&format!("{}{location}", self.base)));
    }

    fn replace(&self, location: String) {
        self.parent_provider
            .replace(clean_path(&format!("{}{location}", self.base)));
    }

    fn go(&self, delta: isize) {
        self.parent_provider.go(delta)
    }

    fn can_go_back(&self) -> bool {
        self.parent_provider.can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.parent_provider.can_go_forward()
    }

    fn href(&self, location: &str) -> String {
        clean_path(&format!("{}{location}", self.base))
    }

    fn updater(&self, callback: Rc<dyn Fn()>) {
        self.parent_provider.updater(callback)
    }
}

/// Remove `base` from the front of `address`, comparing case-insensitively. Keeps query and
/// fragment. An empty remainder path becomes `/`.
pub(crate) fn strip_base(address: &str, base: &str) -> String {
    let split = address.find(['?', '#']).unwrap_or(address.len());
    let (path, rest) = address.split_at(split);

    let path = match !base.is_empty()
        && path.len() >= base.len()
        && path.is_char_boundary(base.len())
        && path[..base.len()].eq_ignore_ascii_case(base)
    {
        true => &path[base.len()..],
        false => path,
    };

    match path.is_empty() {
        true => format!("/{rest}"),
        false => format!("{path}{rest}"),
    }
}

use std::rc::Rc;

use crate::{clean_path, normalize_base, web::strip_base, History};

/// A [`History`] that keeps route locations in the fragment of the address (`/app/#/users/1`).
///
/// The address itself lives in the wrapped `parent_provider`. On construction the fragment is
/// corrected to start with `/`, and with `fallback` enabled a plain address such as `/app/users/1`
/// is rewritten into its fragment form `/app/#/users/1` first.
pub struct HashHistory {
    parent_provider: Rc<dyn History>,
}

impl HashHistory {
    /// Wrap `parent_provider` without any fallback handling.
    pub fn new(parent_provider: Rc<dyn History>) -> Self {
        let history = Self { parent_provider };
        history.ensure_slash();
        history
    }

    /// Wrap `parent_provider`, rewriting a non-fragment address below `base` into fragment form.
    ///
    /// ```rust
    /// # use std::rc::Rc;
    /// # use waypoint_history::{HashHistory, History, MemoryHistory};
    /// let address = Rc::new(MemoryHistory::with_initial_path("/app/users/1"));
    /// let history = HashHistory::with_fallback(address.clone(), "/app");
    ///
    /// assert_eq!(address.current_location(), "/app/#/users/1");
    /// assert_eq!(history.current_location(), "/users/1");
    /// ```
    pub fn with_fallback(parent_provider: Rc<dyn History>, base: &str) -> Self {
        let base = normalize_base(base);
        let location = strip_base(&parent_provider.current_location(), &base);
        if !location.starts_with("/#") {
            let rewritten = clean_path(&format!("{base}/#{location}"));
            tracing::debug!(%rewritten, "moving address into fragment form");
            parent_provider.replace(rewritten);
        }

        Self::new(parent_provider)
    }

    fn ensure_slash(&self) {
        ensure_slash(self.parent_provider.as_ref())
    }
}

impl History for HashHistory {
    fn current_location(&self) -> String {
        let fragment = fragment(&self.parent_provider.current_location()).to_string();
        match fragment.starts_with('/') {
            true => fragment,
            false => format!("/{fragment}"),
        }
    }

    fn push(&self, location: String) {
        let address = with_fragment(&self.parent_provider.current_location(), &location);
        self.parent_provider.push(address);
    }

    fn replace(&self, location: String) {
        let address = with_fragment(&self.parent_provider.current_location(), &location);
        self.parent_provider.replace(address);
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
        with_fragment(&self.parent_provider.current_location(), location)
    }

    fn updater(&self, callback: Rc<dyn Fn()>) {
        let parent = Rc::downgrade(&self.parent_provider);
        self.parent_provider.updater(Rc::new(move || {
            if let Some(parent) = parent.upgrade() {
                ensure_slash(parent.as_ref());
            }
            callback();
        }));
    }
}

/// Make the fragment of the parent's address start with `/`.
fn ensure_slash(parent: &dyn History) {
    let address = parent.current_location();
    let fragment = fragment(&address);
    if fragment.starts_with('/') {
        return;
    }

    let corrected = format!("/{fragment}");
    parent.replace(with_fragment(&address, &corrected));
}

/// Everything after the first `#`, or the empty string.
fn fragment(address: &str) -> &str {
    match address.find('#') {
        Some(index) => &address[index + 1..],
        None => "",
    }
}

/// Replace the fragment of `address` with `location`.
fn with_fragment(address: &str, location: &str) -> String {
    let base = match address.find('#') {
        Some(index) => &address[..index],
        None => address,
    };
    format!("{base}#{location}")
}

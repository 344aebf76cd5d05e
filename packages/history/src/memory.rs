use std::{cell::RefCell, rc::Rc};

use crate::History;

struct MemoryHistoryState {
    current: String,
    history: Vec<String>,
    future: Vec<String>,
}

/// A [`History`] that stores all navigation information in memory.
///
/// Works as a route-level history on its own (the router's `abstract` mode) and as the
/// address-level store wrapped by [`HashHistory`](crate::HashHistory) and
/// [`WebHistory`](crate::WebHistory).
pub struct MemoryHistory {
    state: RefCell<MemoryHistoryState>,
    updater: RefCell<Option<Rc<dyn Fn()>>>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::with_initial_path("/")
    }
}

impl MemoryHistory {
    /// Create a [`MemoryHistory`] starting at `path`.
    ///
    /// ```rust
    /// # use waypoint_history::{History, MemoryHistory};
    /// let history = MemoryHistory::with_initial_path("/users/1");
    /// assert_eq!(history.current_location(), "/users/1");
    /// assert_eq!(history.can_go_back(), false);
    /// ```
    pub fn with_initial_path(path: impl ToString) -> Self {
        Self {
            state: MemoryHistoryState {
                current: path.to_string(),
                history: Vec::new(),
                future: Vec::new(),
            }
            .into(),
            updater: RefCell::new(None),
        }
    }

    /// Number of entries in the session, including the current one.
    pub fn len(&self) -> usize {
        let state = self.state.borrow();
        state.history.len() + 1 + state.future.len()
    }

    /// A memory history always holds its current entry.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn notify(&self) {
        let updater = self.updater.borrow().clone();
        if let Some(callback) = updater {
            callback();
        }
    }
}

impl History for MemoryHistory {
    fn current_location(&self) -> String {
        self.state.borrow().current.clone()
    }

    fn push(&self, new: String) {
        let mut write = self.state.borrow_mut();
        // don't push the same location twice
        if write.current == new {
            return;
        }
        let old = std::mem::replace(&mut write.current, new);
        write.history.push(old);
        write.future.clear();
    }

    fn replace(&self, location: String) {
        self.state.borrow_mut().current = location;
    }

    fn go(&self, delta: isize) {
        {
            let mut write = self.state.borrow_mut();
            let steps = delta.unsigned_abs();
            let available = match delta < 0 {
                true => write.history.len(),
                false => write.future.len(),
            };
            if delta == 0 || steps > available {
                tracing::trace!(delta, available, "history move out of range, ignored");
                return;
            }

            for _ in 0..steps {
                if delta < 0 {
                    if let Some(last) = write.history.pop() {
                        let old = std::mem::replace(&mut write.current, last);
                        write.future.push(old);
                    }
                } else if let Some(next) = write.future.pop() {
                    let old = std::mem::replace(&mut write.current, next);
                    write.history.push(old);
                }
            }
        }

        self.notify();
    }

    fn can_go_back(&self) -> bool {
        !self.state.borrow().history.is_empty()
    }

    fn can_go_forward(&self) -> bool {
        !self.state.borrow().future.is_empty()
    }

    fn updater(&self, callback: Rc<dyn Fn()>) {
        *self.updater.borrow_mut() = Some(callback);
    }
}

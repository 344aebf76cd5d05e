use std::{cell::RefCell, fmt::Debug, rc::Rc};

use crate::{async_components::ComponentLoader, guards::Component};

/// The name of the implicit view slot.
pub const DEFAULT_VIEW: &str = "default";

/// The content of a view slot.
#[derive(Clone)]
pub enum ViewSlot {
    Resolved(Component),
    /// Loaded the first time a navigation activates the record. Replaced by
    /// [`ViewSlot::Resolved`] once loaded.
    Lazy(LazyComponent),
}

impl ViewSlot {
    /// The component, if it is available.
    pub fn resolved(&self) -> Option<&Component> {
        match self {
            Self::Resolved(component) => Some(component),
            Self::Lazy(_) => None,
        }
    }
}

impl Debug for ViewSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(component) => f
                .debug_tuple("Resolved")
                .field(&component.name().unwrap_or("anonymous"))
                .finish(),
            Self::Lazy(lazy) => f.debug_tuple("Lazy").field(lazy).finish(),
        }
    }
}

/// A component produced by a factory.
///
/// The factory runs at most once per [`LazyComponent`] (clones included) while a load is in flight
/// or after it succeeded; the loaded component is remembered and reused by every record sharing
/// it. A failed load lets the next navigation call the factory again.
#[derive(Clone)]
pub struct LazyComponent {
    factory: Rc<dyn Fn(ComponentLoader)>,
    state: Rc<RefCell<LoadState>>,
}

enum LoadState {
    Idle,
    /// The factory was called. Loaders of later navigations wait for its outcome.
    Loading(Vec<ComponentLoader>),
    Resolved(Component),
}

impl LazyComponent {
    pub fn new(factory: impl Fn(ComponentLoader) + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            state: Rc::new(RefCell::new(LoadState::Idle)),
        }
    }

    /// The component, if the factory has delivered it.
    pub fn resolved(&self) -> Option<Component> {
        match &*self.state.borrow() {
            LoadState::Resolved(component) => Some(component.clone()),
            _ => None,
        }
    }

    /// Whether the factory was called and has not settled yet.
    pub fn is_loading(&self) -> bool {
        matches!(&*self.state.borrow(), LoadState::Loading(_))
    }

    /// Settle `loader` with the component, joining a load in flight or starting one.
    pub(crate) fn load(&self, loader: ComponentLoader) {
        let resolved = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                LoadState::Resolved(component) => Some(component.clone()),
                LoadState::Loading(waiting) => {
                    waiting.push(loader);
                    return;
                }
                LoadState::Idle => {
                    *state = LoadState::Loading(Vec::new());
                    None
                }
            }
        };

        match resolved {
            Some(component) => loader.resolve(component),
            None => (self.factory)(loader),
        }
    }

    /// Record the outcome of the factory. Returns the loaders that joined the load meanwhile.
    pub(crate) fn settle(&self, component: Option<Component>) -> Vec<ComponentLoader> {
        let next = match component {
            Some(component) => LoadState::Resolved(component),
            None => LoadState::Idle,
        };

        match std::mem::replace(&mut *self.state.borrow_mut(), next) {
            LoadState::Loading(waiting) => waiting,
            _ => Vec::new(),
        }
    }
}

impl Debug for LazyComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.borrow() {
            LoadState::Idle => "idle",
            LoadState::Loading(_) => "loading",
            LoadState::Resolved(_) => "resolved",
        };
        f.debug_struct("LazyComponent").field("state", &state).finish()
    }
}

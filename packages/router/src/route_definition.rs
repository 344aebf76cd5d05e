//! Types for describing which components to render for which path.
//!
//! A route configuration is a tree of [`RouteConfig`]s. The [`RouteTable`] flattens that tree
//! into [`RouteRecord`]s, one per path entry (aliases included), ordered by matching priority.

use std::{collections::BTreeMap, fmt::Debug, rc::Rc};

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    async_components::ComponentLoader,
    error::NavigationError,
    guards::{Component, Guard, Next},
    navigation::Location,
    route::Route,
};

mod instances;
mod pattern;
mod record;
mod table;
mod view;

pub use instances::*;
pub use pattern::*;
pub use record::*;
pub use table::*;
pub use view::*;

/// Where a record sends navigations that reach it.
#[derive(Clone)]
pub enum Redirect {
    /// A path, resolved relative to the parent record's path.
    Path(String),
    /// A structured target. `query`, `hash` and `params` that are [`None`] are taken from the
    /// location being redirected.
    Location(Location),
    /// Computed from the route that would have been created for the redirecting record. Returning
    /// another [`Redirect::Function`] is invalid.
    Function(Rc<dyn Fn(&Route) -> Redirect>),
}

impl Debug for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Location(location) => f.debug_tuple("Location").field(location).finish(),
            Self::Function(_) => f.write_str("Function"),
        }
    }
}

impl From<&str> for Redirect {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Redirect {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Location> for Redirect {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

/// How to derive a view's input data from the current route.
#[derive(Clone)]
pub enum PropsSpec {
    /// `true` passes all params.
    Params(bool),
    Object(Map<String, Value>),
    Function(Rc<dyn Fn(&Route) -> Map<String, Value>>),
}

impl Debug for PropsSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Params(all) => f.debug_tuple("Params").field(all).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(object).finish(),
            Self::Function(_) => f.write_str("Function"),
        }
    }
}

impl From<bool> for PropsSpec {
    fn from(all: bool) -> Self {
        Self::Params(all)
    }
}

impl From<Map<String, Value>> for PropsSpec {
    fn from(object: Map<String, Value>) -> Self {
        Self::Object(object)
    }
}

/// One entry of a route configuration.
///
/// This follows the builder pattern:
///
/// ```rust
/// # use std::rc::Rc;
/// # use waypoint_router::prelude::*;
/// struct User;
/// impl RouteComponent for User {}
/// struct Posts;
/// impl RouteComponent for Posts {}
///
/// RouteConfig::new("/user/:id")
///     .name("user")
///     .component(Rc::new(User))
///     .alias("/u/:id")
///     .child(RouteConfig::new("posts").component(Rc::new(Posts)));
/// ```
#[derive(Clone)]
pub struct RouteConfig {
    pub(crate) path: String,
    pub(crate) name: Option<String>,
    pub(crate) components: BTreeMap<String, ViewSlot>,
    pub(crate) redirect: Option<Redirect>,
    pub(crate) alias: Vec<String>,
    pub(crate) children: Vec<RouteConfig>,
    pub(crate) before_enter: Option<Guard>,
    pub(crate) meta: Value,
    pub(crate) props: BTreeMap<String, PropsSpec>,
    pub(crate) case_sensitive: Option<bool>,
    pub(crate) path_options: PathOptions,
}

impl RouteConfig {
    /// Create a [`RouteConfig`] for `path`.
    ///
    /// Paths starting with `/` are absolute. All others are resolved relative to the parent entry.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            components: BTreeMap::new(),
            redirect: None,
            alias: Vec::new(),
            children: Vec::new(),
            before_enter: None,
            meta: Value::Object(Map::new()),
            props: BTreeMap::new(),
            case_sensitive: None,
            path_options: PathOptions::default(),
        }
    }

    /// Add a name for name based navigation. Names should be unique across the whole table.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(existing) = &self.name {
            warn!(r#"name already set: "{existing}" to "{name}", later prevails"#);
        }

        self.name = Some(name);
        self
    }

    /// Set the component for the [default view](DEFAULT_VIEW).
    pub fn component(self, component: Component) -> Self {
        self.named_view(DEFAULT_VIEW, component)
    }

    /// Set the component for a named view.
    pub fn named_view(mut self, slot: impl Into<String>, component: Component) -> Self {
        self.insert_view(slot.into(), ViewSlot::Resolved(component));
        self
    }

    /// Set a lazily loaded component for the [default view](DEFAULT_VIEW).
    ///
    /// The factory runs the first time a navigation activates this entry.
    pub fn lazy_component(self, factory: impl Fn(ComponentLoader) + 'static) -> Self {
        self.lazy_named_view(DEFAULT_VIEW, factory)
    }

    /// Set a lazily loaded component for a named view.
    pub fn lazy_named_view(
        mut self,
        slot: impl Into<String>,
        factory: impl Fn(ComponentLoader) + 'static,
    ) -> Self {
        self.insert_view(slot.into(), ViewSlot::Lazy(LazyComponent::new(factory)));
        self
    }

    fn insert_view(&mut self, slot: String, view: ViewSlot) {
        if self.components.insert(slot.clone(), view).is_some() {
            warn!(r#"view "{slot}" already set for "{}", later prevails"#, self.path);
        }
    }

    /// Redirect navigations that reach this entry.
    pub fn redirect(mut self, redirect: impl Into<Redirect>) -> Self {
        if self.redirect.is_some() {
            warn!("redirect already set for {:?}, later prevails", self.path);
        }

        self.redirect = Some(redirect.into());
        self
    }

    /// Redirect navigations that reach this entry to a target computed from the route.
    pub fn redirect_with(self, redirect: impl Fn(&Route) -> Redirect + 'static) -> Self {
        self.redirect(Redirect::Function(Rc::new(redirect)))
    }

    /// Make this entry, including its children, reachable from another path as well.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    /// Add a nested entry.
    pub fn child(mut self, child: RouteConfig) -> Self {
        self.children.push(child);
        self
    }

    /// Add several nested entries.
    pub fn children(mut self, children: impl IntoIterator<Item = RouteConfig>) -> Self {
        self.children.extend(children);
        self
    }

    /// Add a guard that runs when a navigation enters this entry.
    pub fn before_enter(
        mut self,
        guard: impl Fn(&Route, &Route, Next) -> Result<(), NavigationError> + 'static,
    ) -> Self {
        if self.before_enter.is_some() {
            warn!("before_enter already set for {:?}, later prevails", self.path);
        }

        self.before_enter = Some(Rc::new(guard));
        self
    }

    /// Attach user data. It is passed through to routes unchanged.
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    /// Describe the input data of the [default view](DEFAULT_VIEW).
    pub fn props(self, props: impl Into<PropsSpec>) -> Self {
        self.view_props(DEFAULT_VIEW, props)
    }

    /// Describe the input data of a named view.
    pub fn view_props(mut self, slot: impl Into<String>, props: impl Into<PropsSpec>) -> Self {
        self.props.insert(slot.into(), props.into());
        self
    }

    /// Override [`PathOptions::sensitive`].
    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = Some(sensitive);
        self
    }

    pub fn path_options(mut self, options: PathOptions) -> Self {
        self.path_options = options;
        self
    }
}

impl Debug for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfig")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("redirect", &self.redirect)
            .field("alias", &self.alias)
            .field("children", &self.children)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

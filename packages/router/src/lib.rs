//! Nested route matching and guarded navigation transitions.
//!
//! A [`Router`](service::Router) resolves navigation targets (paths, named routes or params
//! changes) against a tree of [`RouteConfig`](route_definition::RouteConfig)s and moves from the
//! current [`Route`](route::Route) to the target through a pipeline of guards, each of which may
//! let the navigation proceed, cancel it or redirect it.
//!
//! ```rust
//! # use waypoint_router::prelude::*;
//! let router = Router::new(
//!     [RouteConfig::new("/user/:id").child(RouteConfig::new("posts/:post_id"))],
//!     RouterConfig::default(),
//! );
//! router.before_each(|to, _from, next| {
//!     match to.params().contains_key("id") {
//!         true => next.proceed(),
//!         false => next.redirect("/user/0"),
//!     }
//!     Ok(())
//! });
//!
//! router.start();
//! router.push("/user/42/posts/7");
//!
//! let route = router.current_route();
//! assert_eq!(route.matched().len(), 2);
//! assert_eq!(route.params(), &params([("id", "42"), ("post_id", "7")]));
//! ```

pub mod async_components;
pub mod error;
pub mod guards;
pub mod location;
pub mod matcher;
pub mod navigation;
pub mod params;
pub mod path;
pub mod query;
pub mod route;
pub mod route_definition;
pub mod router_cfg;
pub mod service;
pub mod transition;

/// A collection of useful items most applications might need.
pub mod prelude {
    pub use crate::async_components::ComponentLoader;
    pub use crate::error::*;
    pub use crate::guards::{
        AfterHook, Component, Guard, GuardKind, Instance, Next, NextAction, RouteComponent,
    };
    pub use crate::matcher::Matcher;
    pub use crate::navigation::*;
    pub use crate::params::{params, ParamValue, Params};
    pub use crate::query::{Query, QueryValue};
    pub use crate::route::{is_included_route, is_same_route, resolve_props, Route};
    pub use crate::route_definition::{
        PathOptions, PropsSpec, Redirect, RouteConfig, RouteRecord, ViewSlot, DEFAULT_VIEW,
    };
    pub use crate::router_cfg::{HistoryMode, RouterConfig};
    pub use crate::service::{HookId, Resolved, Router, Subscription};
    pub use waypoint_history::{HashHistory, History, MemoryHistory, WebHistory};
}

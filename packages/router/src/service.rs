use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use tracing::{debug, warn};
use waypoint_history::{History, MemoryHistory};

use crate::{
    error::{NavigationError, NavigationFailure},
    guards::{AfterHook, Guard, Instance, Next},
    location::normalize_location,
    matcher::Matcher,
    navigation::{Location, RawLocation},
    route::Route,
    route_definition::{RouteConfig, RouteRecord, Validity, ViewSlot},
    router_cfg::RouterConfig,
    transition::Transition,
};

/// Called with the committed route.
pub type CompleteCallback = Box<dyn FnOnce(&Route)>;

/// Called with the reason a navigation did not commit.
pub type AbortCallback = Box<dyn FnOnce(&NavigationFailure)>;

type ErrorCallback = Rc<dyn Fn(&NavigationError)>;
type Subscriber = dyn Fn(&Route);

/// Identifies a registered global hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Keeps a [`Router::subscribe`] callback registered. Dropping it unsubscribes.
#[must_use = "the callback is unsubscribed when the subscription is dropped"]
pub struct Subscription {
    _callback: Rc<Subscriber>,
}

/// The result of [`Router::resolve`].
#[derive(Clone, Debug)]
pub struct Resolved {
    /// The normalized target.
    pub location: Location,
    /// The route the target matches.
    pub route: Route,
    /// The address of the target, as produced by the history.
    pub href: String,
}

pub(crate) struct RouterState {
    pub(crate) current: Route,
    pub(crate) pending: Option<Rc<Transition>>,
    pub(crate) started: bool,
    pub(crate) ready: bool,
    pub(crate) ready_cbs: Vec<CompleteCallback>,
    pub(crate) ready_error_cbs: Vec<AbortCallback>,
    pub(crate) error_cbs: Vec<ErrorCallback>,
    pub(crate) subscribers: Vec<Weak<Subscriber>>,
    /// Invalidated whenever another route commits.
    pub(crate) validity: Validity,
}

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) before_each: Vec<(HookId, Guard)>,
    pub(crate) before_resolve: Vec<(HookId, Guard)>,
    pub(crate) after_each: Vec<(HookId, AfterHook)>,
    next_id: u64,
}

impl Hooks {
    fn next_id(&mut self) -> HookId {
        self.next_id += 1;
        HookId(self.next_id)
    }
}

pub(crate) struct RouterInner {
    pub(crate) matcher: Matcher,
    pub(crate) history: Rc<dyn History>,
    pub(crate) state: RefCell<RouterState>,
    pub(crate) hooks: RefCell<Hooks>,
}

/// The core of the router.
///
/// This combines a [`Matcher`] and a [`History`]: navigations are matched into [`Route`]s, run
/// through the guard pipeline and, once committed, recorded in the history. Location changes that
/// originate in the history (back and forward) are picked up after [`Router::start`].
///
/// Cloning a [`Router`] creates another handle to the same router.
///
/// ```rust
/// # use waypoint_router::prelude::*;
/// let router = Router::new(
///     [RouteConfig::new("/").name("home"), RouteConfig::new("/user/:id").name("user")],
///     RouterConfig::default(),
/// );
/// router.start();
/// assert_eq!(router.current_route().name(), Some("home"));
///
/// router.push(Location::named("user").param("id", "42"));
/// assert_eq!(router.current_route().full_path(), "/user/42");
/// assert_eq!(router.history().current_location(), "/user/42");
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    /// Create a router over an in-memory address starting at [`RouterConfig::initial_location`],
    /// wrapped in the history strategy `config` selects.
    pub fn new(routes: impl IntoIterator<Item = RouteConfig>, config: RouterConfig) -> Self {
        let address: Rc<dyn History> =
            Rc::new(MemoryHistory::with_initial_path(&config.initial_location));
        Self::with_history(routes, config.build_history(address))
    }

    /// Create a router on top of any [`History`].
    pub fn with_history(routes: impl IntoIterator<Item = RouteConfig>, history: Rc<dyn History>) -> Self {
        Self {
            inner: Rc::new(RouterInner {
                matcher: Matcher::new(routes),
                history,
                state: RefCell::new(RouterState {
                    current: Route::start(),
                    pending: None,
                    started: false,
                    ready: false,
                    ready_cbs: Vec::new(),
                    ready_error_cbs: Vec::new(),
                    error_cbs: Vec::new(),
                    subscribers: Vec::new(),
                    validity: Validity::new(),
                }),
                hooks: RefCell::new(Hooks::default()),
            }),
        }
    }

    /// Navigate to the location of the history and follow its external changes from now on.
    pub fn start(&self) {
        if std::mem::replace(&mut self.inner.state.borrow_mut().started, true) {
            warn!("router was already started");
            return;
        }

        let router = Rc::downgrade(&self.inner);
        self.inner.history.updater(Rc::new(move || {
            if let Some(router) = router.upgrade() {
                let location = router.history.current_location();
                debug!(%location, "history changed externally");
                router.transition_to(location.into(), None, None);
            }
        }));

        let location = self.inner.history.current_location();
        self.inner.transition_to(location.into(), None, None);
    }

    pub fn history(&self) -> Rc<dyn History> {
        self.inner.history.clone()
    }

    pub fn matcher(&self) -> &Matcher {
        &self.inner.matcher
    }

    /// The committed route. [`Route::start`] until the first navigation commits.
    pub fn current_route(&self) -> Route {
        self.inner.state.borrow().current.clone()
    }

    /// The target of the navigation waiting for its guards, if any.
    pub fn pending_route(&self) -> Option<Route> {
        self.inner
            .state
            .borrow()
            .pending
            .as_ref()
            .map(|transition| transition.to.clone())
    }

    /// Whether the first navigation finished.
    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().ready
    }

    /// Navigate to `to`, creating a new history entry once committed.
    pub fn push(&self, to: impl Into<RawLocation>) {
        self.inner.navigate(to.into(), false, None, None);
    }

    /// Like [`Router::push`], reporting the outcome.
    pub fn push_with(
        &self,
        to: impl Into<RawLocation>,
        on_complete: impl FnOnce(&Route) + 'static,
        on_abort: impl FnOnce(&NavigationFailure) + 'static,
    ) {
        self.inner.navigate(
            to.into(),
            false,
            Some(Box::new(on_complete)),
            Some(Box::new(on_abort)),
        );
    }

    /// Navigate to `to`, replacing the current history entry once committed.
    pub fn replace(&self, to: impl Into<RawLocation>) {
        self.inner.navigate(to.into(), true, None, None);
    }

    /// Like [`Router::replace`], reporting the outcome.
    pub fn replace_with(
        &self,
        to: impl Into<RawLocation>,
        on_complete: impl FnOnce(&Route) + 'static,
        on_abort: impl FnOnce(&NavigationFailure) + 'static,
    ) {
        self.inner.navigate(
            to.into(),
            true,
            Some(Box::new(on_complete)),
            Some(Box::new(on_abort)),
        );
    }

    /// Run a navigation to `to` without touching the history, superseding any pending one.
    pub fn transition_to(
        &self,
        to: impl Into<RawLocation>,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) {
        self.inner.transition_to(to.into(), on_complete, on_abort);
    }

    /// Move `delta` entries through the history.
    pub fn go(&self, delta: isize) {
        self.inner.history.go(delta);
    }

    pub fn back(&self) {
        self.inner.history.go_back();
    }

    pub fn forward(&self) {
        self.inner.history.go_forward();
    }

    pub fn can_go_back(&self) -> bool {
        self.inner.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.inner.history.can_go_forward()
    }

    /// Match `to` relative to `current`.
    pub fn match_route(&self, to: impl Into<RawLocation>, current: Option<&Route>) -> Route {
        self.inner.matcher.match_route(to, current, None)
    }

    /// Work out where navigating to `to` from the current route would lead, without navigating.
    pub fn resolve(&self, to: impl Into<RawLocation>, append: bool) -> Resolved {
        let current = self.current_route();
        let location = normalize_location(to.into(), Some(&current), append);
        let route = self
            .inner
            .matcher
            .match_route(location.clone(), Some(&current), None);

        let full_path = route
            .redirected_from_full_path()
            .unwrap_or_else(|| route.full_path().to_string());
        let href = self.inner.history.href(&full_path);

        Resolved {
            location,
            route,
            href,
        }
    }

    /// The view slots of the route `to` would match, or of the current route.
    pub fn matched_components(&self, to: Option<RawLocation>) -> Vec<ViewSlot> {
        let route = match to {
            Some(to) => self.resolve(to, false).route,
            None => self.current_route(),
        };

        route
            .matched()
            .iter()
            .flat_map(|record| record.components())
            .map(|(_, view)| view)
            .collect()
    }

    /// Add routes to the table. A started router navigates to its current location again so the
    /// new routes can take effect.
    pub fn add_routes(&self, routes: impl IntoIterator<Item = RouteConfig>) {
        self.inner.matcher.add_routes(routes);

        if !self.current_route().is_start() {
            let location = self.inner.history.current_location();
            self.inner.transition_to(location.into(), None, None);
        }
    }

    /// Add a guard that runs for every navigation, before the update guards.
    pub fn before_each(
        &self,
        guard: impl Fn(&Route, &Route, Next) -> Result<(), NavigationError> + 'static,
    ) -> HookId {
        let mut hooks = self.inner.hooks.borrow_mut();
        let id = hooks.next_id();
        hooks.before_each.push((id, Rc::new(guard)));
        id
    }

    /// Add a guard that runs for every navigation, after the enter guards.
    pub fn before_resolve(
        &self,
        guard: impl Fn(&Route, &Route, Next) -> Result<(), NavigationError> + 'static,
    ) -> HookId {
        let mut hooks = self.inner.hooks.borrow_mut();
        let id = hooks.next_id();
        hooks.before_resolve.push((id, Rc::new(guard)));
        id
    }

    /// Add a hook that runs after every committed navigation, with the new and previous route.
    pub fn after_each(&self, hook: impl Fn(&Route, &Route) + 'static) -> HookId {
        let mut hooks = self.inner.hooks.borrow_mut();
        let id = hooks.next_id();
        hooks.after_each.push((id, Rc::new(hook)));
        id
    }

    /// Unregister a hook. Returns whether it was registered.
    pub fn remove_hook(&self, id: HookId) -> bool {
        let mut hooks = self.inner.hooks.borrow_mut();
        let before = hooks.before_each.len() + hooks.before_resolve.len() + hooks.after_each.len();

        hooks.before_each.retain(|(hook, _)| *hook != id);
        hooks.before_resolve.retain(|(hook, _)| *hook != id);
        hooks.after_each.retain(|(hook, _)| *hook != id);

        before != hooks.before_each.len() + hooks.before_resolve.len() + hooks.after_each.len()
    }

    /// Run `on_ready` once the first navigation committed, or `on_error` if it failed.
    ///
    /// Runs `on_ready` right away when the router is ready already.
    pub fn on_ready(
        &self,
        on_ready: impl FnOnce(&Route) + 'static,
        on_error: Option<AbortCallback>,
    ) {
        let current = {
            let mut state = self.inner.state.borrow_mut();
            if !state.ready {
                state.ready_cbs.push(Box::new(on_ready));
                state.ready_error_cbs.extend(on_error);
                return;
            }
            state.current.clone()
        };

        on_ready(&current);
    }

    /// Observe errors raised by guards and lazy components. Without observers they are logged.
    pub fn on_error(&self, callback: impl Fn(&NavigationError) + 'static) {
        self.inner
            .state
            .borrow_mut()
            .error_cbs
            .push(Rc::new(callback));
    }

    /// Call `callback` with every committed route, for as long as the returned [`Subscription`]
    /// is alive.
    pub fn subscribe(&self, callback: impl Fn(&Route) + 'static) -> Subscription {
        let callback: Rc<Subscriber> = Rc::new(callback);
        let mut state = self.inner.state.borrow_mut();
        state.subscribers.retain(|subscriber| subscriber.strong_count() > 0);
        state.subscribers.push(Rc::downgrade(&callback));

        Subscription {
            _callback: callback,
        }
    }

    /// Record that `instance` is mounted in `slot` of `record`. Pending enter guard callbacks
    /// waiting for it run now.
    pub fn register_instance(&self, record: &RouteRecord, slot: &str, instance: Instance) {
        record.instances.register(slot, instance);
    }

    /// Forget `instance` if it is the one mounted in `slot` of `record`.
    pub fn unregister_instance(&self, record: &RouteRecord, slot: &str, instance: &Instance) -> bool {
        record.instances.unregister(slot, instance)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn hooks_can_be_removed() {
        let router = Router::new([RouteConfig::new("/")], RouterConfig::default());
        let first = router.before_each(|_, _, next| {
            next.proceed();
            Ok(())
        });
        let second = router.after_each(|_, _| {});

        assert_ne!(first, second);
        assert!(router.remove_hook(first));
        assert!(!router.remove_hook(first));
        assert!(router.remove_hook(second));
    }

    #[test]
    fn ready_runs_immediately_once_ready() {
        let router = Router::new([RouteConfig::new("/")], RouterConfig::default());
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        router.on_ready(move |_| counter.set(counter.get() + 1), None);
        assert_eq!(calls.get(), 0);

        router.start();
        assert!(router.is_ready());
        assert_eq!(calls.get(), 1);

        let counter = calls.clone();
        router.on_ready(move |_| counter.set(counter.get() + 1), None);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn dropped_subscriptions_are_not_called() {
        let router = Router::new([RouteConfig::new("/"), RouteConfig::new("/a")], RouterConfig::default());
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        let subscription = router.subscribe(move |_| counter.set(counter.get() + 1));
        router.start();
        assert_eq!(calls.get(), 1);

        drop(subscription);
        router.push("/a");
        assert_eq!(calls.get(), 1);
        assert_eq!(router.current_route().path(), "/a");
    }

    #[test]
    fn resolve_uses_redirect_source_for_href() {
        let router = Router::new(
            [RouteConfig::new("/old").redirect("/new"), RouteConfig::new("/new")],
            RouterConfig::default().mode(crate::router_cfg::HistoryMode::Hash),
        );

        let resolved = router.resolve("/old?x=1", false);
        assert_eq!(resolved.route.full_path(), "/new?x=1");
        assert_eq!(resolved.href, "/#/old?x=1");
        assert_eq!(resolved.location.path.as_deref(), Some("/old"));
    }
}

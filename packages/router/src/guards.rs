//! Navigation guards and the `next` continuation they report through.

use std::{any::Any, cell::Cell, fmt::Debug, rc::Rc};

use tracing::warn;

use crate::{
    error::NavigationError,
    navigation::{Location, RawLocation},
    route::Route,
    route_definition::RouteRecord,
};

/// A mounted component instance, as registered by whatever renders the matched views.
pub type Instance = Rc<dyn Any>;

/// A navigation guard: called with the target route, the current route and the continuation.
///
/// Returning `Err` is the same as calling `next` with that error.
pub type Guard = Rc<dyn Fn(&Route, &Route, Next) -> Result<(), NavigationError>>;

/// A hook that runs after a navigation committed, with the new and the previous route.
pub type AfterHook = Rc<dyn Fn(&Route, &Route)>;

/// A component that can be placed in a view slot.
pub type Component = Rc<dyn RouteComponent>;

/// The kinds of guards a navigation runs, in the order they are introduced to a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardKind {
    /// Of components being left, innermost first.
    Leave,
    /// Global hooks registered with `before_each`.
    BeforeEach,
    /// Of components that stay mounted but see new params.
    Update,
    /// Configured on route entries with `before_enter`.
    BeforeEnter,
    /// Of components being entered. They run before the component exists.
    Enter,
    /// Global hooks registered with `before_resolve`.
    BeforeResolve,
    /// Global hooks registered with `after_each`. They cannot affect the navigation.
    AfterEach,
}

/// The component definitions the router places in view slots.
///
/// Components take part in navigations through their guards.
pub trait RouteComponent {
    /// A name for diagnostics.
    fn name(&self) -> Option<&str> {
        None
    }

    /// The guards of `kind` this component defines.
    ///
    /// [`GuardKind::Leave`] and [`GuardKind::Update`] guards are bound to the mounted `instance`;
    /// they are only requested for slots with an instance. [`GuardKind::Enter`] guards are
    /// requested without one, since the component has not been created yet.
    #[allow(unused_variables)]
    fn guards(&self, kind: GuardKind, instance: Option<&Instance>) -> Vec<Guard> {
        Vec::new()
    }
}

/// What a guard decided.
pub enum NextAction {
    /// Continue with the next guard.
    Proceed,
    /// Cancel the navigation and restore the visible location.
    Abort,
    /// Cancel the navigation and report the error.
    Error(NavigationError),
    /// Cancel the navigation and start a new one to the given target. A target without a path or
    /// a name continues like [`NextAction::Proceed`].
    Redirect(RawLocation),
    /// Continue, and call back with the component instance once it is mounted. Only enter
    /// guards can use the instance; other guards simply continue.
    WithInstance(Box<dyn FnOnce(Instance)>),
}

impl Debug for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proceed => f.write_str("Proceed"),
            Self::Abort => f.write_str("Abort"),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Self::Redirect(to) => f.debug_tuple("Redirect").field(to).finish(),
            Self::WithInstance(_) => f.write_str("WithInstance"),
        }
    }
}

impl From<bool> for NextAction {
    fn from(proceed: bool) -> Self {
        match proceed {
            true => Self::Proceed,
            false => Self::Abort,
        }
    }
}

impl From<()> for NextAction {
    fn from(_: ()) -> Self {
        Self::Proceed
    }
}

impl From<NavigationError> for NextAction {
    fn from(error: NavigationError) -> Self {
        Self::Error(error)
    }
}

impl From<RawLocation> for NextAction {
    fn from(to: RawLocation) -> Self {
        match to.has_destination() {
            true => Self::Redirect(to),
            false => Self::Proceed,
        }
    }
}

impl From<Location> for NextAction {
    fn from(to: Location) -> Self {
        RawLocation::from(to).into()
    }
}

impl From<&str> for NextAction {
    fn from(to: &str) -> Self {
        Self::Redirect(to.into())
    }
}

impl From<String> for NextAction {
    fn from(to: String) -> Self {
        Self::Redirect(to.into())
    }
}

struct NextInner {
    called: Cell<bool>,
    sink: Box<dyn Fn(NextAction)>,
}

/// The continuation handed to every guard.
///
/// The first call decides; later calls (through any clone) are ignored with a warning. A guard
/// may keep the handle and call it later, for example once a request finished. The navigation
/// waits until then.
#[derive(Clone)]
pub struct Next {
    inner: Rc<NextInner>,
}

impl Next {
    pub(crate) fn new(sink: impl Fn(NextAction) + 'static) -> Self {
        Self {
            inner: Rc::new(NextInner {
                called: Cell::new(false),
                sink: Box::new(sink),
            }),
        }
    }

    /// Report the decision of the guard.
    ///
    /// Accepts anything convertible to a [`NextAction`]: `true`/`()` continue, `false` aborts, a
    /// [`NavigationError`] fails, a path or [`Location`] redirects.
    pub fn call(&self, action: impl Into<NextAction>) {
        let action = action.into();
        if self.inner.called.replace(true) {
            warn!(?action, "next was called more than once in a navigation guard, ignoring");
            return;
        }

        (self.inner.sink)(action)
    }

    pub fn proceed(&self) {
        self.call(NextAction::Proceed)
    }

    pub fn abort(&self) {
        self.call(NextAction::Abort)
    }

    pub fn error(&self, error: NavigationError) {
        self.call(NextAction::Error(error))
    }

    /// Redirect to `to`. Without a path or a name, this continues instead.
    pub fn redirect(&self, to: impl Into<RawLocation>) {
        self.call(to.into())
    }

    /// Continue, running `callback` with the entered component's instance once it is mounted.
    pub fn with_instance(&self, callback: impl FnOnce(Instance) + 'static) {
        self.call(NextAction::WithInstance(Box::new(callback)))
    }

    /// Whether the guard has decided.
    pub fn is_called(&self) -> bool {
        self.inner.called.get()
    }
}

impl Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("called", &self.inner.called.get())
            .finish()
    }
}

/// A component guard together with where it came from.
#[derive(Clone)]
pub(crate) struct BoundGuard {
    pub(crate) guard: Guard,
    pub(crate) record: Rc<RouteRecord>,
    pub(crate) slot: String,
}

/// Collect the `kind` guards of the resolved components of `records`.
///
/// Leave and update guards need a mounted instance. With `reverse`, records and slots are visited
/// innermost first, while the guards of one component keep their order.
pub(crate) fn extract_guards(
    records: &[Rc<RouteRecord>],
    kind: GuardKind,
    reverse: bool,
) -> Vec<BoundGuard> {
    let mut per_component = Vec::new();

    for record in records {
        for (slot, view) in record.components() {
            let Some(component) = view.resolved() else {
                continue;
            };

            let guards = match kind {
                GuardKind::Leave | GuardKind::Update => match record.instance(&slot) {
                    Some(instance) => component.guards(kind, Some(&instance)),
                    None => continue,
                },
                _ => component.guards(kind, None),
            };

            per_component.push(
                guards
                    .into_iter()
                    .map(|guard| BoundGuard {
                        guard,
                        record: record.clone(),
                        slot: slot.clone(),
                    })
                    .collect::<Vec<_>>(),
            );
        }
    }

    if reverse {
        per_component.reverse();
    }
    per_component.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::route_definition::{RouteConfig, RouteTable};

    fn recording_next() -> (Next, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let next = Next::new(move |action| sink.borrow_mut().push(format!("{action:?}")));
        (next, log)
    }

    #[test]
    fn first_call_wins() {
        let (next, log) = recording_next();

        next.call(false);
        next.proceed();
        next.clone().redirect("/other");

        assert!(next.is_called());
        assert_eq!(*log.borrow(), vec![String::from("Abort")]);
    }

    #[test]
    fn conversions() {
        assert!(matches!(NextAction::from(true), NextAction::Proceed));
        assert!(matches!(NextAction::from(()), NextAction::Proceed));
        assert!(matches!(NextAction::from("/x"), NextAction::Redirect(_)));
        assert!(matches!(
            NextAction::from(Location::named("home")),
            NextAction::Redirect(_)
        ));
        assert!(matches!(
            NextAction::from(Location::default().query_value("x", "1")),
            NextAction::Proceed
        ));
        assert!(matches!(
            NextAction::from(NavigationError::guard("nope")),
            NextAction::Error(_)
        ));
    }

    struct Named {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl RouteComponent for Named {
        fn guards(&self, kind: GuardKind, instance: Option<&Instance>) -> Vec<Guard> {
            let name = self.name;
            let log = self.log.clone();
            let bound = instance.is_some();
            vec![Rc::new(move |_: &Route, _: &Route, next: Next| -> Result<(), NavigationError> {
                log.borrow_mut().push(format!("{name}:{kind:?}:{bound}"));
                next.proceed();
                Ok(())
            })]
        }
    }

    #[test]
    fn extraction_order_and_binding() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let component = |name| -> Component {
            Rc::new(Named {
                name,
                log: log.clone(),
            })
        };

        let table = RouteTable::new([RouteConfig::new("/a")
            .component(component("outer"))
            .child(RouteConfig::new("b").component(component("inner")))]);
        let chain = table.chain(table.by_path("/a/b").unwrap());

        // nothing is mounted, so nothing to leave
        assert!(extract_guards(&chain, GuardKind::Leave, true).is_empty());

        for record in &chain {
            record.instances.register("default", Rc::new(()));
        }

        let leave = extract_guards(&chain, GuardKind::Leave, true);
        let enter = extract_guards(&chain, GuardKind::Enter, false);
        let (next, _) = recording_next();
        for bound in leave.iter().chain(enter.iter()) {
            (bound.guard)(&Route::start(), &Route::start(), next.clone()).unwrap();
        }

        assert_eq!(
            *log.borrow(),
            vec![
                String::from("inner:Leave:true"),
                String::from("outer:Leave:true"),
                String::from("outer:Enter:false"),
                String::from("inner:Enter:false"),
            ]
        );
        assert_eq!(leave[0].record.path(), "/a/b");
        assert_eq!(enter[0].slot, "default");
    }
}

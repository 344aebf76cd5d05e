use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use pretty_assertions::assert_eq;
use waypoint_router::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn failures() -> (
    Rc<RefCell<Vec<NavigationFailure>>>,
    impl FnOnce(&NavigationFailure) + 'static,
) {
    let failures = Rc::new(RefCell::new(Vec::new()));
    let sink = failures.clone();
    (failures, move |failure: &NavigationFailure| {
        sink.borrow_mut().push(failure.clone())
    })
}

/// Logs and proceeds from its leave, update and enter guards.
struct Logged {
    name: &'static str,
    log: Log,
}

impl RouteComponent for Logged {
    fn name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn guards(&self, kind: GuardKind, _instance: Option<&Instance>) -> Vec<Guard> {
        let (name, log) = (self.name, self.log.clone());
        vec![Rc::new(
            move |_: &Route, _: &Route, next: Next| -> Result<(), NavigationError> {
                log.borrow_mut().push(format!("{name}:{kind:?}"));
                next.proceed();
                Ok(())
            },
        )]
    }
}

fn logged(name: &'static str, log: &Log) -> Component {
    Rc::new(Logged {
        name,
        log: log.clone(),
    })
}

struct Page;
impl RouteComponent for Page {}

#[test]
fn guards_run_in_pipeline_order() {
    let log = log();
    let sink = log.clone();
    let router = Router::new(
        [RouteConfig::new("/parent")
            .component(logged("Parent", &log))
            .child(RouteConfig::new("a").component(logged("A", &log)))
            .child(
                RouteConfig::new("b")
                    .component(logged("B", &log))
                    .before_enter(move |_, _, next| {
                        sink.borrow_mut().push(String::from("b:before_enter"));
                        next.proceed();
                        Ok(())
                    }),
            )],
        RouterConfig::default().initial_location("/parent/a"),
    );
    router.start();

    let current = router.current_route();
    assert_eq!(current.matched().len(), 2);
    for record in current.matched() {
        router.register_instance(record, DEFAULT_VIEW, Rc::new(()));
    }

    for (name, hook) in [("before_each", 0), ("before_resolve", 1)] {
        let log = log.clone();
        let guard = move |_: &Route, _: &Route, next: Next| -> Result<(), NavigationError> {
            log.borrow_mut().push(name.to_string());
            next.proceed();
            Ok(())
        };
        match hook {
            0 => router.before_each(guard),
            _ => router.before_resolve(guard),
        };
    }
    let after = log.clone();
    router.after_each(move |to, from| {
        after
            .borrow_mut()
            .push(format!("after_each:{}<-{}", to.path(), from.path()))
    });

    log.borrow_mut().clear();
    router.push("/parent/b");

    assert_eq!(
        *log.borrow(),
        [
            "A:Leave",
            "before_each",
            "Parent:Update",
            "b:before_enter",
            "B:Enter",
            "before_resolve",
            "after_each:/parent/b<-/parent/a",
        ]
    );
    assert_eq!(router.current_route().path(), "/parent/b");
}

#[test]
fn cancelled_navigation_keeps_current_route() {
    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/blocked").before_enter(|_, _, next| {
                next.call(false);
                Ok(())
            }),
        ],
        RouterConfig::default(),
    );
    router.start();

    let (aborts, on_abort) = failures();
    router.push_with("/blocked", |_| panic!("cancelled navigation committed"), on_abort);

    assert_eq!(
        *aborts.borrow(),
        [NavigationFailure::Cancelled {
            from: String::from("/"),
            to: String::from("/blocked"),
        }]
    );
    assert_eq!(router.current_route().path(), "/");
    assert_eq!(router.history().current_location(), "/");
    assert!(router.pending_route().is_none());
}

#[test]
fn guard_redirect_starts_one_new_navigation() {
    let targets = log();
    let committed = log();

    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/guarded").before_enter(|_, _, next| {
                next.redirect("/other");
                Ok(())
            }),
            RouteConfig::new("/other"),
        ],
        RouterConfig::default(),
    );
    router.start();

    let sink = targets.clone();
    router.before_each(move |to, _, next| {
        sink.borrow_mut().push(to.full_path().to_string());
        next.proceed();
        Ok(())
    });
    let sink = committed.clone();
    router.after_each(move |to, _| sink.borrow_mut().push(to.full_path().to_string()));

    let (aborts, on_abort) = failures();
    router.push_with("/guarded", |_| panic!("redirected navigation committed"), on_abort);

    assert_eq!(*targets.borrow(), ["/guarded", "/other"]);
    assert_eq!(*committed.borrow(), ["/other"]);
    assert_eq!(
        *aborts.borrow(),
        [NavigationFailure::Redirected {
            from: String::from("/"),
            to: String::from("/guarded"),
        }]
    );
    assert_eq!(router.current_route().path(), "/other");
    assert_eq!(router.history().current_location(), "/other");
}

#[test]
fn next_without_destination_continues() {
    let router = Router::new(
        [RouteConfig::new("/"), RouteConfig::new("/a")],
        RouterConfig::default(),
    );
    router.start();
    router.before_each(|_, _, next| {
        next.call(Location::default().query_value("x", "1"));
        Ok(())
    });

    let (aborts, on_abort) = failures();
    router.push_with("/a", |_| {}, on_abort);

    assert!(aborts.borrow().is_empty());
    assert_eq!(router.current_route().full_path(), "/a");
    assert_eq!(router.history().current_location(), "/a");
}

#[test]
fn replacing_redirect_does_not_add_an_entry() {
    let address = Rc::new(MemoryHistory::default());
    let router = Router::with_history(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/guarded").before_enter(|_, _, next| {
                next.redirect(Location::path("/other").replace(true));
                Ok(())
            }),
            RouteConfig::new("/other"),
        ],
        address.clone(),
    );
    router.start();

    router.push("/guarded");
    assert_eq!(address.current_location(), "/other");
    assert_eq!(address.len(), 1);
}

#[test]
fn superseded_navigation_never_commits() {
    let parked: Rc<RefCell<Option<Next>>> = Rc::new(RefCell::new(None));
    let park = parked.clone();

    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/slow").before_enter(move |_, _, next| {
                *park.borrow_mut() = Some(next);
                Ok(())
            }),
            RouteConfig::new("/fast"),
        ],
        RouterConfig::default(),
    );
    router.start();

    let committed = Rc::new(Cell::new(false));
    let flag = committed.clone();
    let (aborts, on_abort) = failures();
    router.push_with("/slow", move |_| flag.set(true), on_abort);
    assert_eq!(
        router.pending_route().map(|route| route.path().to_string()),
        Some(String::from("/slow"))
    );

    router.push("/fast");
    assert_eq!(router.current_route().path(), "/fast");

    let next = parked.borrow_mut().take().expect("guard was called");
    next.proceed();
    next.proceed();

    assert!(!committed.get());
    assert_eq!(router.current_route().path(), "/fast");
    assert_eq!(router.history().current_location(), "/fast");
    assert_eq!(
        *aborts.borrow(),
        [NavigationFailure::Superseded {
            to: String::from("/slow"),
        }]
    );
}

#[test]
fn duplicate_navigation_is_reported() {
    let router = Router::new(
        [RouteConfig::new("/"), RouteConfig::new("/a")],
        RouterConfig::default(),
    );
    router.start();
    router.push("/a");

    let (aborts, on_abort) = failures();
    router.push_with("/a", |_| panic!("duplicate committed"), on_abort);

    assert_eq!(
        *aborts.borrow(),
        [NavigationFailure::Duplicated(String::from("/a"))]
    );
}

#[test]
fn guard_errors_reach_error_observers() {
    init_logging();
    let router = Router::new(
        [RouteConfig::new("/"), RouteConfig::new("/private")],
        RouterConfig::default(),
    );
    router.start();

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    router.on_error(move |error| sink.borrow_mut().push(error.clone()));
    router.before_each(|to, _, next| {
        if to.path() == "/private" {
            return Err(NavigationError::guard("not signed in"));
        }
        next.proceed();
        Ok(())
    });

    let (aborts, on_abort) = failures();
    router.push_with("/private", |_| panic!("failed navigation committed"), on_abort);

    let error = NavigationError::guard("not signed in");
    assert_eq!(*errors.borrow(), [error.clone()]);
    assert_eq!(*aborts.borrow(), [NavigationFailure::Error(error)]);
    assert_eq!(router.current_route().path(), "/");
}

#[test]
fn deferred_guards_hold_the_navigation() {
    let parked: Rc<RefCell<Option<Next>>> = Rc::new(RefCell::new(None));
    let park = parked.clone();

    let router = Router::new(
        [RouteConfig::new("/"), RouteConfig::new("/data")],
        RouterConfig::default(),
    );
    router.start();
    router.before_each(move |_, _, next| {
        *park.borrow_mut() = Some(next);
        Ok(())
    });

    router.push("/data");
    assert_eq!(router.current_route().path(), "/");
    assert!(router.pending_route().is_some());

    let next = parked.borrow_mut().take().expect("guard was called");
    next.proceed();
    assert_eq!(router.current_route().path(), "/data");
    assert!(router.pending_route().is_none());
}

/// Asks for its instance from its enter guard.
struct Profile {
    seen: Rc<Cell<Option<u32>>>,
}

impl RouteComponent for Profile {
    fn guards(&self, kind: GuardKind, _instance: Option<&Instance>) -> Vec<Guard> {
        if kind != GuardKind::Enter {
            return Vec::new();
        }

        let seen = self.seen.clone();
        vec![Rc::new(
            move |_: &Route, _: &Route, next: Next| -> Result<(), NavigationError> {
                let seen = seen.clone();
                next.with_instance(move |instance| {
                    seen.set(instance.downcast_ref::<u32>().copied());
                });
                Ok(())
            },
        )]
    }
}

fn profile_router(seen: &Rc<Cell<Option<u32>>>) -> Router {
    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/profile").component(Rc::new(Profile { seen: seen.clone() })),
        ],
        RouterConfig::default(),
    );
    router.start();
    router
}

#[test]
fn enter_guard_receives_mounted_instance() {
    let seen = Rc::new(Cell::new(None));
    let router = profile_router(&seen);

    router.push("/profile");
    assert_eq!(router.current_route().path(), "/profile");
    assert_eq!(seen.get(), None);

    let record = router.current_route().matched()[0].clone();
    router.register_instance(&record, DEFAULT_VIEW, Rc::new(7u32));
    assert_eq!(seen.get(), Some(7));
}

#[test]
fn instance_wait_ends_when_route_changes() {
    let seen = Rc::new(Cell::new(None));
    let router = profile_router(&seen);

    router.push("/profile");
    let record = router.current_route().matched()[0].clone();
    router.push("/");

    router.register_instance(&record, DEFAULT_VIEW, Rc::new(7u32));
    assert_eq!(seen.get(), None);

    let instance = record.instance(DEFAULT_VIEW).expect("registered");
    assert!(router.unregister_instance(&record, DEFAULT_VIEW, &instance));
    assert!(record.instance(DEFAULT_VIEW).is_none());
}

#[test]
fn lazy_components_load_before_commit() {
    let loaders: Rc<RefCell<Vec<ComponentLoader>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = loaders.clone();

    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/lazy").lazy_component(move |loader| sink.borrow_mut().push(loader)),
        ],
        RouterConfig::default(),
    );
    router.start();

    router.push("/lazy");
    assert_eq!(router.current_route().path(), "/");
    assert_eq!(loaders.borrow().len(), 1);
    assert!(matches!(
        router.matched_components(Some("/lazy".into())).as_slice(),
        [ViewSlot::Lazy(_)]
    ));

    let loader = loaders.borrow_mut().remove(0);
    assert_eq!(loader.slot(), DEFAULT_VIEW);
    loader.resolve(Rc::new(Page));

    assert_eq!(router.current_route().path(), "/lazy");
    assert!(matches!(
        router.matched_components(None).as_slice(),
        [ViewSlot::Resolved(_)]
    ));
}

#[test]
fn lazy_factory_is_not_called_again_while_loading() {
    let calls = Rc::new(Cell::new(0));
    let loaders: Rc<RefCell<Vec<ComponentLoader>>> = Rc::new(RefCell::new(Vec::new()));
    let (counter, sink) = (calls.clone(), loaders.clone());

    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/other"),
            RouteConfig::new("/lazy").lazy_component(move |loader| {
                counter.set(counter.get() + 1);
                sink.borrow_mut().push(loader);
            }),
        ],
        RouterConfig::default(),
    );
    router.start();

    let (first_aborts, on_abort) = failures();
    router.push_with("/lazy", |_| panic!("superseded navigation committed"), on_abort);
    router.push("/other");
    assert_eq!(router.current_route().path(), "/other");

    router.push("/lazy");
    assert_eq!(calls.get(), 1);
    assert_eq!(router.current_route().path(), "/other");

    let pending: Vec<ComponentLoader> = loaders.borrow_mut().drain(..).collect();
    for loader in pending {
        loader.resolve(Rc::new(Page));
    }

    assert_eq!(calls.get(), 1);
    assert_eq!(router.current_route().path(), "/lazy");
    assert!(matches!(
        first_aborts.borrow().as_slice(),
        [NavigationFailure::Superseded { .. }]
    ));
}

#[test]
fn lazy_component_failure_aborts() {
    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/lazy").lazy_component(|loader| loader.reject("network down")),
        ],
        RouterConfig::default(),
    );
    router.start();

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    router.on_error(move |error| sink.borrow_mut().push(error.clone()));

    router.push("/lazy");
    assert_eq!(
        *errors.borrow(),
        [NavigationError::AsyncComponent {
            slot: String::from(DEFAULT_VIEW),
            reason: String::from("network down"),
        }]
    );
    assert_eq!(router.current_route().path(), "/");
}

#[test]
fn failed_initial_navigation_fails_readiness() {
    init_logging();
    let router = Router::new(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/blocked").before_enter(|_, _, next| {
                next.abort();
                Ok(())
            }),
        ],
        RouterConfig::default().initial_location("/blocked"),
    );

    let (failed, on_error) = failures();
    router.on_ready(
        |_| panic!("ready after a failed navigation"),
        Some(Box::new(on_error)),
    );
    router.start();

    assert!(router.is_ready());
    assert_eq!(failed.borrow().len(), 1);
    assert!(router.current_route().is_start());
    assert_eq!(router.history().current_location(), "/");
}

#[test]
fn redirected_initial_navigation_becomes_ready() {
    let router = Router::new(
        [
            RouteConfig::new("/entry").before_enter(|_, _, next| {
                next.redirect("/home");
                Ok(())
            }),
            RouteConfig::new("/home"),
        ],
        RouterConfig::default().initial_location("/entry"),
    );

    let ready = log();
    let sink = ready.clone();
    router.on_ready(
        move |route| sink.borrow_mut().push(route.path().to_string()),
        Some(Box::new(|_: &NavigationFailure| panic!("redirect failed readiness"))),
    );
    router.start();

    assert_eq!(*ready.borrow(), ["/home"]);
}

#[test]
fn history_moves_trigger_navigations() {
    let address = Rc::new(MemoryHistory::default());
    let router = Router::with_history(
        [
            RouteConfig::new("/"),
            RouteConfig::new("/a"),
            RouteConfig::new("/b"),
        ],
        address.clone(),
    );
    router.start();
    router.push("/a");
    router.push("/b");
    assert_eq!(address.len(), 3);

    router.back();
    assert_eq!(router.current_route().path(), "/a");
    assert!(router.can_go_forward());

    router.forward();
    assert_eq!(router.current_route().path(), "/b");

    router.go(-2);
    assert_eq!(router.current_route().path(), "/");
    assert!(!router.can_go_back());
}

#[test]
fn hash_mode_keeps_location_in_fragment() {
    let address = Rc::new(MemoryHistory::with_initial_path("/app/"));
    let history = RouterConfig::default()
        .mode(HistoryMode::Hash)
        .build_history(address.clone());
    let router = Router::with_history(
        [RouteConfig::new("/"), RouteConfig::new("/users/:id")],
        history,
    );
    router.start();
    assert_eq!(address.current_location(), "/app/#/");

    router.push(Location::path("/users/1").query_value("tab", "posts"));
    assert_eq!(address.current_location(), "/app/#/users/1?tab=posts");
    assert_eq!(router.resolve("/users/2", false).href, "/app/#/users/2");
}

#[test]
fn history_mode_strips_base() {
    let address = Rc::new(MemoryHistory::with_initial_path("/shop/items/3"));
    let history = RouterConfig::default()
        .mode(HistoryMode::History)
        .base("/shop/")
        .build_history(address.clone());
    let router = Router::with_history(
        [RouteConfig::new("/items/:id"), RouteConfig::new("/cart")],
        history,
    );
    router.start();

    assert_eq!(router.current_route().params(), &params([("id", "3")]));

    router.push("/cart");
    assert_eq!(address.current_location(), "/shop/cart");
    assert_eq!(router.resolve("/items/4", false).href, "/shop/items/4");
}

#[test]
fn history_mode_falls_back_to_fragment() {
    let router = Router::new(
        [RouteConfig::new("/users/:id")],
        RouterConfig::default()
            .mode(HistoryMode::History)
            .base("/app")
            .supports_push_state(false)
            .initial_location("/app/users/1"),
    );
    router.start();

    assert_eq!(router.current_route().path(), "/users/1");
    assert_eq!(router.resolve("/users/2", false).href, "/app/#/users/2");
}

#[test]
fn added_routes_apply_to_current_location() {
    let router = Router::new(
        [RouteConfig::new("/")],
        RouterConfig::default().initial_location("/late"),
    );
    router.start();
    assert!(router.current_route().matched().is_empty());

    router.add_routes([RouteConfig::new("/late").name("late")]);
    assert_eq!(router.current_route().name(), Some("late"));
}

#[test]
fn params_only_navigation_reuses_current_route() {
    let router = Router::new(
        [RouteConfig::new("/user/:id/:tab").name("user")],
        RouterConfig::default().initial_location("/user/1/posts"),
    );
    router.start();

    router.push(Location::with_params(params([("tab", "likes")])));
    assert_eq!(router.current_route().path(), "/user/1/likes");
    assert_eq!(router.history().current_location(), "/user/1/likes");
}

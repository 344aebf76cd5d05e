//! Loading lazily defined view components before a navigation enters them.

use std::{cell::Cell, fmt::Display, rc::Rc};

use tracing::{debug, warn};

use crate::{
    error::NavigationError,
    guards::{Component, Guard, Next},
    route::Route,
    route_definition::{LazyComponent, RouteRecord, ViewSlot},
};

struct Batch {
    pending: Cell<usize>,
    failed: Cell<bool>,
    next: Next,
}

struct LoaderInner {
    record: Rc<RouteRecord>,
    slot: String,
    lazy: LazyComponent,
    settled: Cell<bool>,
    batch: Rc<Batch>,
}

/// Handed to the factory of a lazy component. Settle it exactly once, now or later.
#[derive(Clone)]
pub struct ComponentLoader {
    inner: Rc<LoaderInner>,
}

impl ComponentLoader {
    /// The view slot being loaded.
    pub fn slot(&self) -> &str {
        &self.inner.slot
    }

    /// Deliver the component. The navigation continues once every lazy component it waits for
    /// has been delivered.
    pub fn resolve(&self, component: Component) {
        if self.inner.settled.replace(true) {
            warn!(slot = %self.inner.slot, "async component settled more than once, ignoring");
            return;
        }

        debug!(
            slot = %self.inner.slot,
            path = %self.inner.record.path(),
            "resolved async component"
        );
        let waiting = self.inner.lazy.settle(Some(component.clone()));
        self.inner
            .record
            .replace_component(&self.inner.slot, ViewSlot::Resolved(component.clone()));

        let batch = &self.inner.batch;
        let pending = batch.pending.get().saturating_sub(1);
        batch.pending.set(pending);
        if pending == 0 && !batch.failed.get() {
            batch.next.proceed();
        }

        for loader in waiting {
            loader.resolve(component.clone());
        }
    }

    /// Report that the component could not be loaded. Fails the navigation, unless another
    /// component of it failed already.
    pub fn reject(&self, reason: impl Display) {
        if self.inner.settled.replace(true) {
            warn!(slot = %self.inner.slot, "async component settled more than once, ignoring");
            return;
        }

        let reason = reason.to_string();
        warn!(
            slot = %self.inner.slot,
            path = %self.inner.record.path(),
            "failed to resolve async component: {reason}"
        );

        let waiting = self.inner.lazy.settle(None);

        let batch = &self.inner.batch;
        if !batch.failed.replace(true) {
            batch.next.error(NavigationError::AsyncComponent {
                slot: self.inner.slot.clone(),
                reason: reason.clone(),
            });
        }

        for loader in waiting {
            loader.reject(&reason);
        }
    }
}

/// A guard that loads every lazy component of `records` and continues once all of them are
/// available.
///
/// Components loaded by an earlier navigation are swapped in without calling their factory again,
/// and components still loading for an earlier navigation are waited for.
pub(crate) fn resolve_async_components(records: Vec<Rc<RouteRecord>>) -> Guard {
    Rc::new(move |_: &Route, _: &Route, next: Next| -> Result<(), NavigationError> {
        let mut waiting = Vec::new();
        for record in &records {
            for (slot, view) in record.components() {
                let ViewSlot::Lazy(lazy) = view else {
                    continue;
                };

                match lazy.resolved() {
                    Some(component) => {
                        record.replace_component(&slot, ViewSlot::Resolved(component))
                    }
                    None => waiting.push((record.clone(), slot, lazy)),
                }
            }
        }

        if waiting.is_empty() {
            next.proceed();
            return Ok(());
        }

        // every slot is counted before any factory runs, so factories may resolve synchronously
        let batch = Rc::new(Batch {
            pending: Cell::new(waiting.len()),
            failed: Cell::new(false),
            next,
        });

        for (record, slot, lazy) in waiting {
            let loader = ComponentLoader {
                inner: Rc::new(LoaderInner {
                    record,
                    slot,
                    lazy: lazy.clone(),
                    settled: Cell::new(false),
                    batch: batch.clone(),
                }),
            };

            lazy.load(loader);
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        guards::{NextAction, RouteComponent},
        route_definition::{RouteConfig, RouteTable},
    };

    struct Loaded;
    impl RouteComponent for Loaded {
        fn name(&self) -> Option<&str> {
            Some("loaded")
        }
    }

    fn run(records: Vec<Rc<RouteRecord>>) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let next = Next::new(move |action| sink.borrow_mut().push(format!("{action:?}")));

        let guard = resolve_async_components(records);
        guard(&Route::start(), &Route::start(), next).unwrap();
        log
    }

    #[test]
    fn proceeds_without_lazy_components() {
        let table = RouteTable::new([RouteConfig::new("/").component(Rc::new(Loaded))]);
        let log = run(table.ordered().cloned().collect());

        assert_eq!(*log.borrow(), vec![String::from("Proceed")]);
    }

    #[test]
    fn waits_for_every_slot() {
        let loaders = Rc::new(RefCell::new(Vec::new()));
        let (first, second) = (loaders.clone(), loaders.clone());
        let table = RouteTable::new([RouteConfig::new("/")
            .lazy_component(move |loader| first.borrow_mut().push(loader))
            .lazy_named_view("side", move |loader| second.borrow_mut().push(loader))]);
        let record = table.by_path("").unwrap().clone();

        let log = run(vec![record.clone()]);
        assert!(log.borrow().is_empty());

        let pending: Vec<ComponentLoader> = loaders.borrow_mut().drain(..).collect();
        assert_eq!(pending.len(), 2);

        pending[0].resolve(Rc::new(Loaded));
        assert!(log.borrow().is_empty());

        pending[1].resolve(Rc::new(Loaded));
        pending[1].resolve(Rc::new(Loaded));
        assert_eq!(*log.borrow(), vec![String::from("Proceed")]);

        assert!(record
            .components()
            .iter()
            .all(|(_, view)| view.resolved().is_some()));
    }

    #[test]
    fn synchronous_factories_proceed_once() {
        let table = RouteTable::new([RouteConfig::new("/a")
            .lazy_component(|loader| loader.resolve(Rc::new(Loaded)))
            .lazy_named_view("side", |loader| loader.resolve(Rc::new(Loaded)))]);

        let log = run(table.ordered().cloned().collect());
        assert_eq!(*log.borrow(), vec![String::from("Proceed")]);
    }

    #[test]
    fn first_rejection_fails() {
        let table = RouteTable::new([RouteConfig::new("/a")
            .lazy_component(|loader| loader.reject("offline"))
            .lazy_named_view("side", |loader| loader.reject("also offline"))]);

        let log = run(table.ordered().cloned().collect());
        let expected = format!(
            "{:?}",
            NextAction::Error(NavigationError::AsyncComponent {
                slot: String::from("default"),
                reason: String::from("offline"),
            })
        );
        assert_eq!(*log.borrow(), vec![expected]);
    }

    #[test]
    fn loads_in_flight_are_shared() {
        let loaders = Rc::new(RefCell::new(Vec::new()));
        let sink = loaders.clone();
        let table = RouteTable::new([RouteConfig::new("/a")
            .lazy_component(move |loader| sink.borrow_mut().push(loader))]);
        let records: Vec<_> = table.ordered().cloned().collect();

        let first = run(records.clone());
        let second = run(records.clone());
        assert_eq!(loaders.borrow().len(), 1);

        let ViewSlot::Lazy(lazy) = records[0].components().remove(0).1 else {
            panic!("slot was resolved before the factory delivered");
        };
        assert!(lazy.is_loading());

        let loader: ComponentLoader = loaders.borrow_mut().remove(0);
        loader.resolve(Rc::new(Loaded));

        assert!(!lazy.is_loading());
        assert_eq!(*first.borrow(), vec![String::from("Proceed")]);
        assert_eq!(*second.borrow(), vec![String::from("Proceed")]);
    }

    #[test]
    fn failed_load_fails_waiters_and_can_retry() {
        let loaders = Rc::new(RefCell::new(Vec::new()));
        let sink = loaders.clone();
        let table = RouteTable::new([RouteConfig::new("/a")
            .lazy_component(move |loader| sink.borrow_mut().push(loader))]);
        let records: Vec<_> = table.ordered().cloned().collect();

        let first = run(records.clone());
        let second = run(records.clone());
        let loader: ComponentLoader = loaders.borrow_mut().remove(0);
        loader.reject("offline");

        assert_eq!(first.borrow().len(), 1);
        assert_eq!(second.borrow().len(), 1);
        assert!(second.borrow()[0].starts_with("Error"));

        run(records);
        assert_eq!(loaders.borrow().len(), 1);
    }

    #[test]
    fn factory_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let table = RouteTable::new([RouteConfig::new("/a").lazy_component(move |loader| {
            counter.set(counter.get() + 1);
            loader.resolve(Rc::new(Loaded));
        })]);
        let records: Vec<_> = table.ordered().cloned().collect();

        run(records.clone());
        let log = run(records);

        assert_eq!(calls.get(), 1);
        assert_eq!(*log.borrow(), vec![String::from("Proceed")]);
    }
}

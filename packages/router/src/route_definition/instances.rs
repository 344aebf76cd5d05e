use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use crate::guards::Instance;

/// A flag shared between the router and pending instance waits.
///
/// The router hands out one per committed route and invalidates it when the next route commits.
#[derive(Clone, Debug)]
pub struct Validity(Rc<Cell<bool>>);

impl Validity {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_valid(&self) -> bool {
        self.0.get()
    }

    pub fn invalidate(&self) {
        self.0.set(false);
    }
}

impl Default for Validity {
    fn default() -> Self {
        Self::new()
    }
}

struct Waiter {
    slot: String,
    validity: Validity,
    callback: Box<dyn FnOnce(Instance)>,
}

/// The mounted component instances of one record, keyed by view slot.
#[derive(Default)]
pub(crate) struct InstanceRegistry {
    instances: RefCell<BTreeMap<String, Instance>>,
    waiters: RefCell<Vec<Waiter>>,
}

impl InstanceRegistry {
    pub(crate) fn get(&self, slot: &str) -> Option<Instance> {
        self.instances.borrow().get(slot).cloned()
    }

    /// Store `instance` and hand it to every still valid wait for `slot`.
    pub(crate) fn register(&self, slot: &str, instance: Instance) {
        self.instances
            .borrow_mut()
            .insert(slot.to_string(), instance.clone());

        let ready: Vec<Waiter> = {
            let mut waiters = self.waiters.borrow_mut();
            let (ready, waiting) = std::mem::take(&mut *waiters)
                .into_iter()
                .filter(|waiter| waiter.validity.is_valid())
                .partition(|waiter| waiter.slot == slot);
            *waiters = waiting;
            ready
        };

        for waiter in ready {
            (waiter.callback)(instance.clone());
        }
    }

    /// Remove the instance of `slot` if it is `instance`. Returns whether anything was removed.
    pub(crate) fn unregister(&self, slot: &str, instance: &Instance) -> bool {
        let mut instances = self.instances.borrow_mut();
        match instances.get(slot) {
            Some(current) if Rc::ptr_eq(current, instance) => {
                instances.remove(slot);
                true
            }
            _ => false,
        }
    }

    /// Run `callback` with the instance of `slot` as soon as one is registered, unless `validity`
    /// is invalidated first.
    pub(crate) fn wait_for(
        &self,
        slot: &str,
        validity: Validity,
        callback: Box<dyn FnOnce(Instance)>,
    ) {
        if !validity.is_valid() {
            return;
        }

        if let Some(instance) = self.get(slot) {
            callback(instance);
            return;
        }

        let mut waiters = self.waiters.borrow_mut();
        waiters.retain(|waiter| waiter.validity.is_valid());
        waiters.push(Waiter {
            slot: slot.to_string(),
            validity,
            callback,
        });
    }

    #[cfg(test)]
    pub(crate) fn pending_waits(&self) -> usize {
        self.waiters
            .borrow()
            .iter()
            .filter(|waiter| waiter.validity.is_valid())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;

    fn instance(value: u32) -> Instance {
        Rc::new(value) as Rc<dyn Any>
    }

    #[test]
    fn wait_resolves_on_registration() {
        let registry = InstanceRegistry::default();
        let seen = Rc::new(Cell::new(0));

        let sink = seen.clone();
        registry.wait_for(
            "default",
            Validity::new(),
            Box::new(move |instance| {
                sink.set(*instance.downcast_ref::<u32>().unwrap());
            }),
        );
        assert_eq!(registry.pending_waits(), 1);

        registry.register("default", instance(7));
        assert_eq!(seen.get(), 7);
        assert_eq!(registry.pending_waits(), 0);
    }

    #[test]
    fn existing_instance_resolves_immediately() {
        let registry = InstanceRegistry::default();
        registry.register("default", instance(1));

        let called = Rc::new(Cell::new(false));
        let sink = called.clone();
        registry.wait_for("default", Validity::new(), Box::new(move |_| sink.set(true)));
        assert!(called.get());
    }

    #[test]
    fn invalidated_wait_never_runs() {
        let registry = InstanceRegistry::default();
        let validity = Validity::new();
        let called = Rc::new(Cell::new(false));

        let sink = called.clone();
        registry.wait_for("default", validity.clone(), Box::new(move |_| sink.set(true)));
        validity.invalidate();
        registry.register("default", instance(1));

        assert!(!called.get());
    }

    #[test]
    fn unregister_requires_same_instance() {
        let registry = InstanceRegistry::default();
        let first = instance(1);
        registry.register("default", first.clone());

        assert!(!registry.unregister("default", &instance(1)));
        assert!(registry.unregister("default", &first));
        assert!(registry.get("default").is_none());
    }
}

//! The navigation transition pipeline.
//!
//! A transition moves the router from its current [`Route`] to a candidate. It runs two phases of
//! guards, one at a time, each reporting through a [`Next`] continuation:
//!
//! 1. leave guards of deactivated records (innermost first), `before_each` hooks, update guards of
//!    updated records, `before_enter` guards of activated records, then loading of lazy
//!    components.
//! 2. enter guards of activated records, then `before_resolve` hooks.
//!
//! The candidate is committed only if every guard proceeds. Guards may answer later; the driver
//! simply stops and resumes when their `next` arrives. A transition that is no longer the pending
//! one when it resumes is superseded and has no effect on the router.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use tracing::{debug, error, trace};

use crate::{
    async_components::resolve_async_components,
    error::NavigationFailure,
    guards::{extract_guards, Guard, GuardKind, Instance, Next, NextAction},
    navigation::RawLocation,
    route::{is_same_route, Route},
    route_definition::{RouteRecord, Validity},
    service::{AbortCallback, CompleteCallback, RouterInner},
};

/// How two matched chains relate.
#[derive(Clone, Debug, Default)]
pub struct MatchedDiff {
    /// The common prefix: records that stay, possibly with new params.
    pub updated: Vec<Rc<RouteRecord>>,
    /// Records only the next chain has.
    pub activated: Vec<Rc<RouteRecord>>,
    /// Records only the current chain has.
    pub deactivated: Vec<Rc<RouteRecord>>,
}

/// Split `current` and `next` at the first position where their records differ.
pub fn resolve_queue(current: &[Rc<RouteRecord>], next: &[Rc<RouteRecord>]) -> MatchedDiff {
    let split = current
        .iter()
        .zip(next)
        .take_while(|(current, next)| Rc::ptr_eq(current, next))
        .count();

    MatchedDiff {
        updated: next[..split].to_vec(),
        activated: next[split..].to_vec(),
        deactivated: current[split..].to_vec(),
    }
}

enum Step {
    Guard(Guard),
    /// An enter guard, which may ask for the instance mounted in `slot` of `record`.
    Enter {
        guard: Guard,
        record: Rc<RouteRecord>,
        slot: String,
    },
}

struct PostEnter {
    record: Rc<RouteRecord>,
    slot: String,
    callback: Box<dyn FnOnce(Instance)>,
}

/// One attempt to move from `from` to `to`.
pub(crate) struct Transition {
    pub(crate) to: Route,
    pub(crate) from: Route,
    activated: Vec<Rc<RouteRecord>>,
    steps: RefCell<VecDeque<Step>>,
    second_phase: Cell<bool>,
    /// A guard was called and has not answered yet.
    waiting: Cell<bool>,
    driving: Cell<bool>,
    settled: Cell<bool>,
    outcome: RefCell<Option<NextAction>>,
    post_enter: RefCell<Vec<PostEnter>>,
    on_complete: RefCell<Option<CompleteCallback>>,
    on_abort: RefCell<Option<AbortCallback>>,
}

impl Transition {
    fn new(
        to: Route,
        from: Route,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) -> Self {
        Self {
            to,
            from,
            activated: Vec::new(),
            steps: RefCell::new(VecDeque::new()),
            second_phase: Cell::new(false),
            waiting: Cell::new(false),
            driving: Cell::new(false),
            settled: Cell::new(false),
            outcome: RefCell::new(None),
            post_enter: RefCell::new(Vec::new()),
            on_complete: RefCell::new(on_complete),
            on_abort: RefCell::new(on_abort),
        }
    }
}

fn is_duplicate(to: &Route, from: &Route) -> bool {
    let same_leaf = match (to.matched().last(), from.matched().last()) {
        (Some(to), Some(from)) => Rc::ptr_eq(to, from),
        (None, None) => true,
        _ => false,
    };

    is_same_route(to, from) && to.matched().len() == from.matched().len() && same_leaf
}

impl RouterInner {
    /// Start a transition to `raw`, superseding any pending one.
    pub(crate) fn transition_to(
        self: &Rc<Self>,
        raw: RawLocation,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) {
        let from = self.state.borrow().current.clone();
        let to = self.matcher.match_route(raw, Some(&from), None);
        debug!(from = %from.full_path(), to = %to.full_path(), "starting transition");

        let mut transition = Transition::new(to, from, on_complete, on_abort);

        if is_duplicate(&transition.to, &transition.from) {
            let transition = Rc::new(transition);
            self.state.borrow_mut().pending = None;
            self.ensure_url(false);
            let failure = NavigationFailure::Duplicated(transition.to.full_path().to_string());
            self.abort(&transition, failure);
            return;
        }

        let diff = resolve_queue(transition.from.matched(), transition.to.matched());
        let mut steps = VecDeque::new();
        steps.extend(
            extract_guards(&diff.deactivated, GuardKind::Leave, true)
                .into_iter()
                .map(|bound| Step::Guard(bound.guard)),
        );
        steps.extend(
            self.hooks
                .borrow()
                .before_each
                .iter()
                .map(|(_, guard)| Step::Guard(guard.clone())),
        );
        steps.extend(
            extract_guards(&diff.updated, GuardKind::Update, false)
                .into_iter()
                .map(|bound| Step::Guard(bound.guard)),
        );
        steps.extend(
            diff.activated
                .iter()
                .filter_map(|record| record.before_enter.clone())
                .map(Step::Guard),
        );
        steps.push_back(Step::Guard(resolve_async_components(
            diff.activated.clone(),
        )));

        transition.steps = RefCell::new(steps);
        transition.activated = diff.activated;

        let transition = Rc::new(transition);
        self.state.borrow_mut().pending = Some(transition.clone());
        self.drive(&transition);
    }

    fn is_pending(&self, transition: &Rc<Transition>) -> bool {
        self.state
            .borrow()
            .pending
            .as_ref()
            .is_some_and(|pending| Rc::ptr_eq(pending, transition))
    }

    /// Run steps until the transition settles or a guard has not answered yet.
    ///
    /// Guards answering synchronously do not recurse: their answer is stored and picked up by
    /// the loop that called them.
    fn drive(self: &Rc<Self>, transition: &Rc<Transition>) {
        if transition.driving.replace(true) {
            return;
        }

        loop {
            if transition.settled.get() {
                break;
            }

            if !self.is_pending(transition) {
                let to = transition.to.full_path().to_string();
                self.abort(transition, NavigationFailure::Superseded { to });
                break;
            }

            let outcome = transition.outcome.borrow_mut().take();
            if let Some(action) = outcome {
                transition.waiting.set(false);
                if !self.handle(transition, action) {
                    break;
                }
                continue;
            }

            if transition.waiting.get() {
                break;
            }

            let step = transition.steps.borrow_mut().pop_front();
            let Some(step) = step else {
                if transition.second_phase.replace(true) {
                    self.commit(transition);
                    break;
                }

                self.enqueue_second_phase(transition);
                continue;
            };

            let (guard, enter) = match step {
                Step::Guard(guard) => (guard, None),
                Step::Enter {
                    guard,
                    record,
                    slot,
                } => (guard, Some((record, slot))),
            };

            transition.waiting.set(true);
            let next = self.next_for(transition, enter);
            if let Err(error) = guard(&transition.to, &transition.from, next.clone()) {
                next.call(error);
            }
        }

        transition.driving.set(false);
    }

    fn next_for(
        self: &Rc<Self>,
        transition: &Rc<Transition>,
        enter: Option<(Rc<RouteRecord>, String)>,
    ) -> Next {
        let router = Rc::downgrade(self);
        let transition = transition.clone();

        Next::new(move |action| {
            let action = match action {
                NextAction::WithInstance(callback) => {
                    if let Some((record, slot)) = &enter {
                        transition.post_enter.borrow_mut().push(PostEnter {
                            record: record.clone(),
                            slot: slot.clone(),
                            callback,
                        });
                    }
                    NextAction::Proceed
                }
                action => action,
            };

            *transition.outcome.borrow_mut() = Some(action);
            if let Some(router) = router.upgrade() {
                router.drive(&transition);
            }
        })
    }

    /// Act on a guard's answer. Returns whether the transition goes on.
    fn handle(self: &Rc<Self>, transition: &Rc<Transition>, action: NextAction) -> bool {
        let from = transition.from.full_path().to_string();
        let to = transition.to.full_path().to_string();

        match action {
            NextAction::Proceed | NextAction::WithInstance(_) => true,
            NextAction::Redirect(target) if !target.has_destination() => true,
            NextAction::Abort => {
                self.ensure_url(true);
                self.abort(transition, NavigationFailure::Cancelled { from, to });
                false
            }
            NextAction::Error(error) => {
                self.ensure_url(true);
                self.abort(transition, error.into());
                false
            }
            NextAction::Redirect(target) => {
                self.abort(transition, NavigationFailure::Redirected { from, to });
                let replace = target.is_replace();
                self.navigate(target, replace, None, None);
                false
            }
        }
    }

    fn enqueue_second_phase(&self, transition: &Rc<Transition>) {
        trace!(to = %transition.to.full_path(), "running enter guards");

        let mut steps: VecDeque<Step> = extract_guards(&transition.activated, GuardKind::Enter, false)
            .into_iter()
            .map(|bound| Step::Enter {
                guard: bound.guard,
                record: bound.record,
                slot: bound.slot,
            })
            .collect();
        steps.extend(
            self.hooks
                .borrow()
                .before_resolve
                .iter()
                .map(|(_, guard)| Step::Guard(guard.clone())),
        );

        *transition.steps.borrow_mut() = steps;
    }

    fn commit(self: &Rc<Self>, transition: &Rc<Transition>) {
        transition.settled.set(true);
        let route = transition.to.clone();
        debug!(path = %route.full_path(), "navigation confirmed");

        let (subscribers, validity, ready) = {
            let mut state = self.state.borrow_mut();
            state.pending = None;
            state.current = route.clone();

            state.validity.invalidate();
            state.validity = Validity::new();

            state.subscribers.retain(|subscriber| subscriber.strong_count() > 0);
            let subscribers: Vec<_> = state
                .subscribers
                .iter()
                .filter_map(|subscriber| subscriber.upgrade())
                .collect();

            let ready = match state.ready {
                true => Vec::new(),
                false => {
                    state.ready = true;
                    state.ready_error_cbs.clear();
                    std::mem::take(&mut state.ready_cbs)
                }
            };

            (subscribers, state.validity.clone(), ready)
        };
        let after_each: Vec<_> = self
            .hooks
            .borrow()
            .after_each
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();

        for subscriber in subscribers {
            subscriber(&route);
        }

        let on_complete = transition.on_complete.borrow_mut().take();
        if let Some(on_complete) = on_complete {
            on_complete(&route);
        }

        self.ensure_url(false);

        for hook in after_each {
            hook(&route, &transition.from);
        }

        for callback in ready {
            callback(&route);
        }

        let post_enter = std::mem::take(&mut *transition.post_enter.borrow_mut());
        for PostEnter {
            record,
            slot,
            callback,
        } in post_enter
        {
            record.instances.wait_for(&slot, validity.clone(), callback);
        }
    }

    /// Settle `transition` without committing it.
    ///
    /// Errors go to the error observers, or are logged when there are none. The first failed
    /// navigation also fails readiness, unless it was superseded or it is the initial navigation
    /// being redirected.
    fn abort(&self, transition: &Rc<Transition>, failure: NavigationFailure) {
        if transition.settled.replace(true) {
            return;
        }
        debug!(%failure, "navigation aborted");

        let (error_cbs, ready_error_cbs) = {
            let mut state = self.state.borrow_mut();
            if state
                .pending
                .as_ref()
                .is_some_and(|pending| Rc::ptr_eq(pending, transition))
            {
                state.pending = None;
            }

            let error_cbs = match &failure {
                NavigationFailure::Error(_) => state.error_cbs.clone(),
                _ => Vec::new(),
            };

            let skip_ready = match &failure {
                NavigationFailure::Superseded { .. } => true,
                NavigationFailure::Redirected { .. } => transition.from.is_start(),
                _ => false,
            };
            let ready_error_cbs = match state.ready || skip_ready {
                true => Vec::new(),
                false => {
                    state.ready = true;
                    state.ready_cbs.clear();
                    std::mem::take(&mut state.ready_error_cbs)
                }
            };

            (error_cbs, ready_error_cbs)
        };

        if let NavigationFailure::Error(navigation_error) = &failure {
            if error_cbs.is_empty() {
                error!(error = %navigation_error, "uncaught error during route navigation");
            }
            for callback in error_cbs {
                callback(navigation_error);
            }
        }

        let on_abort = transition.on_abort.borrow_mut().take();
        if let Some(on_abort) = on_abort {
            on_abort(&failure);
        }

        for callback in ready_error_cbs {
            callback(&failure);
        }
    }

    /// Make the visible location show the current route.
    pub(crate) fn ensure_url(&self, push: bool) {
        let full_path = self.state.borrow().current.full_path().to_string();
        if self.history.current_location() == full_path {
            return;
        }

        trace!(location = %full_path, push, "restoring visible location");
        match push {
            true => self.history.push(full_path),
            false => self.history.replace(full_path),
        }
    }

    /// Start a transition to `raw` that records its route in the history once committed.
    pub(crate) fn navigate(
        self: &Rc<Self>,
        raw: RawLocation,
        replace: bool,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) {
        let history = self.history.clone();
        let persist: CompleteCallback = Box::new(move |route: &Route| {
            let full_path = route.full_path().to_string();
            match replace {
                true => history.replace(full_path),
                false => history.push(full_path),
            }

            if let Some(on_complete) = on_complete {
                on_complete(route);
            }
        });

        self.transition_to(raw, Some(persist), on_abort);
    }
}

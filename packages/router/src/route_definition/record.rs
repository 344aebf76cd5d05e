use std::{cell::RefCell, collections::BTreeMap, fmt::Debug, rc::Rc};

use serde_json::Value;

use super::{InstanceRegistry, PathPattern, PropsSpec, Redirect, ViewSlot};
use crate::guards::{Guard, Instance};

/// Stable index of a record inside its [`RouteTable`](super::RouteTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) usize);

/// A compiled entry of the route table.
///
/// Everything except the view slots (lazy components are replaced once loaded) and the mounted
/// instances is fixed once the record is built.
pub struct RouteRecord {
    pub(crate) id: RecordId,
    pub(crate) path: String,
    pub(crate) pattern: Option<Rc<PathPattern>>,
    pub(crate) components: RefCell<BTreeMap<String, ViewSlot>>,
    pub(crate) instances: InstanceRegistry,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<RecordId>,
    pub(crate) match_as: Option<String>,
    pub(crate) redirect: Option<Redirect>,
    pub(crate) before_enter: Option<Guard>,
    pub(crate) meta: Value,
    pub(crate) props: BTreeMap<String, PropsSpec>,
}

impl RouteRecord {
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The normalized path template, including the paths of all ancestors.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    /// For alias entries, the canonical path this entry resolves through.
    pub fn alias_of(&self) -> Option<&str> {
        self.match_as.as_deref()
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }

    pub fn meta(&self) -> &Value {
        &self.meta
    }

    pub fn pattern(&self) -> Option<&PathPattern> {
        self.pattern.as_deref()
    }

    /// The view slots of this record, in slot name order.
    pub fn components(&self) -> Vec<(String, ViewSlot)> {
        self.components
            .borrow()
            .iter()
            .map(|(slot, view)| (slot.clone(), view.clone()))
            .collect()
    }

    pub fn component(&self, slot: &str) -> Option<ViewSlot> {
        self.components.borrow().get(slot).cloned()
    }

    pub fn props(&self, slot: &str) -> Option<&PropsSpec> {
        self.props.get(slot)
    }

    /// The instance currently mounted in `slot`.
    pub fn instance(&self, slot: &str) -> Option<Instance> {
        self.instances.get(slot)
    }

    pub(crate) fn replace_component(&self, slot: &str, view: ViewSlot) {
        self.components.borrow_mut().insert(slot.to_string(), view);
    }
}

impl Debug for RouteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("match_as", &self.match_as)
            .field("redirect", &self.redirect)
            .field("components", &*self.components.borrow())
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RouteRecord {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

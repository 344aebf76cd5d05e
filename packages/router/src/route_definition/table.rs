use std::{cell::RefCell, collections::HashSet, rc::Rc};

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::{InstanceRegistry, PathPattern, RecordId, RouteConfig, RouteRecord};
use crate::path::clean_path;

/// The path of catch-all entries. They are always tried last.
pub const WILDCARD: &str = "*";

/// The compiled route configuration.
///
/// Holds every [`RouteRecord`] plus the lookup structures the matcher needs: the path list in
/// matching priority order and the path and name maps.
#[derive(Debug, Default)]
pub struct RouteTable {
    records: Vec<Rc<RouteRecord>>,
    path_list: Vec<String>,
    path_map: FxHashMap<String, RecordId>,
    name_map: FxHashMap<String, RecordId>,
}

impl RouteTable {
    /// Build a table from a configuration tree.
    pub fn new(routes: impl IntoIterator<Item = RouteConfig>) -> Self {
        let mut table = Self::default();
        table.append(routes);
        table
    }

    /// Add more entries. Existing paths and names are kept.
    pub fn append(&mut self, routes: impl IntoIterator<Item = RouteConfig>) {
        for route in routes {
            self.add_record(&route, None, None);
        }

        // catch-alls go last, keeping their relative order
        let (wildcards, mut paths): (Vec<_>, Vec<_>) = std::mem::take(&mut self.path_list)
            .into_iter()
            .partition(|path| path == WILDCARD);
        paths.extend(wildcards);
        self.path_list = paths;
    }

    /// All paths, in matching priority order.
    pub fn path_list(&self) -> &[String] {
        &self.path_list
    }

    /// Records in matching priority order.
    pub fn ordered(&self) -> impl Iterator<Item = &Rc<RouteRecord>> {
        self.path_list
            .iter()
            .filter_map(|path| self.path_map.get(path))
            .map(|id| &self.records[id.0])
    }

    pub fn record(&self, id: RecordId) -> Option<&Rc<RouteRecord>> {
        self.records.get(id.0)
    }

    pub fn by_path(&self, path: &str) -> Option<&Rc<RouteRecord>> {
        self.path_map.get(path).and_then(|id| self.record(*id))
    }

    pub fn by_name(&self, name: &str) -> Option<&Rc<RouteRecord>> {
        self.name_map.get(name).and_then(|id| self.record(*id))
    }

    /// `record` and all of its ancestors, outermost first.
    pub fn chain(&self, record: &Rc<RouteRecord>) -> Vec<Rc<RouteRecord>> {
        let mut chain = vec![record.clone()];
        let mut parent = record.parent;
        while let Some(record) = parent.and_then(|id| self.record(id)) {
            chain.push(record.clone());
            parent = record.parent;
        }

        chain.reverse();
        chain
    }

    fn add_record(&mut self, route: &RouteConfig, parent: Option<RecordId>, match_as: Option<String>) {
        let parent_path = parent.and_then(|id| self.record(id)).map(|parent| parent.path.clone());
        let path = normalize_path(
            &route.path,
            parent_path.as_deref(),
            route.path_options.strict,
        );

        let mut options = route.path_options;
        if let Some(sensitive) = route.case_sensitive {
            options.sensitive = sensitive;
        }

        let pattern = match PathPattern::cached(&path, options) {
            Ok(pattern) => {
                let mut seen = HashSet::new();
                for key in pattern.keys() {
                    if !seen.insert(&key.name) {
                        warn!("duplicate param keys in route with path: {path:?}");
                    }
                }
                Some(pattern)
            }
            Err(error) => {
                warn!(%error, "route {path:?} will never match");
                None
            }
        };

        let id = RecordId(self.records.len());
        self.records.push(Rc::new(RouteRecord {
            id,
            path: path.clone(),
            pattern,
            components: RefCell::new(route.components.clone()),
            instances: InstanceRegistry::default(),
            name: route.name.clone(),
            parent,
            match_as: match_as.clone(),
            redirect: route.redirect.clone(),
            before_enter: route.before_enter.clone(),
            meta: route.meta.clone(),
            props: route.props.clone(),
        }));

        if let (Some(name), None) = (&route.name, &route.redirect) {
            let default_child = route
                .children
                .iter()
                .any(|child| child.path.is_empty() || child.path == "/");
            if default_child {
                warn!(
                    "named route {name:?} has a default child route; navigating to it by name \
                     will not render the default child, navigate to the child's name instead"
                );
            }
        }

        for child in &route.children {
            let child_match_as = match_as
                .as_ref()
                .map(|match_as| clean_path(&format!("{match_as}/{}", child.path)));
            self.add_record(child, Some(id), child_match_as);
        }

        for alias in &route.alias {
            if alias == &route.path {
                warn!("found an alias with the same value as the path: {alias:?}, ignoring it");
                continue;
            }

            let alias_route = RouteConfig::new(alias.clone()).children(route.children.clone());
            let canonical = match path.is_empty() {
                true => String::from("/"),
                false => path.clone(),
            };
            self.add_record(&alias_route, parent, Some(canonical));
        }

        if !self.path_map.contains_key(&path) {
            trace!(path = %path, "registering route");
            self.path_list.push(path.clone());
            self.path_map.insert(path.clone(), id);
        }

        if let Some(name) = &route.name {
            if !self.name_map.contains_key(name) {
                self.name_map.insert(name.clone(), id);
            } else if match_as.is_none() {
                warn!("duplicate named routes definition: {name:?} for path {path:?}");
            }
        }
    }
}

/// Resolve a configured path against its parent: drop a trailing slash unless strict, keep
/// absolute paths, prefix relative ones with the parent path.
fn normalize_path(path: &str, parent: Option<&str>, strict: bool) -> String {
    let path = match strict {
        true => path,
        false => path.strip_suffix('/').unwrap_or(path),
    };

    if path.starts_with('/') {
        return path.to_string();
    }

    match parent {
        Some(parent) => clean_path(&format!("{parent}/{path}")),
        None => path.to_string(),
    }
}

use std::{cell::RefCell, rc::Rc};

use tracing::warn;

use crate::{
    location::normalize_location,
    navigation::{Location, RawLocation},
    params::{ParamValue, Params},
    path::resolve_path,
    route::Route,
    route_definition::{fill_params, Redirect, RouteConfig, RouteRecord, RouteTable},
};

/// Resolves navigation targets against a [`RouteTable`].
///
/// Matching never fails: targets that match nothing, or whose redirect cannot be followed,
/// produce a [`Route`] without matched records.
#[derive(Debug, Default)]
pub struct Matcher {
    table: RefCell<RouteTable>,
}

impl Matcher {
    pub fn new(routes: impl IntoIterator<Item = RouteConfig>) -> Self {
        Self {
            table: RefCell::new(RouteTable::new(routes)),
        }
    }

    /// Add more entries to the table.
    pub fn add_routes(&self, routes: impl IntoIterator<Item = RouteConfig>) {
        self.table.borrow_mut().append(routes);
    }

    /// Inspect the table.
    pub fn with_table<T>(&self, f: impl FnOnce(&RouteTable) -> T) -> T {
        f(&self.table.borrow())
    }

    /// Resolve `raw` relative to `current`.
    ///
    /// Named targets inherit required params they do not set from `current`. Path targets match
    /// the first entry in priority order. Redirect and alias entries are followed.
    pub fn match_route(
        &self,
        raw: impl Into<RawLocation>,
        current: Option<&Route>,
        redirected_from: Option<Location>,
    ) -> Route {
        let mut location = normalize_location(raw.into(), current, false);

        if let Some(name) = location.name.clone() {
            let record = self.table.borrow().by_name(&name).cloned();
            let Some(record) = record else {
                warn!("route with name {name:?} does not exist");
                return self.create_route(None, location, None);
            };

            let required: Vec<&str> = record
                .pattern()
                .map(|pattern| {
                    pattern
                        .keys()
                        .iter()
                        .filter(|key| !key.optional)
                        .map(|key| key.name.as_str())
                        .collect()
                })
                .unwrap_or_default();

            let params = location.params.get_or_insert_with(Params::new);
            if let Some(current) = current {
                for (key, value) in current.params() {
                    if !params.contains_key(key) && required.contains(&key.as_str()) {
                        params.insert(key.clone(), value.clone());
                    }
                }
            }

            let context = format!("named route {name:?}");
            location.path = Some(fill_params(record.path(), params, &context));
            return self.create_route(Some(record), location, redirected_from);
        }

        if let Some(path) = location.path.clone() {
            let found = self.table.borrow().ordered().find_map(|record| {
                let captures = record.pattern()?.exec(&path)?;
                let params = record
                    .pattern()?
                    .keys()
                    .iter()
                    .zip(captures)
                    .filter_map(|(key, capture)| {
                        capture.map(|value| (key.name.clone(), ParamValue::One(decode(value))))
                    })
                    .collect::<Params>();
                Some((record.clone(), params))
            });

            location.params = Some(Params::new());
            if let Some((record, params)) = found {
                location.params = Some(params);
                return self.create_route(Some(record), location, redirected_from);
            }
        }

        self.create_route(None, location, None)
    }

    fn create_route(
        &self,
        record: Option<Rc<RouteRecord>>,
        location: Location,
        redirected_from: Option<Location>,
    ) -> Route {
        if let Some(record) = &record {
            if let Some(redirect) = record.redirect.clone() {
                return self.redirect(record, redirect, redirected_from.unwrap_or(location));
            }
            if let Some(match_as) = &record.match_as {
                return self.alias(location, match_as);
            }
        }

        let matched = match &record {
            Some(record) => self.table.borrow().chain(record),
            None => Vec::new(),
        };
        Route::new(matched, &location, redirected_from)
    }

    fn redirect(&self, record: &Rc<RouteRecord>, redirect: Redirect, location: Location) -> Route {
        let redirect = match redirect {
            Redirect::Function(redirect) => {
                let chain = self.table.borrow().chain(record);
                redirect(&Route::new(chain, &location, None))
            }
            redirect => redirect,
        };

        let target = match redirect {
            Redirect::Path(path) => Location::path(path),
            Redirect::Location(target) => target,
            Redirect::Function(_) => {
                warn!("invalid redirect option for {:?}: a redirect function returned another function", record.path());
                return self.create_route(None, location, None);
            }
        };

        let query = target.query.clone().or_else(|| location.query.clone());
        let hash = target.hash.clone().or_else(|| location.hash.clone());
        let params = target.params.clone().or_else(|| location.params.clone());

        if let Some(name) = target.name {
            if self.table.borrow().by_name(&name).is_none() {
                warn!("redirect failed: named route {name:?} not found");
                return self.create_route(None, location, None);
            }

            let next = Location {
                name: Some(name),
                query,
                hash,
                params,
                normalized: true,
                ..Default::default()
            };
            return self.match_route(next, None, Some(location));
        }

        if let Some(path) = target.path {
            let parent = {
                let table = self.table.borrow();
                record
                    .parent
                    .and_then(|id| table.record(id))
                    .map(|parent| parent.path.clone())
            };
            let raw_path = resolve_path(&path, parent.as_deref().unwrap_or("/"), true);
            let context = format!("redirect route with path {raw_path:?}");
            let resolved = fill_params(&raw_path, &params.unwrap_or_default(), &context);

            let next = Location {
                path: Some(resolved),
                query,
                hash,
                normalized: true,
                ..Default::default()
            };
            return self.match_route(next, None, Some(location));
        }

        warn!("invalid redirect option for {:?}: no name or path", record.path());
        self.create_route(None, location, None)
    }

    fn alias(&self, mut location: Location, match_as: &str) -> Route {
        let context = format!("aliased route with path {match_as:?}");
        let aliased_path = fill_params(
            match_as,
            &location.params.clone().unwrap_or_default(),
            &context,
        );

        let aliased = self.match_route(
            Location {
                path: Some(aliased_path),
                normalized: true,
                ..Default::default()
            },
            None,
            None,
        );

        match aliased.matched().last().cloned() {
            Some(record) => {
                location.params = Some(aliased.params().clone());
                self.create_route(Some(record), location, None)
            }
            None => self.create_route(None, location, None),
        }
    }
}

fn decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(error) => {
            warn!(%error, "error decoding {value:?}, keeping the raw value");
            value.to_string()
        }
    }
}

use tracing::warn;

use crate::{
    navigation::{Location, RawLocation},
    path::{parse_path, resolve_path},
    query::resolve_query,
    route::Route,
    route_definition::fill_params,
};

/// Turn a raw navigation target into a normalized [`Location`].
///
/// - Named and already normalized locations pass through.
/// - A location with params but no path changes the params of `current`: named routes keep their
///   name, unnamed ones get their leaf template filled with the merged params.
/// - Everything else is parsed into path, query and fragment, with the path resolved against the
///   path of `current` and explicit query values overriding parsed ones.
///
/// ```rust
/// # use waypoint_router::{location::normalize_location, navigation::RawLocation};
/// let location = normalize_location(RawLocation::from("/users?page=2#top"), None, false);
/// assert_eq!(location.path.as_deref(), Some("/users"));
/// assert_eq!(location.hash.as_deref(), Some("#top"));
/// ```
pub fn normalize_location(raw: RawLocation, current: Option<&Route>, append: bool) -> Location {
    let next = raw.into_location();
    if next.normalized || next.name.is_some() {
        return next;
    }

    if next.path.is_none() {
        if let (Some(params), Some(current)) = (&next.params, current) {
            let mut merged = current.params().clone();
            merged.extend(params.iter().map(|(key, value)| (key.clone(), value.clone())));

            let mut location = Location {
                normalized: true,
                ..next.clone()
            };
            if let Some(name) = current.name() {
                location.name = Some(name.to_string());
                location.params = Some(merged);
            } else if let Some(leaf) = current.matched().last() {
                let context = format!("path {}", current.path());
                location.path = Some(fill_params(leaf.path(), &merged, &context));
            } else {
                warn!("relative params navigation requires a current route");
            }
            return location;
        }

        if next.params.is_some() {
            warn!("relative params navigation requires a current route");
        }
    }

    let parsed = parse_path(next.path.as_deref().unwrap_or_default());
    let base = current.map(Route::path).unwrap_or("/");
    let path = match parsed.path.is_empty() {
        true => base.to_string(),
        false => resolve_path(&parsed.path, base, append || next.append),
    };

    let query = resolve_query(&parsed.query, next.query.as_ref());

    let hash = match next.hash.as_deref() {
        Some(hash) if !hash.is_empty() => hash.to_string(),
        _ => parsed.hash,
    };
    let hash = match hash.is_empty() || hash.starts_with('#') {
        true => hash,
        false => format!("#{hash}"),
    };

    Location {
        path: Some(path),
        query: Some(query),
        hash: Some(hash),
        replace: next.replace,
        normalized: true,
        ..Default::default()
    }
}

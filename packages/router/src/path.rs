//! Helpers for splitting and resolving location strings.

/// The components of a location string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// Everything before the query and fragment.
    pub path: String,
    /// The query string, without the leading `?`.
    pub query: String,
    /// The fragment, including the leading `#`.
    pub hash: String,
}

/// Split `path` into path, query and fragment. The fragment is cut first, so a `?` after a `#`
/// belongs to the fragment.
///
/// ```rust
/// # use waypoint_router::path::parse_path;
/// let parsed = parse_path("/users?page=2#top");
/// assert_eq!(parsed.path, "/users");
/// assert_eq!(parsed.query, "page=2");
/// assert_eq!(parsed.hash, "#top");
/// ```
pub fn parse_path(path: &str) -> ParsedPath {
    let (rest, hash) = match path.find('#') {
        Some(index) => path.split_at(index),
        None => (path, ""),
    };

    let (path, query) = match rest.find('?') {
        Some(index) => (&rest[..index], &rest[index + 1..]),
        None => (rest, ""),
    };

    ParsedPath {
        path: path.to_string(),
        query: query.to_string(),
        hash: hash.to_string(),
    }
}

/// Resolve `relative` against `base`.
///
/// - Absolute paths are returned unchanged.
/// - A bare query or fragment is appended to `base`.
/// - Otherwise the last segment of `base` is dropped (unless `append` is set and the segment is
///   not empty), then `..` and `.` segments are applied.
///
/// ```rust
/// # use waypoint_router::path::resolve_path;
/// assert_eq!(resolve_path("../sibling", "/a/b/c", false), "/a/sibling");
/// assert_eq!(resolve_path("x", "/a/b/", true), "/a/b/x");
/// assert_eq!(resolve_path("/abs", "/a/b", true), "/abs");
/// ```
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }

    if relative.starts_with('?') || relative.starts_with('#') {
        return format!("{base}{relative}");
    }

    let mut stack: Vec<&str> = base.split('/').collect();

    // drop the current segment unless appending to it
    if !append || stack.last().is_some_and(|last| last.is_empty()) {
        stack.pop();
    }

    for segment in relative.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." => {}
            segment => stack.push(segment),
        }
    }

    if stack.first().is_none_or(|first| !first.is_empty()) {
        stack.insert(0, "");
    }

    stack.join("/")
}

/// Collapse `//` into `/`.
pub fn clean_path(path: &str) -> String {
    path.replace("//", "/")
}

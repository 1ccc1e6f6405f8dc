//! Path classification for path-based queries
//!
//! Resolved paths are compared with the query path component by component:
//! `/foo` encloses `/foo/bar` but not `/foobar`. A resolved path at or below
//! the query is a listing match. A resolved path at or above it competes for
//! the single deepest enclosing slot.

use spacereg_core::Space;

/// Normalize an absolute path
///
/// Collapses repeated separators, drops `.` components, resolves `..`
/// lexically and strips any trailing separator. The root stays `/`.
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let mut out = String::with_capacity(path.len() + 1);
    for part in &parts {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// True when `prefix` equals `path` or is one of its ancestors
///
/// Both arguments must already be cleaned.
pub fn is_path_prefix(prefix: &str, path: &str) -> bool {
    if prefix == "/" || prefix == path {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Remainder of `path` below `prefix`, starting with `/`, or empty when equal
pub fn strip_path_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if !is_path_prefix(prefix, path) {
        return None;
    }
    if prefix == "/" {
        return Some(if path == "/" { "" } else { path });
    }
    path.strip_prefix(prefix)
}

/// How a resolved path relates to the query path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Same path
    Exact,
    /// Strictly below the query
    Descendant,
    /// Strictly above the query
    Ancestor,
    /// Different branch of the namespace
    Unrelated,
}

/// Classify `resolved` against `query`; both must be cleaned
pub fn classify(query: &str, resolved: &str) -> Relation {
    if query == resolved {
        Relation::Exact
    } else if is_path_prefix(query, resolved) {
        Relation::Descendant
    } else if is_path_prefix(resolved, query) {
        Relation::Ancestor
    } else {
        Relation::Unrelated
    }
}

/// A space chosen for the result, with the provider serving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Provider address
    pub address: String,
    /// The space as returned by the provider
    pub space: Space,
    /// Resolved path of the space
    pub path: String,
}

/// Accumulates candidates for one path query
///
/// Offers must arrive in rule declaration order, and within a rule in the
/// order the provider listed them; the first of several equally deep
/// ancestors is kept.
#[derive(Debug)]
pub struct PathSelector {
    query: String,
    unique: bool,
    matches: Vec<Candidate>,
    deepest: Option<Candidate>,
}

impl PathSelector {
    /// Start selecting for `query`
    pub fn new(query: &str, unique: bool) -> Self {
        Self {
            query: clean_path(query),
            unique,
            matches: Vec::new(),
            deepest: None,
        }
    }

    /// The cleaned query path
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Consider one resolved space
    pub fn offer(&mut self, address: &str, space: Space, path: &str) -> Relation {
        let path = clean_path(path);
        let relation = classify(&self.query, &path);
        let candidate = || Candidate {
            address: address.to_string(),
            space: space.clone(),
            path: path.clone(),
        };
        if matches!(relation, Relation::Exact | Relation::Ancestor) {
            let deeper = self
                .deepest
                .as_ref()
                .map_or(true, |current| path.len() > current.path.len());
            if deeper {
                self.deepest = Some(candidate());
            }
        }
        if !self.unique && matches!(relation, Relation::Exact | Relation::Descendant) {
            self.matches.push(candidate());
        }
        relation
    }

    /// Finished selection: listing matches followed by the deepest ancestor
    pub fn finish(self) -> Vec<Candidate> {
        if self.unique {
            return self.deepest.into_iter().collect();
        }
        let mut out = self.matches;
        if let Some(deepest) = self.deepest {
            // An exact match is already listed
            if deepest.path != self.query {
                out.push(deepest);
            }
        }
        out
    }
}

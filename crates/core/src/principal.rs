//! Principal sets and their canonical cache key
//!
//! A request names the principals (users and groups) it acts for as a
//! comma-separated list. Two requests naming the same principals in a
//! different order, or with repeats, must share one cache entry, so every
//! set is kept sorted and deduplicated and its key is derived from that
//! canonical order.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Sorted, deduplicated set of principal identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalSet {
    principals: BTreeSet<String>,
}

impl PrincipalSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw parameter value such as `"alice, bob,carol"`.
    ///
    /// Items are split on `,` and trimmed. Empty items are dropped, so
    /// `""` and `" , "` both parse to the empty set.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Add a principal; returns false if it was already present
    pub fn insert(&mut self, principal: impl Into<String>) -> bool {
        self.principals.insert(principal.into())
    }

    /// Number of distinct principals
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// True if no principals are present
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Principals in canonical (lexicographic) order
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.principals.iter().map(String::as_str)
    }

    /// Canonical cache key for this set
    pub fn key(&self) -> PrincipalKey {
        PrincipalKey(self.principals.iter().cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for PrincipalSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        PrincipalSet {
            principals: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Canonical, cheaply clonable identity of a [`PrincipalSet`].
///
/// Holds the sorted identifiers themselves rather than a joined string, so
/// principals containing the separator can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalKey(Arc<[String]>);

impl PrincipalKey {
    /// Principals in canonical order
    pub fn principals(&self) -> &[String] {
        &self.0
    }

    /// Rebuild the set this key was derived from
    pub fn to_set(&self) -> PrincipalSet {
        self.0.iter().cloned().collect()
    }
}

impl fmt::Display for PrincipalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

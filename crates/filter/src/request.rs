//! Request-side types: parameters, filter list, document predicates

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use strata_acl_core::{DocOrdinal, PrincipalKey, SegmentKey};

use crate::bitmap::DocBitmap;

/// Document-membership predicate over segment ordinals.
///
/// A request's filters combine with logical AND.
pub trait QueryFilter: Send + Sync + std::fmt::Debug {
    /// True if the document at `doc` in `segment` passes this filter
    fn matches(&self, segment: &SegmentKey, doc: DocOrdinal) -> bool;
}

/// Principal-set restriction backed by one bitmap per segment.
///
/// Documents in a segment this filter holds no bitmap for never match.
#[derive(Debug, Clone)]
pub struct AclFilter {
    principals: PrincipalKey,
    segments: HashMap<SegmentKey, Arc<DocBitmap>>,
}

impl AclFilter {
    /// Filter for `principals` over the given segment bitmaps
    pub fn new(
        principals: PrincipalKey,
        segments: impl IntoIterator<Item = (SegmentKey, Arc<DocBitmap>)>,
    ) -> Self {
        AclFilter {
            principals,
            segments: segments.into_iter().collect(),
        }
    }

    /// Filter that matches no document in any segment
    pub fn deny_all(principals: PrincipalKey) -> Self {
        AclFilter {
            principals,
            segments: HashMap::new(),
        }
    }

    /// The principal set this filter restricts to
    pub fn principals(&self) -> &PrincipalKey {
        &self.principals
    }

    /// Bitmap for one segment, if the filter covers it
    pub fn bitmap(&self, segment: &SegmentKey) -> Option<&Arc<DocBitmap>> {
        self.segments.get(segment)
    }

    /// Number of segments covered
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Readable documents across all covered segments
    pub fn cardinality(&self) -> usize {
        self.segments.values().map(|b| b.cardinality()).sum()
    }
}

impl QueryFilter for AclFilter {
    fn matches(&self, segment: &SegmentKey, doc: DocOrdinal) -> bool {
        self.segments
            .get(segment)
            .map_or(false, |bitmap| bitmap.contains(doc))
    }
}

/// A search request as seen by pipeline components.
///
/// Components read parameters and append filters; they never remove or
/// replace filters added by others.
#[derive(Debug, Default, Clone)]
pub struct SearchRequest {
    params: BTreeMap<String, String>,
    filters: Vec<Arc<dyn QueryFilter>>,
}

impl SearchRequest {
    /// Request with no parameters or filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style parameter setter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(name, value);
        self
    }

    /// Set a parameter
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Parameter value, if present
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Append a filter
    pub fn add_filter(&mut self, filter: Arc<dyn QueryFilter>) {
        self.filters.push(filter);
    }

    /// Active filters in the order they were added
    pub fn filters(&self) -> &[Arc<dyn QueryFilter>] {
        &self.filters
    }

    /// True if every filter accepts the document (no filters: everything matches)
    pub fn matches(&self, segment: &SegmentKey, doc: DocOrdinal) -> bool {
        self.filters.iter().all(|f| f.matches(segment, doc))
    }
}

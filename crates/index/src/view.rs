//! Read-only segment boundary used by filter construction
//!
//! A `SegmentView` is one immutable slice of the collection as of some
//! point in time. Everything a filter build needs goes through it: the
//! ordinal range, the posting list for a field value, and which ordinals
//! are still live.

use std::io;
use std::sync::Arc;

use strata_acl_core::{DocOrdinal, SegmentKey};

use crate::live::LiveDocs;
use crate::segment::SealedSegment;

/// Posting list cursor. Any `Err` item means the list could not be read.
pub type Postings<'a> = Box<dyn Iterator<Item = io::Result<DocOrdinal>> + 'a>;

/// Immutable view over one segment snapshot.
///
/// Implementations must be safe to share across concurrent builders.
pub trait SegmentView: Send + Sync {
    /// Identity of this snapshot; two views with the same key must expose
    /// identical postings and liveness.
    fn segment_key(&self) -> SegmentKey;

    /// Number of ordinals in the segment; valid ordinals are `0..max_doc`.
    fn max_doc(&self) -> u32;

    /// Documents whose `field` contains `value`.
    ///
    /// `Ok(None)` if the term does not occur in this segment.
    fn postings(&self, field: &str, value: &str) -> io::Result<Option<Postings<'_>>>;

    /// Liveness of each ordinal, or `None` if every ordinal is live.
    fn live_docs(&self) -> Option<&LiveDocs>;
}

/// A sealed segment paired with the deletions frozen at snapshot time.
#[derive(Debug, Clone)]
pub struct SegmentSnapshot {
    segment: Arc<SealedSegment>,
    key: SegmentKey,
    live_docs: Option<LiveDocs>,
}

impl SegmentSnapshot {
    /// Snapshot the segment's current deletion state
    pub fn new(segment: Arc<SealedSegment>) -> Self {
        let (key, live_docs) = segment.freeze_deletions();
        SegmentSnapshot {
            segment,
            key,
            live_docs,
        }
    }

    /// The underlying sealed segment
    pub fn segment(&self) -> &Arc<SealedSegment> {
        &self.segment
    }
}

impl SegmentView for SegmentSnapshot {
    fn segment_key(&self) -> SegmentKey {
        self.key
    }

    fn max_doc(&self) -> u32 {
        self.segment.max_doc()
    }

    fn postings(&self, field: &str, value: &str) -> io::Result<Option<Postings<'_>>> {
        Ok(self
            .segment
            .postings(field, value)?
            .map(|iter| Box::new(iter) as Postings<'_>))
    }

    fn live_docs(&self) -> Option<&LiveDocs> {
        self.live_docs.as_ref()
    }
}

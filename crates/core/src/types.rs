//! Document and segment identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense per-segment document number, `0..max_doc`.
pub type DocOrdinal = u32;

/// Identity of one immutable segment snapshot.
///
/// `segment_id` is only unique within one index and may be reused when a
/// segment is replaced, so every loaded or sealed segment also carries an
/// `instance` number that is unique for the life of the process. Instance 0
/// is never handed out to a sealed segment.
///
/// `generation` is the segment's deletion generation. Deleting a document
/// bumps it, so a bitmap built before the delete is keyed differently from
/// one built after and can never be served for the newer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentKey {
    /// Segment identifier, unique within an index
    pub segment_id: u64,
    /// Process-unique segment instance
    pub instance: u64,
    /// Deletion generation of the snapshot
    pub generation: u64,
}

impl SegmentKey {
    /// Key with instance 0, for views not backed by a sealed segment
    pub fn new(segment_id: u64, generation: u64) -> Self {
        Self::for_instance(segment_id, 0, generation)
    }

    /// Key of one segment instance at one deletion generation
    pub fn for_instance(segment_id: u64, instance: u64, generation: u64) -> Self {
        SegmentKey {
            segment_id,
            instance,
            generation,
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seg{}@{}.g{}",
            self.segment_id, self.instance, self.generation
        )
    }
}

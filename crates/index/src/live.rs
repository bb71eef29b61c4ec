//! Frozen per-segment liveness

use std::collections::HashSet;

use bitvec::prelude::*;
use strata_acl_core::DocOrdinal;

/// Liveness of every ordinal in one segment snapshot.
///
/// Built once from the segment's deletions and never mutated, so it can be
/// shared by any number of concurrent filter builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDocs {
    bits: BitVec<u64, Lsb0>,
}

impl LiveDocs {
    /// All `max_doc` ordinals live
    pub fn all_live(max_doc: u32) -> Self {
        LiveDocs {
            bits: bitvec![u64, Lsb0; 1; max_doc as usize],
        }
    }

    /// All ordinals live except `deleted`. Out-of-range entries are ignored.
    pub fn with_deletions(max_doc: u32, deleted: &HashSet<DocOrdinal>) -> Self {
        let mut live = Self::all_live(max_doc);
        for &doc in deleted {
            if (doc as usize) < live.bits.len() {
                live.bits.set(doc as usize, false);
            }
        }
        live
    }

    /// True if `doc` exists and is not deleted
    #[inline]
    pub fn is_live(&self, doc: DocOrdinal) -> bool {
        self.bits.get(doc as usize).map(|b| *b).unwrap_or(false)
    }

    /// Number of ordinals covered
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True if the segment has no ordinals
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of deleted ordinals
    pub fn num_deleted(&self) -> usize {
        self.bits.count_zeros()
    }
}

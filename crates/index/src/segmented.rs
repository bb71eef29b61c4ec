//! The live set of sealed segments and point-in-time snapshots of it
//!
//! New documents arrive as whole new segments; merges replace several
//! segments with one. A reader takes an [`IndexSnapshot`] and works against
//! it for the whole request; later adds, deletes and merges never change
//! what that snapshot exposes.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use strata_acl_core::{DocOrdinal, Result};
use tracing::{debug, info, warn};

use crate::segment::{SealedSegment, SEGMENT_FILE_EXTENSION};
use crate::view::{SegmentSnapshot, SegmentView};
use crate::writer::SegmentWriter;

/// Ordered collection of sealed segments.
///
/// # Thread Safety
///
/// The segment list is guarded by a `parking_lot::RwLock`; segments
/// themselves are shared through `Arc` and only their deletions change.
#[derive(Debug, Default)]
pub struct SegmentedIndex {
    sealed: RwLock<Vec<Arc<SealedSegment>>>,
    next_segment_id: AtomicU64,
}

impl SegmentedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.seg` file in `dir` (mmap-backed), ordered by segment id.
    pub fn open_dir(dir: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_FILE_EXTENSION) {
                continue;
            }
            segments.push(Arc::new(SealedSegment::from_mmap(&path)?));
        }
        segments.sort_by_key(|s| s.segment_id());
        let next = segments.last().map(|s| s.segment_id() + 1).unwrap_or(0);
        info!(
            target: "strata::index",
            dir = %dir.display(),
            segments = segments.len(),
            "Opened segmented index"
        );
        Ok(SegmentedIndex {
            sealed: RwLock::new(segments),
            next_segment_id: AtomicU64::new(next),
        })
    }

    /// Write every segment to `dir` as `<segment_id>.seg`.
    pub fn write_dir(&self, dir: &Path) -> Result<()> {
        for segment in self.sealed.read().iter() {
            let path = dir.join(format!(
                "{:020}.{}",
                segment.segment_id(),
                SEGMENT_FILE_EXTENSION
            ));
            segment.write_to_file(&path)?;
        }
        Ok(())
    }

    /// Reserve a fresh segment id
    pub fn allocate_segment_id(&self) -> u64 {
        self.next_segment_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Seal `writer` under a fresh id and add it; returns the id.
    pub fn commit(&self, writer: SegmentWriter) -> u64 {
        let segment_id = self.allocate_segment_id();
        self.add_segment(writer.seal(segment_id));
        segment_id
    }

    /// Add a sealed segment. A segment with the same id is replaced.
    pub fn add_segment(&self, segment: SealedSegment) {
        let segment_id = segment.segment_id();
        self.next_segment_id
            .fetch_max(segment_id + 1, Ordering::SeqCst);
        let mut sealed = self.sealed.write();
        if let Some(pos) = sealed.iter().position(|s| s.segment_id() == segment_id) {
            warn!(target: "strata::index", segment_id, "Replacing segment with duplicate id");
            sealed[pos] = Arc::new(segment);
        } else {
            debug!(target: "strata::index", segment_id, max_doc = segment.max_doc(), "Segment added");
            sealed.push(Arc::new(segment));
        }
    }

    /// Delete one document. Returns false if the segment or ordinal is
    /// unknown, or the document was already deleted.
    pub fn delete_document(&self, segment_id: u64, doc: DocOrdinal) -> bool {
        self.sealed
            .read()
            .iter()
            .find(|s| s.segment_id() == segment_id)
            .map(|s| s.delete(doc))
            .unwrap_or(false)
    }

    /// Replace `removed` with `merged` in one step, as a merge does.
    pub fn replace_segments(&self, removed: &[u64], merged: SealedSegment) {
        let merged_id = merged.segment_id();
        self.next_segment_id
            .fetch_max(merged_id + 1, Ordering::SeqCst);
        let mut sealed = self.sealed.write();
        sealed.retain(|s| !removed.contains(&s.segment_id()));
        sealed.push(Arc::new(merged));
        sealed.sort_by_key(|s| s.segment_id());
        info!(
            target: "strata::index",
            ?removed,
            merged = merged_id,
            segments = sealed.len(),
            "Segments replaced"
        );
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.sealed.read().len()
    }

    /// Point-in-time view of every segment and its current deletions
    pub fn snapshot(&self) -> IndexSnapshot {
        let segments = self
            .sealed
            .read()
            .iter()
            .map(|s| Arc::new(SegmentSnapshot::new(Arc::clone(s))) as Arc<dyn SegmentView>)
            .collect();
        IndexSnapshot { segments }
    }
}

/// Ordered, immutable list of segment views a request runs against.
#[derive(Clone, Default)]
pub struct IndexSnapshot {
    segments: Vec<Arc<dyn SegmentView>>,
}

impl IndexSnapshot {
    /// Snapshot over arbitrary segment views
    pub fn from_views(segments: Vec<Arc<dyn SegmentView>>) -> Self {
        IndexSnapshot { segments }
    }

    /// Segments in index order
    pub fn segments(&self) -> &[Arc<dyn SegmentView>] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if the snapshot has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total ordinals across all segments
    pub fn max_doc(&self) -> u64 {
        self.segments.iter().map(|s| s.max_doc() as u64).sum()
    }
}

impl std::fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.segments.iter().map(|s| s.segment_key()))
            .finish()
    }
}

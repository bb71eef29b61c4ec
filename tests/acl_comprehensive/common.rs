//! Shared fixtures for the ACL suite.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Barrier, Once};

use strata_acl::{
    AclComponent, AclConfig, IndexSnapshot, LiveDocs, Postings, PrincipalSet, SegmentKey,
    SegmentView, SegmentWriter, SegmentedIndex,
};

pub const PARAM: &str = "principals";
pub const FIELD: &str = "readers";

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness once per process.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn config(max_entries: usize, low_water_mark: usize) -> AclConfig {
    AclConfig::new(PARAM, FIELD).with_cache_bounds(max_entries, low_water_mark)
}

pub fn component() -> AclComponent {
    init_tracing();
    AclComponent::init(&config(64, 32)).expect("valid config")
}

/// One segment: alice → {1, 3}, bob → {2, 3}, doc 0 readable by nobody.
pub fn scenario_index() -> SegmentedIndex {
    let index = SegmentedIndex::new();
    let mut writer = SegmentWriter::new();
    writer.add_blank_document();
    writer.add_document(FIELD, ["alice"]);
    writer.add_document(FIELD, ["bob"]);
    writer.add_document(FIELD, ["alice", "bob"]);
    index.commit(writer);
    index
}

/// Commit a segment whose documents list the given readers.
pub fn commit_segment(index: &SegmentedIndex, docs: &[&[&str]]) -> u64 {
    let mut writer = SegmentWriter::new();
    for readers in docs {
        writer.add_document(FIELD, readers.iter().copied());
    }
    index.commit(writer)
}

/// Ordinals of `segment` that pass every filter on the request.
pub fn visible(request: &strata_acl::SearchRequest, segment: &dyn SegmentView) -> Vec<u32> {
    let key = segment.segment_key();
    (0..segment.max_doc())
        .filter(|&d| request.matches(&key, d))
        .collect()
}

/// Brute-force reference: live docs readable by any principal in `principals`.
pub fn expected_visible(docs: &[Vec<String>], deleted: &[bool], principals: &PrincipalSet) -> Vec<u32> {
    docs.iter()
        .enumerate()
        .filter(|(i, readers)| {
            !deleted[*i] && readers.iter().any(|r| principals.iter().any(|p| p == r.as_str()))
        })
        .map(|(i, _)| i as u32)
        .collect()
}

/// Segment view whose postings always fail to read.
pub struct BrokenSegment {
    pub key: SegmentKey,
}

impl SegmentView for BrokenSegment {
    fn segment_key(&self) -> SegmentKey {
        self.key
    }

    fn max_doc(&self) -> u32 {
        8
    }

    fn postings(&self, _field: &str, _value: &str) -> io::Result<Option<Postings<'_>>> {
        Err(io::Error::new(io::ErrorKind::Other, "posting file unreadable"))
    }

    fn live_docs(&self) -> Option<&LiveDocs> {
        None
    }
}

/// Segment view that parks the first posting lookup until released.
///
/// `entered` is reached once the build is inside `postings`; the build then
/// blocks on `release`.
pub struct GatedSegment {
    pub key: SegmentKey,
    pub entered: Arc<Barrier>,
    pub release: Arc<Barrier>,
}

impl SegmentView for GatedSegment {
    fn segment_key(&self) -> SegmentKey {
        self.key
    }

    fn max_doc(&self) -> u32 {
        4
    }

    fn postings(&self, _field: &str, _value: &str) -> io::Result<Option<Postings<'_>>> {
        self.entered.wait();
        self.release.wait();
        let docs: Vec<io::Result<u32>> = vec![Ok(0), Ok(2)];
        Ok(Some(Box::new(docs.into_iter())))
    }

    fn live_docs(&self) -> Option<&LiveDocs> {
        None
    }
}

pub fn snapshot_of(view: impl SegmentView + 'static) -> IndexSnapshot {
    IndexSnapshot::from_views(vec![Arc::new(view) as Arc<dyn SegmentView>])
}

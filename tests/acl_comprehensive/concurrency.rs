//! Shared component under concurrent requests.

use std::sync::{Arc, Barrier};
use std::thread;

use strata_acl::{
    AclComponent, FilterBuilder, FilterKey, PrincipalSet, SearchComponent, SearchRequest,
    SegmentKey, SegmentView,
};

use crate::common::*;

#[test]
fn concurrent_requests_agree_with_serial_results() {
    init_tracing();
    let component = Arc::new(AclComponent::init(&config(8, 4)).unwrap());
    let index = scenario_index();
    commit_segment(&index, &[&["carol"], &["alice"], &["bob", "carol"]]);
    let snapshot = Arc::new(index.snapshot());

    let queries = ["alice", "bob", "carol", "alice,bob", "bob,carol", "dave"];
    let expected: Vec<Vec<(SegmentKey, u32)>> = queries
        .iter()
        .map(|raw| {
            let serial = AclComponent::init(&config(8, 4)).unwrap();
            let mut request = SearchRequest::new().with_param(PARAM, *raw);
            serial.prepare(&mut request, &snapshot).unwrap();
            hits(&request, &snapshot)
        })
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let component = Arc::clone(&component);
            let snapshot = Arc::clone(&snapshot);
            let expected = expected.clone();
            thread::spawn(move || {
                for round in 0..50 {
                    let q = (t + round) % queries.len();
                    let mut request = SearchRequest::new().with_param(PARAM, queries[q]);
                    component.prepare(&mut request, &snapshot).unwrap();
                    assert_eq!(hits(&request, &snapshot), expected[q]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = component.stats().cache;
    // 8 threads × 50 requests × 2 segments
    assert_eq!(stats.lookups, 800);
    assert_eq!(stats.lookups, stats.hits + stats.misses);
    assert!(stats.size <= 8);
    // 6 principal sets × 2 segments, each built at least once
    assert!(stats.puts >= 12);
}

#[test]
fn build_in_progress_does_not_block_other_keys() {
    let component = Arc::new(component());
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let gated = GatedSegment {
        key: SegmentKey::new(900, 0),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    };
    let slow_key = FilterKey::new(PrincipalSet::parse("alice").key(), gated.segment_key());

    let slow = {
        let component = Arc::clone(&component);
        let slow_key = slow_key.clone();
        thread::spawn(move || {
            let builder = FilterBuilder::new(FIELD);
            component
                .cache()
                .resolve(slow_key, || builder.build(&PrincipalSet::parse("alice"), &gated))
                .unwrap()
                .cardinality()
        })
    };

    entered.wait();
    // The slow build is parked inside the segment; the cache must stay usable.
    let index = scenario_index();
    let snapshot = index.snapshot();
    let segment = &snapshot.segments()[0];
    let bob = PrincipalSet::parse("bob");
    let bitmap = component
        .cache()
        .resolve(FilterKey::new(bob.key(), segment.segment_key()), || {
            FilterBuilder::new(FIELD).build(&bob, segment.as_ref())
        })
        .unwrap();
    assert_eq!(bitmap.cardinality(), 2);
    assert_eq!(component.cache().len(), 1);
    assert!(!component.cache().contains(&slow_key));
    release.wait();

    assert_eq!(slow.join().unwrap(), 2);
    assert!(component.cache().contains(&slow_key));
    assert_eq!(component.cache().len(), 2);
}

#[test]
fn duplicate_concurrent_builds_leave_one_entry() {
    init_tracing();
    let component = Arc::new(component());
    let index = scenario_index();
    let snapshot = Arc::new(index.snapshot());
    let start = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let component = Arc::clone(&component);
            let snapshot = Arc::clone(&snapshot);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                component
                    .filter_for(&PrincipalSet::parse("alice,bob"), &snapshot)
                    .unwrap()
                    .cardinality()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }

    let stats = component.stats().cache;
    assert_eq!(stats.size, 1);
    assert_eq!(stats.lookups, 4);
    assert_eq!(stats.puts, stats.misses);
}

fn hits(request: &SearchRequest, snapshot: &strata_acl::IndexSnapshot) -> Vec<(SegmentKey, u32)> {
    snapshot
        .segments()
        .iter()
        .flat_map(|segment| {
            let key = segment.segment_key();
            (0..segment.max_doc())
                .filter(move |&d| request.matches(&key, d))
                .map(move |d| (key, d))
        })
        .collect()
}

//! End-to-end request scenarios through `AclComponent`.

use std::sync::Arc;

use strata_acl::{
    AclComponent, Error, FilterKey, PrincipalSet, QueryFilter, RecordingObserver, SearchComponent,
    SearchRequest, SegmentKey, SegmentView, SegmentWriter, SegmentedIndex,
};

use crate::common::*;

#[test]
fn scenario_a_union_of_principals() {
    let component = component();
    let index = scenario_index();
    let snapshot = index.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "bob, alice");

    component.prepare(&mut request, &snapshot).unwrap();

    assert_eq!(request.filters().len(), 1);
    assert_eq!(visible(&request, snapshot.segments()[0].as_ref()), vec![1, 2, 3]);
}

#[test]
fn scenario_b_unknown_principal_reads_nothing() {
    let component = component();
    let index = scenario_index();
    let snapshot = index.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "carol");

    component.prepare(&mut request, &snapshot).unwrap();

    assert_eq!(request.filters().len(), 1);
    assert!(visible(&request, snapshot.segments()[0].as_ref()).is_empty());
    let stats = component.stats().cache;
    assert_eq!(stats.puts, 1);
    assert_eq!(stats.non_live_puts, 1);
}

#[test]
fn scenario_c_no_parameter_is_unrestricted() {
    let component = component();
    let index = scenario_index();
    let snapshot = index.snapshot();
    let mut request = SearchRequest::new().with_param("q", "quarterly report");

    component.prepare(&mut request, &snapshot).unwrap();

    assert!(request.filters().is_empty());
    assert_eq!(visible(&request, snapshot.segments()[0].as_ref()), vec![0, 1, 2, 3]);
    assert_eq!(component.stats().cache.lookups, 0);
}

#[test]
fn scenario_d_eviction_to_water_mark() {
    init_tracing();
    let component = AclComponent::init(&config(2, 1)).unwrap();
    let index = scenario_index();
    let snapshot = index.snapshot();

    for raw in ["alice", "bob", "carol"] {
        let mut request = SearchRequest::new().with_param(PARAM, raw);
        component.prepare(&mut request, &snapshot).unwrap();
    }

    let stats = component.stats().cache;
    assert_eq!(stats.size, 1);
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.puts, 3);

    let segment = snapshot.segments()[0].segment_key();
    let newest = FilterKey::new(PrincipalSet::parse("carol").key(), segment);
    assert!(component.cache().contains(&newest));
}

#[test]
fn existing_filters_are_preserved() {
    let component = component();
    let index = scenario_index();
    let snapshot = index.snapshot();
    let segment = snapshot.segments()[0].segment_key();

    let only_bob = component
        .filter_for(&PrincipalSet::parse("bob"), &snapshot)
        .unwrap();
    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    request.add_filter(Arc::new(only_bob));

    component.prepare(&mut request, &snapshot).unwrap();

    assert_eq!(request.filters().len(), 2);
    // alice ∩ bob
    assert!(request.matches(&segment, 3));
    assert!(!request.matches(&segment, 1));
    assert!(!request.matches(&segment, 2));
}

#[test]
fn multi_segment_request_covers_every_segment() {
    let component = component();
    let index = scenario_index();
    commit_segment(&index, &[&["carol"], &["alice", "carol"], &[]]);
    let snapshot = index.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "alice");

    component.prepare(&mut request, &snapshot).unwrap();

    assert_eq!(visible(&request, snapshot.segments()[0].as_ref()), vec![1, 3]);
    assert_eq!(visible(&request, snapshot.segments()[1].as_ref()), vec![1]);
    assert_eq!(component.stats().cache.size, 2);
}

#[test]
fn repeated_request_is_served_from_cache() {
    let observer = Arc::new(RecordingObserver::new());
    let component = AclComponent::init_with_observer(&config(16, 8), observer.clone()).unwrap();
    let index = scenario_index();
    let snapshot = index.snapshot();

    for raw in ["alice,bob", " bob , alice ", "alice, bob, alice"] {
        let mut request = SearchRequest::new().with_param(PARAM, raw);
        component.prepare(&mut request, &snapshot).unwrap();
        assert_eq!(visible(&request, snapshot.segments()[0].as_ref()), vec![1, 2, 3]);
    }

    assert_eq!(observer.build_count(), 1);
    let stats = component.stats().cache;
    assert_eq!(stats.lookups, 3);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
}

#[test]
fn deletion_invalidates_through_new_segment_key() {
    let component = component();
    let index = scenario_index();
    let principals = PrincipalSet::parse("alice");

    let before = index.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    component.prepare(&mut request, &before).unwrap();
    assert_eq!(visible(&request, before.segments()[0].as_ref()), vec![1, 3]);

    assert!(index.delete_document(0, 3));
    let after = index.snapshot();
    assert_ne!(before.segments()[0].segment_key(), after.segments()[0].segment_key());

    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    component.prepare(&mut request, &after).unwrap();
    assert_eq!(visible(&request, after.segments()[0].as_ref()), vec![1]);

    // The old snapshot still resolves to its own bitmap.
    let old = component.filter_for(&principals, &before).unwrap();
    assert_eq!(old.cardinality(), 2);
    assert_eq!(component.stats().cache.misses, 2);
}

#[test]
fn merged_segment_gets_fresh_filter() {
    let component = component();
    let index = scenario_index();
    commit_segment(&index, &[&["alice"]]);
    let principals = PrincipalSet::parse("alice");
    component.filter_for(&principals, &index.snapshot()).unwrap();

    let docs: [&[&str]; 5] = [&["alice"], &[], &["bob"], &["alice", "bob"], &["alice"]];
    let mut writer = SegmentWriter::new();
    for readers in docs {
        writer.add_document(FIELD, readers.iter().copied());
    }
    let merged_id = index.allocate_segment_id();
    index.replace_segments(&[0, 1], writer.seal(merged_id));

    let snapshot = index.snapshot();
    assert_eq!(snapshot.len(), 1);
    let filter = component.filter_for(&principals, &snapshot).unwrap();
    let merged = snapshot.segments()[0].segment_key();
    assert_eq!(merged.segment_id, merged_id);
    let hits: Vec<_> = (0..5).filter(|&d| filter.matches(&merged, d)).collect();
    assert_eq!(hits, vec![0, 3, 4]);
}

#[test]
fn replacing_a_segment_id_drops_old_grants() {
    let component = component();
    let index = SegmentedIndex::new();
    let id = commit_segment(&index, &[&["alice"]]);

    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    component.prepare(&mut request, &index.snapshot()).unwrap();
    assert_eq!(visible(&request, index.snapshot().segments()[0].as_ref()), vec![0]);

    let mut writer = SegmentWriter::new();
    writer.add_document(FIELD, ["bob"]);
    index.add_segment(writer.seal(id));

    let snapshot = index.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    component.prepare(&mut request, &snapshot).unwrap();
    assert!(visible(&request, snapshot.segments()[0].as_ref()).is_empty());
}

#[test]
fn indexes_sharing_a_component_stay_separate() {
    let component = component();
    let index_a = SegmentedIndex::new();
    commit_segment(&index_a, &[&["alice"]]);
    let index_b = SegmentedIndex::new();
    commit_segment(&index_b, &[&["bob"]]);

    let snapshot_a = index_a.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    component.prepare(&mut request, &snapshot_a).unwrap();
    assert_eq!(visible(&request, snapshot_a.segments()[0].as_ref()), vec![0]);

    let snapshot_b = index_b.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "alice");
    component.prepare(&mut request, &snapshot_b).unwrap();
    assert!(visible(&request, snapshot_b.segments()[0].as_ref()).is_empty());
    assert_eq!(component.stats().cache.size, 2);
}

#[test]
fn build_failure_fails_request_and_caches_nothing() {
    let component = component();
    let broken = BrokenSegment {
        key: SegmentKey::new(42, 0),
    };
    let snapshot = snapshot_of(broken);
    let mut request = SearchRequest::new().with_param(PARAM, "alice");

    let err = component.prepare(&mut request, &snapshot).unwrap_err();

    match err {
        Error::Build { segment, .. } => assert_eq!(segment, SegmentKey::new(42, 0)),
        other => panic!("expected build error, got {:?}", other),
    }
    assert!(request.filters().is_empty());
    let stats = component.stats().cache;
    assert_eq!(stats.puts, 0);
    assert_eq!(stats.size, 0);

    // A retry builds again and fails again.
    let mut retry = SearchRequest::new().with_param(PARAM, "alice");
    assert!(component.prepare(&mut retry, &snapshot).is_err());
    assert_eq!(component.stats().cache.misses, 2);
}

#[test]
fn empty_principal_list_denies_everything() {
    let component = component();
    let index = scenario_index();
    let snapshot = index.snapshot();
    let mut request = SearchRequest::new().with_param(PARAM, "");

    component.prepare(&mut request, &snapshot).unwrap();

    assert_eq!(request.filters().len(), 1);
    assert!(visible(&request, snapshot.segments()[0].as_ref()).is_empty());
    assert_eq!(component.stats().cache.lookups, 0);
}

#[test]
fn stats_report_is_consistent_after_traffic() {
    let component = component();
    let index = scenario_index();
    let snapshot = index.snapshot();
    for raw in ["alice", "bob", "alice", "dave", "bob"] {
        let mut request = SearchRequest::new().with_param(PARAM, raw);
        component.prepare(&mut request, &snapshot).unwrap();
    }

    let report = component.stats();
    assert_eq!(report.name, "acl");
    let json = report.to_json().unwrap();
    assert_eq!(json["cumulative_lookups"], 5);
    assert_eq!(json["cumulative_hits"], 2);
    assert_eq!(json["cumulative_misses"], 3);
    assert_eq!(json["cumulative_puts"], 3);
    assert_eq!(json["cumulative_nonlive_puts"], 1);
    assert_eq!(json["cumulative_evictions"], 0);
    assert_eq!(json["size"], 3);
}

//! Strata ACL - principal-set document filtering for segmented indexes
//!
//! Restricts search results to the documents a set of principals (users and
//! groups) may read. Each indexed document lists its readers in a field; for
//! a request's principal set the filter is the union of those principals'
//! postings, computed per segment and kept in a bounded LRU cache.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_acl::{AclComponent, AclConfig, SearchComponent, SearchRequest, SegmentedIndex};
//!
//! let component = AclComponent::init(&AclConfig::new("principals", "readers"))?;
//!
//! let mut request = SearchRequest::new().with_param("principals", "bob, alice");
//! component.prepare(&mut request, &index.snapshot())?;
//! ```
//!
//! # Architecture
//!
//! - `strata-acl-core`: principal sets, segment keys, errors, configuration
//! - `strata-acl-index`: segment views, sealed segments, snapshots
//! - `strata-acl-filter`: filter builder, filter cache, pipeline component

pub use strata_acl_core::{
    AclConfig, DocOrdinal, Error, FilterSettings, PrincipalKey, PrincipalSet, Result, SegmentKey,
    CONFIG_FILE_NAME,
};
pub use strata_acl_filter::*;
pub use strata_acl_index::{
    build_sealed_segment, IndexSnapshot, LiveDocs, Postings, SealedSegment, SegmentSnapshot,
    SegmentView, SegmentWriter, SegmentedIndex, SEGMENT_FILE_EXTENSION,
};

//! Segmented readers index for ACL filtering
//!
//! This crate provides:
//! - `SegmentView`: the read-only boundary the filter builder works against
//! - `SealedSegment`: immutable term→postings segments (`.seg` format)
//! - `SegmentWriter`: builds a sealed segment from documents
//! - `SegmentedIndex`: the live set of segments, handing out point-in-time
//!   `IndexSnapshot`s whose segments never change underneath a reader

#![warn(missing_docs)]
#![warn(clippy::all)]

mod live;
pub mod segment;
mod segmented;
mod view;
mod writer;

pub use live::LiveDocs;
pub use segment::{build_sealed_segment, PostingIter, SealedSegment, SEGMENT_FILE_EXTENSION};
pub use segmented::{IndexSnapshot, SegmentedIndex};
pub use view::{Postings, SegmentSnapshot, SegmentView};
pub use writer::SegmentWriter;

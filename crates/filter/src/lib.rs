//! Principal-set document filters
//!
//! This crate provides:
//! - `DocBitmap`: per-segment set of readable ordinals
//! - `FilterBuilder`: builds a `DocBitmap` from a principal set and a segment
//! - `FilterCache`: bounded LRU of built bitmaps with cumulative statistics
//! - `AclComponent`: the request-pipeline stage that parses the principal
//!   parameter and appends an `AclFilter` to the request
//!
//! # Control flow
//!
//! ```text
//! raw "bob, alice" ─► PrincipalSet ─► key ─► FilterCache::get
//!                                              │ miss
//!                                              ▼
//!                                    FilterBuilder::build ─► put
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bitmap;
mod builder;
mod cache;
mod component;
mod observer;
mod request;
mod stats;

pub use bitmap::DocBitmap;
pub use builder::FilterBuilder;
pub use cache::{FilterCache, FilterKey};
pub use component::{AclComponent, ComponentStats, SearchComponent};
pub use observer::{BuildEvent, BuildFailure, BuildObserver, TracingObserver};
#[cfg(any(test, feature = "test-util"))]
pub use observer::RecordingObserver;
pub use request::{AclFilter, QueryFilter, SearchRequest};
pub use stats::CacheStats;

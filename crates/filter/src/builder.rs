//! Segment filter construction
//!
//! Given a principal set and one segment view, compute the bitmap of live
//! ordinals that at least one principal may read. Cost is proportional to
//! the postings of the requested principals present in the segment, plus
//! the bitmap allocation.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use strata_acl_core::{Error, PrincipalSet, Result};
use strata_acl_index::SegmentView;

use crate::bitmap::DocBitmap;
use crate::observer::{BuildEvent, BuildFailure, BuildObserver, TracingObserver};

/// Builds per-segment reader bitmaps from the configured readers field.
///
/// Holds no per-build state; one builder serves any number of concurrent
/// builds.
#[derive(Clone)]
pub struct FilterBuilder {
    field: String,
    observer: Arc<dyn BuildObserver>,
}

impl FilterBuilder {
    /// Builder over `field` reporting to the `tracing` sink
    pub fn new(field: impl Into<String>) -> Self {
        Self::with_observer(field, Arc::new(TracingObserver))
    }

    /// Builder over `field` reporting to `observer`
    pub fn with_observer(field: impl Into<String>, observer: Arc<dyn BuildObserver>) -> Self {
        FilterBuilder {
            field: field.into(),
            observer,
        }
    }

    /// The readers field postings are read from
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Build the bitmap of live ordinals readable by any of `principals`.
    ///
    /// Principals without postings in this segment contribute nothing.
    ///
    /// # Errors
    ///
    /// `Error::Build` if any posting list cannot be read. No partial bitmap
    /// is ever returned.
    pub fn build(&self, principals: &PrincipalSet, segment: &dyn SegmentView) -> Result<DocBitmap> {
        let start = Instant::now();
        match self.fill(principals, segment) {
            Ok(bitmap) => {
                self.observer.on_build(&BuildEvent {
                    segment: segment.segment_key(),
                    max_doc: segment.max_doc(),
                    principals: principals.len(),
                    matched: bitmap.cardinality(),
                    elapsed: start.elapsed(),
                });
                Ok(bitmap)
            }
            Err(source) => {
                self.observer.on_failure(&BuildFailure {
                    segment: segment.segment_key(),
                    error: source.to_string(),
                    elapsed: start.elapsed(),
                });
                Err(Error::Build {
                    segment: segment.segment_key(),
                    source,
                })
            }
        }
    }

    fn fill(&self, principals: &PrincipalSet, segment: &dyn SegmentView) -> io::Result<DocBitmap> {
        let max_doc = segment.max_doc();
        let mut bitmap = DocBitmap::with_capacity(max_doc);
        let live_docs = segment.live_docs();

        for principal in principals.iter() {
            let postings = match segment.postings(&self.field, principal)? {
                Some(postings) => postings,
                None => continue,
            };
            for doc in postings {
                let doc = doc?;
                if doc >= max_doc {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("posting ordinal {} outside segment of {} docs", doc, max_doc),
                    ));
                }
                if live_docs.map_or(true, |live| live.is_live(doc)) {
                    bitmap.set(doc);
                }
            }
        }
        Ok(bitmap)
    }
}

impl std::fmt::Debug for FilterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterBuilder")
            .field("field", &self.field)
            .finish()
    }
}

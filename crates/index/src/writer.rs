//! Accumulates documents and seals them into a segment

use std::collections::BTreeMap;

use strata_acl_core::DocOrdinal;

use crate::segment::{build_sealed_segment, term_key, SealedSegment};

/// In-memory segment under construction.
///
/// Ordinals are assigned densely in insertion order. Nothing is visible to
/// readers until [`SegmentWriter::seal`].
#[derive(Debug, Default)]
pub struct SegmentWriter {
    max_doc: u32,
    terms: BTreeMap<String, Vec<DocOrdinal>>,
}

impl SegmentWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document listing `values` in `field`; returns its ordinal.
    pub fn add_document<I, S>(&mut self, field: &str, values: I) -> DocOrdinal
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doc = self.add_blank_document();
        for value in values {
            self.add_term(doc, field, value.as_ref());
        }
        doc
    }

    /// Add a document with no indexed terms; returns its ordinal.
    pub fn add_blank_document(&mut self) -> DocOrdinal {
        let doc = self.max_doc;
        self.max_doc += 1;
        doc
    }

    /// Index `value` in `field` for an existing document.
    ///
    /// Returns false if `doc` has not been added yet.
    pub fn add_term(&mut self, doc: DocOrdinal, field: &str, value: &str) -> bool {
        if doc >= self.max_doc {
            return false;
        }
        let docs = self.terms.entry(term_key(field, value)).or_default();
        if docs.last() != Some(&doc) {
            docs.push(doc);
        }
        true
    }

    /// Number of documents added so far
    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// Seal into an immutable segment
    pub fn seal(self, segment_id: u64) -> SealedSegment {
        build_sealed_segment(segment_id, self.terms, self.max_doc)
    }
}

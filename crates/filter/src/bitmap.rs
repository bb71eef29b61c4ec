//! Per-segment document bitmap

use bitvec::prelude::*;
use strata_acl_core::DocOrdinal;

/// Fixed-size bit vector over one segment's ordinals.
///
/// Bit `i` set means at least one requesting principal may read ordinal `i`.
/// Built once by the filter builder, then shared read-only through `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct DocBitmap {
    bits: BitVec<u64, Lsb0>,
}

impl DocBitmap {
    /// All-clear bitmap covering `max_doc` ordinals
    pub fn with_capacity(max_doc: u32) -> Self {
        DocBitmap {
            bits: bitvec![u64, Lsb0; 0; max_doc as usize],
        }
    }

    /// Bitmap with exactly `ordinals` set; out-of-range entries are ignored.
    pub fn from_ordinals(max_doc: u32, ordinals: impl IntoIterator<Item = DocOrdinal>) -> Self {
        let mut bitmap = Self::with_capacity(max_doc);
        for doc in ordinals {
            bitmap.set(doc);
        }
        bitmap
    }

    /// Set `doc`. Returns false if `doc` is outside the bitmap.
    #[inline]
    pub fn set(&mut self, doc: DocOrdinal) -> bool {
        let idx = doc as usize;
        if idx >= self.bits.len() {
            return false;
        }
        self.bits.set(idx, true);
        true
    }

    /// True if `doc` is set. Ordinals outside the bitmap are never set.
    #[inline]
    pub fn contains(&self, doc: DocOrdinal) -> bool {
        self.bits.get(doc as usize).map(|b| *b).unwrap_or(false)
    }

    /// Number of set bits
    pub fn cardinality(&self) -> usize {
        self.bits.count_ones()
    }

    /// True if no bit is set
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Number of ordinals covered (the segment's max_doc)
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Set ordinals in ascending order
    pub fn ordinals(&self) -> impl Iterator<Item = DocOrdinal> + '_ {
        self.bits.iter_ones().map(|i| i as DocOrdinal)
    }

    /// Approximate heap footprint in bytes
    pub fn heap_bytes(&self) -> usize {
        self.bits.as_raw_slice().len() * std::mem::size_of::<u64>()
    }
}

impl std::fmt::Debug for DocBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocBitmap")
            .field("len", &self.len())
            .field("cardinality", &self.cardinality())
            .finish()
    }
}

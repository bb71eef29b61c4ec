//! Sealed segment file format (.seg) for the readers index
//!
//! Provides immutable, mmap-able segments that store a term dictionary and
//! delta-encoded posting lists in a compact binary format. Terms are
//! namespaced by field: the dictionary key is `field 0x00 value`.
//!
//! ## File Format
//!
//! ```text
//! HEADER (40 bytes):
//!   magic "SEGP"            4B
//!   version                 u32 LE
//!   segment_id              u64 LE
//!   max_doc                 u32 LE
//!   term_count              u32 LE
//!   term_offsets_offset     u64 LE    → byte offset to term offset table
//!   postings_offset         u64 LE    → byte offset to postings section
//!
//! TERM DICTIONARY (variable length, sorted by term bytes):
//!   per term:
//!     term_len              u32 LE
//!     term_bytes            [u8; term_len]
//!     df                    u32 LE
//!     posting_offset        u32 LE    → relative to postings section start
//!     posting_byte_len      u32 LE
//!
//! TERM OFFSET TABLE (term_count × 4 bytes):
//!   per term: offset        u32 LE    → byte offset of term entry in dict
//!
//! POSTINGS SECTION:
//!   per term's posting list:
//!     num_entries           u32 LE
//!     delta-encoded ordinals: delta_doc: varint
//! ```
//!
//! Deletions are not part of the file. They are tracked in memory together
//! with a deletion generation that is bumped on every new delete.
//!
//! Every `SealedSegment` value, whether sealed from a writer or loaded from a
//! file, gets a process-unique instance number. Segment ids may be reused
//! (replacement, separate indexes); instances are not.

use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use strata_acl_core::{DocOrdinal, Error, Result, SegmentKey};

use crate::live::LiveDocs;

/// Magic bytes for .seg files
const SEG_MAGIC: &[u8; 4] = b"SEGP";
/// Current format version
const SEG_VERSION: u32 = 1;
/// Header size in bytes
const HEADER_SIZE: usize = 40;
/// Size of the term length prefix of a dictionary entry
const TERM_LEN_SIZE: usize = 4;
/// Size of the fixed part of a dictionary entry after the term bytes
const DICT_ENTRY_TAIL: usize = 12;

/// Source of segment instance numbers; 0 is reserved for unsealed views.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// File extension used for segment files
pub const SEGMENT_FILE_EXTENSION: &str = "seg";

/// Dictionary key for a value of a field.
pub(crate) fn term_key(field: &str, value: &str) -> String {
    let mut key = String::with_capacity(field.len() + value.len() + 1);
    key.push_str(field);
    key.push('\0');
    key.push_str(value);
    key
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn read_u32(bytes: &[u8], pos: usize) -> Option<u32> {
    bytes.get(pos..pos + 4)?.try_into().ok().map(u32::from_le_bytes)
}

fn read_u64(bytes: &[u8], pos: usize) -> Option<u64> {
    bytes.get(pos..pos + 8)?.try_into().ok().map(u64::from_le_bytes)
}

// ============================================================================
// Varint (LEB128) Codec
// ============================================================================

/// Encode a u32 as a variable-length integer (LEB128).
pub(crate) fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from a byte slice, returning (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
        shift += 7;
        if shift >= 35 {
            return None; // overflow
        }
    }
    None // truncated
}

// ============================================================================
// SegmentData
// ============================================================================

/// Underlying storage for a sealed segment.
enum SegmentData {
    /// In-memory owned data (before flush)
    Owned(Vec<u8>),
    /// Memory-mapped file data
    Mmap(memmap2::Mmap),
}

impl SegmentData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            SegmentData::Owned(v) => v,
            SegmentData::Mmap(m) => m,
        }
    }
}

#[derive(Debug, Default)]
struct Deletions {
    docs: HashSet<DocOrdinal>,
    generation: u64,
}

// ============================================================================
// SealedSegment
// ============================================================================

/// An immutable, searchable segment of the readers index.
///
/// Contains a sorted term dictionary and delta-encoded posting lists.
/// Can be backed by either owned memory or an mmap'd file.
pub struct SealedSegment {
    data: SegmentData,
    segment_id: u64,
    instance: u64,
    max_doc: u32,
    term_count: u32,
    term_offsets_offset: usize,
    postings_offset: usize,
    /// Deleted ordinals (not physically removed until merge)
    deletions: RwLock<Deletions>,
}

impl SealedSegment {
    /// Create a sealed segment from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::validate_and_create(SegmentData::Owned(data))
    }

    /// Load a sealed segment from an mmap'd file.
    pub fn from_mmap(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: segment files are written once via temp+rename and never modified.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::validate_and_create(SegmentData::Mmap(mmap))
    }

    fn validate_and_create(data: SegmentData) -> Result<Self> {
        let bytes = data.as_bytes();
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Corruption("segment too small".to_string()));
        }
        if &bytes[0..4] != SEG_MAGIC {
            return Err(Error::Corruption("bad SEGP magic".to_string()));
        }
        let header = |pos: usize| read_u64(bytes, pos);
        let version = read_u32(bytes, 4).unwrap_or_default();
        if version != SEG_VERSION {
            return Err(Error::Corruption(format!(
                "unsupported segment version {}",
                version
            )));
        }
        let truncated = || Error::Corruption("truncated segment header".to_string());
        let segment_id = header(8).ok_or_else(truncated)?;
        let max_doc = read_u32(bytes, 16).ok_or_else(truncated)?;
        let term_count = read_u32(bytes, 20).ok_or_else(truncated)?;
        let term_offsets_offset = header(24).ok_or_else(truncated)? as usize;
        let postings_offset = header(32).ok_or_else(truncated)? as usize;

        let table_end = term_offsets_offset
            .checked_add(term_count as usize * 4)
            .ok_or_else(truncated)?;
        if term_offsets_offset < HEADER_SIZE
            || table_end > postings_offset
            || postings_offset > bytes.len()
        {
            return Err(Error::Corruption(format!(
                "segment {} section offsets out of bounds",
                segment_id
            )));
        }

        Ok(SealedSegment {
            data,
            segment_id,
            instance: next_instance(),
            max_doc,
            term_count,
            term_offsets_offset,
            postings_offset,
            deletions: RwLock::new(Deletions::default()),
        })
    }

    /// Segment ID
    pub fn segment_id(&self) -> u64 {
        self.segment_id
    }

    /// Process-unique instance number of this segment value
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Number of document ordinals in this segment (including deleted)
    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// Number of distinct terms across all fields
    pub fn term_count(&self) -> u32 {
        self.term_count
    }

    // ========================================================================
    // Deletions
    // ========================================================================

    /// Mark an ordinal as deleted. Returns false if it was out of range or
    /// already deleted; the deletion generation only moves on a real change.
    pub fn delete(&self, doc: DocOrdinal) -> bool {
        if doc >= self.max_doc {
            return false;
        }
        let mut deletions = self.deletions.write();
        if deletions.docs.insert(doc) {
            deletions.generation += 1;
            true
        } else {
            false
        }
    }

    /// Check if an ordinal is deleted
    pub fn is_deleted(&self, doc: DocOrdinal) -> bool {
        self.deletions.read().docs.contains(&doc)
    }

    /// Number of deleted ordinals
    pub fn deleted_count(&self) -> usize {
        self.deletions.read().docs.len()
    }

    /// Live document count (max_doc - deletions)
    pub fn live_doc_count(&self) -> u32 {
        self.max_doc.saturating_sub(self.deleted_count() as u32)
    }

    /// Identity of the segment's current deletion state
    pub fn segment_key(&self) -> SegmentKey {
        SegmentKey::for_instance(
            self.segment_id,
            self.instance,
            self.deletions.read().generation,
        )
    }

    /// Freeze the current deletions.
    ///
    /// Returns the key of that state and its liveness bitmap, or `None` for
    /// the bitmap when nothing is deleted. Both are read under one lock so
    /// the key always describes the bitmap.
    pub fn freeze_deletions(&self) -> (SegmentKey, Option<LiveDocs>) {
        let deletions = self.deletions.read();
        let key = SegmentKey::for_instance(self.segment_id, self.instance, deletions.generation);
        if deletions.docs.is_empty() {
            return (key, None);
        }
        (key, Some(LiveDocs::with_deletions(self.max_doc, &deletions.docs)))
    }

    // ========================================================================
    // Term Dictionary Access
    // ========================================================================

    /// Number of documents listing `value` in `field`.
    pub fn doc_freq(&self, field: &str, value: &str) -> io::Result<u32> {
        Ok(self
            .find_term(&term_key(field, value))?
            .map(|(df, _, _)| df)
            .unwrap_or(0))
    }

    /// Lazily decoding iterator over the ordinals listing `value` in `field`.
    ///
    /// Returns `Ok(None)` when the term does not occur in this segment.
    /// Does NOT filter deletions; the caller checks liveness.
    pub fn postings(&self, field: &str, value: &str) -> io::Result<Option<PostingIter<'_>>> {
        let (_, posting_offset, posting_len) = match self.find_term(&term_key(field, value))? {
            Some(info) => info,
            None => return Ok(None),
        };
        let bytes = self.data.as_bytes();
        let start = self.postings_offset + posting_offset as usize;
        let end = start + posting_len as usize;
        let posting_bytes = bytes.get(start..end).ok_or_else(|| {
            invalid_data(format!(
                "segment {}: posting list for {}:{} past end of data",
                self.segment_id, field, value
            ))
        })?;
        let num_entries = read_u32(posting_bytes, 0).ok_or_else(|| {
            invalid_data(format!(
                "segment {}: posting list header truncated",
                self.segment_id
            ))
        })?;
        Ok(Some(PostingIter {
            data: posting_bytes,
            pos: 4,
            remaining: num_entries,
            prev_doc: 0,
            max_doc: self.max_doc,
        }))
    }

    /// Binary search the term dictionary.
    ///
    /// Returns (df, posting_offset, posting_byte_len). A dictionary that
    /// points outside the segment data is an error, not a missing term.
    fn find_term(&self, term: &str) -> io::Result<Option<(u32, u32, u32)>> {
        let bytes = self.data.as_bytes();
        let corrupt = || invalid_data(format!("segment {}: corrupt term dictionary", self.segment_id));

        let mut lo = 0usize;
        let mut hi = self.term_count as usize;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let dict_offset =
                read_u32(bytes, self.term_offsets_offset + mid * 4).ok_or_else(corrupt)? as usize;
            let abs_pos = HEADER_SIZE + dict_offset;
            let term_len = read_u32(bytes, abs_pos).ok_or_else(corrupt)? as usize;
            let term_start = abs_pos + TERM_LEN_SIZE;
            let term_end = term_start.checked_add(term_len).ok_or_else(corrupt)?;
            if term_end.saturating_add(DICT_ENTRY_TAIL) > bytes.len() {
                return Err(corrupt());
            }
            let entry_term = &bytes[term_start..term_end];

            match entry_term.cmp(term.as_bytes()) {
                std::cmp::Ordering::Equal => {
                    let df = read_u32(bytes, term_end).ok_or_else(corrupt)?;
                    let p_offset = read_u32(bytes, term_end + 4).ok_or_else(corrupt)?;
                    let p_len = read_u32(bytes, term_end + 8).ok_or_else(corrupt)?;
                    return Ok(Some((df, p_offset, p_len)));
                }
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        Ok(None)
    }

    /// Write this segment's data to a file (atomic temp+rename).
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let tmp_path = path.with_extension("seg.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(self.data.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl std::fmt::Debug for SealedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedSegment")
            .field("segment_id", &self.segment_id)
            .field("instance", &self.instance)
            .field("max_doc", &self.max_doc)
            .field("term_count", &self.term_count)
            .finish()
    }
}

// ============================================================================
// PostingIter
// ============================================================================

/// Iterator that lazily decodes a delta-encoded posting list.
///
/// Yields an error and then stops if the list is truncated or names an
/// ordinal outside the segment.
#[derive(Debug)]
pub struct PostingIter<'a> {
    data: &'a [u8],
    pos: usize,
    remaining: u32,
    prev_doc: u32,
    max_doc: u32,
}

impl<'a> PostingIter<'a> {
    fn fail(&mut self, msg: String) -> Option<io::Result<DocOrdinal>> {
        self.remaining = 0;
        Some(Err(invalid_data(msg)))
    }
}

impl<'a> Iterator for PostingIter<'a> {
    type Item = io::Result<DocOrdinal>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let decoded = self.data.get(self.pos..).and_then(decode_varint);
        let (delta, n) = match decoded {
            Some(v) => v,
            None => return self.fail(format!("truncated posting at byte {}", self.pos)),
        };
        self.pos += n;
        let doc = match self.prev_doc.checked_add(delta) {
            Some(doc) if doc < self.max_doc => doc,
            _ => {
                let msg = format!("posting ordinal out of range (max_doc {})", self.max_doc);
                return self.fail(msg);
            }
        };
        self.prev_doc = doc;
        Some(Ok(doc))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

// ============================================================================
// Segment Builder
// ============================================================================

/// Build a sealed segment from term→ordinals data.
///
/// The `BTreeMap` provides the dictionary order. Ordinal lists are sorted
/// and deduplicated here.
pub fn build_sealed_segment(
    segment_id: u64,
    term_postings: BTreeMap<String, Vec<DocOrdinal>>,
    max_doc: u32,
) -> SealedSegment {
    let term_count = term_postings.len() as u32;

    let mut dict_buf: Vec<u8> = Vec::new();
    let mut postings_buf: Vec<u8> = Vec::new();
    let mut term_offsets: Vec<u32> = Vec::with_capacity(term_postings.len());

    for (term, mut docs) in term_postings {
        term_offsets.push(dict_buf.len() as u32);

        docs.sort_unstable();
        docs.dedup();

        let df = docs.len() as u32;
        let posting_offset = postings_buf.len() as u32;
        encode_posting_list(&docs, &mut postings_buf);
        let posting_byte_len = postings_buf.len() as u32 - posting_offset;

        let term_bytes = term.as_bytes();
        dict_buf.extend_from_slice(&(term_bytes.len() as u32).to_le_bytes());
        dict_buf.extend_from_slice(term_bytes);
        dict_buf.extend_from_slice(&df.to_le_bytes());
        dict_buf.extend_from_slice(&posting_offset.to_le_bytes());
        dict_buf.extend_from_slice(&posting_byte_len.to_le_bytes());
    }

    let offsets_size = term_offsets.len() * 4;
    let term_offsets_offset = HEADER_SIZE + dict_buf.len();
    let postings_offset = term_offsets_offset + offsets_size;

    let total_size = postings_offset + postings_buf.len();
    let mut buf = Vec::with_capacity(total_size);

    // Header (40 bytes)
    buf.extend_from_slice(SEG_MAGIC);
    buf.extend_from_slice(&SEG_VERSION.to_le_bytes());
    buf.extend_from_slice(&segment_id.to_le_bytes());
    buf.extend_from_slice(&max_doc.to_le_bytes());
    buf.extend_from_slice(&term_count.to_le_bytes());
    buf.extend_from_slice(&(term_offsets_offset as u64).to_le_bytes());
    buf.extend_from_slice(&(postings_offset as u64).to_le_bytes());
    debug_assert_eq!(buf.len(), HEADER_SIZE);

    buf.extend_from_slice(&dict_buf);
    for offset in &term_offsets {
        buf.extend_from_slice(&offset.to_le_bytes());
    }
    buf.extend_from_slice(&postings_buf);
    debug_assert_eq!(buf.len(), total_size);

    SealedSegment {
        data: SegmentData::Owned(buf),
        segment_id,
        instance: next_instance(),
        max_doc,
        term_count,
        term_offsets_offset,
        postings_offset,
        deletions: RwLock::new(Deletions::default()),
    }
}

/// Encode a sorted ordinal list as a count followed by delta varints.
fn encode_posting_list(docs: &[DocOrdinal], buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(docs.len() as u32).to_le_bytes());
    let mut prev_doc: u32 = 0;
    for &doc in docs {
        encode_varint(doc - prev_doc, buf);
        prev_doc = doc;
    }
}

// ============================================================================
// Tests
// ============================================================================

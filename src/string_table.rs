//! String table for node text.
//!
//! Every text value a node exposes is recorded as a `(start, end)` span into
//! the combined text buffer: the source text followed by an auxiliary
//! buffer of strings that do not appear verbatim in the source.
//!
//! Most literal text (identifiers, unescaped string literals) is an exact
//! slice of the source at a position derived from the node's own range, so
//! interning it only records the span. Text that differs from its source
//! slice (escaped literals, cooked template text, file names) is appended
//! to the auxiliary buffer.
//!
//! Entries are never deduplicated against each other: every call to
//! [`StringTable::intern`] returns a fresh index.
//!
//! # Example
//!
//! ```ignore
//! use syntax_buffer::node::TextRange;
//! use syntax_buffer::string_table::{StringTable, TextOrigin};
//!
//! let source = "let s = \"bar\";";
//! let mut strings = StringTable::new(source);
//! let idx = strings.intern("bar", TextOrigin::node(1), TextRange::new(7, 13))?;
//! assert_eq!(strings.span(idx), (9, 12));
//! assert_eq!(strings.other_strings_len(), 0);
//! ```

use crate::error::{EncodeError, EncodeResult, Limit};
use crate::format::{MAX_STRING_ENTRIES, STRING_OFFSET_PAIR_SIZE, append_u32s};
use crate::node::TextRange;

// ============================================================================
// String Index
// ============================================================================

/// Index of an entry in the string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrIdx(u32);

impl StrIdx {
    /// Create a StrIdx from a raw u32 value.
    #[inline]
    pub fn from_raw(idx: u32) -> Self {
        StrIdx(idx)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Where an interned text value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    /// The whole-file text of the root node. Its range is recorded as is.
    SourceFile,
    /// Text of an ordinary node.
    Node {
        /// Bytes at the end of the node's range that are not part of the text.
        closing_delimiter: u32,
    },
}

impl TextOrigin {
    /// Origin for a node whose range ends `closing_delimiter` bytes after its text.
    pub fn node(closing_delimiter: u32) -> Self {
        TextOrigin::Node { closing_delimiter }
    }
}

// ============================================================================
// String Table
// ============================================================================

/// Append-only table of text spans for one encode.
#[derive(Debug)]
pub struct StringTable<'s> {
    source: &'s str,
    /// Flat `(start, end)` pairs, one per entry.
    offsets: Vec<u32>,
    other_strings: String,
}

impl<'s> StringTable<'s> {
    /// Create an empty table over `source`.
    pub fn new(source: &'s str) -> Self {
        Self::with_capacity(source, 0)
    }

    /// Create an empty table with room for `entries` entries.
    pub fn with_capacity(source: &'s str, entries: usize) -> Self {
        Self {
            source,
            offsets: Vec::with_capacity(entries * 2),
            other_strings: String::new(),
        }
    }

    /// Record `text` and return its new index.
    ///
    /// `range` is the range of the node the text belongs to. Fails once the
    /// table holds as many entries as a string payload can address.
    pub fn intern(
        &mut self,
        text: &str,
        origin: TextOrigin,
        range: TextRange,
    ) -> EncodeResult<StrIdx> {
        let index = self.len();
        if index >= MAX_STRING_ENTRIES {
            return Err(EncodeError::capacity(Limit::StringIndex, index));
        }
        let index = StrIdx(index as u32);

        let closing_delimiter = match origin {
            TextOrigin::SourceFile => {
                self.offsets.push(range.pos);
                self.offsets.push(range.end);
                return Ok(index);
            }
            TextOrigin::Node { closing_delimiter } => closing_delimiter,
        };

        if let Some((start, end)) = self.source_span(text, closing_delimiter, range) {
            self.offsets.push(start);
            self.offsets.push(end);
            return Ok(index);
        }

        let offset = self.source.len() + self.other_strings.len();
        let end = offset + text.len();
        let end = u32::try_from(end).map_err(|_| EncodeError::capacity(Limit::BufferSize, end))?;
        self.other_strings.push_str(text);
        self.offsets.push(offset as u32);
        self.offsets.push(end);
        Ok(index)
    }

    /// Find `text` in the source, ending `closing_delimiter` bytes before `range.end`.
    fn source_span(
        &self,
        text: &str,
        closing_delimiter: u32,
        range: TextRange,
    ) -> Option<(u32, u32)> {
        if range.is_detached() || range.is_empty() {
            return None;
        }
        let end = range.end.checked_sub(closing_delimiter)?;
        let start = end.checked_sub(u32::try_from(text.len()).ok()?)?;
        if start < range.pos {
            return None;
        }
        let slice = self.source.as_bytes().get(start as usize..end as usize)?;
        (slice == text.as_bytes()).then_some((start, end))
    }

    /// The `(start, end)` span of an entry in the combined text buffer.
    ///
    /// # Panics
    ///
    /// Panics if the index is invalid.
    pub fn span(&self, idx: StrIdx) -> (u32, u32) {
        let slot = idx.0 as usize * 2;
        (self.offsets[slot], self.offsets[slot + 1])
    }

    /// The text of an entry, if the index is valid.
    pub fn get(&self, idx: StrIdx) -> Option<&str> {
        let slot = idx.0 as usize * 2;
        let start = *self.offsets.get(slot)? as usize;
        let end = *self.offsets.get(slot + 1)? as usize;
        let source_len = self.source.len();
        if end <= source_len {
            self.source.get(start..end)
        } else {
            self.other_strings.get(start.checked_sub(source_len)?..end - source_len)
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.offsets.len() / 2
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Bytes appended after the source text.
    pub fn other_strings_len(&self) -> usize {
        self.other_strings.len()
    }

    /// Byte length of the string offsets section.
    pub fn offsets_byte_len(&self) -> usize {
        self.len() * STRING_OFFSET_PAIR_SIZE
    }

    /// Byte length of the string data section.
    pub fn data_byte_len(&self) -> usize {
        self.source.len() + self.other_strings.len()
    }

    /// Append the string offsets section to `out`.
    pub fn write_offsets(&self, out: &mut Vec<u8>) {
        append_u32s(out, &self.offsets);
    }

    /// Append the string data section to `out`.
    pub fn write_data(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.source.as_bytes());
        out.extend_from_slice(self.other_strings.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_span_is_recorded_directly() {
        let mut strings = StringTable::new("");
        let idx = strings.intern("", TextOrigin::SourceFile, TextRange::empty()).unwrap();
        assert_eq!(idx.raw(), 0);
        assert_eq!(strings.span(idx), (0, 0));
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn test_quoted_literal_reuses_source() {
        let source = "import { bar } from \"bar\";";
        let mut strings = StringTable::new(source);
        // The literal's range includes leading trivia and both quotes.
        let idx = strings.intern("bar", TextOrigin::node(1), TextRange::new(19, 25)).unwrap();
        assert_eq!(strings.span(idx), (21, 24));
        assert_eq!(strings.get(idx), Some("bar"));
        assert_eq!(strings.other_strings_len(), 0);
    }

    #[test]
    fn test_identifier_with_leading_trivia_reuses_source() {
        let source = "let   foo = 1";
        let mut strings = StringTable::new(source);
        let idx = strings.intern("foo", TextOrigin::node(0), TextRange::new(3, 9)).unwrap();
        assert_eq!(strings.span(idx), (6, 9));
        assert_eq!(strings.other_strings_len(), 0);
    }

    #[test]
    fn test_escaped_text_is_appended() {
        let source = "x = \"a\\nb\"";
        let mut strings = StringTable::new(source);
        let idx = strings.intern("a\nb", TextOrigin::node(1), TextRange::new(3, 10)).unwrap();
        let (start, end) = strings.span(idx);
        assert!(start as usize >= source.len());
        assert_eq!((start, end), (10, 13));
        assert_eq!(strings.get(idx), Some("a\nb"));
        assert_eq!(strings.data_byte_len(), source.len() + 3);
    }

    #[test]
    fn test_empty_range_always_appends() {
        let mut strings = StringTable::new("abc");
        let idx = strings.intern("abc", TextOrigin::node(0), TextRange::new(3, 3)).unwrap();
        assert_eq!(strings.span(idx), (3, 6));
        let idx = strings.intern("main.res", TextOrigin::node(0), TextRange::DETACHED).unwrap();
        assert_eq!(strings.span(idx), (6, 14));
    }

    #[test]
    fn test_candidate_before_node_start_is_rejected() {
        // "xab" ends at 4 in the source but starts before the node range.
        let mut strings = StringTable::new("xxab");
        let idx = strings.intern("xab", TextOrigin::node(0), TextRange::new(2, 4)).unwrap();
        assert_eq!(strings.span(idx), (4, 7));
    }

    #[test]
    fn test_delimiter_wider_than_range_appends() {
        let mut strings = StringTable::new("\"");
        let idx = strings.intern("", TextOrigin::node(2), TextRange::new(0, 1)).unwrap();
        assert_eq!(strings.span(idx), (1, 1));
    }

    #[test]
    fn test_identical_text_gets_fresh_indices() {
        let source = "a a";
        let mut strings = StringTable::new(source);
        let first = strings.intern("a", TextOrigin::node(0), TextRange::new(0, 1)).unwrap();
        let second = strings.intern("a", TextOrigin::node(0), TextRange::new(1, 3)).unwrap();
        assert_eq!(first.raw(), 0);
        assert_eq!(second.raw(), 1);
        assert_eq!(strings.span(second), (2, 3));
    }

    #[test]
    fn test_write_sections() {
        let mut strings = StringTable::new("ab");
        strings.intern("b", TextOrigin::node(0), TextRange::new(0, 2)).unwrap();
        strings.intern("z", TextOrigin::node(0), TextRange::new(0, 2)).unwrap();

        let mut offsets = Vec::new();
        strings.write_offsets(&mut offsets);
        assert_eq!(offsets.len(), strings.offsets_byte_len());
        assert_eq!(&offsets[..8], &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(&offsets[8..], &[2, 0, 0, 0, 3, 0, 0, 0]);

        let mut data = Vec::new();
        strings.write_data(&mut data);
        assert_eq!(data, b"abz");
    }

    #[test]
    fn test_index_space_is_24_bits() {
        let mut strings = StringTable::with_capacity("", MAX_STRING_ENTRIES);
        for _ in 0..MAX_STRING_ENTRIES {
            strings.intern("", TextOrigin::node(0), TextRange::empty()).unwrap();
        }
        assert_eq!(strings.len(), MAX_STRING_ENTRIES);
        assert_eq!(strings.other_strings_len(), 0);

        let err = strings
            .intern("", TextOrigin::node(0), TextRange::empty())
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::CapacityExceeded {
                limit: Limit::StringIndex,
                value: 16_777_216
            }
        );
        assert_eq!(strings.len(), MAX_STRING_ENTRIES);
    }
}

//! Extended data area.
//!
//! Holds node payloads that fit neither a child count nor a single string
//! index. Each entry describes its own length:
//!
//! ```text
//! ┌──────────────┬──────────┬──────────┬─────┐
//! │ word count n │ word 0   │ word 1   │ ... │   (all u32, little-endian)
//! └──────────────┴──────────┴──────────┴─────┘
//! ```
//!
//! Nodes reference an entry by its byte offset from the start of the area.

use crate::error::{EncodeError, EncodeResult, Limit};
use crate::format::{MAX_EXTENDED_OFFSET, append_u32s};

/// Byte offset of an entry in the extended data area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtIdx(u32);

impl ExtIdx {
    /// Create an ExtIdx from a raw u32 value.
    #[inline]
    pub fn from_raw(offset: u32) -> Self {
        ExtIdx(offset)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Append-only writer for the extended data area.
#[derive(Debug, Default)]
pub struct ExtendedData {
    bytes: Vec<u8>,
}

impl ExtendedData {
    /// Create an empty area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry holding `words` and return its offset.
    pub fn push(&mut self, words: &[u32]) -> EncodeResult<ExtIdx> {
        let offset = self.bytes.len();
        if offset > MAX_EXTENDED_OFFSET {
            return Err(EncodeError::capacity(Limit::ExtendedOffset, offset));
        }
        let count = u32::try_from(words.len())
            .map_err(|_| EncodeError::capacity(Limit::BufferSize, words.len()))?;
        append_u32s(&mut self.bytes, &[count]);
        append_u32s(&mut self.bytes, words);
        Ok(ExtIdx(offset as u32))
    }

    /// Byte length of the area.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no entry was written.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The encoded area.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

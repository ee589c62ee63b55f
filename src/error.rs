//! Error types for encoding and decoding.
//!
//! Encode errors are capacity or invariant violations. They are never
//! transient: retrying the same tree fails the same way. Decode errors all
//! mean the input buffer is corrupt, truncated, or from a format revision
//! this crate does not understand.

use std::fmt;

/// Result type for encode operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Which fixed-width field a tree would overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// 24-bit string index.
    StringIndex,
    /// 8-bit child count.
    ChildCount,
    /// 30-bit extended data offset.
    ExtendedOffset,
    /// 6-bit node flags.
    NodeFlags,
    /// 32-bit node index.
    NodeCount,
    /// 32-bit section offsets.
    BufferSize,
}

impl Limit {
    /// Short name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Limit::StringIndex => "string index",
            Limit::ChildCount => "child count",
            Limit::ExtendedOffset => "extended data offset",
            Limit::NodeFlags => "node flags",
            Limit::NodeCount => "node count",
            Limit::BufferSize => "buffer size",
        }
    }
}

/// Errors that abort an encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A value does not fit the field reserved for it.
    CapacityExceeded {
        /// The field that overflowed.
        limit: Limit,
        /// The value that did not fit.
        value: usize,
    },
    /// A kind tag equal to the list sentinel.
    ReservedKind,
    /// A node range outside the source text, or with `pos > end`.
    InvalidRange {
        /// Start of the range.
        pos: u32,
        /// End of the range.
        end: u32,
        /// Length of the source text.
        source_len: usize,
    },
    /// The encoder configuration cannot be used.
    InvalidConfig(String),
    /// The assembled buffer failed verification.
    Verification(DecodeError),
}

impl EncodeError {
    pub(crate) fn capacity(limit: Limit, value: usize) -> Self {
        EncodeError::CapacityExceeded { limit, value }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::CapacityExceeded { limit, value } => {
                write!(f, "capacity exceeded: {} {} does not fit", limit.as_str(), value)
            }
            EncodeError::ReservedKind => {
                write!(f, "kind {:#x} is reserved for node lists", crate::format::KIND_NODE_LIST)
            }
            EncodeError::InvalidRange {
                pos,
                end,
                source_len,
            } => write!(
                f,
                "invalid node range [{}, {}) for source of {} bytes",
                pos, end, source_len
            ),
            EncodeError::InvalidConfig(msg) => write!(f, "invalid encoder config: {}", msg),
            EncodeError::Verification(err) => {
                write!(f, "encoded buffer failed verification: {}", err)
            }
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Verification(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while reading an encoded buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ends before a required read.
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        len: usize,
    },
    /// The metadata word names a protocol version this crate cannot read.
    UnsupportedVersion(u8),
    /// A header offset points outside the buffer or before the previous section.
    SectionOutOfBounds {
        /// Section name.
        section: &'static str,
        /// Offset read from the header.
        offset: u32,
        /// Buffer length.
        len: usize,
    },
    /// The node table is not a whole number of records, or is empty.
    MisalignedNodeTable,
    /// The string offsets section is not a whole number of pairs.
    MisalignedStringOffsets,
    /// A node index past the end of the node table.
    NodeIndexOutOfRange(u32),
    /// A string index past the end of the string offsets section.
    StringIndexOutOfRange(u32),
    /// A string span outside the string data section, or reversed.
    InvalidSpan {
        /// Start of the span.
        start: u32,
        /// End of the span.
        end: u32,
    },
    /// A data field carrying the reserved `0b11` tag.
    ReservedDataTag(u32),
    /// An extended data entry running past the extended data section.
    ExtendedOutOfBounds(u32),
    /// A `parent` or `next` link that breaks the pre-order structure.
    BrokenLink {
        /// Record whose link is wrong.
        index: u32,
        /// Description of the violated property.
        reason: &'static str,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { needed, len } => {
                write!(f, "truncated buffer: need {} bytes, got {}", needed, len)
            }
            DecodeError::UnsupportedVersion(v) => write!(
                f,
                "unsupported protocol version {} (expected {})",
                v,
                crate::format::PROTOCOL_VERSION
            ),
            DecodeError::SectionOutOfBounds {
                section,
                offset,
                len,
            } => write!(
                f,
                "{} section offset {} is out of bounds for buffer of {} bytes",
                section, offset, len
            ),
            DecodeError::MisalignedNodeTable => {
                write!(f, "node table is not a whole number of records")
            }
            DecodeError::MisalignedStringOffsets => {
                write!(f, "string offsets section is not a whole number of pairs")
            }
            DecodeError::NodeIndexOutOfRange(i) => write!(f, "node index {} out of range", i),
            DecodeError::StringIndexOutOfRange(i) => write!(f, "string index {} out of range", i),
            DecodeError::InvalidSpan { start, end } => {
                write!(f, "invalid string span [{}, {})", start, end)
            }
            DecodeError::ReservedDataTag(data) => write!(f, "reserved data tag in {:#010x}", data),
            DecodeError::ExtendedOutOfBounds(offset) => {
                write!(f, "extended data entry at {} runs past its section", offset)
            }
            DecodeError::BrokenLink { index, reason } => write!(f, "node {}: {}", index, reason),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_names_limit() {
        let err = EncodeError::capacity(Limit::StringIndex, 16_777_216);
        assert_eq!(err.to_string(), "capacity exceeded: string index 16777216 does not fit");
    }

    #[test]
    fn test_version_message() {
        let err = DecodeError::UnsupportedVersion(9);
        assert_eq!(err.to_string(), "unsupported protocol version 9 (expected 1)");
    }
}

//! The interface a tree producer implements to be encoded.
//!
//! The encoder never sees the producer's own node types. It asks each node
//! for its kind, its source range, what its `data` field should carry, and
//! its children in visitor order. Children that the grammar groups into one
//! slot (a statement block's statements, a parameter list) are reported as a
//! [`Child::List`] and become synthetic list records.

use serde::{Deserialize, Serialize};

use crate::error::{EncodeError, EncodeResult, Limit};
use crate::format::{DETACHED_POS, NODE_FLAGS_MASK};
use crate::kind::SyntaxKind;

/// A `[pos, end)` byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    /// Start offset (inclusive).
    pub pos: u32,
    /// End offset (exclusive).
    pub end: u32,
}

impl TextRange {
    /// Range used by nodes that do not come from the source text.
    pub const DETACHED: TextRange = TextRange {
        pos: DETACHED_POS,
        end: DETACHED_POS,
    };

    /// Create a range.
    pub const fn new(pos: u32, end: u32) -> Self {
        Self { pos, end }
    }

    /// An empty range at offset 0.
    pub const fn empty() -> Self {
        Self { pos: 0, end: 0 }
    }

    /// Length in bytes, 0 for detached ranges.
    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.pos)
    }

    /// Whether the range covers no bytes.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Whether this is the detached marker.
    pub fn is_detached(self) -> bool {
        self == Self::DETACHED
    }

    /// Check `pos <= end <= source_len`, allowing the detached marker.
    pub fn validate(self, source_len: usize) -> EncodeResult<()> {
        if self.is_detached() || (self.pos <= self.end && self.end as usize <= source_len) {
            Ok(())
        } else {
            Err(EncodeError::InvalidRange {
                pos: self.pos,
                end: self.end,
                source_len,
            })
        }
    }
}

/// Six producer-defined boolean bits stored beside a node's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags(u8);

impl NodeFlags {
    /// No flags set.
    pub const NONE: NodeFlags = NodeFlags(0);

    /// On a list record: its last child is a list record continuing this list.
    pub const LIST_CONTINUED: NodeFlags = NodeFlags(1);

    /// Create flags, rejecting bits above the sixth.
    pub fn new(bits: u8) -> EncodeResult<Self> {
        if u32::from(bits) & !NODE_FLAGS_MASK != 0 {
            return Err(EncodeError::capacity(Limit::NodeFlags, bits as usize));
        }
        Ok(NodeFlags(bits))
    }

    /// Build flags from a decoded field. Bits above the sixth are dropped.
    pub(crate) fn from_field(bits: u32) -> Self {
        NodeFlags((bits & NODE_FLAGS_MASK) as u8)
    }

    /// Get the raw bits.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: NodeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One word of an extended data entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedField<'a> {
    /// Text, stored as the index of its string table entry.
    Text(&'a str),
    /// A plain value stored verbatim.
    Word(u32),
}

/// What a node's `data` field carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload<'a> {
    /// Only children, or nothing at all (keywords, composite nodes).
    Children,
    /// A single literal text value.
    Text(&'a str),
    /// An entry in the extended data area.
    Extended(Vec<ExtendedField<'a>>),
}

/// A child slot of a node, in visitor order.
#[derive(Debug)]
pub enum Child<'a, N: ?Sized> {
    /// A single child node.
    Node(&'a N),
    /// A run of nodes the grammar treats as one slot.
    List {
        /// The range covered by the list.
        range: TextRange,
        /// The list items.
        items: Vec<&'a N>,
    },
}

/// A node of a parsed tree as seen by the encoder.
pub trait SourceNode {
    /// The node's syntax kind.
    fn kind(&self) -> SyntaxKind;

    /// The node's range in the source text.
    fn range(&self) -> TextRange;

    /// What the node's `data` field should carry.
    fn payload(&self) -> NodePayload<'_>;

    /// Kind-specific flag bits. Defaults to none.
    ///
    /// Nodes with an extended payload are stored without flags. Their bits
    /// are still checked against the 6-bit width and then dropped.
    fn flags(&self) -> EncodeResult<NodeFlags> {
        Ok(NodeFlags::NONE)
    }

    /// Width of a closing delimiter included in `end` but not in the text
    /// value (the closing quote of a string literal, the backtick of a
    /// template tail). Defaults to 0.
    fn closing_delimiter(&self) -> u32 {
        0
    }

    /// The node's child slots in visitor order.
    fn children(&self) -> Vec<Child<'_, Self>>;
}

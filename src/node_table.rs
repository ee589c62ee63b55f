//! Node table construction.
//!
//! The builder walks the tree once in pre-order and emits one fixed-size
//! record per node and one per list run. Relationships are plain indices:
//!
//! - `parent` is the index of the structural parent. List items point at
//!   their list record, list records at the node owning the list.
//! - `next` is the index of the first record after the subtree, or `0` when
//!   the subtree reaches the end of the table. The subtree of record `i` is
//!   therefore `[i, next(i))`, and `next(i)` is `i`'s next sibling whenever
//!   both records share a parent.
//!
//! Record 0 is the root. Nothing can follow *to* the root and nothing above
//! it can be its parent, so `0` doubles as the "none" value for both links.
//!
//! A list is one list record owned by the node, whatever its length. When
//! the items do not fit in one run, the record holds the first run and ends
//! with a nested list record holding the rest, and carries
//! [`NodeFlags::LIST_CONTINUED`]:
//!
//! ```text
//! owner
//!   NodeList [pos, end)       (continued)
//!     item 0 .. item k-1
//!     NodeList [item k, end)  (continued)
//!       ...
//!         NodeList [item m, end)
//!           item m .. item n-1
//! ```
//!
//! The owner therefore spends one child slot per list, and no list record
//! holds more than [`MAX_CHILD_COUNT`] children.
//!
//! Traversal uses an explicit work stack, so deeply nested trees do not
//! grow the call stack.

use crate::config::EncoderConfig;
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult, Limit};
use crate::extended::{ExtIdx, ExtendedData};
use crate::format::{
    MAX_CHILD_COUNT, NODE_DATA_CHILD_MASK, NODE_DATA_EXTENDED_MASK, NODE_DATA_STRING_INDEX_MASK,
    NODE_DATA_TYPE_CHILDREN, NODE_DATA_TYPE_EXTENDED, NODE_DATA_TYPE_MASK, NODE_DATA_TYPE_STRING,
    NODE_FLAGS_SHIFT, NODE_SIZE, append_u32s,
};
use crate::kind::RecordKind;
use crate::node::{Child, ExtendedField, NodeFlags, NodePayload, SourceNode, TextRange};
use crate::string_table::{StrIdx, StringTable, TextOrigin};

// ============================================================================
// Records
// ============================================================================

/// Index of a record in the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(u32);

impl NodeIdx {
    /// The root record, also used as "no node".
    pub const ROOT: NodeIdx = NodeIdx(0);

    /// Create a NodeIdx from a raw u32 value.
    #[inline]
    pub fn from_raw(idx: u32) -> Self {
        NodeIdx(idx)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// The `data` field of a record, before packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeData {
    /// Number of direct child records.
    Children {
        /// Child record count.
        count: u8,
        /// Node flags.
        flags: NodeFlags,
    },
    /// A string table entry.
    String {
        /// The entry holding the node's text.
        index: StrIdx,
        /// Node flags.
        flags: NodeFlags,
    },
    /// An entry in the extended data area. The 30-bit offset leaves no room
    /// for flags.
    Extended(ExtIdx),
}

impl NodeData {
    /// Pack into the wire representation.
    pub fn pack(self) -> u32 {
        match self {
            NodeData::Children { count, flags } => {
                NODE_DATA_TYPE_CHILDREN
                    | (u32::from(flags.bits()) << NODE_FLAGS_SHIFT)
                    | u32::from(count)
            }
            NodeData::String { index, flags } => {
                NODE_DATA_TYPE_STRING | (u32::from(flags.bits()) << NODE_FLAGS_SHIFT) | index.raw()
            }
            NodeData::Extended(offset) => NODE_DATA_TYPE_EXTENDED | offset.raw(),
        }
    }

    /// Decode a wire `data` field.
    pub fn unpack(raw: u32) -> DecodeResult<NodeData> {
        let flags = NodeFlags::from_field(raw >> NODE_FLAGS_SHIFT);
        match raw & NODE_DATA_TYPE_MASK {
            NODE_DATA_TYPE_CHILDREN => Ok(NodeData::Children {
                count: (raw & NODE_DATA_CHILD_MASK) as u8,
                flags,
            }),
            NODE_DATA_TYPE_STRING => Ok(NodeData::String {
                index: StrIdx::from_raw(raw & NODE_DATA_STRING_INDEX_MASK),
                flags,
            }),
            NODE_DATA_TYPE_EXTENDED => Ok(NodeData::Extended(ExtIdx::from_raw(
                raw & NODE_DATA_EXTENDED_MASK,
            ))),
            _ => Err(DecodeError::ReservedDataTag(raw)),
        }
    }

    /// Node flags, empty for extended payloads.
    pub fn flags(self) -> NodeFlags {
        match self {
            NodeData::Children { flags, .. } | NodeData::String { flags, .. } => flags,
            NodeData::Extended(_) => NodeFlags::NONE,
        }
    }
}

/// One node table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    /// Syntax kind or list marker.
    pub kind: RecordKind,
    /// Source range.
    pub range: TextRange,
    /// First record after this record's subtree, or root for none.
    pub next: NodeIdx,
    /// Structural parent.
    pub parent: NodeIdx,
    /// Tagged payload.
    pub data: NodeData,
}

/// A finished node table.
#[derive(Debug)]
pub struct NodeTable {
    records: Vec<NodeRecord>,
}

impl NodeTable {
    /// All records in table order.
    pub fn records(&self) -> &[NodeRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Byte length of the node table section.
    pub fn byte_len(&self) -> usize {
        self.records.len() * NODE_SIZE
    }

    /// Append the node table section to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        for record in &self.records {
            append_u32s(
                out,
                &[
                    record.kind.to_raw(),
                    record.range.pos,
                    record.range.end,
                    record.next.raw(),
                    record.parent.raw(),
                    record.data.pack(),
                ],
            );
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// A child slot waiting to be emitted.
enum Slot<'a, N: ?Sized> {
    Node(&'a N),
    /// The remaining items of a list, from its first unemitted item.
    List {
        range: TextRange,
        items: Vec<&'a N>,
    },
}

enum Work<'a, N: ?Sized> {
    Emit { slot: Slot<'a, N>, parent: NodeIdx },
    Close(NodeIdx),
}

/// Builds the node table of one tree, interning text as it goes.
pub struct NodeTableBuilder<'c> {
    config: &'c EncoderConfig,
    source_len: usize,
    records: Vec<NodeRecord>,
}

impl<'c> NodeTableBuilder<'c> {
    /// Create a builder for a tree over a source text of `source_len` bytes.
    pub fn new(config: &'c EncoderConfig, source_len: usize) -> Self {
        Self {
            config,
            source_len,
            records: Vec::new(),
        }
    }

    /// Walk `root` and return the finished table.
    pub fn build<'a, N: SourceNode + ?Sized>(
        mut self,
        root: &'a N,
        strings: &mut StringTable<'_>,
        extended: &mut ExtendedData,
    ) -> EncodeResult<NodeTable> {
        let mut stack: Vec<Work<'a, N>> = Vec::new();

        let range = root.range();
        range.validate(self.source_len)?;
        let data = self.root_data(root, strings, extended)?;
        let slots = self.child_slots(root);
        let root_idx = self.push(RecordKind::Syntax(root.kind()), range, NodeIdx::ROOT, data)?;
        schedule(&mut stack, root_idx, slots);

        while let Some(work) = stack.pop() {
            match work {
                Work::Close(idx) => {
                    let next = NodeIdx(self.records.len() as u32);
                    self.records[idx.0 as usize].next = next;
                }
                Work::Emit {
                    slot: Slot::Node(node),
                    parent,
                } => {
                    let range = node.range();
                    range.validate(self.source_len)?;
                    let slots = self.child_slots(node);
                    let data = self.node_data(node, slots.len(), strings, extended)?;
                    let idx = self.push(RecordKind::Syntax(node.kind()), range, parent, data)?;
                    schedule(&mut stack, idx, slots);
                }
                Work::Emit {
                    slot: Slot::List { range, mut items },
                    parent,
                } => {
                    range.validate(self.source_len)?;
                    let run = self.list_run();
                    let (flags, slots) = if items.len() > run {
                        // Keep one slot free for the rest of the list.
                        let rest = items.split_off(run.min(MAX_CHILD_COUNT - 1));
                        let mut slots: Vec<_> = items.into_iter().map(Slot::Node).collect();
                        slots.push(continuation(range, rest));
                        (NodeFlags::LIST_CONTINUED, slots)
                    } else {
                        (NodeFlags::NONE, items.into_iter().map(Slot::Node).collect())
                    };
                    let data = NodeData::Children {
                        count: slots.len() as u8,
                        flags,
                    };
                    let idx = self.push(RecordKind::List, range, parent, data)?;
                    schedule(&mut stack, idx, slots);
                }
            }
        }

        let end = NodeIdx(self.records.len() as u32);
        for record in &mut self.records {
            if record.next == end {
                record.next = NodeIdx::ROOT;
            }
        }
        Ok(NodeTable {
            records: self.records,
        })
    }

    fn push(
        &mut self,
        kind: RecordKind,
        range: TextRange,
        parent: NodeIdx,
        data: NodeData,
    ) -> EncodeResult<NodeIdx> {
        let index = self.records.len();
        // `index + 1` must stay representable as a thread pointer.
        if index >= u32::MAX as usize {
            return Err(EncodeError::capacity(Limit::NodeCount, index));
        }
        self.records.push(NodeRecord {
            kind,
            range,
            next: NodeIdx::ROOT,
            parent,
            data,
        });
        Ok(NodeIdx(index as u32))
    }

    fn list_run(&self) -> usize {
        usize::from(self.config.list_run.max(1))
    }

    /// Flatten a node's children into record slots, one per node or list.
    fn child_slots<'a, N: SourceNode + ?Sized>(&self, node: &'a N) -> Vec<Slot<'a, N>> {
        let run = self.list_run();
        let mut slots = Vec::new();
        for child in node.children() {
            match child {
                Child::Node(node) => slots.push(Slot::Node(node)),
                Child::List { items, .. } if items.is_empty() => {}
                Child::List { range, items } => {
                    if items.len() > run {
                        log::trace!(
                            "chaining list of {} items at [{}, {}) in runs of {}",
                            items.len(),
                            range.pos,
                            range.end,
                            run
                        );
                    }
                    slots.push(Slot::List { range, items });
                }
            }
        }
        slots
    }

    fn node_data<N: SourceNode + ?Sized>(
        &self,
        node: &N,
        child_count: usize,
        strings: &mut StringTable<'_>,
        extended: &mut ExtendedData,
    ) -> EncodeResult<NodeData> {
        let origin = TextOrigin::node(node.closing_delimiter());
        match node.payload() {
            NodePayload::Children => {
                if child_count > MAX_CHILD_COUNT {
                    return Err(EncodeError::capacity(Limit::ChildCount, child_count));
                }
                Ok(NodeData::Children {
                    count: child_count as u8,
                    flags: node.flags()?,
                })
            }
            NodePayload::Text(text) => Ok(NodeData::String {
                index: strings.intern(text, origin, node.range())?,
                flags: node.flags()?,
            }),
            NodePayload::Extended(fields) => {
                // Extended records have no flag bits; the width is still checked.
                node.flags()?;
                let mut words = Vec::with_capacity(fields.len());
                for field in fields {
                    words.push(match field {
                        ExtendedField::Text(text) => {
                            strings.intern(text, origin, node.range())?.raw()
                        }
                        ExtendedField::Word(word) => word,
                    });
                }
                Ok(NodeData::Extended(extended.push(&words)?))
            }
        }
    }

    /// The root always exposes the whole file as its text.
    fn root_data<N: SourceNode + ?Sized>(
        &self,
        root: &N,
        strings: &mut StringTable<'_>,
        extended: &mut ExtendedData,
    ) -> EncodeResult<NodeData> {
        let flags = root.flags()?;
        let whole_file = TextRange::new(0, self.source_len as u32);
        let text = strings.intern("", TextOrigin::SourceFile, whole_file)?;
        if !self.config.has_source_info() {
            return Ok(NodeData::String { index: text, flags });
        }
        let detached = TextOrigin::node(0);
        let file_name = self.config.file_name.as_deref().unwrap_or_default();
        let source_id = self.config.source_id.as_deref().unwrap_or_default();
        let file_name = strings.intern(file_name, detached, TextRange::DETACHED)?;
        let source_id = strings.intern(source_id, detached, TextRange::DETACHED)?;
        let offset = extended.push(&[text.raw(), file_name.raw(), source_id.raw()])?;
        Ok(NodeData::Extended(offset))
    }
}

/// Queue `slots` as children of `idx`, followed by closing `idx`.
fn schedule<'a, N: ?Sized>(stack: &mut Vec<Work<'a, N>>, idx: NodeIdx, slots: Vec<Slot<'a, N>>) {
    stack.push(Work::Close(idx));
    stack.extend(slots.into_iter().rev().map(|slot| Work::Emit { slot, parent: idx }));
}

/// The list record holding `rest`, nested inside the record spanning `range`.
///
/// It starts at its first item and keeps the list's end.
fn continuation<'a, N: SourceNode + ?Sized>(range: TextRange, rest: Vec<&'a N>) -> Slot<'a, N> {
    let head = rest[0].range();
    let pos = if range.is_detached() || head.is_detached() {
        range.pos
    } else {
        head.pos.clamp(range.pos, range.end)
    };
    Slot::List {
        range: TextRange::new(pos, range.end),
        items: rest,
    }
}

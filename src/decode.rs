//! Read-only view over an encoded buffer.
//!
//! Every offset read from the buffer is checked against the buffer length
//! before it is followed. Records are addressed directly:
//!
//! ```text
//! record i   = nodes + i * NODE_SIZE
//! string n   = string_data + [offsets[2n] .. offsets[2n + 1])
//! extended e = extended_data + e  →  [count][word; count]
//! ```
//!
//! Structure is recovered from `parent` and `next` alone: the subtree of
//! record `i` is `[i, next(i))`, or `[i, node_count)` when `next(i)` is 0.

use crate::assemble::Header;
use crate::error::{DecodeError, DecodeResult};
use crate::extended::ExtIdx;
use crate::format::{
    HEADER_OFFSET_EXTENDED_DATA, HEADER_OFFSET_METADATA, HEADER_OFFSET_NODES,
    HEADER_OFFSET_STRING_DATA, HEADER_OFFSET_STRING_OFFSETS, HEADER_SIZE, METADATA_VERSION_SHIFT,
    NODE_OFFSET_DATA, NODE_OFFSET_END, NODE_OFFSET_KIND, NODE_OFFSET_NEXT, NODE_OFFSET_PARENT,
    NODE_OFFSET_POS, NODE_SIZE, PROTOCOL_VERSION, STRING_OFFSET_PAIR_SIZE, read_u32,
};
use crate::kind::RecordKind;
use crate::node::{NodeFlags, TextRange};
use crate::node_table::{NodeData, NodeIdx, NodeRecord};
use crate::string_table::StrIdx;

/// A validated encoded buffer.
#[derive(Debug, Clone, Copy)]
pub struct EncodedTree<'a> {
    buf: &'a [u8],
    header: Header,
    string_count: u32,
    node_count: u32,
}

impl<'a> EncodedTree<'a> {
    /// Validate the header and section layout of `buf`.
    pub fn parse(buf: &'a [u8]) -> DecodeResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated {
                needed: HEADER_SIZE,
                len: buf.len(),
            });
        }
        let word = |offset| read_u32(buf, offset).unwrap_or_default();

        let metadata = word(HEADER_OFFSET_METADATA);
        let version = (metadata >> METADATA_VERSION_SHIFT) as u8;
        if version != PROTOCOL_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let header = Header {
            metadata,
            string_offsets: word(HEADER_OFFSET_STRING_OFFSETS),
            string_data: word(HEADER_OFFSET_STRING_DATA),
            extended_data: word(HEADER_OFFSET_EXTENDED_DATA),
            nodes: word(HEADER_OFFSET_NODES),
        };

        let mut previous = HEADER_SIZE;
        for (section, offset) in [
            ("string offsets", header.string_offsets),
            ("string data", header.string_data),
            ("extended data", header.extended_data),
            ("node table", header.nodes),
        ] {
            let start = offset as usize;
            if start < previous || start > buf.len() {
                return Err(DecodeError::SectionOutOfBounds {
                    section,
                    offset,
                    len: buf.len(),
                });
            }
            previous = start;
        }

        let offsets_len = (header.string_data - header.string_offsets) as usize;
        if offsets_len % STRING_OFFSET_PAIR_SIZE != 0 {
            return Err(DecodeError::MisalignedStringOffsets);
        }
        let nodes_len = buf.len() - header.nodes as usize;
        if nodes_len == 0 || nodes_len % NODE_SIZE != 0 {
            return Err(DecodeError::MisalignedNodeTable);
        }

        Ok(Self {
            buf,
            header,
            string_count: (offsets_len / STRING_OFFSET_PAIR_SIZE) as u32,
            node_count: (nodes_len / NODE_SIZE) as u32,
        })
    }

    /// The buffer header.
    pub fn header(&self) -> Header {
        self.header
    }

    /// Number of node records.
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Number of string table entries.
    pub fn string_count(&self) -> u32 {
        self.string_count
    }

    /// The underlying buffer.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    fn word(&self, offset: usize) -> DecodeResult<u32> {
        read_u32(self.buf, offset).ok_or(DecodeError::Truncated {
            needed: offset + 4,
            len: self.buf.len(),
        })
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Read record `idx`.
    pub fn node(&self, idx: NodeIdx) -> DecodeResult<NodeRecord> {
        if idx.raw() >= self.node_count {
            return Err(DecodeError::NodeIndexOutOfRange(idx.raw()));
        }
        let base = self.header.nodes as usize + idx.raw() as usize * NODE_SIZE;
        Ok(NodeRecord {
            kind: RecordKind::from_raw(self.word(base + NODE_OFFSET_KIND)?),
            range: TextRange::new(
                self.word(base + NODE_OFFSET_POS)?,
                self.word(base + NODE_OFFSET_END)?,
            ),
            next: NodeIdx::from_raw(self.word(base + NODE_OFFSET_NEXT)?),
            parent: NodeIdx::from_raw(self.word(base + NODE_OFFSET_PARENT)?),
            data: NodeData::unpack(self.word(base + NODE_OFFSET_DATA)?)?,
        })
    }

    /// One past the last record of `idx`'s subtree.
    pub fn subtree_end(&self, idx: NodeIdx) -> DecodeResult<NodeIdx> {
        let next = self.node(idx)?.next;
        if next == NodeIdx::ROOT {
            Ok(NodeIdx::from_raw(self.node_count))
        } else {
            Ok(next)
        }
    }

    /// Direct child records of `idx`, in order.
    pub fn children(&self, idx: NodeIdx) -> DecodeResult<Vec<NodeIdx>> {
        let end = self.subtree_end(idx)?;
        let mut children = Vec::new();
        let mut child = idx.raw() + 1;
        while child < end.raw() {
            let child_idx = NodeIdx::from_raw(child);
            let next = self.subtree_end(child_idx)?;
            if next.raw() <= child {
                return Err(DecodeError::BrokenLink {
                    index: child,
                    reason: "next does not move forward",
                });
            }
            children.push(child_idx);
            child = next.raw();
        }
        Ok(children)
    }

    /// Parents of `idx`, nearest first, ending at the root.
    pub fn ancestors(&self, idx: NodeIdx) -> DecodeResult<Vec<NodeIdx>> {
        let mut ancestors = Vec::new();
        let mut current = idx;
        while current != NodeIdx::ROOT {
            let parent = self.node(current)?.parent;
            if parent >= current {
                return Err(DecodeError::BrokenLink {
                    index: current.raw(),
                    reason: "parent does not precede its child",
                });
            }
            ancestors.push(parent);
            current = parent;
        }
        Ok(ancestors)
    }

    /// Items of the logical list starting at list record `idx`.
    ///
    /// A continued list record ends with the list record holding the rest of
    /// the items, so the chain is followed through last children.
    pub fn list_items(&self, idx: NodeIdx) -> DecodeResult<Vec<NodeIdx>> {
        let mut record = self.node(idx)?;
        if !record.kind.is_list() {
            return Err(DecodeError::BrokenLink {
                index: idx.raw(),
                reason: "not a list record",
            });
        }
        let mut current = idx;
        let mut items = Vec::new();
        loop {
            let mut children = self.children(current)?;
            if !record.data.flags().contains(NodeFlags::LIST_CONTINUED) {
                items.append(&mut children);
                return Ok(items);
            }
            let rest = children.pop().ok_or(DecodeError::BrokenLink {
                index: current.raw(),
                reason: "continued list has no records",
            })?;
            record = self.node(rest)?;
            if !record.kind.is_list() || record.parent != current {
                return Err(DecodeError::BrokenLink {
                    index: current.raw(),
                    reason: "continued list does not end with a list record",
                });
            }
            items.append(&mut children);
            current = rest;
        }
    }

    // ========================================================================
    // Strings and extended data
    // ========================================================================

    /// The `(start, end)` span of string `index`, relative to string data.
    pub fn string_span(&self, index: StrIdx) -> DecodeResult<(u32, u32)> {
        if index.raw() >= self.string_count {
            return Err(DecodeError::StringIndexOutOfRange(index.raw()));
        }
        let base = self.header.string_offsets as usize
            + index.raw() as usize * STRING_OFFSET_PAIR_SIZE;
        Ok((self.word(base)?, self.word(base + 4)?))
    }

    /// The text of string `index`.
    pub fn string(&self, index: StrIdx) -> DecodeResult<&'a str> {
        let (start, end) = self.string_span(index)?;
        let buf: &'a [u8] = self.buf;
        let data = &buf[self.header.string_data as usize..self.header.extended_data as usize];
        let bytes = data
            .get(start as usize..end as usize)
            .ok_or(DecodeError::InvalidSpan { start, end })?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidSpan { start, end })
    }

    /// The text of a record whose data is a string entry.
    pub fn text(&self, idx: NodeIdx) -> DecodeResult<Option<&'a str>> {
        match self.node(idx)?.data {
            NodeData::String { index, .. } => self.string(index).map(Some),
            _ => Ok(None),
        }
    }

    /// The words of the extended entry at `offset`.
    pub fn extended(&self, offset: ExtIdx) -> DecodeResult<Vec<u32>> {
        let start = self.header.extended_data as usize;
        let end = self.header.nodes as usize;
        let out_of_bounds = DecodeError::ExtendedOutOfBounds(offset.raw());

        let count_at = start + offset.raw() as usize;
        if count_at + 4 > end {
            return Err(out_of_bounds);
        }
        let count = self.word(count_at)? as usize;
        let words_at = count_at + 4;
        if count > (end - words_at) / 4 {
            return Err(out_of_bounds);
        }
        (0..count).map(|i| self.word(words_at + i * 4)).collect()
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Check that links form a pre-order tree and that every payload resolves.
    pub fn verify(&self) -> DecodeResult<()> {
        for index in 0..self.string_count {
            self.string(StrIdx::from_raw(index))?;
        }

        let count = self.node_count;
        let mut direct_children = vec![0u32; count as usize];
        let mut last_child = vec![0u32; count as usize];
        // Open ancestors of the current record, with their subtree ends.
        let mut open: Vec<(u32, u32)> = Vec::new();

        for i in 0..count {
            let idx = NodeIdx::from_raw(i);
            let record = self.node(idx)?;
            let end = if record.next == NodeIdx::ROOT {
                count
            } else {
                record.next.raw()
            };
            let broken = |reason: &'static str| DecodeError::BrokenLink { index: i, reason };

            if end <= i || end > count {
                return Err(broken("next does not point past the record"));
            }

            while open.last().is_some_and(|&(_, open_end)| open_end <= i) {
                open.pop();
            }
            match open.last() {
                None if i == 0 => {
                    if record.parent != NodeIdx::ROOT || end != count {
                        return Err(broken("root must cover the whole table"));
                    }
                    if record.kind.is_list() {
                        return Err(broken("root is a list record"));
                    }
                }
                None => return Err(broken("record outside the root subtree")),
                Some(&(parent, parent_end)) => {
                    if record.parent.raw() != parent {
                        return Err(broken("parent does not match pre-order position"));
                    }
                    if end > parent_end {
                        return Err(broken("subtree extends past its parent"));
                    }
                    direct_children[parent as usize] += 1;
                    last_child[parent as usize] = i;
                }
            }
            open.push((i, end));

            match record.data {
                NodeData::String { index, .. } => {
                    self.string(index)?;
                }
                NodeData::Extended(offset) => {
                    self.extended(offset)?;
                }
                NodeData::Children { .. } => {}
            }
        }

        for i in 0..count {
            let record = self.node(NodeIdx::from_raw(i))?;
            let NodeData::Children {
                count: expected,
                flags,
            } = record.data
            else {
                continue;
            };
            let broken = |reason: &'static str| DecodeError::BrokenLink { index: i, reason };
            if u32::from(expected) != direct_children[i as usize] {
                return Err(broken("child count does not match child records"));
            }
            if record.kind.is_list() && flags.contains(NodeFlags::LIST_CONTINUED) {
                let last = last_child[i as usize];
                if last == 0 || !self.node(NodeIdx::from_raw(last))?.kind.is_list() {
                    return Err(broken("continued list does not end with a list record"));
                }
            }
        }
        Ok(())
    }
}

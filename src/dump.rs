//! Human-readable listing of an encoded buffer.
//!
//! One line per record, indented by depth:
//!
//! ```text
//! #308 "f(a)" [0, 4) i=0 next=0
//!   #214 [0, 4) i=1 next=0
//!     #80 "f" [0, 1) i=2 next=3
//!     NodeList [2, 3) i=3 next=0
//!       #80 "a" [2, 3) i=4 next=0
//! ```
//!
//! Records with extended data print `ext=<offset>`; non-zero flags print
//! `flags=<bits>`.

use std::fmt::Write;

use crate::decode::EncodedTree;
use crate::error::DecodeResult;
use crate::kind::RecordKind;
use crate::node_table::{NodeData, NodeIdx};

/// Render every record of `buf`.
pub fn dump(buf: &[u8]) -> DecodeResult<String> {
    let tree = EncodedTree::parse(buf)?;
    dump_tree(&tree)
}

/// Render every record of an already parsed buffer.
pub fn dump_tree(tree: &EncodedTree<'_>) -> DecodeResult<String> {
    let mut out = String::new();
    // Subtree ends of the records enclosing the current one.
    let mut open: Vec<u32> = Vec::new();

    for i in 0..tree.node_count() {
        let idx = NodeIdx::from_raw(i);
        let record = tree.node(idx)?;
        while open.last().is_some_and(|&end| end <= i) {
            open.pop();
        }

        let _ = write!(out, "{:indent$}", "", indent = open.len() * 2);
        match record.kind {
            RecordKind::Syntax(kind) => {
                let _ = write!(out, "#{}", kind.raw());
            }
            RecordKind::List => out.push_str("NodeList"),
        }
        if let NodeData::String { index, .. } = record.data {
            let _ = write!(out, " {:?}", tree.string(index)?);
        }
        let _ = write!(
            out,
            " [{}, {}) i={} next={}",
            record.range.pos,
            record.range.end,
            i,
            record.next.raw()
        );
        if let NodeData::Extended(offset) = record.data {
            let _ = write!(out, " ext={}", offset.raw());
        }
        let flags = record.data.flags();
        if flags.bits() != 0 {
            let _ = write!(out, " flags={:#x}", flags.bits());
        }
        out.push('\n');

        open.push(tree.subtree_end(idx)?.raw());
    }
    Ok(out)
}
